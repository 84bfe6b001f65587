//! Event bridge between the session screen and the engine.
//!
//! The engine processes one event at a time. Everything that can change it
//! (user commands, timer fires, clip load reports) goes through the single
//! queue created here, so nothing ever touches engine state concurrently.
//!
//! # Architecture
//!
//! - **UI** owns [`SessionHandle`]: sends commands, reads the atomic readback
//! - **Host callbacks** hold an [`EventSender`] to post timer and load events
//! - **Engine driver** owns [`EngineHandle`] with the [`SessionEngine`]
//!
//! # Usage
//!
//! ```ignore
//! let (session, mut engine) = create_bridge(engine);
//!
//! // UI: send commands
//! session.start();
//!
//! // Host timer callback
//! sender.post(Event::TimerFired { timer, token });
//!
//! // Driver: drain the queue and publish
//! engine.process_events();
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering},
    mpsc::{self, Receiver, Sender},
};

use log::debug;

use crate::engine::SessionEngine;
use crate::event::Event;
use crate::state::{Command, CommandResult, EngineState, SessionReadback, format_clock};
use crate::timeline::Phase;

/// Handle for the session screen.
pub struct SessionHandle {
    /// Queue into the engine.
    event_tx: Sender<Event>,

    /// Results of processed commands, in order.
    result_rx: Receiver<CommandResult>,

    /// Shared readback state (written by the engine driver).
    readback: Arc<SharedReadback>,
}

/// Handle owning the engine and the receiving end of the queue.
pub struct EngineHandle {
    engine: SessionEngine,

    event_rx: Receiver<Event>,

    /// Kept so host callbacks can be handed new senders.
    event_tx: Sender<Event>,

    result_tx: Sender<CommandResult>,

    readback: Arc<SharedReadback>,
}

/// Cloneable sender for host callbacks.
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<Event>,
}

impl EventSender {
    /// Queue an event. Dropped silently once the engine is gone.
    pub fn post(&self, event: Event) {
        if self.tx.send(event).is_err() {
            debug!("engine gone, event dropped");
        }
    }
}

/// Lock-free shared state for engine -> UI readback.
struct SharedReadback {
    elapsed_sec: AtomicU32,
    /// `u32::MAX` for open sessions.
    remaining_sec: AtomicU32,
    state: AtomicU8,
    phase: AtomicU8,
    /// Whole-bar progress stored as f32 bits.
    progress_bits: AtomicU32,
    voice_enabled: AtomicBool,
    confirmation_pending: AtomicBool,
    exited: AtomicBool,
}

const NO_REMAINING: u32 = u32::MAX;

impl SharedReadback {
    fn new() -> Self {
        Self {
            elapsed_sec: AtomicU32::new(0),
            remaining_sec: AtomicU32::new(NO_REMAINING),
            state: AtomicU8::new(EngineState::Idle.code()),
            phase: AtomicU8::new(Phase::Intro.code()),
            progress_bits: AtomicU32::new(0.0_f32.to_bits()),
            voice_enabled: AtomicBool::new(false),
            confirmation_pending: AtomicBool::new(false),
            exited: AtomicBool::new(false),
        }
    }

    fn store(&self, readback: &SessionReadback) {
        self.elapsed_sec
            .store(readback.elapsed_sec, Ordering::Relaxed);
        self.remaining_sec.store(
            readback.remaining_sec.unwrap_or(NO_REMAINING),
            Ordering::Relaxed,
        );
        self.state.store(readback.state.code(), Ordering::Relaxed);
        self.phase.store(readback.phase.code(), Ordering::Relaxed);
        self.progress_bits
            .store(readback.progress.to_bits(), Ordering::Relaxed);
        self.voice_enabled
            .store(readback.voice_enabled, Ordering::Relaxed);
        self.confirmation_pending
            .store(readback.confirmation_pending, Ordering::Relaxed);
        self.exited.store(readback.exited, Ordering::Relaxed);
    }
}

/// Create a linked pair of handles around a mounted engine.
///
/// The readback is published once immediately, so the UI sees the mounted
/// state before any event is processed.
pub fn create_bridge(engine: SessionEngine) -> (SessionHandle, EngineHandle) {
    let (event_tx, event_rx) = mpsc::channel();
    let (result_tx, result_rx) = mpsc::channel();
    let readback = Arc::new(SharedReadback::new());

    let session_handle = SessionHandle {
        event_tx: event_tx.clone(),
        result_rx,
        readback: Arc::clone(&readback),
    };

    let engine_handle = EngineHandle {
        engine,
        event_rx,
        event_tx,
        result_tx,
        readback,
    };
    engine_handle.sync_readback();

    (session_handle, engine_handle)
}

// ═══════════════════════════════════════════════════════════════════
// SessionHandle - UI API
// ═══════════════════════════════════════════════════════════════════

impl SessionHandle {
    /// Queue a command for the engine.
    pub fn send(&self, command: Command) {
        if self.event_tx.send(Event::Command(command)).is_err() {
            debug!("engine gone, {:?} dropped", command);
        }
    }

    /// Sender for host callbacks (timers, clip loads).
    pub fn event_sender(&self) -> EventSender {
        EventSender {
            tx: self.event_tx.clone(),
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Convenience Methods
    // ───────────────────────────────────────────────────────────────

    pub fn start(&self) {
        self.send(Command::Start);
    }

    pub fn toggle_pause(&self) {
        self.send(Command::TogglePause);
    }

    pub fn seek(&self, phase: Phase) {
        self.send(Command::Seek { phase });
    }

    pub fn toggle_voice(&self) {
        self.send(Command::ToggleVoice);
    }

    pub fn finish(&self) {
        self.send(Command::Finish);
    }

    pub fn confirm_finish(&self) {
        self.send(Command::ConfirmFinish);
    }

    pub fn cancel_finish(&self) {
        self.send(Command::CancelFinish);
    }

    pub fn unmount(&self) {
        self.send(Command::Unmount);
    }

    /// Next command result, if any (non-blocking).
    pub fn poll_result(&self) -> Option<CommandResult> {
        self.result_rx.try_recv().ok()
    }

    /// Drain all pending command results.
    pub fn drain_results(&self) -> Vec<CommandResult> {
        self.result_rx.try_iter().collect()
    }

    // ───────────────────────────────────────────────────────────────
    // Readback
    // ───────────────────────────────────────────────────────────────

    #[inline]
    pub fn elapsed_sec(&self) -> u32 {
        self.readback.elapsed_sec.load(Ordering::Relaxed)
    }

    /// `None` for open sessions.
    #[inline]
    pub fn remaining_sec(&self) -> Option<u32> {
        match self.readback.remaining_sec.load(Ordering::Relaxed) {
            NO_REMAINING => None,
            remaining => Some(remaining),
        }
    }

    /// The big clock: remaining time when timed, elapsed time when open.
    pub fn display(&self) -> String {
        format_clock(self.remaining_sec().unwrap_or_else(|| self.elapsed_sec()))
    }

    #[inline]
    pub fn state(&self) -> EngineState {
        EngineState::from_code(self.readback.state.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        Phase::from_code(self.readback.phase.load(Ordering::Relaxed)).unwrap_or(Phase::Intro)
    }

    #[inline]
    pub fn progress(&self) -> f32 {
        f32::from_bits(self.readback.progress_bits.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn voice_enabled(&self) -> bool {
        self.readback.voice_enabled.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn confirmation_pending(&self) -> bool {
        self.readback.confirmation_pending.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn exited(&self) -> bool {
        self.readback.exited.load(Ordering::Relaxed)
    }
}

// ═══════════════════════════════════════════════════════════════════
// EngineHandle - engine driver API
// ═══════════════════════════════════════════════════════════════════

impl EngineHandle {
    // ───────────────────────────────────────────────────────────────
    // Event Processing
    // ───────────────────────────────────────────────────────────────

    /// Process every queued event in arrival order, then publish the
    /// readback. Returns the number of events processed.
    pub fn process_events(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.event_rx.try_recv() {
            self.dispatch(event);
            processed += 1;
        }
        if processed > 0 {
            self.sync_readback();
        }
        processed
    }

    /// Process one event immediately, bypassing the queue.
    ///
    /// Only for hosts that call in on the engine's own thread.
    pub fn dispatch(&mut self, event: Event) -> CommandResult {
        let is_command = matches!(event, Event::Command(_));
        let result = self.engine.handle(event);
        if is_command {
            let _ = self.result_tx.send(result);
        }
        result
    }

    /// Sender for host callbacks.
    pub fn event_sender(&self) -> EventSender {
        EventSender {
            tx: self.event_tx.clone(),
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Engine State Access
    // ───────────────────────────────────────────────────────────────

    /// Full projection, for hosts that render more than the atomics carry.
    pub fn readback(&self) -> SessionReadback {
        self.engine.readback()
    }

    pub fn engine(&self) -> &SessionEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut SessionEngine {
        &mut self.engine
    }

    /// Publish the engine state to the shared readback.
    pub fn sync_readback(&self) {
        self.readback.store(&self.engine.readback());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ClipKind;
    use crate::services::TimerId;
    use crate::state::{EngineConfig, Mode, RawParams, SessionConfig, resolve};
    use crate::test::Rig;

    fn narrated(minutes: u32) -> (SessionHandle, EngineHandle, Rig) {
        let config = SessionConfig {
            mode: Mode::Timed { minutes },
            ..SessionConfig::default()
        };
        let (engine, rig) = Rig::mount(config, EngineConfig::default());
        let (session, engine) = create_bridge(engine);
        let sender = session.event_sender();
        sender.post(Event::ClipLoaded {
            clip: ClipKind::Intro,
            duration_sec: Some(8.0),
        });
        sender.post(Event::ClipLoaded {
            clip: ClipKind::Outro,
            duration_sec: Some(20.0),
        });
        (session, engine, rig)
    }

    /// Post the armed clock tick and process it.
    fn tick(engine: &mut EngineHandle, rig: &Rig) {
        if let Some(token) = rig.timers.pending(TimerId::Clock) {
            engine.event_sender().post(Event::TimerFired {
                timer: TimerId::Clock,
                token,
            });
            engine.process_events();
        }
    }

    #[test]
    fn test_mounted_readback_is_published() {
        let (session, _engine, _rig) = narrated(10);
        assert_eq!(session.state(), EngineState::Idle);
        assert_eq!(session.display(), "10:00");
        assert!(session.voice_enabled());
        assert!(!session.exited());
    }

    #[test]
    fn test_full_session_through_bridge() {
        let (session, mut engine, rig) = narrated(1);
        session.start();
        assert_eq!(engine.process_events(), 3);
        assert_eq!(session.poll_result(), Some(CommandResult::Ok));
        assert_eq!(session.state(), EngineState::Running);
        assert_eq!(session.phase(), Phase::Intro);
        assert!(rig.audio.player(ClipKind::Intro).is_playing());

        for _ in 0..8 {
            tick(&mut engine, &rig);
        }
        assert_eq!(session.phase(), Phase::Meditation);
        assert!(!rig.audio.player(ClipKind::Intro).is_playing());

        for _ in 0..60 {
            tick(&mut engine, &rig);
        }
        assert_eq!(session.phase(), Phase::Outro);
        assert!(rig.audio.player(ClipKind::Outro).is_playing());

        for _ in 0..20 {
            tick(&mut engine, &rig);
        }
        assert_eq!(session.state(), EngineState::Finished);
        assert_eq!(session.display(), "00:00");
        assert_eq!(session.progress(), 1.0);

        session.finish();
        engine.process_events();
        assert_eq!(session.poll_result(), Some(CommandResult::Exited));
        assert!(session.exited());
        assert_eq!(rig.navigator.count(), 1);
    }

    #[test]
    fn test_commands_processed_in_order() {
        let (session, mut engine, _rig) = narrated(10);
        session.start();
        session.toggle_pause();
        session.finish();
        session.cancel_finish();
        session.toggle_pause();
        engine.process_events();

        let results = session.drain_results();
        assert_eq!(
            results,
            vec![
                CommandResult::Ok,
                CommandResult::Ok,
                CommandResult::ConfirmationRequired,
                CommandResult::Ok,
                CommandResult::Ok,
            ]
        );
        assert_eq!(session.state(), EngineState::Running);
        assert!(!session.confirmation_pending());
    }

    #[test]
    fn test_open_session_display_counts_up() {
        let config = resolve(&RawParams::from_pairs([("type", "open")]));
        let (engine, rig) = Rig::mount(config, EngineConfig::default());
        let (session, mut engine) = create_bridge(engine);
        session.start();
        engine.process_events();
        for _ in 0..125 {
            tick(&mut engine, &rig);
        }
        assert_eq!(session.remaining_sec(), None);
        assert_eq!(session.display(), "02:05");
    }

    #[test]
    fn test_unmount_tears_down() {
        let (session, mut engine, rig) = narrated(10);
        session.start();
        session.unmount();
        engine.process_events();
        assert_eq!(rig.timers.pending(TimerId::Clock), None);
        assert!(!rig.audio.player(ClipKind::Intro).is_playing());
        assert_eq!(rig.audio.player(ClipKind::Intro).release_count(), 1);
        assert_eq!(rig.navigator.count(), 0);

        // Late host callbacks are harmless.
        session.toggle_pause();
        engine.process_events();
        assert!(matches!(
            session.drain_results().last(),
            Some(CommandResult::Ignored { .. })
        ));
    }

    #[test]
    fn test_sender_outlives_engine() {
        let (session, engine, _rig) = narrated(10);
        let sender = session.event_sender();
        drop(engine);
        sender.post(Event::ClipDuration {
            clip: ClipKind::Intro,
            duration_sec: 8.0,
        });
        session.start();
        assert_eq!(session.poll_result(), None);
    }
}
