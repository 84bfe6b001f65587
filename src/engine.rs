// src/engine.rs

use log::{debug, info};

use crate::assets::{ClipKind, asset_for};
use crate::clip::{AudioClipState, ClipProxy};
use crate::clock::SessionClock;
use crate::event::Event;
use crate::services::{AudioPlayback, Services, TimerId, TimerService};
use crate::state::{
    Command, CommandResult, DisplayLabel, EngineConfig, EngineState, SessionConfig,
    SessionReadback, format_clock,
};
use crate::timeline::{Phase, PhaseTimeline};

/// Session timeline engine.
///
/// One instance per session screen. It owns the clock, both narration clips
/// and the one-shot latches, and is the only thing that mutates them. Input
/// arrives as [`Event`]s processed one at a time; every handler runs the
/// auto-transition rules before returning, so the published state is always
/// consistent.
pub struct SessionEngine {
    config: SessionConfig,

    settings: EngineConfig,

    voice_enabled: bool,

    intro: ClipProxy,
    outro: ClipProxy,

    /// Rebuilt whenever a duration becomes known or voice is toggled.
    timeline: PhaseTimeline,

    clock: SessionClock,

    /// Sticky once a timed session reaches its end.
    finished: bool,

    intro_played_once: bool,
    outro_started_once: bool,

    /// An early finish is waiting for the user's answer.
    confirmation_pending: bool,

    /// Navigation was asked to leave the session.
    exited: bool,

    /// Clock stopped and clips released.
    torn_down: bool,

    services: Services,
}

impl SessionEngine {
    /// Mount a session: create both clip proxies and start loading them.
    pub fn mount(
        config: SessionConfig,
        settings: EngineConfig,
        audio: &mut dyn AudioPlayback,
        services: Services,
    ) -> Self {
        let intro = ClipProxy::load(
            ClipKind::Intro,
            asset_for(config.intention, ClipKind::Intro),
            settings.fade,
            audio,
        );
        let outro = ClipProxy::load(
            ClipKind::Outro,
            asset_for(config.intention, ClipKind::Outro),
            settings.fade,
            audio,
        );
        let timeline = PhaseTimeline::derive(config.mode, settings.voice_enabled, None, None);

        info!(
            "session mounted: {:?}, intention {}",
            config.mode,
            config.intention.as_str()
        );

        Self {
            config,
            settings,
            voice_enabled: settings.voice_enabled,
            intro,
            outro,
            timeline,
            clock: SessionClock::new(settings.tick_period),
            finished: false,
            intro_played_once: false,
            outro_started_once: false,
            confirmation_pending: false,
            exited: false,
            torn_down: false,
            services,
        }
    }

    /// Process one event to completion.
    pub fn handle(&mut self, event: Event) -> CommandResult {
        if self.torn_down {
            return ignored("session closed");
        }

        match event {
            Event::Command(command) => self.apply(command),

            Event::TimerFired { timer, token } => {
                self.on_timer(timer, token);
                CommandResult::Ok
            }

            Event::ClipLoaded { clip, duration_sec } => {
                if self.clip_mut(clip).on_loaded(duration_sec) {
                    self.rebuild_timeline();
                }
                self.reconcile();
                CommandResult::Ok
            }

            Event::ClipDuration { clip, duration_sec } => {
                if self.clip_mut(clip).on_duration(duration_sec) {
                    self.rebuild_timeline();
                    self.reconcile();
                }
                CommandResult::Ok
            }
        }
    }

    /// Apply a user command.
    pub fn apply(&mut self, command: Command) -> CommandResult {
        if self.torn_down {
            return ignored("session closed");
        }

        match command {
            Command::Start => self.start(),
            Command::TogglePause => self.toggle_pause(),
            Command::ToggleVoice => self.toggle_voice(),
            Command::Seek { phase } => self.seek(phase),
            Command::Finish => self.finish(),
            Command::ConfirmFinish => self.confirm_finish(),
            Command::CancelFinish => self.cancel_finish(),
            Command::Unmount => {
                self.teardown();
                CommandResult::Ok
            }
        }
    }

    // ═════════════════════════════════════════════════════════════
    // Commands
    // ═════════════════════════════════════════════════════════════

    fn start(&mut self) -> CommandResult {
        if self.clock.is_started() {
            return ignored("already started");
        }

        self.clock.set_started(true);
        self.clock.set_paused(false);
        self.intro_played_once = false;
        self.outro_started_once = false;

        if let Err(e) = self.services.haptics.impact_light() {
            debug!("haptic cue failed: {}", e);
        }

        info!("session started");
        self.reconcile();
        CommandResult::Ok
    }

    fn toggle_pause(&mut self) -> CommandResult {
        if !self.clock.is_started() {
            return ignored("not started");
        }
        if self.finished {
            return ignored("finished");
        }

        if self.clock.is_paused() {
            self.clock.set_paused(false);
            match self.phase() {
                Phase::Intro if self.intro_played_once && self.voice_enabled => {
                    self.resume_exclusive(ClipKind::Intro);
                }
                Phase::Outro if self.outro_started_once => {
                    self.resume_exclusive(ClipKind::Outro);
                }
                _ => {}
            }
            info!("session resumed at {}s", self.clock.elapsed());
        } else {
            self.clock.set_paused(true);
            let timers = self.services.timers.as_mut();
            self.intro.pause(timers);
            self.outro.pause(timers);
            info!("session paused at {}s", self.clock.elapsed());
        }

        self.reconcile();
        CommandResult::Ok
    }

    fn toggle_voice(&mut self) -> CommandResult {
        if self.finished {
            return ignored("finished");
        }

        self.voice_enabled = !self.voice_enabled;
        self.rebuild_timeline();

        if self.voice_enabled {
            if self.clock.elapsed() < self.timeline.meditation_start() {
                self.intro_played_once = false;
            }
        } else {
            let timers = self.services.timers.as_mut();
            self.intro.pause(timers);
            self.outro.pause(timers);
        }

        info!(
            "voice guidance {}",
            if self.voice_enabled { "on" } else { "off" }
        );
        self.reconcile();
        CommandResult::Ok
    }

    fn seek(&mut self, phase: Phase) -> CommandResult {
        if self.finished {
            return ignored("finished");
        }
        if phase == Phase::Outro && !self.timeline.is_timed() {
            return ignored("open sessions have no outro");
        }

        let target = self.timeline.phase_start(phase);
        self.clock.seek(target);

        // Seeking always lands in a running session once it has started.
        if self.clock.is_started() && self.clock.is_paused() {
            self.clock.set_paused(false);
        }

        let timers = self.services.timers.as_mut();
        match phase {
            Phase::Intro => {
                self.outro.stop(timers);
                self.intro.stop(timers);
                self.intro_played_once = false;
                self.outro_started_once = false;
            }
            Phase::Meditation => {
                self.intro.stop(timers);
                self.outro.stop(timers);
                self.outro_started_once = false;
            }
            Phase::Outro => {
                self.intro.stop(timers);
                self.intro_played_once = true;
                self.outro.stop(timers);
                self.outro_started_once = false;
            }
        }

        info!("seek to {} start ({}s)", phase.as_str(), target);
        self.reconcile();
        CommandResult::Ok
    }

    fn finish(&mut self) -> CommandResult {
        if self.finished {
            return self.commit_finish();
        }
        self.confirmation_pending = true;
        info!("early finish requested at {}s", self.clock.elapsed());
        CommandResult::ConfirmationRequired
    }

    fn confirm_finish(&mut self) -> CommandResult {
        if !self.confirmation_pending && !self.finished {
            return ignored("no finish pending");
        }
        self.commit_finish()
    }

    fn cancel_finish(&mut self) -> CommandResult {
        if !self.confirmation_pending {
            return ignored("no finish pending");
        }
        self.confirmation_pending = false;
        CommandResult::Ok
    }

    fn commit_finish(&mut self) -> CommandResult {
        self.confirmation_pending = false;
        self.teardown();
        self.exited = true;
        info!("session closed at {}s", self.clock.elapsed());
        self.services.navigator.navigate_home();
        CommandResult::Exited
    }

    /// Stop the clock, cancel ramps, pause and release both clips.
    ///
    /// Runs on every exit path, including drop. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        let timers = self.services.timers.as_mut();
        self.clock.stop(timers);
        self.clock.set_paused(true);
        self.intro.release(timers);
        self.outro.release(timers);
        self.torn_down = true;
        debug!("session torn down");
    }

    // ═════════════════════════════════════════════════════════════
    // Host events
    // ═════════════════════════════════════════════════════════════

    fn on_timer(&mut self, timer: TimerId, token: u64) {
        match timer {
            TimerId::Clock => {
                if self.clock.on_tick(token) {
                    self.reconcile();
                }
            }
            TimerId::Fade(kind) => {
                let (clip, timers) = self.clip_and_timers(kind);
                clip.on_fade_step(token, timers);
            }
        }
    }

    fn rebuild_timeline(&mut self) {
        self.timeline = PhaseTimeline::derive(
            self.config.mode,
            self.voice_enabled,
            self.intro.duration_sec(),
            self.outro.duration_sec(),
        );
        debug!(
            "timeline: meditation at {}s, outro at {}s, total {:?}",
            self.timeline.meditation_start(),
            self.timeline.outro_start(),
            self.timeline.total()
        );
    }

    /// Auto-transition rules. Run after every state change.
    fn reconcile(&mut self) {
        let elapsed = self.clock.elapsed();

        if !self.finished && self.timeline.is_finished(elapsed) {
            self.finished = true;
            self.clock.set_paused(true);
            let timers = self.services.timers.as_mut();
            self.intro.pause(timers);
            self.outro.pause(timers);
            info!("session finished after {}s", elapsed);
        }
        self.clock
            .sync(self.finished, self.services.timers.as_mut());

        // Narration never bleeds into the meditation phase.
        if elapsed >= self.timeline.meditation_start() && self.intro.is_audible() {
            debug!("intro window over at {}s, pausing intro", elapsed);
            self.intro.pause(self.services.timers.as_mut());
        }

        if !self.is_running() {
            return;
        }

        if !self.outro_started_once
            && self.timeline.in_outro_window(elapsed)
            && self.outro.is_loaded()
        {
            self.outro_started_once = true;
            let offset = elapsed - self.timeline.outro_start();
            self.play_exclusive(ClipKind::Outro, offset);
        }

        if self.voice_enabled
            && !self.intro_played_once
            && self.timeline.phase_at(elapsed) == Phase::Intro
            && self.intro.is_loaded()
        {
            self.intro_played_once = true;
            self.play_exclusive(ClipKind::Intro, elapsed);
        }
    }

    /// Fade `kind` in from `offset` seconds after silencing the other clip.
    fn play_exclusive(&mut self, kind: ClipKind, offset: u32) {
        self.pause_clip(kind.other());
        let (clip, timers) = self.clip_and_timers(kind);
        clip.seek_to(offset as f64);
        if clip.fade_in_and_play(timers) {
            info!("{} narration started at +{}s", kind.as_str(), offset);
        }
    }

    /// Resume `kind` where it paused, unless it already ran out.
    fn resume_exclusive(&mut self, kind: ClipKind) {
        let clip = self.clip_mut(kind);
        if !clip.is_loaded() || clip.is_exhausted() {
            return;
        }
        self.pause_clip(kind.other());
        self.clip_mut(kind).resume();
    }

    fn pause_clip(&mut self, kind: ClipKind) {
        let (clip, timers) = self.clip_and_timers(kind);
        clip.pause(timers);
    }

    fn clip_and_timers(&mut self, kind: ClipKind) -> (&mut ClipProxy, &mut dyn TimerService) {
        let timers = self.services.timers.as_mut();
        let clip = match kind {
            ClipKind::Intro => &mut self.intro,
            ClipKind::Outro => &mut self.outro,
        };
        (clip, timers)
    }

    fn clip_mut(&mut self, kind: ClipKind) -> &mut ClipProxy {
        match kind {
            ClipKind::Intro => &mut self.intro,
            ClipKind::Outro => &mut self.outro,
        }
    }

    // ═════════════════════════════════════════════════════════════
    // Readback
    // ═════════════════════════════════════════════════════════════

    #[inline]
    fn is_running(&self) -> bool {
        self.clock.is_started() && !self.clock.is_paused() && !self.finished
    }

    pub fn state(&self) -> EngineState {
        if !self.clock.is_started() {
            EngineState::Idle
        } else if self.finished {
            EngineState::Finished
        } else if self.clock.is_paused() {
            EngineState::Paused
        } else {
            EngineState::Running
        }
    }

    pub fn phase(&self) -> Phase {
        self.timeline.phase_at(self.clock.elapsed())
    }

    #[inline]
    pub fn elapsed(&self) -> u32 {
        self.clock.elapsed()
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[inline]
    pub fn is_exited(&self) -> bool {
        self.exited
    }

    #[inline]
    pub fn voice_enabled(&self) -> bool {
        self.voice_enabled
    }

    #[inline]
    pub fn timeline(&self) -> &PhaseTimeline {
        &self.timeline
    }

    #[inline]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[inline]
    pub fn settings(&self) -> &EngineConfig {
        &self.settings
    }

    #[inline]
    pub fn intro_played_once(&self) -> bool {
        self.intro_played_once
    }

    #[inline]
    pub fn outro_started_once(&self) -> bool {
        self.outro_started_once
    }

    /// Token of the armed clock ticker, if the clock is running.
    #[inline]
    pub fn clock_token(&self) -> Option<u64> {
        self.clock.ticker_token()
    }

    pub fn clip_state(&self, kind: ClipKind) -> AudioClipState {
        match kind {
            ClipKind::Intro => self.intro.state(),
            ClipKind::Outro => self.outro.state(),
        }
    }

    /// Build the projection for the session screen.
    pub fn readback(&self) -> SessionReadback {
        let elapsed = self.clock.elapsed();
        let remaining = self.timeline.remaining(elapsed);
        let (display, display_label) = match remaining {
            Some(remaining) => (format_clock(remaining), DisplayLabel::Remaining),
            None => (format_clock(elapsed), DisplayLabel::Elapsed),
        };
        let intention = self.config.intention;

        SessionReadback {
            state: self.state(),
            phase: self.phase(),
            elapsed_sec: elapsed,
            remaining_sec: remaining,
            display,
            display_label,
            progress: self.timeline.overall_progress(elapsed),
            intro_progress: self.timeline.phase_progress(Phase::Intro, elapsed),
            meditation_progress: self.timeline.phase_progress(Phase::Meditation, elapsed),
            outro_progress: self.timeline.phase_progress(Phase::Outro, elapsed),
            meditation_start_sec: self.timeline.meditation_start(),
            outro_start_sec: self.timeline.outro_start(),
            total_sec: self.timeline.total(),
            voice_enabled: self.voice_enabled,
            intention,
            intention_label: intention.label(),
            accent: intention.accent(),
            intro_transport: self.intro.transport(),
            outro_transport: self.outro.transport(),
            confirmation_pending: self.confirmation_pending,
            exited: self.exited,
        }
    }
}

impl Drop for SessionEngine {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn ignored(reason: &'static str) -> CommandResult {
    debug!("command ignored: {}", reason);
    CommandResult::Ignored { reason }
}
