//! WebAssembly bindings via wasm-bindgen for browser integration.
//!
//! This module is only compiled when the `web` feature is enabled.
//!
//! # Usage
//!
//! Build with wasm-pack:
//! ```bash
//! wasm-pack build --target web --features web
//! ```
//!
//! # JavaScript Example
//!
//! ```javascript
//! import init, { meditate_init, MeditateSession } from './meditate.js';
//!
//! await init();
//! meditate_init();
//!
//! // `host` implements loadClip, play, pause, seek, setVolume, currentTime,
//! // releaseClip, scheduleTimer, cancelTimer, hapticLight and navigateHome.
//! const session = new MeditateSession("timed", "20", "grounded", host);
//!
//! // Host callbacks report back into the session
//! audio.onloadedmetadata = () => session.clip_loaded(0, audio.duration);
//! setInterval(() => session.timer_fired(0, token), 1000);
//!
//! session.start();
//! label.textContent = session.display();
//! ```

use std::time::Duration;

use log::debug;
use wasm_bindgen::prelude::*;

use crate::assets::{AssetId, ClipKind};
use crate::bridge::{EngineHandle, SessionHandle, create_bridge};
use crate::engine::SessionEngine;
use crate::event::Event;
use crate::prefs::launch_minutes;
use crate::services::{
    AudioPlayback, Haptics, Navigator, PlaybackError, PlayerHandle, ServiceError, Services,
    TimerId, TimerService,
};
use crate::state::{
    Command, CommandResult, EngineConfig, FadeSettings, ParamValue, RawParams, SessionReadback, resolve,
};
use crate::timeline::Phase;

// ═══════════════════════════════════════════════════════════════════════════
// Initialization
// ═══════════════════════════════════════════════════════════════════════════

/// Initialize the wasm module. Call this once before using any other functions.
/// Sets up panic hooks and console logging.
#[wasm_bindgen]
pub fn meditate_init() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Debug).ok();
}

// ═══════════════════════════════════════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════════════════════════════════════

/// Engine tuning.
#[wasm_bindgen]
#[derive(Clone, Copy)]
pub struct MeditateConfig {
    /// Session clock period in milliseconds (normally 1000).
    pub tick_period_ms: u32,
    /// Volume reached by the narration fade-in.
    pub fade_ceiling: f32,
    /// Number of fade-in volume steps.
    pub fade_steps: u32,
    /// Total fade-in duration in milliseconds.
    pub fade_duration_ms: u32,
    /// Voice guidance state at mount.
    pub voice_enabled: bool,
}

#[wasm_bindgen]
impl MeditateConfig {
    /// Create a new configuration with default values.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for MeditateConfig {
    fn default() -> Self {
        let defaults = EngineConfig::default();
        Self {
            tick_period_ms: defaults.tick_period.as_millis() as u32,
            fade_ceiling: defaults.fade.ceiling,
            fade_steps: defaults.fade.steps,
            fade_duration_ms: defaults.fade.duration.as_millis() as u32,
            voice_enabled: defaults.voice_enabled,
        }
    }
}

impl From<MeditateConfig> for EngineConfig {
    fn from(c: MeditateConfig) -> Self {
        Self {
            tick_period: Duration::from_millis(u64::from(c.tick_period_ms.max(1))),
            fade: FadeSettings {
                ceiling: c.fade_ceiling.clamp(0.0, 1.0),
                steps: c.fade_steps.max(1),
                duration: Duration::from_millis(u64::from(c.fade_duration_ms)),
            },
            voice_enabled: c.voice_enabled,
        }
    }
}

/// Get the default configuration values.
#[wasm_bindgen]
pub fn meditate_default_config() -> MeditateConfig {
    MeditateConfig::default()
}

// ═══════════════════════════════════════════════════════════════════════════
// Host Object
// ═══════════════════════════════════════════════════════════════════════════

#[wasm_bindgen]
extern "C" {
    /// Any JS object with the methods below. Clips are addressed by kind code
    /// (0 intro, 1 outro); timers by timer code (0 clock, 1 intro fade,
    /// 2 outro fade).
    #[derive(Clone)]
    pub type MeditateHost;

    #[wasm_bindgen(method, js_name = loadClip)]
    fn load_clip(this: &MeditateHost, clip: u8, file_name: &str);

    #[wasm_bindgen(method)]
    fn play(this: &MeditateHost, clip: u8) -> bool;

    #[wasm_bindgen(method)]
    fn pause(this: &MeditateHost, clip: u8);

    #[wasm_bindgen(method)]
    fn seek(this: &MeditateHost, clip: u8, seconds: f64);

    #[wasm_bindgen(method, js_name = setVolume)]
    fn set_volume(this: &MeditateHost, clip: u8, volume: f32);

    #[wasm_bindgen(method, js_name = currentTime)]
    fn current_time(this: &MeditateHost, clip: u8) -> f64;

    #[wasm_bindgen(method, js_name = releaseClip)]
    fn release_clip(this: &MeditateHost, clip: u8);

    /// Tokens are plain numbers on the JS side.
    #[wasm_bindgen(method, js_name = scheduleTimer)]
    fn schedule_timer(this: &MeditateHost, timer: u8, token: f64, delay_ms: u32, repeat: bool);

    #[wasm_bindgen(method, js_name = cancelTimer)]
    fn cancel_timer(this: &MeditateHost, timer: u8);

    #[wasm_bindgen(method, js_name = hapticLight)]
    fn haptic_light(this: &MeditateHost) -> bool;

    #[wasm_bindgen(method, js_name = navigateHome)]
    fn navigate_home(this: &MeditateHost);
}

struct JsPlayer {
    host: MeditateHost,
    clip: u8,
}

impl PlayerHandle for JsPlayer {
    fn play(&mut self) -> Result<(), PlaybackError> {
        if self.host.play(self.clip) {
            Ok(())
        } else {
            Err(PlaybackError::Failed("play() was rejected".into()))
        }
    }

    fn pause(&mut self) -> Result<(), PlaybackError> {
        self.host.pause(self.clip);
        Ok(())
    }

    fn seek_to(&mut self, seconds: f64) -> Result<(), PlaybackError> {
        self.host.seek(self.clip, seconds);
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        self.host.set_volume(self.clip, volume);
    }

    fn current_time(&self) -> f64 {
        self.host.current_time(self.clip)
    }

    fn release(&mut self) {
        self.host.release_clip(self.clip);
    }
}

struct JsServices {
    host: MeditateHost,
}

impl AudioPlayback for JsServices {
    fn load(&mut self, clip: ClipKind, asset: AssetId) -> Box<dyn PlayerHandle> {
        self.host.load_clip(clip.code(), asset.file_name());
        Box::new(JsPlayer {
            host: self.host.clone(),
            clip: clip.code(),
        })
    }
}

impl TimerService for JsServices {
    fn schedule(&mut self, timer: TimerId, token: u64, delay: Duration, repeat: bool) {
        let delay_ms = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        self.host
            .schedule_timer(timer.code(), token as f64, delay_ms, repeat);
    }

    fn cancel(&mut self, timer: TimerId) {
        self.host.cancel_timer(timer.code());
    }
}

impl Haptics for JsServices {
    fn impact_light(&mut self) -> Result<(), ServiceError> {
        if self.host.haptic_light() {
            Ok(())
        } else {
            Err(ServiceError::Unavailable)
        }
    }
}

impl Navigator for JsServices {
    fn navigate_home(&mut self) {
        self.host.navigate_home();
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Session
// ═══════════════════════════════════════════════════════════════════════════

/// One mounted session screen.
///
/// Every method processes its input to completion before returning. Command
/// methods return 0 ok, 1 ignored, 2 confirmation required, 3 exited, and
/// 255 for an unknown phase code.
#[wasm_bindgen]
pub struct MeditateSession {
    session: SessionHandle,
    engine: EngineHandle,
    latest: SessionReadback,
}

#[wasm_bindgen]
impl MeditateSession {
    /// Mount a session from raw navigation parameters with default tuning.
    #[wasm_bindgen(constructor)]
    pub fn new(
        kind: Option<String>,
        minutes: Option<String>,
        intention: Option<String>,
        host: MeditateHost,
    ) -> MeditateSession {
        Self::new_with_config(kind, minutes, intention, host, MeditateConfig::default())
    }

    /// Mount a session with custom tuning.
    pub fn new_with_config(
        kind: Option<String>,
        minutes: Option<String>,
        intention: Option<String>,
        host: MeditateHost,
        config: MeditateConfig,
    ) -> MeditateSession {
        let raw = RawParams {
            kind: kind.map(ParamValue::Single),
            minutes: minutes.map(ParamValue::Single),
            intention: intention.map(ParamValue::Single),
        };
        let services = Services::new(
            Box::new(JsServices { host: host.clone() }),
            Box::new(JsServices { host: host.clone() }),
            Box::new(JsServices { host: host.clone() }),
        );
        let mut audio = JsServices { host };
        let engine =
            SessionEngine::mount(resolve(&raw), EngineConfig::from(config), &mut audio, services);
        let (session, engine) = create_bridge(engine);
        let latest = engine.readback();

        MeditateSession {
            session,
            engine,
            latest,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    pub fn start(&mut self) -> u8 {
        self.command(Command::Start)
    }

    pub fn toggle_pause(&mut self) -> u8 {
        self.command(Command::TogglePause)
    }

    pub fn toggle_voice(&mut self) -> u8 {
        self.command(Command::ToggleVoice)
    }

    /// Jump to the start of a phase (0 intro, 1 meditation, 2 outro).
    pub fn seek(&mut self, phase: u8) -> u8 {
        match Phase::from_code(phase) {
            Some(phase) => self.command(Command::Seek { phase }),
            None => {
                debug!("seek: unknown phase {}", phase);
                CommandResult::INVALID_CODE
            }
        }
    }

    pub fn finish(&mut self) -> u8 {
        self.command(Command::Finish)
    }

    pub fn confirm_finish(&mut self) -> u8 {
        self.command(Command::ConfirmFinish)
    }

    pub fn cancel_finish(&mut self) -> u8 {
        self.command(Command::CancelFinish)
    }

    pub fn unmount(&mut self) -> u8 {
        self.command(Command::Unmount)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Host Events
    // ─────────────────────────────────────────────────────────────────────────

    pub fn timer_fired(&mut self, timer: u8, token: f64) {
        if let Some(timer) = TimerId::from_code(timer) {
            self.post(Event::TimerFired {
                timer,
                token: token as u64,
            });
        }
    }

    /// `duration_sec` is `undefined` (or NaN) while the browser does not know it.
    pub fn clip_loaded(&mut self, clip: u8, duration_sec: Option<f64>) {
        if let Some(clip) = ClipKind::from_code(clip) {
            let duration_sec = duration_sec.filter(|d| d.is_finite());
            self.post(Event::ClipLoaded { clip, duration_sec });
        }
    }

    pub fn clip_duration(&mut self, clip: u8, duration_sec: f64) {
        if let Some(clip) = ClipKind::from_code(clip) {
            self.post(Event::ClipDuration { clip, duration_sec });
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Readback
    // ─────────────────────────────────────────────────────────────────────────

    /// 0 idle, 1 running, 2 paused, 3 finished.
    pub fn state(&self) -> u8 {
        self.latest.state.code()
    }

    /// 0 intro, 1 meditation, 2 outro.
    pub fn phase(&self) -> u8 {
        self.latest.phase.code()
    }

    pub fn elapsed_sec(&self) -> u32 {
        self.latest.elapsed_sec
    }

    /// `undefined` for open sessions.
    pub fn remaining_sec(&self) -> Option<u32> {
        self.latest.remaining_sec
    }

    /// The big clock, `mm:ss`.
    pub fn display(&self) -> String {
        self.latest.display.clone()
    }

    /// "remaining" or "elapsed".
    pub fn display_label(&self) -> String {
        self.latest.display_label.as_str().to_string()
    }

    pub fn progress(&self) -> f32 {
        self.latest.progress
    }

    pub fn intro_progress(&self) -> f32 {
        self.latest.intro_progress
    }

    pub fn meditation_progress(&self) -> f32 {
        self.latest.meditation_progress
    }

    pub fn outro_progress(&self) -> f32 {
        self.latest.outro_progress
    }

    pub fn voice_enabled(&self) -> bool {
        self.latest.voice_enabled
    }

    pub fn intention_label(&self) -> String {
        self.latest.intention_label.to_string()
    }

    pub fn confirmation_pending(&self) -> bool {
        self.latest.confirmation_pending
    }

    pub fn exited(&self) -> bool {
        self.latest.exited
    }
}

impl MeditateSession {
    fn command(&mut self, command: Command) -> u8 {
        self.session.send(command);
        self.engine.process_events();
        self.latest = self.engine.readback();
        self.session
            .drain_results()
            .pop()
            .map(|result| result.code())
            .unwrap_or(1)
    }

    fn post(&mut self, event: Event) {
        self.engine.event_sender().post(event);
        self.engine.process_events();
        self.latest = self.engine.readback();
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Home Screen
// ═══════════════════════════════════════════════════════════════════════════

/// Minutes a timed launch from the home screen's minutes text will use.
#[wasm_bindgen]
pub fn meditate_launch_minutes(text: &str) -> u32 {
    launch_minutes(text)
}
