// src/services.rs
//
// Host collaborators.
//
// The engine never touches platform APIs directly. Audio playback, timers,
// haptics, navigation and preferences are reached through these traits;
// the host implements them (Swift via `ffi`, JavaScript via `wasm`, fakes in
// tests) and reports asynchronous completions back as queued events.

use std::time::Duration;

use thiserror::Error;

use crate::assets::{AssetId, ClipKind};

/// Failure reported by the host audio transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("playback failed: {0}")]
    Failed(String),
}

/// Failure reported by a host service that has no effect on the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("service unavailable")]
    Unavailable,
}

/// Failure reading or writing the preference store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreferenceError {
    #[error("preference store unavailable")]
    Unavailable,
    #[error("preference {key} could not be written: {message}")]
    Write { key: String, message: String },
}

/// One loaded (or loading) audio source.
///
/// Load completion is not reported here: the host posts
/// `Event::ClipLoaded` once the transport knows about the file.
pub trait PlayerHandle {
    fn play(&mut self) -> Result<(), PlaybackError>;

    fn pause(&mut self) -> Result<(), PlaybackError>;

    fn seek_to(&mut self, seconds: f64) -> Result<(), PlaybackError>;

    /// Volume in `[0, 1]`.
    fn set_volume(&mut self, volume: f32);

    /// Playback position in seconds.
    fn current_time(&self) -> f64;

    /// Free the underlying player. Called once at teardown.
    fn release(&mut self) {}
}

/// Creates player handles for bundled assets.
pub trait AudioPlayback {
    fn load(&mut self, clip: ClipKind, asset: AssetId) -> Box<dyn PlayerHandle>;
}

/// Timers owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// The one-second session clock.
    Clock,
    /// Volume ramp of a narration clip.
    Fade(ClipKind),
}

impl TimerId {
    /// Stable numeric code for host bindings.
    pub fn code(self) -> u8 {
        match self {
            TimerId::Clock => 0,
            TimerId::Fade(ClipKind::Intro) => 1,
            TimerId::Fade(ClipKind::Outro) => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(TimerId::Clock),
            1 => Some(TimerId::Fade(ClipKind::Intro)),
            2 => Some(TimerId::Fade(ClipKind::Outro)),
            _ => None,
        }
    }
}

/// Host timer facility.
///
/// When a timer fires the host posts `Event::TimerFired` carrying the same
/// `token`. Scheduling a timer that is already scheduled replaces it.
pub trait TimerService {
    fn schedule(&mut self, timer: TimerId, token: u64, delay: Duration, repeat: bool);

    fn cancel(&mut self, timer: TimerId);
}

/// Fire-and-forget haptic feedback.
pub trait Haptics {
    fn impact_light(&mut self) -> Result<(), ServiceError>;
}

/// Screen navigation.
pub trait Navigator {
    /// Leave the session screen and return home.
    fn navigate_home(&mut self);
}

/// Key-value preference storage.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError>;
}

/// Everything the engine needs from its host besides audio loading.
pub struct Services {
    pub timers: Box<dyn TimerService>,
    pub haptics: Box<dyn Haptics>,
    pub navigator: Box<dyn Navigator>,
}

impl Services {
    pub fn new(
        timers: Box<dyn TimerService>,
        haptics: Box<dyn Haptics>,
        navigator: Box<dyn Navigator>,
    ) -> Self {
        Self {
            timers,
            haptics,
            navigator,
        }
    }
}
