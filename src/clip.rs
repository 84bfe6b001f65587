// src/clip.rs
//
// Audio clip proxy.
//
// Wraps one host player handle (intro or outro narration) and owns its
// observable state: load state, duration once reported, transport state and
// the fade-in ramp. The engine only issues commands; it never writes these
// fields.
//
// Host transport failures stop here. They are logged and the proxy carries
// on as if the call had been a no-op.

use log::{debug, warn};

use crate::assets::{AssetId, ClipKind};
use crate::services::{AudioPlayback, PlayerHandle, TimerId, TimerService};
use crate::state::FadeSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipTransport {
    Stopped,
    FadingIn,
    Playing,
    Paused,
}

/// Point-in-time view of a clip, for readback and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioClipState {
    pub load_state: LoadState,
    pub duration_sec: Option<u32>,
    pub transport: ClipTransport,
    pub position_sec: f64,
}

/// Proxy for one narration clip.
pub struct ClipProxy {
    kind: ClipKind,

    /// Host player. `None` once released.
    handle: Option<Box<dyn PlayerHandle>>,

    load_state: LoadState,

    /// Exact duration as reported by the host.
    duration: Option<f64>,

    transport: ClipTransport,

    fade: FadeSettings,

    /// Bumped on every new ramp and every cancellation. Ramp steps carry the
    /// generation they were scheduled under.
    fade_generation: u64,

    /// Completed steps of the current ramp.
    fade_step: u32,

    /// Last volume written to the handle.
    volume: f32,
}

impl ClipProxy {
    /// Ask the host to load `asset`. The clip stays unloaded until the host
    /// reports completion through [`on_loaded`](Self::on_loaded).
    pub fn load(
        kind: ClipKind,
        asset: AssetId,
        fade: FadeSettings,
        audio: &mut dyn AudioPlayback,
    ) -> Self {
        debug!("loading {} clip {}", kind.as_str(), asset.file_name());
        let handle = audio.load(kind, asset);
        Self {
            kind,
            handle: Some(handle),
            load_state: LoadState::Unloaded,
            duration: None,
            transport: ClipTransport::Stopped,
            fade,
            fade_generation: 0,
            fade_step: 0,
            volume: fade.ceiling,
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Load reports
    // ───────────────────────────────────────────────────────────────

    /// Host finished loading. Returns true if this made the duration known.
    pub fn on_loaded(&mut self, duration_sec: Option<f64>) -> bool {
        if self.handle.is_none() {
            return false;
        }
        if self.load_state == LoadState::Unloaded {
            debug!("{} clip loaded", self.kind.as_str());
            self.load_state = LoadState::Loaded;
        }
        match duration_sec {
            Some(duration) => self.on_duration(duration),
            None => false,
        }
    }

    /// Host determined the duration. Only the first valid report counts.
    pub fn on_duration(&mut self, duration_sec: f64) -> bool {
        if self.duration.is_some() || self.handle.is_none() {
            return false;
        }
        if !duration_sec.is_finite() || duration_sec < 0.0 {
            warn!(
                "ignoring invalid {} clip duration {}",
                self.kind.as_str(),
                duration_sec
            );
            return false;
        }
        debug!("{} clip duration {:.2}s", self.kind.as_str(), duration_sec);
        self.duration = Some(duration_sec);
        true
    }

    // ───────────────────────────────────────────────────────────────
    // Transport
    // ───────────────────────────────────────────────────────────────

    /// Start playback at volume 0 and ramp up to the ceiling.
    ///
    /// Returns false if the clip is not loaded or the host refused to play.
    pub fn fade_in_and_play(&mut self, timers: &mut dyn TimerService) -> bool {
        if self.load_state != LoadState::Loaded {
            debug!("{} clip not loaded, fade-in skipped", self.kind.as_str());
            return false;
        }
        self.cancel_fade(timers);

        let Some(handle) = self.handle.as_mut() else {
            return false;
        };

        handle.set_volume(0.0);
        self.volume = 0.0;

        if let Err(e) = handle.play() {
            warn!("{} play failed: {}", self.kind.as_str(), e);
            self.transport = ClipTransport::Stopped;
            return false;
        }

        self.transport = ClipTransport::FadingIn;
        self.fade_step = 0;
        self.fade_generation += 1;
        self.schedule_fade_step(timers);
        true
    }

    /// One ramp step fired. Stale steps are dropped.
    pub fn on_fade_step(&mut self, token: u64, timers: &mut dyn TimerService) {
        if self.transport != ClipTransport::FadingIn || token != self.fade_generation {
            debug!(
                "stale {} fade step (token {}, current {})",
                self.kind.as_str(),
                token,
                self.fade_generation
            );
            return;
        }
        let Some(handle) = self.handle.as_mut() else {
            return;
        };

        self.fade_step += 1;
        self.volume = self.fade.volume_at(self.fade_step);
        handle.set_volume(self.volume);

        if self.fade_step >= self.fade.steps {
            self.transport = ClipTransport::Playing;
        } else {
            self.schedule_fade_step(timers);
        }
    }

    /// Abort an in-flight ramp. Playback itself is left alone.
    pub fn cancel_fade(&mut self, timers: &mut dyn TimerService) {
        if self.transport == ClipTransport::FadingIn {
            self.transport = ClipTransport::Playing;
        }
        self.fade_generation += 1;
        timers.cancel(TimerId::Fade(self.kind));
    }

    /// Suspend playback. No-op unless loaded and audible.
    pub fn pause(&mut self, timers: &mut dyn TimerService) {
        if self.load_state != LoadState::Loaded || !self.is_audible() {
            return;
        }
        self.cancel_fade(timers);
        if let Some(handle) = self.handle.as_mut() {
            if let Err(e) = handle.pause() {
                warn!("{} pause failed: {}", self.kind.as_str(), e);
            }
        }
        self.transport = ClipTransport::Paused;
    }

    /// Resume playback from the current position without a ramp.
    ///
    /// No-op when not loaded or already audible. Refuses exhausted clips;
    /// callers check [`is_exhausted`](Self::is_exhausted) first.
    pub fn resume(&mut self) -> bool {
        if self.load_state != LoadState::Loaded {
            return false;
        }
        if self.is_audible() {
            return true;
        }
        if self.is_exhausted() {
            debug!("{} clip exhausted, not resuming", self.kind.as_str());
            return false;
        }
        let Some(handle) = self.handle.as_mut() else {
            return false;
        };

        // A ramp cut short by pause would otherwise leave the clip quiet.
        if self.volume < self.fade.ceiling {
            self.volume = self.fade.ceiling;
            handle.set_volume(self.volume);
        }

        match handle.play() {
            Ok(()) => {
                self.transport = ClipTransport::Playing;
                true
            }
            Err(e) => {
                warn!("{} resume failed: {}", self.kind.as_str(), e);
                false
            }
        }
    }

    pub fn seek_to(&mut self, seconds: f64) {
        if self.load_state != LoadState::Loaded {
            return;
        }
        if let Some(handle) = self.handle.as_mut() {
            if let Err(e) = handle.seek_to(seconds.max(0.0)) {
                warn!("{} seek failed: {}", self.kind.as_str(), e);
            }
        }
    }

    #[inline]
    pub fn rewind(&mut self) {
        self.seek_to(0.0);
    }

    /// Pause and rewind.
    pub fn stop(&mut self, timers: &mut dyn TimerService) {
        self.pause(timers);
        self.rewind();
        if self.transport == ClipTransport::Paused {
            self.transport = ClipTransport::Stopped;
        }
    }

    /// Stop playback and free the host player. Safe to call repeatedly.
    pub fn release(&mut self, timers: &mut dyn TimerService) {
        self.pause(timers);
        self.cancel_fade(timers);
        if let Some(mut handle) = self.handle.take() {
            handle.release();
            debug!("{} clip released", self.kind.as_str());
        }
        self.transport = ClipTransport::Stopped;
        self.load_state = LoadState::Unloaded;
    }

    fn schedule_fade_step(&self, timers: &mut dyn TimerService) {
        timers.schedule(
            TimerId::Fade(self.kind),
            self.fade_generation,
            self.fade.step_interval(),
            false,
        );
    }

    // ───────────────────────────────────────────────────────────────
    // Accessors
    // ───────────────────────────────────────────────────────────────

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.load_state == LoadState::Loaded
    }

    #[inline]
    pub fn transport(&self) -> ClipTransport {
        self.transport
    }

    /// Playing or fading in.
    #[inline]
    pub fn is_audible(&self) -> bool {
        matches!(
            self.transport,
            ClipTransport::Playing | ClipTransport::FadingIn
        )
    }

    /// Whole-second duration, once known.
    #[inline]
    pub fn duration_sec(&self) -> Option<u32> {
        self.duration.map(|d| d.floor() as u32)
    }

    #[inline]
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Current position, clamped to `[0, duration]`.
    pub fn position_sec(&self) -> f64 {
        let Some(handle) = self.handle.as_ref() else {
            return 0.0;
        };
        let position = handle.current_time().max(0.0);
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    /// True once the playhead reached the end. Unknown duration never counts
    /// as exhausted.
    pub fn is_exhausted(&self) -> bool {
        match (self.handle.as_ref(), self.duration) {
            (Some(handle), Some(duration)) => handle.current_time() >= duration,
            _ => false,
        }
    }

    pub fn state(&self) -> AudioClipState {
        AudioClipState {
            load_state: self.load_state,
            duration_sec: self.duration_sec(),
            transport: self.transport,
            position_sec: self.position_sec(),
        }
    }
}
