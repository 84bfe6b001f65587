// Session configuration.
//
// The resolved, immutable description of one meditation session plus the
// engine-wide tuning knobs (tick period, fade ramp shape).

use std::time::Duration;

/// Smallest accepted session length in minutes.
pub const MIN_MINUTES: u32 = 1;

/// Largest accepted session length in minutes.
pub const MAX_MINUTES: u32 = 180;

/// Session length used when the requested one is missing or malformed.
pub const DEFAULT_MINUTES: u32 = 10;

/// Timed sessions count down a fixed length, open sessions count up forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Timed { minutes: u32 },
    Open,
}

impl Mode {
    #[inline]
    pub fn is_timed(&self) -> bool {
        matches!(self, Mode::Timed { .. })
    }

    /// Length of the silent meditation phase in seconds (0 for open sessions).
    #[inline]
    pub fn meditation_seconds(&self) -> u32 {
        match self {
            Mode::Timed { minutes } => minutes.saturating_mul(60),
            Mode::Open => 0,
        }
    }
}

/// A named meditation style. Drives the accent colour and narration assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intention {
    Grounded,
    Focus,
    Gratitude,
    None,
}

/// Accent colour family shown for an intention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accent {
    Teal,
    Blue,
    Violet,
    Neutral,
}

impl Intention {
    /// Exact-match parse of a navigation value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "grounded" => Some(Intention::Grounded),
            "focus" => Some(Intention::Focus),
            "gratitude" => Some(Intention::Gratitude),
            "none" => Some(Intention::None),
            _ => None,
        }
    }

    /// Wire name used in navigation parameters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Intention::Grounded => "grounded",
            Intention::Focus => "focus",
            Intention::Gratitude => "gratitude",
            Intention::None => "none",
        }
    }

    /// Human-facing label. The intention-less session is called "Open".
    pub fn label(&self) -> &'static str {
        match self {
            Intention::Grounded => "Grounded",
            Intention::Focus => "Focus",
            Intention::Gratitude => "Gratitude",
            Intention::None => "Open",
        }
    }

    pub fn accent(&self) -> Accent {
        match self {
            Intention::Grounded => Accent::Teal,
            Intention::Focus => Accent::Blue,
            Intention::Gratitude => Accent::Violet,
            Intention::None => Accent::Neutral,
        }
    }
}

/// Resolved session configuration.
///
/// Immutable once produced by [`resolve`](super::resolve). Voice guidance is
/// runtime state and lives in the engine, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub mode: Mode,
    pub intention: Intention,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Timed {
                minutes: DEFAULT_MINUTES,
            },
            intention: Intention::Grounded,
        }
    }
}

/// Shape of the narration fade-in ramp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeSettings {
    /// Volume reached at the end of the ramp.
    pub ceiling: f32,

    /// Number of volume steps.
    pub steps: u32,

    /// Total ramp duration.
    pub duration: Duration,
}

impl FadeSettings {
    /// Delay between two volume steps.
    #[inline]
    pub fn step_interval(&self) -> Duration {
        self.duration / self.steps.max(1)
    }

    /// Volume after `step` of `steps` steps.
    #[inline]
    pub fn volume_at(&self, step: u32) -> f32 {
        let steps = self.steps.max(1);
        self.ceiling * step.min(steps) as f32 / steps as f32
    }
}

impl Default for FadeSettings {
    fn default() -> Self {
        Self {
            ceiling: 0.85,
            steps: 20,
            duration: Duration::from_millis(600),
        }
    }
}

/// Engine-wide tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Period of the session clock.
    pub tick_period: Duration,

    /// Narration fade-in ramp.
    pub fade: FadeSettings,

    /// Voice guidance state when the session screen mounts.
    pub voice_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_secs(1),
            fade: FadeSettings::default(),
            voice_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meditation_seconds_saturate() {
        assert_eq!(Mode::Timed { minutes: 10 }.meditation_seconds(), 600);
        assert_eq!(Mode::Open.meditation_seconds(), 0);
        assert_eq!(Mode::Timed { minutes: u32::MAX }.meditation_seconds(), u32::MAX);
    }

    #[test]
    fn test_fade_defaults() {
        let fade = FadeSettings::default();
        assert_eq!(fade.step_interval(), Duration::from_millis(30));
        assert_eq!(fade.volume_at(0), 0.0);
        assert!((fade.volume_at(10) - 0.425).abs() < 1e-6);
        assert!((fade.volume_at(20) - 0.85).abs() < 1e-6);
        // Past the last step the ceiling holds.
        assert!((fade.volume_at(25) - 0.85).abs() < 1e-6);
    }

    #[test]
    fn test_intention_labels() {
        assert_eq!(Intention::None.label(), "Open");
        assert_eq!(Intention::Gratitude.label(), "Gratitude");
        assert_eq!(Intention::Focus.accent(), Accent::Blue);
        for intention in [
            Intention::Grounded,
            Intention::Focus,
            Intention::Gratitude,
            Intention::None,
        ] {
            assert_eq!(Intention::parse(intention.as_str()), Some(intention));
        }
        assert_eq!(Intention::parse("Focus"), None);
    }

    #[test]
    fn test_meditation_seconds() {
        assert_eq!(Mode::Timed { minutes: 10 }.meditation_seconds(), 600);
        assert_eq!(Mode::Open.meditation_seconds(), 0);
    }
}
