// src/timeline.rs
//
// Phase timeline.
//
// Pure derivation of the intro / meditation / outro boundaries from the
// session mode, the voice flag and whatever clip durations are known. The
// engine rebuilds it from scratch whenever one of those inputs changes; it is
// never patched in place.

use crate::state::Mode;

/// One of the three sequential parts of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Intro,
    Meditation,
    Outro,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Intro => "intro",
            Phase::Meditation => "meditation",
            Phase::Outro => "outro",
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Phase::Intro => 0,
            Phase::Meditation => 1,
            Phase::Outro => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Phase::Intro),
            1 => Some(Phase::Meditation),
            2 => Some(Phase::Outro),
            _ => None,
        }
    }
}

/// Phase boundaries in whole seconds.
///
/// Invariant: `0 <= meditation_start <= outro_start <= total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTimeline {
    intro: u32,
    meditation: u32,
    outro: u32,
    timed: bool,
}

impl PhaseTimeline {
    /// Derive the timeline. Unknown clip durations count as zero-length
    /// phases, as does every narration phase while voice guidance is off.
    pub fn derive(
        mode: Mode,
        voice_enabled: bool,
        intro_sec: Option<u32>,
        outro_sec: Option<u32>,
    ) -> Self {
        let narration = |duration: Option<u32>| {
            if voice_enabled {
                duration.unwrap_or(0)
            } else {
                0
            }
        };

        Self {
            intro: narration(intro_sec),
            meditation: mode.meditation_seconds(),
            outro: narration(outro_sec),
            timed: mode.is_timed(),
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Boundaries
    // ───────────────────────────────────────────────────────────────

    #[inline]
    pub fn intro_duration(&self) -> u32 {
        self.intro
    }

    #[inline]
    pub fn meditation_duration(&self) -> u32 {
        self.meditation
    }

    #[inline]
    pub fn outro_duration(&self) -> u32 {
        self.outro
    }

    #[inline]
    pub fn is_timed(&self) -> bool {
        self.timed
    }

    #[inline]
    pub fn meditation_start(&self) -> u32 {
        self.intro
    }

    #[inline]
    pub fn outro_start(&self) -> u32 {
        self.intro.saturating_add(self.meditation)
    }

    /// Session length. `None` for open sessions, which never end on their own.
    #[inline]
    pub fn total(&self) -> Option<u32> {
        self.timed.then(|| self.span())
    }

    /// Sum of all phase lengths regardless of mode.
    #[inline]
    fn span(&self) -> u32 {
        self.outro_start().saturating_add(self.outro)
    }

    pub fn phase_start(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Intro => 0,
            Phase::Meditation => self.meditation_start(),
            Phase::Outro => self.outro_start(),
        }
    }

    pub fn phase_duration(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Intro => self.intro,
            Phase::Meditation => self.meditation,
            Phase::Outro => self.outro,
        }
    }

    /// Whether the outro exists as a phase at all.
    #[inline]
    pub fn has_outro(&self) -> bool {
        self.timed && self.outro > 0
    }

    // ───────────────────────────────────────────────────────────────
    // Queries at an elapsed time
    // ───────────────────────────────────────────────────────────────

    pub fn phase_at(&self, elapsed: u32) -> Phase {
        if elapsed < self.meditation_start() {
            Phase::Intro
        } else if self.has_outro() && elapsed >= self.outro_start() {
            Phase::Outro
        } else {
            Phase::Meditation
        }
    }

    /// `elapsed` falls inside `[outro_start, outro_start + outro)`.
    pub fn in_outro_window(&self, elapsed: u32) -> bool {
        self.has_outro() && elapsed >= self.outro_start() && elapsed < self.span()
    }

    pub fn is_finished(&self, elapsed: u32) -> bool {
        self.total().is_some_and(|total| elapsed >= total)
    }

    /// Seconds left in a timed session, saturating at zero.
    pub fn remaining(&self, elapsed: u32) -> Option<u32> {
        self.total().map(|total| total.saturating_sub(elapsed))
    }

    /// Fraction of `phase` covered at `elapsed`, in `[0, 1]`. A zero-length
    /// phase counts as complete once reached.
    pub fn phase_progress(&self, phase: Phase, elapsed: u32) -> f32 {
        let start = self.phase_start(phase);
        let duration = self.phase_duration(phase);
        if elapsed < start {
            return 0.0;
        }
        if duration == 0 {
            return 1.0;
        }
        ((elapsed - start) as f32 / duration as f32).min(1.0)
    }

    /// Fraction of the whole bar covered at `elapsed`, in `[0, 1]`.
    pub fn overall_progress(&self, elapsed: u32) -> f32 {
        let span = self.span().max(1);
        (elapsed as f32 / span as f32).clamp(0.0, 1.0)
    }
}
