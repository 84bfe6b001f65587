// Read-only session state for UI display.
//
// Published by the engine after every processed event. The UI renders it
// and never writes back.

use crate::clip::ClipTransport;
use crate::timeline::Phase;

use super::config::{Accent, Intention};

/// Coarse engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    /// Mounted, not started yet.
    #[default]
    Idle,
    Running,
    Paused,
    /// Timed session reached its end.
    Finished,
}

impl EngineState {
    pub fn code(self) -> u8 {
        match self {
            EngineState::Idle => 0,
            EngineState::Running => 1,
            EngineState::Paused => 2,
            EngineState::Finished => 3,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            1 => EngineState::Running,
            2 => EngineState::Paused,
            3 => EngineState::Finished,
            _ => EngineState::Idle,
        }
    }
}

/// Caption under the big clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayLabel {
    Remaining,
    Elapsed,
}

impl DisplayLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            DisplayLabel::Remaining => "remaining",
            DisplayLabel::Elapsed => "elapsed",
        }
    }
}

/// Projection of the session for the session screen.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReadback {
    pub state: EngineState,
    pub phase: Phase,

    pub elapsed_sec: u32,

    /// Timed sessions only.
    pub remaining_sec: Option<u32>,

    /// `mm:ss`, counting down for timed sessions and up for open ones.
    pub display: String,
    pub display_label: DisplayLabel,

    /// Whole-bar progress in `[0, 1]`.
    pub progress: f32,

    /// Per-phase progress in `[0, 1]`.
    pub intro_progress: f32,
    pub meditation_progress: f32,
    pub outro_progress: f32,

    pub meditation_start_sec: u32,
    pub outro_start_sec: u32,
    pub total_sec: Option<u32>,

    pub voice_enabled: bool,
    pub intention: Intention,
    pub intention_label: &'static str,
    pub accent: Accent,

    pub intro_transport: ClipTransport,
    pub outro_transport: ClipTransport,

    /// An early finish is waiting for the user's answer.
    pub confirmation_pending: bool,

    /// The session was handed back to navigation.
    pub exited: bool,
}

/// Format seconds as zero-padded `mm:ss`. Minutes grow past two digits.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
