// src/event.rs

use crate::assets::ClipKind;
use crate::services::TimerId;
use crate::state::Command;

/// ===============================
/// Engine input events
/// ===============================

/// Everything the engine reacts to, serialized onto one queue.
///
/// These events:
/// - come from the UI (commands) or from host callbacks (timers, loads)
/// - arrive in any order
/// - are processed one at a time, each to completion
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A user command.
    Command(Command),

    /// A host timer fired with the token it was scheduled under.
    TimerFired { timer: TimerId, token: u64 },

    /// A clip finished loading. The duration may not be known yet.
    ClipLoaded {
        clip: ClipKind,
        duration_sec: Option<f64>,
    },

    /// A clip's duration became known after it loaded.
    ClipDuration { clip: ClipKind, duration_sec: f64 },
}

impl From<Command> for Event {
    fn from(command: Command) -> Self {
        Event::Command(command)
    }
}
