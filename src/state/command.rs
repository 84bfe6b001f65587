// Commands from UI to Engine.
//
// Commands are the ONLY way the UI can mutate session state.
// They are queued and processed one at a time by the engine.

use crate::timeline::Phase;

/// A command from the session screen to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    // ═══════════════════════════════════════════
    // Transport
    // ═══════════════════════════════════════════
    /// Begin the session. Only valid before the first start.
    Start,

    /// Pause a running session or resume a paused one.
    TogglePause,

    /// Jump to the start of a phase.
    Seek { phase: Phase },

    // ═══════════════════════════════════════════
    // Voice guidance
    // ═══════════════════════════════════════════
    /// Turn narration on or off.
    ToggleVoice,

    // ═══════════════════════════════════════════
    // Leaving the session
    // ═══════════════════════════════════════════
    /// Finish the session. Early finishes need confirmation first.
    Finish,

    /// The user confirmed an early finish.
    ConfirmFinish,

    /// The user backed out of an early finish.
    CancelFinish,

    /// The session screen is going away (back navigation, teardown).
    Unmount,
}

/// Response from the engine after processing a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    /// Command applied.
    Ok,

    /// Command not valid in the current state; nothing changed.
    Ignored { reason: &'static str },

    /// Early finish: ask the user, then send `ConfirmFinish` or `CancelFinish`.
    ConfirmationRequired,

    /// The session ended and navigation was asked to go home.
    Exited,
}

impl CommandResult {
    /// Code the bindings return for input that never reached the engine
    /// (a NULL session or an unknown phase code).
    pub const INVALID_CODE: u8 = u8::MAX;

    pub fn code(self) -> u8 {
        match self {
            CommandResult::Ok => 0,
            CommandResult::Ignored { .. } => 1,
            CommandResult::ConfirmationRequired => 2,
            CommandResult::Exited => 3,
        }
    }
}
