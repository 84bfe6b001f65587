// src/lib.rs
//
// Library entry point for Rust consumers and the host bindings
// (iOS/Swift through `ffi`, browsers through `wasm`).

mod assets;
mod bridge;
mod clip;
mod clock;
mod engine;
mod event;
mod prefs;
mod services;
mod state;
mod timeline;

pub mod ffi;

#[cfg(feature = "web")]
pub mod wasm;

#[cfg(test)]
mod test;

// Re-export key types for Rust consumers
pub use assets::{AssetId, ClipKind, asset_for};
pub use bridge::{EngineHandle, EventSender, SessionHandle, create_bridge};
pub use clip::{AudioClipState, ClipTransport, LoadState};
pub use engine::SessionEngine;
pub use event::Event;
pub use prefs::{
    MINUTES_KEY, launch_minutes, load_minutes, open_launch, sanitize_minutes, save_minutes,
    timed_launch,
};
pub use services::{
    AudioPlayback, Haptics, Navigator, PlaybackError, PlayerHandle, PreferenceError,
    PreferenceStore, ServiceError, Services, TimerId, TimerService,
};
pub use state::{
    Accent, Command, CommandResult, DisplayLabel, EngineConfig, EngineState, FadeSettings,
    Intention, Mode, ParamValue, RawParams, SessionConfig, SessionReadback, format_clock, resolve,
};
pub use timeline::{Phase, PhaseTimeline};
