// src/state/mod.rs
//
// Declarative state layer for UI interaction.
//
// This module contains the values exchanged between the session screen and
// the engine: the resolved configuration, the commands the UI may send and
// the read-only projection the engine publishes back.
//
// Key principles:
// - Configuration is resolved once and never mutated
// - Mutations happen through Commands
// - The UI only ever reads the readback

mod command;
mod config;
mod params;
mod readback;

pub use command::*;
pub use config::*;
pub use params::*;
pub use readback::*;
