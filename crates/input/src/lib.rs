//! Input: the character transform and controller polling the frame loop reads.
//!
//! # Invariants
//! - The frame loop only reads the character transform; it never writes it.
//! - Desktop and touch produce the same commands. Only their delivery differs.

mod command;
mod controller;

pub use command::CharacterCommand;
pub use controller::{CharacterController, InputSource, Platform};

pub fn crate_info() -> &'static str {
    "strider-input v0.1.0"
}
