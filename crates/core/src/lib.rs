//! Core: the per-frame loop that keeps terrain, physics, and rendering in step.
//!
//! # Invariants
//! - Every frame runs in one fixed order: character, anchor, terrain, camera,
//!   physics, clear, shadow pass, color pass, debug overlay, controller poll.
//! - Terrain is streamed before physics steps, and physics steps before any
//!   render pass reads body transforms.
//! - Teardown releases each resource exactly once; a second teardown is a no-op.
//!
//! # Workaround
//! Everything runs on the calling thread. Tile generation inside the terrain
//! update can stall a frame when the character crosses many tiles at once.

mod clock;
mod config;
mod disposer;
mod orchestrator;
mod scene;

pub use clock::{Clock, FixedClock, FrameTimer, SystemClock};
pub use config::{ConfigError, EngineConfig};
pub use disposer::DisposerRegistry;
pub use orchestrator::{FrameError, FrameOrchestrator, FramePhase, FrameReport};
pub use scene::{EmptyScene, SceneContext, SceneError, ScenePopulator};

pub fn crate_info() -> &'static str {
    "strider-core v0.1.0"
}
