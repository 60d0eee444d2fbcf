//! Physics World: rigid bodies, fixed-step simulation, debug overlay.
//!
//! # Invariants
//! - The world exclusively owns every body; callers hold generational handles.
//! - A stale handle never aliases a newer body.
//! - Stepping is deterministic given identical body states and inputs.
//! - Static bodies never move.
//!
//! # Workaround
//! Collision detection and constraint solving are not implemented. The world
//! delegates integration to a [`Solver`]; the default applies gravity and
//! damping only.

mod body;
mod debug;
mod solver;
mod world;

pub use body::{BodyHandle, BodyKind, BodyShape, RigidBody};
pub use debug::DebugDrawMode;
pub use solver::{GravitySolver, Solver};
pub use world::{PhysicsConfig, PhysicsError, PhysicsEvent, PhysicsStats, PhysicsWorld};

pub fn crate_info() -> &'static str {
    "strider-physics v0.1.0"
}
