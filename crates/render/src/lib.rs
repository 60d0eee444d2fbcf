//! Rendering Adapter: renderer-agnostic batches and the two-pass frame render.
//!
//! # Invariants
//! - Renderer never mutates simulation state; it only reads transforms.
//! - Depth-only draws never carry lighting parameters.
//! - Every pass that begins also ends, including early-exit paths.
//!
//! # Workaround
//! Ships a recording backend in place of a GPU backend. Batches and depth
//! targets are created through [`RenderBackend`], so a GPU implementation can
//! be swapped in without touching the pipelines.

mod backend;
mod batch;
mod camera;
mod environment;
mod light;
mod pipeline;
mod recording;
mod sky;

pub use backend::{BatchKind, DepthTarget, RenderBackend, TargetId};
pub use batch::{
    DepthPolicy, DrawItem, Mesh, RenderBatch, RenderError, Shading, ViewProjection, Viewport,
};
pub use camera::{Camera, ChaseCamera, ChaseConfig};
pub use environment::{DirectionalLight, Environment, LightingConfig};
pub use light::{Light, ShadowConfig, ShadowLight, ShadowMap};
pub use pipeline::{ColorPass, ColorPipeline, PassState, ShadowPass, ShadowPipeline};
pub use recording::{DrawLog, DrawRecord, RecordingBackend, RecordingBatch};
pub use sky::{SkyBackdrop, SkyConfig};

pub fn crate_info() -> &'static str {
    "strider-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
