use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use strider_common::Disposable;

use crate::environment::{DirectionalLight, Environment};
use crate::light::ShadowMap;

/// Errors from render passes and render resource construction.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("{0} pass is already active")]
    PassActive(&'static str),
    #[error("invalid render resource: {0}")]
    InvalidResource(String),
}

/// Output surface dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

/// View and projection a batch draws with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewProjection {
    pub eye: Vec3,
    pub view: Mat4,
    pub projection: Mat4,
}

impl ViewProjection {
    pub fn matrix(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// Geometry a draw refers to. Backends map these to their own buffers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mesh {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    Capsule { radius: f32, half_height: f32 },
    TerrainTile { x: i32, z: i32, resolution: u32 },
    SkyDome,
}

/// How a draw is shaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shading {
    /// Depth only. Carries no lighting state at all.
    DepthOnly,
    Lit {
        ambient: Vec3,
        light: DirectionalLight,
        shadow_map: Option<ShadowMap>,
    },
    Unlit { color: Vec3 },
    Wireframe { color: Vec3 },
}

impl Shading {
    /// Lit shading from an environment, depth-only without one.
    pub fn for_environment(environment: Option<&Environment>) -> Self {
        environment.map_or(Shading::DepthOnly, Environment::shading)
    }

    pub fn is_depth_only(&self) -> bool {
        matches!(self, Shading::DepthOnly)
    }
}

/// Depth test policy of a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthPolicy {
    /// Regular depth test and write.
    #[default]
    Test,
    /// Drawn behind everything: no depth write, depth at the far plane.
    Backdrop,
    /// Drawn over the scene with depth test disabled.
    Overlay,
}

/// A single draw submitted to a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub mesh: Mesh,
    pub model: Mat4,
    pub shading: Shading,
    pub depth: DepthPolicy,
}

impl DrawItem {
    pub fn new(mesh: Mesh, model: Mat4, shading: Shading) -> Self {
        Self {
            mesh,
            model,
            shading,
            depth: DepthPolicy::Test,
        }
    }

    pub fn with_depth(mut self, depth: DepthPolicy) -> Self {
        self.depth = depth;
        self
    }
}

/// A batch collects draws between `begin` and `end` and submits them on `end`.
///
/// Batches are GPU resources, released through [`Disposable`].
pub trait RenderBatch: Disposable {
    fn begin(&mut self, view: &ViewProjection);

    /// Clear the bound framebuffer and set the viewport.
    fn clear(&mut self, viewport: Viewport, color: Vec4);

    fn draw(&mut self, item: DrawItem);

    fn end(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_aspect_never_divides_by_zero() {
        assert_eq!(Viewport::new(200, 100).aspect(), 2.0);
        assert!(Viewport::new(0, 0).aspect().is_finite());
    }

    #[test]
    fn no_environment_means_depth_only() {
        assert!(Shading::for_environment(None).is_depth_only());
        let env = Environment::new(Vec3::splat(0.3), DirectionalLight::default());
        assert!(!Shading::for_environment(Some(&env)).is_depth_only());
    }

    #[test]
    fn draw_item_defaults_to_depth_test() {
        let item = DrawItem::new(Mesh::SkyDome, Mat4::IDENTITY, Shading::DepthOnly);
        assert_eq!(item.depth, DepthPolicy::Test);
        assert_eq!(item.with_depth(DepthPolicy::Backdrop).depth, DepthPolicy::Backdrop);
    }
}
