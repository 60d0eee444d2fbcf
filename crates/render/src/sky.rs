use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::batch::{DepthPolicy, DrawItem, Mesh, RenderBatch, RenderError, Shading, ViewProjection};

/// Sky dome settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyConfig {
    /// Dome radius. Kept inside the camera far plane.
    pub radius: f32,
    pub color: Vec3,
}

impl Default for SkyConfig {
    fn default() -> Self {
        Self {
            radius: 2500.0,
            color: Vec3::new(0.45, 0.62, 0.85),
        }
    }
}

/// Background dome that follows the camera. Drawn first, never occludes.
#[derive(Debug, Clone)]
pub struct SkyBackdrop {
    config: SkyConfig,
}

impl SkyBackdrop {
    pub fn new(config: SkyConfig) -> Result<Self, RenderError> {
        if !(config.radius.is_finite() && config.radius > 0.0) {
            return Err(RenderError::InvalidResource(format!(
                "sky radius {}",
                config.radius
            )));
        }
        if !config.color.is_finite() {
            return Err(RenderError::InvalidResource("sky color".into()));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &SkyConfig {
        &self.config
    }

    pub fn render(&self, batch: &mut dyn RenderBatch, camera: &ViewProjection) {
        let model = Mat4::from_translation(camera.eye) * Mat4::from_scale(Vec3::splat(self.config.radius));
        batch.draw(
            DrawItem::new(
                Mesh::SkyDome,
                model,
                Shading::Unlit {
                    color: self.config.color,
                },
            )
            .with_depth(DepthPolicy::Backdrop),
        );
    }
}
