use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::batch::Shading;
use crate::light::ShadowMap;

/// Direction and color shared by both light variants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    /// Direction the light travels in, normalized.
    pub direction: Vec3,
    pub color: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self::new(Vec3::splat(0.8), Vec3::new(-0.5, -1.0, -0.5))
    }
}

impl DirectionalLight {
    /// Zero directions fall back to straight down.
    pub fn new(color: Vec3, direction: Vec3) -> Self {
        let direction = direction.try_normalize().unwrap_or(Vec3::NEG_Y);
        Self { direction, color }
    }
}

/// Scene lighting configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub ambient: Vec3,
    pub color: Vec3,
    pub direction: Vec3,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient: Vec3::splat(0.3),
            color: Vec3::splat(0.8),
            direction: Vec3::new(-0.5, -1.0, -0.5),
        }
    }
}

impl LightingConfig {
    pub fn light(&self) -> DirectionalLight {
        DirectionalLight::new(self.color, self.direction)
    }
}

/// Lighting state attached to lit draws.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Environment {
    pub ambient: Vec3,
    pub light: DirectionalLight,
    /// Depth map from this frame's shadow pass, if one ran.
    pub shadow_map: Option<ShadowMap>,
}

impl Environment {
    pub fn new(ambient: Vec3, light: DirectionalLight) -> Self {
        Self {
            ambient,
            light,
            shadow_map: None,
        }
    }

    pub fn from_config(config: &LightingConfig) -> Self {
        Self::new(config.ambient, config.light())
    }

    pub fn with_shadow_map(mut self, shadow_map: Option<ShadowMap>) -> Self {
        self.shadow_map = shadow_map;
        self
    }

    pub fn shading(&self) -> Shading {
        Shading::Lit {
            ambient: self.ambient,
            light: self.light,
            shadow_map: self.shadow_map,
        }
    }
}
