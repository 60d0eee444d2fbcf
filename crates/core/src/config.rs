use std::path::Path;

use glam::Vec4;
use serde::{Deserialize, Serialize};
use strider_physics::PhysicsConfig;
use strider_render::{ChaseConfig, LightingConfig, ShadowConfig, SkyConfig, Viewport};
use strider_stream::TerrainConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Everything the frame loop reads at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Run the shadow pass. Read once; the light variant follows it.
    pub shadows: bool,
    pub viewport: Viewport,
    pub clear_color: Vec4,
    pub terrain: TerrainConfig,
    pub physics: PhysicsConfig,
    pub camera: ChaseConfig,
    pub lighting: LightingConfig,
    pub shadow: ShadowConfig,
    pub sky: SkyConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shadows: true,
            viewport: Viewport::default(),
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            terrain: TerrainConfig::default(),
            physics: PhysicsConfig::default(),
            camera: ChaseConfig::default(),
            lighting: LightingConfig::default(),
            shadow: ShadowConfig::default(),
            sky: SkyConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&data)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(invalid(format!(
                "viewport {}x{}",
                self.viewport.width, self.viewport.height
            )));
        }
        self.terrain
            .validate()
            .map_err(|e| invalid(e.to_string()))?;

        let physics = &self.physics;
        if !(physics.fixed_timestep.is_finite() && physics.fixed_timestep > 0.0) {
            return Err(invalid(format!(
                "physics.fixed_timestep must be positive, got {}",
                physics.fixed_timestep
            )));
        }
        if physics.max_substeps == 0 {
            return Err(invalid("physics.max_substeps must be at least 1".into()));
        }
        if !physics.gravity.is_finite() {
            return Err(invalid("physics.gravity must be finite".into()));
        }
        if !(0.0..1.0).contains(&physics.linear_damping) {
            return Err(invalid(format!(
                "physics.linear_damping must be in [0, 1), got {}",
                physics.linear_damping
            )));
        }

        let camera = &self.camera;
        if !(camera.fov_degrees > 0.0 && camera.fov_degrees < 180.0) {
            return Err(invalid(format!("camera.fov_degrees {}", camera.fov_degrees)));
        }
        if !(camera.near > 0.0 && camera.far > camera.near) {
            return Err(invalid(format!(
                "camera depth range {}..{}",
                camera.near, camera.far
            )));
        }

        if self.shadows {
            self.shadow.validate().map_err(|e| invalid(e.to_string()))?;
        }
        Ok(())
    }
}

fn invalid(msg: String) -> ConfigError {
    ConfigError::Invalid(msg)
}
