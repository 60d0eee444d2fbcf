use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::backend::{DepthTarget, RenderBackend, TargetId};
use crate::batch::{RenderError, ViewProjection};
use crate::environment::{DirectionalLight, LightingConfig};

/// Shadow map resolution and the orthographic volume the light camera covers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    pub map_width: u32,
    pub map_height: u32,
    /// World-space width of the shadow camera volume.
    pub viewport_width: f32,
    /// World-space height of the shadow camera volume.
    pub viewport_height: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            map_width: 1024,
            map_height: 1024,
            viewport_width: 20.0,
            viewport_height: 20.0,
            near: 1.0,
            far: 300.0,
        }
    }
}

impl ShadowConfig {
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.map_width == 0 || self.map_height == 0 {
            return Err(RenderError::InvalidResource(format!(
                "shadow map size {}x{}",
                self.map_width, self.map_height
            )));
        }
        if !(self.viewport_width > 0.0 && self.viewport_height > 0.0) {
            return Err(RenderError::InvalidResource(
                "shadow viewport must be positive".into(),
            ));
        }
        if !(self.near >= 0.0 && self.far > self.near) {
            return Err(RenderError::InvalidResource(format!(
                "shadow depth range {}..{}",
                self.near, self.far
            )));
        }
        Ok(())
    }

    fn half_depth(&self) -> f32 {
        self.near + 0.5 * (self.far - self.near)
    }
}

/// A captured depth map, sampled by the color pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowMap {
    pub target: TargetId,
    pub light_view_proj: Mat4,
}

/// Directional light that owns a shadow camera and an off-screen depth target.
pub struct ShadowLight {
    light: DirectionalLight,
    config: ShadowConfig,
    target: Box<dyn DepthTarget>,
    camera: ViewProjection,
    framing: bool,
    depth_map: Option<ShadowMap>,
}

impl ShadowLight {
    pub fn new(
        light: DirectionalLight,
        config: ShadowConfig,
        backend: &mut dyn RenderBackend,
    ) -> Result<Self, RenderError> {
        config.validate()?;
        let target = backend.create_depth_target(config.map_width, config.map_height)?;
        let camera = frame_camera(&light, &config, Vec3::ZERO, Vec3::ZERO);
        Ok(Self {
            light,
            config,
            target,
            camera,
            framing: false,
            depth_map: None,
        })
    }

    pub fn light(&self) -> &DirectionalLight {
        &self.light
    }

    pub fn config(&self) -> &ShadowConfig {
        &self.config
    }

    pub fn target_id(&self) -> TargetId {
        self.target.id()
    }

    /// The shadow-casting camera computed by the last `begin`.
    pub fn camera(&self) -> &ViewProjection {
        &self.camera
    }

    pub fn is_framing(&self) -> bool {
        self.framing
    }

    /// Depth map published by the last completed capture.
    pub fn depth_map(&self) -> Option<ShadowMap> {
        self.depth_map
    }

    /// Frame the light camera around `center`, pushed ahead along `forward`,
    /// and bind the depth target.
    pub fn begin(&mut self, center: Vec3, forward: Vec3) -> Result<(), RenderError> {
        if self.framing {
            return Err(RenderError::PassActive("shadow"));
        }
        self.camera = frame_camera(&self.light, &self.config, center, forward);
        self.target.bind();
        self.framing = true;
        tracing::trace!(target_id = self.target.id().0, "shadow target bound");
        Ok(())
    }

    /// Unbind the depth target and publish the captured map.
    pub fn end(&mut self) -> ShadowMap {
        if self.framing {
            self.target.unbind();
            self.framing = false;
        }
        let map = ShadowMap {
            target: self.target.id(),
            light_view_proj: self.camera.matrix(),
        };
        self.depth_map = Some(map);
        map
    }

    pub fn dispose(self) {
        tracing::debug!(target_id = self.target.id().0, "releasing shadow target");
        self.target.dispose();
    }
}

/// Orthographic light camera looking along the light direction.
///
/// The focus point sits half a shadow volume ahead of `center` along the
/// horizontal part of `forward`, so the map covers what lies in view.
fn frame_camera(
    light: &DirectionalLight,
    config: &ShadowConfig,
    center: Vec3,
    forward: Vec3,
) -> ViewProjection {
    let dir = light.direction.try_normalize().unwrap_or(Vec3::NEG_Y);
    let ahead = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();
    let reach = 0.5 * config.viewport_width.max(config.viewport_height);
    let focus = center + ahead * reach;
    let eye = focus - dir * config.half_depth();
    let up = if dir.y.abs() > 0.99 { Vec3::Z } else { Vec3::Y };
    let half_w = 0.5 * config.viewport_width;
    let half_h = 0.5 * config.viewport_height;
    ViewProjection {
        eye,
        view: Mat4::look_at_rh(eye, focus, up),
        projection: Mat4::orthographic_rh(-half_w, half_w, -half_h, half_h, config.near, config.far),
    }
}

/// The scene light. The variant is chosen once, at construction.
pub enum Light {
    Directional(DirectionalLight),
    Shadow(ShadowLight),
}

impl Light {
    /// A shadow-casting light when `shadows` is given, a plain one otherwise.
    pub fn from_config(
        lighting: &LightingConfig,
        shadows: Option<&ShadowConfig>,
        backend: &mut dyn RenderBackend,
    ) -> Result<Self, RenderError> {
        let light = lighting.light();
        match shadows {
            Some(config) => Ok(Light::Shadow(ShadowLight::new(light, *config, backend)?)),
            None => Ok(Light::Directional(light)),
        }
    }

    pub fn params(&self) -> DirectionalLight {
        match self {
            Light::Directional(light) => *light,
            Light::Shadow(shadow) => shadow.light,
        }
    }

    pub fn direction(&self) -> Vec3 {
        self.params().direction
    }

    pub fn color(&self) -> Vec3 {
        self.params().color
    }

    pub fn casts_shadows(&self) -> bool {
        matches!(self, Light::Shadow(_))
    }

    pub fn shadow(&self) -> Option<&ShadowLight> {
        match self {
            Light::Shadow(shadow) => Some(shadow),
            Light::Directional(_) => None,
        }
    }

    pub fn shadow_mut(&mut self) -> Option<&mut ShadowLight> {
        match self {
            Light::Shadow(shadow) => Some(shadow),
            Light::Directional(_) => None,
        }
    }

    /// Releases the depth target of a shadow-casting light.
    pub fn dispose(self) {
        if let Light::Shadow(shadow) = self {
            shadow.dispose();
        }
    }
}
