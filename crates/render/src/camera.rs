use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::batch::{ViewProjection, Viewport};

/// Perspective camera with an explicit eye and look target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 10.0, 15.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: 67.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.01,
            far: 5000.0,
        }
    }
}

impl Camera {
    pub fn direction(&self) -> Vec3 {
        (self.target - self.eye).normalize_or_zero()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> ViewProjection {
        ViewProjection {
            eye: self.eye,
            view: self.view_matrix(),
            projection: self.projection_matrix(),
        }
    }
}

/// Chase camera placement, in the character's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaseConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Eye offset from the character. Local -Z is the character's forward.
    pub offset: Vec3,
    /// Look target offset from the character.
    pub look_offset: Vec3,
}

impl Default for ChaseConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 67.0,
            near: 0.01,
            far: 5000.0,
            offset: Vec3::new(0.0, 2.5, 6.0),
            look_offset: Vec3::new(0.0, 1.0, 0.0),
        }
    }
}

/// Camera rig that follows the character's transform at a fixed offset.
#[derive(Debug, Clone)]
pub struct ChaseCamera {
    config: ChaseConfig,
    camera: Camera,
}

impl ChaseCamera {
    pub fn new(config: ChaseConfig, viewport: Viewport) -> Self {
        let camera = Camera {
            eye: config.offset,
            target: config.look_offset,
            up: Vec3::Y,
            fov: config.fov_degrees.to_radians(),
            aspect: viewport.aspect(),
            near: config.near,
            far: config.far,
        };
        Self { config, camera }
    }

    /// Re-derive the aspect ratio after a viewport change.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.camera.aspect = viewport.aspect();
    }

    /// Place the camera behind and above the character.
    pub fn update(&mut self, character: &Mat4) {
        let (_, rotation, translation) = character.to_scale_rotation_translation();
        self.camera.eye = translation + rotation * self.config.offset;
        self.camera.target = translation + rotation * self.config.look_offset;
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn direction(&self) -> Vec3 {
        self.camera.direction()
    }

    pub fn view_projection(&self) -> ViewProjection {
        self.camera.view_projection()
    }

    pub fn config(&self) -> &ChaseConfig {
        &self.config
    }
}
