use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use strider_common::Transform;
use strider_render::Mesh;

use crate::world::PhysicsError;

slotmap::new_key_type! {
    /// Generational handle to a body. Stale after the body is unregistered.
    pub struct BodyHandle;
}

/// Collision shape of a body, in body-local space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BodyShape {
    Box {
        half_extents: Vec3,
    },
    Sphere {
        radius: f32,
    },
    /// Y-aligned capsule.
    Capsule {
        radius: f32,
        half_height: f32,
    },
    /// Square heightfield anchored at its local origin, spanning `size` on X and Z.
    Heightfield {
        size: f32,
        resolution: u32,
        min_height: f32,
        max_height: f32,
    },
}

impl BodyShape {
    pub fn validate(&self) -> Result<(), PhysicsError> {
        let ok = match *self {
            BodyShape::Box { half_extents } => {
                half_extents.is_finite() && half_extents.min_element() > 0.0
            }
            BodyShape::Sphere { radius } => radius.is_finite() && radius > 0.0,
            BodyShape::Capsule {
                radius,
                half_height,
            } => radius.is_finite() && radius > 0.0 && half_height.is_finite() && half_height >= 0.0,
            BodyShape::Heightfield {
                size,
                resolution,
                min_height,
                max_height,
            } => {
                size.is_finite()
                    && size > 0.0
                    && resolution > 0
                    && min_height.is_finite()
                    && max_height.is_finite()
                    && min_height <= max_height
            }
        };
        if ok {
            Ok(())
        } else {
            Err(PhysicsError::InvalidShape(*self))
        }
    }

    /// Render mesh for this shape. Heightfields are drawn by their owner.
    pub fn mesh(&self) -> Option<Mesh> {
        match *self {
            BodyShape::Box { half_extents } => Some(Mesh::Box { half_extents }),
            BodyShape::Sphere { radius } => Some(Mesh::Sphere { radius }),
            BodyShape::Capsule {
                radius,
                half_height,
            } => Some(Mesh::Capsule {
                radius,
                half_height,
            }),
            BodyShape::Heightfield { .. } => None,
        }
    }

    /// Local-space bounds as (min, max).
    pub fn local_bounds(&self) -> (Vec3, Vec3) {
        match *self {
            BodyShape::Box { half_extents } => (-half_extents, half_extents),
            BodyShape::Sphere { radius } => (Vec3::splat(-radius), Vec3::splat(radius)),
            BodyShape::Capsule {
                radius,
                half_height,
            } => {
                let h = Vec3::new(radius, radius + half_height, radius);
                (-h, h)
            }
            BodyShape::Heightfield {
                size,
                min_height,
                max_height,
                ..
            } => (
                Vec3::new(0.0, min_height, 0.0),
                Vec3::new(size, max_height, size),
            ),
        }
    }
}

/// Static bodies never move; dynamic bodies are integrated by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BodyKind {
    Static,
    Dynamic { mass: f32 },
}

impl BodyKind {
    pub fn is_static(&self) -> bool {
        matches!(self, BodyKind::Static)
    }

    pub fn is_dynamic(&self) -> bool {
        !self.is_static()
    }
}

/// A body owned by the physics world.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    pub shape: BodyShape,
    pub kind: BodyKind,
    pub transform: Transform,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl RigidBody {
    pub fn new(shape: BodyShape, transform: Transform, kind: BodyKind) -> Self {
        Self {
            shape,
            kind,
            transform,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.transform.to_matrix()
    }

    /// World-space axis-aligned bounds as (min, max).
    pub fn world_bounds(&self) -> (Vec3, Vec3) {
        let (lo, hi) = self.shape.local_bounds();
        let m = self.model_matrix();
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { lo.x } else { hi.x },
                if i & 2 == 0 { lo.y } else { hi.y },
                if i & 4 == 0 { lo.z } else { hi.z },
            );
            let p = m.transform_point3(corner);
            min = min.min(p);
            max = max.max(p);
        }
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_validation() {
        assert!(BodyShape::Sphere { radius: 1.0 }.validate().is_ok());
        assert!(BodyShape::Sphere { radius: 0.0 }.validate().is_err());
        assert!(BodyShape::Box {
            half_extents: Vec3::new(1.0, -1.0, 1.0)
        }
        .validate()
        .is_err());
        assert!(BodyShape::Heightfield {
            size: 64.0,
            resolution: 16,
            min_height: 3.0,
            max_height: 1.0,
        }
        .validate()
        .is_err());
    }

    #[test]
    fn heightfields_have_no_body_mesh() {
        let field = BodyShape::Heightfield {
            size: 64.0,
            resolution: 16,
            min_height: 0.0,
            max_height: 4.0,
        };
        assert!(field.mesh().is_none());
        assert!(BodyShape::Sphere { radius: 1.0 }.mesh().is_some());
    }

    #[test]
    fn world_bounds_follow_translation() {
        let body = RigidBody::new(
            BodyShape::Box {
                half_extents: Vec3::ONE,
            },
            Transform::from_position(Vec3::new(10.0, 0.0, 0.0)),
            BodyKind::Static,
        );
        let (min, max) = body.world_bounds();
        assert!((min - Vec3::new(9.0, -1.0, -1.0)).length() < 1e-5);
        assert!((max - Vec3::new(11.0, 1.0, 1.0)).length() < 1e-5);
    }
}
