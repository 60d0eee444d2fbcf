use glam::{Quat, Vec3};

use crate::body::RigidBody;

/// Integration seam. The world hands every dynamic body to the solver once
/// per fixed sub-step; static bodies are never passed in.
pub trait Solver {
    fn integrate(&mut self, body: &mut RigidBody, dt: f32);
}

/// Semi-implicit Euler under uniform gravity with linear damping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravitySolver {
    pub gravity: Vec3,
    pub linear_damping: f32,
}

impl GravitySolver {
    pub fn new(gravity: Vec3, linear_damping: f32) -> Self {
        Self {
            gravity,
            linear_damping,
        }
    }
}

impl Solver for GravitySolver {
    fn integrate(&mut self, body: &mut RigidBody, dt: f32) {
        body.linear_velocity += self.gravity * dt;
        body.linear_velocity *= (1.0 - self.linear_damping * dt).max(0.0);
        body.transform.position += body.linear_velocity * dt;

        let w = body.angular_velocity;
        if w != Vec3::ZERO {
            let spin = Quat::from_xyzw(w.x, w.y, w.z, 0.0) * body.transform.rotation;
            let r = body.transform.rotation;
            body.transform.rotation = Quat::from_xyzw(
                r.x + 0.5 * dt * spin.x,
                r.y + 0.5 * dt * spin.y,
                r.z + 0.5 * dt * spin.z,
                r.w + 0.5 * dt * spin.w,
            )
            .normalize();
        }
    }
}
