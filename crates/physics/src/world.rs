use std::time::{Duration, Instant};

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use strider_common::{StateHasher, Transform};
use strider_render::{DepthPolicy, DrawItem, Environment, Mesh, RenderBatch, Shading};

use crate::body::{BodyHandle, BodyKind, BodyShape, RigidBody};
use crate::debug::DebugDrawMode;
use crate::solver::{GravitySolver, Solver};

/// Errors from body registration.
#[derive(Debug, thiserror::Error)]
pub enum PhysicsError {
    #[error("invalid body shape: {0:?}")]
    InvalidShape(BodyShape),
    #[error("body transform is not finite")]
    InvalidTransform,
    #[error("dynamic body mass must be positive, got {0}")]
    InvalidMass(f32),
}

/// Simulation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: Vec3,
    /// Length of one simulation sub-step, in seconds.
    pub fixed_timestep: f32,
    /// Sub-steps allowed per `step` call. Time beyond that is dropped.
    pub max_substeps: u32,
    pub linear_damping: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 5,
            linear_damping: 0.0,
        }
    }
}

/// An event record produced by every mutation of the body set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhysicsEvent {
    Registered { handle: BodyHandle, kind: BodyKind },
    Unregistered { handle: BodyHandle },
    /// One `step` call; `substeps` fixed steps were taken, ending at `tick`.
    Stepped { tick: u64, substeps: u32 },
}

/// Counters for the performance readout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhysicsStats {
    pub step_calls: u64,
    pub total_substeps: u64,
    pub last_substeps: u32,
    pub last_step_time: Duration,
    pub static_bodies: usize,
    pub dynamic_bodies: usize,
}

/// The rigid-body world.
///
/// Owns every body. `step` and `render` both touch the body set; `&mut self`
/// on every mutation keeps them serialized.
pub struct PhysicsWorld {
    bodies: SlotMap<BodyHandle, RigidBody>,
    config: PhysicsConfig,
    solver: Box<dyn Solver>,
    debug_mode: DebugDrawMode,
    accumulator: f32,
    tick: u64,
    stats: PhysicsStats,
    events: Vec<PhysicsEvent>,
}

impl PhysicsWorld {
    /// World integrated by [`GravitySolver`].
    pub fn new(config: PhysicsConfig) -> Self {
        let solver = GravitySolver::new(config.gravity, config.linear_damping);
        Self::with_solver(config, Box::new(solver))
    }

    pub fn with_solver(config: PhysicsConfig, solver: Box<dyn Solver>) -> Self {
        Self {
            bodies: SlotMap::with_key(),
            config,
            solver,
            debug_mode: DebugDrawMode::NONE,
            accumulator: 0.0,
            tick: 0,
            stats: PhysicsStats::default(),
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Fixed sub-steps taken since creation.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.contains_key(handle)
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> {
        self.bodies.iter()
    }

    pub fn stats(&self) -> &PhysicsStats {
        &self.stats
    }

    pub fn events(&self) -> &[PhysicsEvent] {
        &self.events
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<PhysicsEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn register_body(
        &mut self,
        shape: BodyShape,
        transform: Transform,
        kind: BodyKind,
    ) -> Result<BodyHandle, PhysicsError> {
        shape.validate()?;
        if !transform.is_finite() {
            return Err(PhysicsError::InvalidTransform);
        }
        if let BodyKind::Dynamic { mass } = kind {
            if !(mass.is_finite() && mass > 0.0) {
                return Err(PhysicsError::InvalidMass(mass));
            }
        }
        let handle = self.bodies.insert(RigidBody::new(shape, transform, kind));
        self.events.push(PhysicsEvent::Registered { handle, kind });
        self.refresh_counts();
        tracing::trace!(?handle, static_body = kind.is_static(), "body registered");
        Ok(handle)
    }

    /// Remove a body. Unknown or stale handles are a no-op returning `false`.
    pub fn unregister_body(&mut self, handle: BodyHandle) -> bool {
        if self.bodies.remove(handle).is_none() {
            return false;
        }
        self.events.push(PhysicsEvent::Unregistered { handle });
        self.refresh_counts();
        tracing::trace!(?handle, "body unregistered");
        true
    }

    /// Add `impulse` to a dynamic body's momentum. Static bodies ignore it.
    pub fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec3) -> bool {
        match self.bodies.get_mut(handle) {
            Some(body) => match body.kind {
                BodyKind::Dynamic { mass } => {
                    body.linear_velocity += impulse / mass;
                    true
                }
                BodyKind::Static => false,
            },
            None => false,
        }
    }

    /// Advance dynamic bodies by `dt` seconds in fixed sub-steps.
    ///
    /// Leftover time carries over to the next call. Returns the number of
    /// sub-steps taken.
    pub fn step(&mut self, dt: f32) -> u32 {
        let started = Instant::now();
        let dt = if dt.is_finite() && dt >= 0.0 {
            dt
        } else {
            tracing::warn!(dt, "ignoring invalid step delta");
            0.0
        };

        let fixed = self.config.fixed_timestep;
        self.accumulator += dt;
        let mut substeps = 0;
        while self.accumulator >= fixed && substeps < self.config.max_substeps {
            for body in self.bodies.values_mut() {
                if body.kind.is_dynamic() {
                    self.solver.integrate(body, fixed);
                }
            }
            self.accumulator -= fixed;
            self.tick += 1;
            substeps += 1;
        }
        if self.accumulator >= fixed {
            tracing::debug!(dropped = self.accumulator, "physics fell behind, dropping time");
            self.accumulator %= fixed;
        }

        self.events.push(PhysicsEvent::Stepped {
            tick: self.tick,
            substeps,
        });
        self.stats.step_calls += 1;
        self.stats.total_substeps += substeps as u64;
        self.stats.last_substeps = substeps;
        self.stats.last_step_time = started.elapsed();
        tracing::trace!(tick = self.tick, substeps, "physics step complete");
        substeps
    }

    /// Draw every body that has a mesh. `None` selects depth-only shading.
    pub fn render(&self, batch: &mut dyn RenderBatch, environment: Option<&Environment>) {
        let shading = Shading::for_environment(environment);
        for body in self.bodies.values() {
            if let Some(mesh) = body.shape.mesh() {
                batch.draw(DrawItem::new(mesh, body.model_matrix(), shading));
            }
        }
    }

    pub fn debug_mode(&self) -> DebugDrawMode {
        self.debug_mode
    }

    /// Takes effect on the next `debug_draw`.
    pub fn set_debug_mode(&mut self, mode: DebugDrawMode) {
        if mode != self.debug_mode {
            tracing::debug!(?mode, "debug draw mode changed");
        }
        self.debug_mode = mode;
    }

    /// Emit the debug overlay selected by the debug mode. Returns draws issued.
    pub fn debug_draw(&self, batch: &mut dyn RenderBatch) -> usize {
        if self.debug_mode.is_empty() {
            return 0;
        }
        let mut issued = 0;
        for body in self.bodies.values() {
            let color = if body.kind.is_static() {
                Vec3::splat(0.6)
            } else {
                Vec3::new(0.2, 1.0, 0.2)
            };
            if self.debug_mode.contains(DebugDrawMode::WIREFRAME) {
                let (lo, hi) = body.shape.local_bounds();
                let mesh = body.shape.mesh().unwrap_or(Mesh::Box {
                    half_extents: (hi - lo) * 0.5,
                });
                let model = match body.shape {
                    BodyShape::Heightfield { .. } => {
                        body.model_matrix() * Mat4::from_translation((lo + hi) * 0.5)
                    }
                    _ => body.model_matrix(),
                };
                batch.draw(
                    DrawItem::new(mesh, model, Shading::Wireframe { color })
                        .with_depth(DepthPolicy::Overlay),
                );
                issued += 1;
            }
            if self.debug_mode.contains(DebugDrawMode::AABB) {
                let (min, max) = body.world_bounds();
                batch.draw(
                    DrawItem::new(
                        Mesh::Box {
                            half_extents: (max - min) * 0.5,
                        },
                        Mat4::from_translation((min + max) * 0.5),
                        Shading::Wireframe {
                            color: Vec3::new(1.0, 0.3, 0.3),
                        },
                    )
                    .with_depth(DepthPolicy::Overlay),
                );
                issued += 1;
            }
        }
        issued
    }

    /// Deterministic hash of the simulation state.
    pub fn state_hash(&self) -> u64 {
        let mut h = StateHasher::new();
        h.write_u64(self.tick);
        for body in self.bodies.values() {
            let t = &body.transform;
            for v in [t.position, body.linear_velocity, body.angular_velocity] {
                h.write_f32(v.x);
                h.write_f32(v.y);
                h.write_f32(v.z);
            }
            for c in t.rotation.to_array() {
                h.write_f32(c);
            }
        }
        h.finish()
    }

    /// Release every body. Consumes the world.
    pub fn dispose(self) -> usize {
        let released = self.bodies.len();
        tracing::debug!(released, "physics world disposed");
        released
    }

    fn refresh_counts(&mut self) {
        let statics = self.bodies.values().filter(|b| b.kind.is_static()).count();
        self.stats.static_bodies = statics;
        self.stats.dynamic_bodies = self.bodies.len() - statics;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strider_render::{BatchKind, RecordingBackend, RenderBackend};

    fn tile_shape() -> BodyShape {
        BodyShape::Heightfield {
            size: 64.0,
            resolution: 16,
            min_height: 0.0,
            max_height: 8.0,
        }
    }

    fn crate_at(world: &mut PhysicsWorld, y: f32) -> BodyHandle {
        world
            .register_body(
                BodyShape::Box {
                    half_extents: Vec3::splat(0.5),
                },
                Transform::from_position(Vec3::new(0.0, y, 0.0)),
                BodyKind::Dynamic { mass: 2.0 },
            )
            .unwrap()
    }

    #[test]
    fn register_and_unregister() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        let h = world
            .register_body(tile_shape(), Transform::default(), BodyKind::Static)
            .unwrap();
        assert!(world.contains(h));
        assert_eq!(world.stats().static_bodies, 1);

        assert!(world.unregister_body(h));
        assert!(!world.contains(h));
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.events().len(), 2);
    }

    #[test]
    fn double_unregister_is_noop() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        let h = crate_at(&mut world, 0.0);
        assert!(world.unregister_body(h));
        assert!(!world.unregister_body(h));
        assert!(!world.unregister_body(h));
        // Only the first removal is logged.
        assert_eq!(world.events().len(), 2);
    }

    #[test]
    fn stale_handle_does_not_alias_new_body() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        let old = crate_at(&mut world, 0.0);
        world.unregister_body(old);
        let new = crate_at(&mut world, 5.0);

        assert_ne!(old, new);
        assert!(world.body(old).is_none());
        assert!(!world.unregister_body(old));
        assert!(world.contains(new));
    }

    #[test]
    fn invalid_registrations_are_rejected() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        let bad_shape = world.register_body(
            BodyShape::Sphere { radius: -1.0 },
            Transform::default(),
            BodyKind::Static,
        );
        assert!(matches!(bad_shape, Err(PhysicsError::InvalidShape(_))));

        let bad_mass = world.register_body(
            BodyShape::Sphere { radius: 1.0 },
            Transform::default(),
            BodyKind::Dynamic { mass: 0.0 },
        );
        assert!(matches!(bad_mass, Err(PhysicsError::InvalidMass(_))));

        let bad_transform = world.register_body(
            BodyShape::Sphere { radius: 1.0 },
            Transform::from_position(Vec3::splat(f32::NAN)),
            BodyKind::Static,
        );
        assert!(matches!(bad_transform, Err(PhysicsError::InvalidTransform)));
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn static_body_survives_ten_steps_unchanged() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        let start = Transform::from_position(Vec3::new(0.0, -2.0, 0.0));
        let h = world
            .register_body(tile_shape(), start, BodyKind::Static)
            .unwrap();
        for _ in 0..10 {
            world.step(1.0 / 60.0);
        }
        assert_eq!(world.body(h).unwrap().transform, start);
        assert_eq!(world.body(h).unwrap().linear_velocity, Vec3::ZERO);
        assert_eq!(world.stats().step_calls, 10);
    }

    #[test]
    fn dynamic_body_falls() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        let h = crate_at(&mut world, 10.0);
        world.step(0.5);
        assert!(world.body(h).unwrap().transform.position.y < 10.0);
    }

    #[test]
    fn step_uses_fixed_substeps_with_carry() {
        let config = PhysicsConfig {
            fixed_timestep: 0.25,
            max_substeps: 4,
            ..PhysicsConfig::default()
        };
        let mut world = PhysicsWorld::new(config);
        assert_eq!(world.step(0.1), 0);
        assert_eq!(world.step(0.2), 1);
        assert_eq!(world.tick(), 1);
        // Far too much time: clamped to max_substeps.
        assert_eq!(world.step(10.0), 4);
        assert_eq!(world.tick(), 5);
        assert_eq!(world.stats().total_substeps, 5);
    }

    #[test]
    fn invalid_delta_is_ignored() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        crate_at(&mut world, 1.0);
        assert_eq!(world.step(f32::NAN), 0);
        assert_eq!(world.step(-1.0), 0);
        assert_eq!(world.tick(), 0);
    }

    #[test]
    fn stepping_is_deterministic() {
        let build = || {
            let mut world = PhysicsWorld::new(PhysicsConfig::default());
            for i in 0..5 {
                let h = crate_at(&mut world, i as f32 * 3.0);
                world.apply_impulse(h, Vec3::new(i as f32, 0.0, 1.0));
            }
            world
        };
        let mut a = build();
        let mut b = build();
        for _ in 0..120 {
            a.step(1.0 / 60.0);
            b.step(1.0 / 60.0);
        }
        assert_eq!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn impulse_ignores_static_bodies() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        let floor = world
            .register_body(tile_shape(), Transform::default(), BodyKind::Static)
            .unwrap();
        let ball = crate_at(&mut world, 1.0);
        assert!(!world.apply_impulse(floor, Vec3::X));
        assert!(world.apply_impulse(ball, Vec3::X * 4.0));
        assert_eq!(world.body(ball).unwrap().linear_velocity, Vec3::X * 2.0);
    }

    #[test]
    fn depth_render_ignores_environment() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        crate_at(&mut world, 1.0);
        crate_at(&mut world, 4.0);

        let mut backend = RecordingBackend::new();
        let mut batch = backend.create_batch(BatchKind::Depth);
        world.render(batch.as_mut(), None);
        let draws = backend.log().draws("depth");
        assert_eq!(draws.len(), 2);
        assert!(draws.iter().all(|d| d.shading.is_depth_only()));
    }

    #[test]
    fn lit_render_carries_environment() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        crate_at(&mut world, 1.0);
        world
            .register_body(tile_shape(), Transform::default(), BodyKind::Static)
            .unwrap();

        let mut backend = RecordingBackend::new();
        let mut batch = backend.create_batch(BatchKind::Color);
        let env = Environment::new(
            Vec3::splat(0.3),
            strider_render::DirectionalLight::default(),
        );
        world.render(batch.as_mut(), Some(&env));
        let draws = backend.log().draws("color");
        // The heightfield is left to its owner.
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].shading, env.shading());
    }

    #[test]
    fn debug_overlay_follows_mode() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        crate_at(&mut world, 1.0);
        world
            .register_body(tile_shape(), Transform::default(), BodyKind::Static)
            .unwrap();
        let mut backend = RecordingBackend::new();
        let mut batch = backend.create_batch(BatchKind::Color);

        assert_eq!(world.debug_draw(batch.as_mut()), 0);

        world.set_debug_mode(DebugDrawMode::WIREFRAME);
        assert_eq!(world.debug_draw(batch.as_mut()), 2);
        let draws = backend.log().draws("color");
        assert!(draws
            .iter()
            .all(|d| matches!(d.shading, Shading::Wireframe { .. }) && d.depth == DepthPolicy::Overlay));

        world.set_debug_mode(DebugDrawMode::WIREFRAME | DebugDrawMode::AABB);
        assert_eq!(world.debug_draw(batch.as_mut()), 4);

        world.set_debug_mode(DebugDrawMode::NONE);
        backend.log().clear();
        assert_eq!(world.debug_draw(batch.as_mut()), 0);
        assert!(backend.log().is_empty());
    }

    #[test]
    fn dispose_reports_released_bodies() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        crate_at(&mut world, 0.0);
        crate_at(&mut world, 1.0);
        assert_eq!(world.dispose(), 2);
    }
}
