use strider_common::{Disposable, Transform};
use strider_physics::{BodyHandle, BodyKind, BodyShape, PhysicsError, PhysicsWorld};

use crate::disposer::DisposerRegistry;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("scene body rejected: {0}")]
    Physics(#[from] PhysicsError),
    #[error("scene resource unavailable: {0}")]
    Resource(String),
}

/// What a scene populator may touch while the frame loop is built.
pub struct SceneContext<'a> {
    physics: &'a mut PhysicsWorld,
    disposers: &'a mut DisposerRegistry,
    bodies: Vec<BodyHandle>,
}

impl<'a> SceneContext<'a> {
    pub(crate) fn new(physics: &'a mut PhysicsWorld, disposers: &'a mut DisposerRegistry) -> Self {
        Self {
            physics,
            disposers,
            bodies: Vec::new(),
        }
    }

    pub fn add_body(
        &mut self,
        shape: BodyShape,
        transform: Transform,
        kind: BodyKind,
    ) -> Result<BodyHandle, SceneError> {
        let handle = self.physics.register_body(shape, transform, kind)?;
        self.bodies.push(handle);
        Ok(handle)
    }

    /// Hand a resource to the teardown registry.
    pub fn add_disposable(&mut self, item: Box<dyn Disposable>) {
        self.disposers.register(item);
    }

    pub fn physics(&mut self) -> &mut PhysicsWorld {
        &mut *self.physics
    }

    /// Bodies added through this context.
    pub fn bodies(&self) -> &[BodyHandle] {
        &self.bodies
    }
}

/// Fills the world with its initial objects. A failure aborts construction.
pub trait ScenePopulator {
    fn populate(&mut self, scene: &mut SceneContext<'_>) -> Result<(), SceneError>;
}

/// Terrain only.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyScene;

impl ScenePopulator for EmptyScene {
    fn populate(&mut self, _scene: &mut SceneContext<'_>) -> Result<(), SceneError> {
        Ok(())
    }
}
