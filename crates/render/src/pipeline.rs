use glam::{Vec3, Vec4};

use crate::backend::{BatchKind, RenderBackend};
use crate::batch::{RenderBatch, RenderError, ViewProjection, Viewport};
use crate::light::{ShadowLight, ShadowMap};

/// Shadow pipeline state: idle -> framing -> capturing -> idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Idle,
    /// Light camera computed and depth target bound.
    Framing,
    /// Depth batch open, accepting depth-only draws.
    Capturing,
}

/// Pass 1: renders scene depth from the light into the shadow map.
pub struct ShadowPipeline {
    batch: Box<dyn RenderBatch>,
    state: PassState,
}

impl ShadowPipeline {
    pub fn new(backend: &mut dyn RenderBackend) -> Self {
        Self {
            batch: backend.create_batch(BatchKind::Depth),
            state: PassState::Idle,
        }
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    /// Frame the light around `target_hint` looking along `view_direction`
    /// and open the depth batch. The pass ends when the guard is finished or
    /// dropped.
    ///
    /// The frame loop passes the character anchor as `target_hint`, so the
    /// shadow map follows the character instead of staying on the world origin.
    pub fn begin<'a>(
        &'a mut self,
        light: &'a mut ShadowLight,
        target_hint: Vec3,
        view_direction: Vec3,
    ) -> Result<ShadowPass<'a>, RenderError> {
        if self.state != PassState::Idle {
            return Err(RenderError::PassActive("shadow"));
        }
        light.begin(target_hint, view_direction)?;
        self.state = PassState::Framing;

        let view = *light.camera();
        self.batch.begin(&view);
        self.state = PassState::Capturing;
        tracing::debug!("shadow pass begin");

        Ok(ShadowPass {
            pipeline: self,
            light,
            finished: false,
        })
    }

    pub fn dispose(self) {
        self.batch.dispose();
    }
}

/// Scoped shadow capture. Ending is guaranteed: dropping the guard ends it.
pub struct ShadowPass<'a> {
    pipeline: &'a mut ShadowPipeline,
    light: &'a mut ShadowLight,
    finished: bool,
}

impl ShadowPass<'_> {
    /// Depth-only batch for this pass.
    pub fn batch(&mut self) -> &mut dyn RenderBatch {
        self.pipeline.batch.as_mut()
    }

    pub fn camera(&self) -> &ViewProjection {
        self.light.camera()
    }

    /// End the pass and hand back the published depth map.
    pub fn finish(mut self) -> ShadowMap {
        self.end()
    }

    fn end(&mut self) -> ShadowMap {
        self.finished = true;
        self.pipeline.batch.end();
        let map = self.light.end();
        self.pipeline.state = PassState::Idle;
        tracing::debug!("shadow pass end");
        map
    }
}

impl Drop for ShadowPass<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.end();
        }
    }
}

/// Pass 2: renders the lit scene from the camera.
pub struct ColorPipeline {
    batch: Box<dyn RenderBatch>,
    active: bool,
}

impl ColorPipeline {
    pub fn new(backend: &mut dyn RenderBackend) -> Self {
        Self {
            batch: backend.create_batch(BatchKind::Color),
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Clear the framebuffer and set the viewport.
    pub fn clear(&mut self, viewport: Viewport, color: Vec4) {
        self.batch.clear(viewport, color);
    }

    pub fn begin(&mut self, camera: &ViewProjection) -> Result<ColorPass<'_>, RenderError> {
        if self.active {
            return Err(RenderError::PassActive("color"));
        }
        self.batch.begin(camera);
        self.active = true;
        Ok(ColorPass {
            pipeline: self,
            finished: false,
        })
    }

    pub fn dispose(self) {
        self.batch.dispose();
    }
}

/// Scoped color pass. Dropping the guard flushes and ends it.
pub struct ColorPass<'a> {
    pipeline: &'a mut ColorPipeline,
    finished: bool,
}

impl ColorPass<'_> {
    pub fn batch(&mut self) -> &mut dyn RenderBatch {
        self.pipeline.batch.as_mut()
    }

    pub fn finish(mut self) {
        self.end();
    }

    fn end(&mut self) {
        self.finished = true;
        self.pipeline.batch.end();
        self.pipeline.active = false;
    }
}

impl Drop for ColorPass<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.end();
        }
    }
}
