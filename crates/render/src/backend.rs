use strider_common::Disposable;

use crate::batch::{RenderBatch, RenderError};

/// Identifier of an off-screen render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u32);

/// Which shader set a batch is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    /// Depth-only shaders for the shadow pass.
    Depth,
    /// Lit shaders for the color pass.
    Color,
}

impl BatchKind {
    pub fn label(&self) -> &'static str {
        match self {
            BatchKind::Depth => "depth",
            BatchKind::Color => "color",
        }
    }
}

/// An off-screen depth target, bound while a shadow pass captures into it.
pub trait DepthTarget: Disposable {
    fn id(&self) -> TargetId;

    fn size(&self) -> (u32, u32);

    fn bind(&mut self);

    fn unbind(&mut self);
}

/// Factory for backend resources. Resources are created once at construction.
pub trait RenderBackend {
    fn create_batch(&mut self, kind: BatchKind) -> Box<dyn RenderBatch>;

    fn create_depth_target(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn DepthTarget>, RenderError>;
}
