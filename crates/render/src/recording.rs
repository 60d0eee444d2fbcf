use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use glam::Vec4;
use strider_common::Disposable;

use crate::backend::{BatchKind, DepthTarget, RenderBackend, TargetId};
use crate::batch::{DrawItem, Mesh, RenderBatch, RenderError, Shading, ViewProjection, Viewport};

/// One backend call, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawRecord {
    Begin {
        batch: &'static str,
        view: ViewProjection,
    },
    Clear {
        batch: &'static str,
        viewport: Viewport,
        color: Vec4,
    },
    Draw {
        batch: &'static str,
        item: DrawItem,
    },
    End {
        batch: &'static str,
    },
    TargetBound(TargetId),
    TargetUnbound(TargetId),
    /// A backend resource was released.
    Released(String),
}

/// Shared, append-only log of backend calls.
#[derive(Debug, Clone, Default)]
pub struct DrawLog {
    records: Rc<RefCell<Vec<DrawRecord>>>,
}

impl DrawLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, record: DrawRecord) {
        self.records.borrow_mut().push(record);
    }

    pub fn records(&self) -> Vec<DrawRecord> {
        self.records.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }

    /// Draws submitted through the batch with the given label.
    pub fn draws(&self, batch: &str) -> Vec<DrawItem> {
        self.records
            .borrow()
            .iter()
            .filter_map(|r| match r {
                DrawRecord::Draw { batch: b, item } if *b == batch => Some(*item),
                _ => None,
            })
            .collect()
    }

    /// Names of released resources, in release order.
    pub fn released(&self) -> Vec<String> {
        self.records
            .borrow()
            .iter()
            .filter_map(|r| match r {
                DrawRecord::Released(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Human-readable dump of the log, for CLI output and debugging.
    pub fn summary(&self) -> String {
        let records = self.records.borrow();
        let mut out = String::new();
        let _ = writeln!(out, "=== Draw Log (records={}) ===", records.len());
        for record in records.iter() {
            let _ = match record {
                DrawRecord::Begin { batch, view } => writeln!(
                    out,
                    "[{batch}] begin eye=({:.1}, {:.1}, {:.1})",
                    view.eye.x, view.eye.y, view.eye.z
                ),
                DrawRecord::Clear {
                    batch, viewport, ..
                } => writeln!(out, "[{batch}] clear {}x{}", viewport.width, viewport.height),
                DrawRecord::Draw { batch, item } => {
                    let p = item.model.w_axis;
                    writeln!(
                        out,
                        "[{batch}]   {} {} pos=({:.2}, {:.2}, {:.2})",
                        mesh_name(&item.mesh),
                        shading_name(&item.shading),
                        p.x,
                        p.y,
                        p.z
                    )
                }
                DrawRecord::End { batch } => writeln!(out, "[{batch}] end"),
                DrawRecord::TargetBound(id) => writeln!(out, "target#{} bound", id.0),
                DrawRecord::TargetUnbound(id) => writeln!(out, "target#{} unbound", id.0),
                DrawRecord::Released(name) => writeln!(out, "released {name}"),
            };
        }
        out
    }
}

fn mesh_name(mesh: &Mesh) -> String {
    match mesh {
        Mesh::Box { .. } => "box".into(),
        Mesh::Sphere { .. } => "sphere".into(),
        Mesh::Capsule { .. } => "capsule".into(),
        Mesh::TerrainTile { x, z, .. } => format!("tile({x},{z})"),
        Mesh::SkyDome => "sky".into(),
    }
}

fn shading_name(shading: &Shading) -> &'static str {
    match shading {
        Shading::DepthOnly => "depth",
        Shading::Lit {
            shadow_map: Some(_),
            ..
        } => "lit+shadow",
        Shading::Lit { .. } => "lit",
        Shading::Unlit { .. } => "unlit",
        Shading::Wireframe { .. } => "wire",
    }
}

/// Headless backend: every batch and target writes into one [`DrawLog`].
#[derive(Debug, Default)]
pub struct RecordingBackend {
    log: DrawLog,
    next_target: u32,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> &DrawLog {
        &self.log
    }
}

impl RenderBackend for RecordingBackend {
    fn create_batch(&mut self, kind: BatchKind) -> Box<dyn RenderBatch> {
        Box::new(RecordingBatch {
            label: kind.label(),
            log: self.log.clone(),
            open: false,
        })
    }

    fn create_depth_target(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn DepthTarget>, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidResource(format!(
                "depth target {width}x{height}"
            )));
        }
        self.next_target += 1;
        Ok(Box::new(RecordingTarget {
            id: TargetId(self.next_target),
            name: format!("target#{}", self.next_target),
            size: (width, height),
            log: self.log.clone(),
        }))
    }
}

/// Batch that records instead of submitting.
#[derive(Debug)]
pub struct RecordingBatch {
    label: &'static str,
    log: DrawLog,
    open: bool,
}

impl RenderBatch for RecordingBatch {
    fn begin(&mut self, view: &ViewProjection) {
        if self.open {
            tracing::warn!(batch = self.label, "begin on an open batch");
        }
        self.open = true;
        self.log.push(DrawRecord::Begin {
            batch: self.label,
            view: *view,
        });
    }

    fn clear(&mut self, viewport: Viewport, color: Vec4) {
        self.log.push(DrawRecord::Clear {
            batch: self.label,
            viewport,
            color,
        });
    }

    fn draw(&mut self, item: DrawItem) {
        if !self.open {
            tracing::warn!(batch = self.label, "draw outside begin/end");
        }
        self.log.push(DrawRecord::Draw {
            batch: self.label,
            item,
        });
    }

    fn end(&mut self) {
        self.open = false;
        self.log.push(DrawRecord::End { batch: self.label });
    }
}

impl Disposable for RecordingBatch {
    fn name(&self) -> &str {
        self.label
    }

    fn dispose(self: Box<Self>) {
        self.log.push(DrawRecord::Released(format!("{}_batch", self.label)));
    }
}

#[derive(Debug)]
struct RecordingTarget {
    id: TargetId,
    name: String,
    size: (u32, u32),
    log: DrawLog,
}

impl DepthTarget for RecordingTarget {
    fn id(&self) -> TargetId {
        self.id
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn bind(&mut self) {
        self.log.push(DrawRecord::TargetBound(self.id));
    }

    fn unbind(&mut self) {
        self.log.push(DrawRecord::TargetUnbound(self.id));
    }
}

impl Disposable for RecordingTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn dispose(self: Box<Self>) {
        self.log.push(DrawRecord::Released(self.name.clone()));
    }
}
