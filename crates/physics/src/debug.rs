bitflags::bitflags! {
    /// Debug overlay selection. Flags combine.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DebugDrawMode: u32 {
        /// Wireframe of every body's collision shape.
        const WIREFRAME = 1;
        /// World-space bounding box of every body.
        const AABB = 1 << 1;
    }
}

impl DebugDrawMode {
    pub const NONE: Self = Self::empty();
}
