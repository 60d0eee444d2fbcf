//! Streaming: a square window of terrain tiles kept centered on an anchor.
//!
//! # Invariants
//! - After `update`, loaded tiles are exactly the window around the anchor
//!   tile, minus tiles whose generation failed in that update.
//! - A tile's static body is registered while, and only while, it is loaded.
//! - Departed tiles are unloaded before new ones are loaded.
//! - An anchor that is non-finite, or whose window leaves the `i32` tile grid,
//!   leaves the loaded set untouched.
//!
//! # Workaround
//! Tile generation runs synchronously inside `update`. A large jump of the
//! anchor stalls that frame for the whole new window.

mod field;
mod generator;
mod grid;

pub use field::{StreamStats, TerrainConfig, TerrainError, TerrainField, TileChanges};
pub use generator::{HeightfieldGenerator, TileGenerator, TileGeometry};
pub use grid::{TileCoord, tile_for_position, window_around, window_in_range};

pub fn crate_info() -> &'static str {
    "strider-stream v0.1.0"
}
