use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Integer tile coordinate on the XZ plane. Y is ignored for partitioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub z: i32,
}

impl TileCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// World-space corner of the tile with the smallest X and Z.
    pub fn origin(&self, tile_size: f32) -> Vec3 {
        Vec3::new(self.x as f32 * tile_size, 0.0, self.z as f32 * tile_size)
    }

    /// Chebyshev distance in tiles.
    pub fn distance(&self, other: TileCoord) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }
}

/// Tile containing a world position: `floor(pos.xz / tile_size)`.
pub fn tile_for_position(pos: Vec3, tile_size: f32) -> TileCoord {
    TileCoord {
        x: (pos.x / tile_size).floor() as i32,
        z: (pos.z / tile_size).floor() as i32,
    }
}

/// Whether every tile of the window around `center` has an `i32` coordinate.
///
/// `tile_for_position` saturates far-away positions to `i32::MIN`/`i32::MAX`,
/// so those always fall outside this range.
pub fn window_in_range(center: TileCoord, radius: u32) -> bool {
    let Ok(r) = i32::try_from(radius) else {
        return false;
    };
    let range = (i32::MIN + r)..=(i32::MAX - r);
    range.contains(&center.x) && range.contains(&center.z)
}

/// Every tile within `radius` tiles of `center`, a `(2r+1)²` square,
/// ordered by X then Z.
pub fn window_around(center: TileCoord, radius: u32) -> Vec<TileCoord> {
    let r = radius as i32;
    let mut tiles = Vec::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);
    for dx in -r..=r {
        for dz in -r..=r {
            tiles.push(TileCoord::new(center.x + dx, center.z + dz));
        }
    }
    tiles
}
