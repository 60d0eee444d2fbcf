use strider_common::splitmix64;

use crate::field::{TerrainConfig, TerrainError};
use crate::grid::TileCoord;

/// Height samples of one tile: `(resolution + 1)²` vertices, row-major in Z.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGeometry {
    pub coord: TileCoord,
    pub size: f32,
    pub resolution: u32,
    pub heights: Vec<f32>,
}

impl TileGeometry {
    /// Vertices per side.
    pub fn side(&self) -> usize {
        self.resolution as usize + 1
    }

    pub fn height_at(&self, ix: usize, iz: usize) -> Option<f32> {
        let side = self.side();
        if ix >= side || iz >= side {
            return None;
        }
        self.heights.get(iz * side + ix).copied()
    }

    /// (min, max) height over all samples.
    pub fn height_range(&self) -> (f32, f32) {
        self.heights
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| {
                (lo.min(h), hi.max(h))
            })
    }
}

/// Produces tile geometry on demand. Failures leave the tile unloaded.
pub trait TileGenerator {
    fn generate(
        &mut self,
        coord: TileCoord,
        config: &TerrainConfig,
    ) -> Result<TileGeometry, TerrainError>;
}

/// Deterministic value-noise heightfields.
///
/// Heights are sampled in world space, so neighboring tiles share their edge
/// vertices exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeightfieldGenerator;

impl HeightfieldGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Height at a world XZ position.
    pub fn sample(config: &TerrainConfig, x: f32, z: f32) -> f32 {
        let fx = x * config.frequency;
        let fz = z * config.frequency;
        let x0 = fx.floor();
        let z0 = fz.floor();
        let tx = smooth(fx - x0);
        let tz = smooth(fz - z0);
        let (ix, iz) = (x0 as i64, z0 as i64);

        let c00 = lattice(config.seed, ix, iz);
        let c10 = lattice(config.seed, ix + 1, iz);
        let c01 = lattice(config.seed, ix, iz + 1);
        let c11 = lattice(config.seed, ix + 1, iz + 1);
        let a = c00 + (c10 - c00) * tx;
        let b = c01 + (c11 - c01) * tx;
        config.amplitude * (a + (b - a) * tz)
    }
}

impl TileGenerator for HeightfieldGenerator {
    fn generate(
        &mut self,
        coord: TileCoord,
        config: &TerrainConfig,
    ) -> Result<TileGeometry, TerrainError> {
        let side = config.resolution as usize + 1;
        let step = config.tile_size / config.resolution as f32;
        let origin = coord.origin(config.tile_size);

        let mut heights = Vec::with_capacity(side * side);
        for iz in 0..side {
            for ix in 0..side {
                let x = origin.x + ix as f32 * step;
                let z = origin.z + iz as f32 * step;
                heights.push(Self::sample(config, x, z));
            }
        }
        if heights.iter().any(|h| !h.is_finite()) {
            return Err(TerrainError::Generation {
                coord,
                reason: "non-finite height sample".into(),
            });
        }
        Ok(TileGeometry {
            coord,
            size: config.tile_size,
            resolution: config.resolution,
            heights,
        })
    }
}

/// Lattice value in [0, 1).
fn lattice(seed: u64, x: i64, z: i64) -> f32 {
    let h = splitmix64(seed ^ splitmix64((x as u64) ^ splitmix64(z as u64)));
    (h >> 40) as f32 / (1u64 << 24) as f32
}

fn smooth(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TerrainConfig {
        TerrainConfig {
            resolution: 8,
            ..TerrainConfig::default()
        }
    }

    #[test]
    fn generates_expected_sample_count() {
        let tile = HeightfieldGenerator::new()
            .generate(TileCoord::new(0, 0), &config())
            .unwrap();
        assert_eq!(tile.heights.len(), 81);
        assert!(tile.height_at(8, 8).is_some());
        assert!(tile.height_at(9, 0).is_none());
    }

    #[test]
    fn heights_stay_within_amplitude() {
        let cfg = config();
        let tile = HeightfieldGenerator::new()
            .generate(TileCoord::new(-3, 5), &cfg)
            .unwrap();
        let (lo, hi) = tile.height_range();
        assert!(lo >= 0.0);
        assert!(hi <= cfg.amplitude);
    }

    #[test]
    fn same_seed_same_tile() {
        let cfg = config();
        let mut generator = HeightfieldGenerator::new();
        let a = generator.generate(TileCoord::new(2, 2), &cfg).unwrap();
        let b = generator.generate(TileCoord::new(2, 2), &cfg).unwrap();
        assert_eq!(a, b);

        let other = TerrainConfig {
            seed: cfg.seed + 1,
            ..cfg
        };
        let c = generator.generate(TileCoord::new(2, 2), &other).unwrap();
        assert_ne!(a.heights, c.heights);
    }

    #[test]
    fn neighbors_share_edges() {
        let cfg = config();
        let mut generator = HeightfieldGenerator::new();
        let left = generator.generate(TileCoord::new(0, 0), &cfg).unwrap();
        let right = generator.generate(TileCoord::new(1, 0), &cfg).unwrap();
        let last = cfg.resolution as usize;
        for iz in 0..=last {
            assert_eq!(left.height_at(last, iz), right.height_at(0, iz));
        }
    }
}
