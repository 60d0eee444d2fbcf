use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use strider_common::Transform;
use strider_physics::{BodyHandle, BodyKind, BodyShape, PhysicsError, PhysicsWorld};
use strider_render::{DrawItem, Environment, Mesh, RenderBatch, Shading};

use crate::generator::{HeightfieldGenerator, TileGenerator, TileGeometry};
use crate::grid::{TileCoord, tile_for_position, window_around, window_in_range};

#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    #[error("invalid terrain config: {0}")]
    InvalidConfig(String),
    #[error("tile generation failed at {coord:?}: {reason}")]
    Generation { coord: TileCoord, reason: String },
    #[error("tile body rejected: {0}")]
    Physics(#[from] PhysicsError),
}

/// Terrain window and heightfield parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Edge length of a square tile, in world units.
    pub tile_size: f32,
    /// Tiles kept loaded on each side of the anchor tile.
    pub radius: u32,
    /// Height cells per tile edge.
    pub resolution: u32,
    pub amplitude: f32,
    pub frequency: f32,
    pub seed: u64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            tile_size: 64.0,
            radius: 1,
            resolution: 16,
            amplitude: 8.0,
            frequency: 0.05,
            seed: 0x5EED,
        }
    }
}

impl TerrainConfig {
    pub fn validate(&self) -> Result<(), TerrainError> {
        if !(self.tile_size.is_finite() && self.tile_size > 0.0) {
            return Err(TerrainError::InvalidConfig(format!(
                "tile_size must be positive, got {}",
                self.tile_size
            )));
        }
        if self.resolution == 0 {
            return Err(TerrainError::InvalidConfig("resolution must be at least 1".into()));
        }
        if !(self.amplitude.is_finite() && self.amplitude >= 0.0) {
            return Err(TerrainError::InvalidConfig(format!(
                "amplitude must be non-negative, got {}",
                self.amplitude
            )));
        }
        if !self.frequency.is_finite() {
            return Err(TerrainError::InvalidConfig("frequency must be finite".into()));
        }
        if self.radius > 64 {
            return Err(TerrainError::InvalidConfig(format!(
                "radius {} is too large",
                self.radius
            )));
        }
        Ok(())
    }

    /// Tiles in a full window, `(2r+1)²`.
    pub fn window_len(&self) -> usize {
        let side = 2 * self.radius as usize + 1;
        side * side
    }
}

/// Tiles touched by one `update`, each list ordered by coordinate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileChanges {
    pub loaded: Vec<TileCoord>,
    pub unloaded: Vec<TileCoord>,
    /// Tiles left unloaded because generation failed. Retried next update.
    pub failed: Vec<TileCoord>,
}

impl TileChanges {
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty() && self.unloaded.is_empty() && self.failed.is_empty()
    }
}

/// Statistics from the last update, for instrumentation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamStats {
    pub tiles_loaded_this_update: usize,
    pub tiles_unloaded_this_update: usize,
    pub tiles_failed_this_update: usize,
    pub total_loaded_tiles: usize,
    pub update_time: Duration,
}

struct Tile {
    geometry: TileGeometry,
    body: BodyHandle,
}

/// Terrain tiles streamed around an anchor.
///
/// The field is the only registrar of tile bodies. It borrows the physics
/// world per call and never holds on to it.
pub struct TerrainField {
    config: TerrainConfig,
    generator: Box<dyn TileGenerator>,
    tiles: BTreeMap<TileCoord, Tile>,
    center: Option<TileCoord>,
    stats: StreamStats,
}

impl TerrainField {
    /// Field backed by [`HeightfieldGenerator`].
    pub fn new(config: TerrainConfig) -> Result<Self, TerrainError> {
        Self::with_generator(config, Box::new(HeightfieldGenerator::new()))
    }

    pub fn with_generator(
        config: TerrainConfig,
        generator: Box<dyn TileGenerator>,
    ) -> Result<Self, TerrainError> {
        config.validate()?;
        Ok(Self {
            config,
            generator,
            tiles: BTreeMap::new(),
            center: None,
            stats: StreamStats::default(),
        })
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Tile the window was last centered on.
    pub fn center(&self) -> Option<TileCoord> {
        self.center
    }

    pub fn loaded_tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        self.tiles.keys().copied()
    }

    pub fn loaded_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_loaded(&self, coord: TileCoord) -> bool {
        self.tiles.contains_key(&coord)
    }

    /// Static body registered for a loaded tile.
    pub fn body_for(&self, coord: TileCoord) -> Option<BodyHandle> {
        self.tiles.get(&coord).map(|t| t.body)
    }

    pub fn geometry(&self, coord: TileCoord) -> Option<&TileGeometry> {
        self.tiles.get(&coord).map(|t| &t.geometry)
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Bring the loaded set to the window around `anchor`.
    ///
    /// Departed tiles are unloaded (and their bodies unregistered) before any
    /// new tile is generated.
    pub fn update(&mut self, anchor: Vec3, physics: &mut PhysicsWorld) -> TileChanges {
        let _span = tracing::info_span!("terrain_update").entered();
        let started = Instant::now();

        if !anchor.is_finite() {
            tracing::warn!(?anchor, "ignoring non-finite anchor");
            return TileChanges::default();
        }

        let center = tile_for_position(anchor, self.config.tile_size);
        if !window_in_range(center, self.config.radius) {
            tracing::warn!(?anchor, ?center, "ignoring anchor outside the tile grid");
            return TileChanges::default();
        }
        let desired: BTreeSet<TileCoord> =
            window_around(center, self.config.radius).into_iter().collect();
        let mut changes = TileChanges::default();

        let departed: Vec<TileCoord> = self
            .tiles
            .keys()
            .filter(|c| !desired.contains(c))
            .copied()
            .collect();
        for coord in departed {
            if let Some(tile) = self.tiles.remove(&coord) {
                physics.unregister_body(tile.body);
                tracing::debug!(?coord, "unloaded tile");
                changes.unloaded.push(coord);
            }
        }

        for coord in desired {
            if self.tiles.contains_key(&coord) {
                continue;
            }
            match self.load_tile(coord, physics) {
                Ok(tile) => {
                    tracing::debug!(?coord, "loaded tile");
                    self.tiles.insert(coord, tile);
                    changes.loaded.push(coord);
                }
                Err(err) => {
                    tracing::warn!(?coord, %err, "tile load failed, retrying next update");
                    changes.failed.push(coord);
                }
            }
        }

        self.center = Some(center);
        self.stats = StreamStats {
            tiles_loaded_this_update: changes.loaded.len(),
            tiles_unloaded_this_update: changes.unloaded.len(),
            tiles_failed_this_update: changes.failed.len(),
            total_loaded_tiles: self.tiles.len(),
            update_time: started.elapsed(),
        };

        tracing::trace!(
            loaded = changes.loaded.len(),
            unloaded = changes.unloaded.len(),
            failed = changes.failed.len(),
            total = self.tiles.len(),
            "terrain update complete"
        );
        changes
    }

    /// Draw every loaded tile. `None` selects depth-only shading.
    pub fn render(&self, batch: &mut dyn RenderBatch, environment: Option<&Environment>) {
        let shading = Shading::for_environment(environment);
        for (coord, tile) in &self.tiles {
            let model = Mat4::from_translation(coord.origin(self.config.tile_size));
            let mesh = Mesh::TerrainTile {
                x: coord.x,
                z: coord.z,
                resolution: tile.geometry.resolution,
            };
            batch.draw(DrawItem::new(mesh, model, shading));
        }
    }

    /// Unload every tile. Returns the number unloaded.
    pub fn clear(&mut self, physics: &mut PhysicsWorld) -> usize {
        let count = self.tiles.len();
        for (_, tile) in std::mem::take(&mut self.tiles) {
            physics.unregister_body(tile.body);
        }
        self.center = None;
        tracing::debug!(count, "terrain cleared");
        count
    }

    fn load_tile(
        &mut self,
        coord: TileCoord,
        physics: &mut PhysicsWorld,
    ) -> Result<Tile, TerrainError> {
        let geometry = self.generator.generate(coord, &self.config)?;
        let (min_height, max_height) = geometry.height_range();
        let shape = BodyShape::Heightfield {
            size: geometry.size,
            resolution: geometry.resolution,
            min_height,
            max_height,
        };
        let transform = Transform::from_position(coord.origin(self.config.tile_size));
        let body = physics.register_body(shape, transform, BodyKind::Static)?;
        Ok(Tile { geometry, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use strider_physics::PhysicsConfig;
    use strider_render::{BatchKind, RecordingBackend, RenderBackend};

    fn field(radius: u32) -> TerrainField {
        TerrainField::new(TerrainConfig {
            radius,
            resolution: 4,
            ..TerrainConfig::default()
        })
        .unwrap()
    }

    /// Center of tile (x, z) at the default tile size.
    fn at(x: i32, z: i32) -> Vec3 {
        Vec3::new(x as f32 * 64.0 + 32.0, 0.0, z as f32 * 64.0 + 32.0)
    }

    fn coords(xs: &[(i32, i32)]) -> Vec<TileCoord> {
        xs.iter().map(|&(x, z)| TileCoord::new(x, z)).collect()
    }

    fn assert_window(field: &TerrainField, center: TileCoord) {
        let expected = window_around(center, field.config().radius);
        let loaded: Vec<TileCoord> = field.loaded_tiles().collect();
        assert_eq!(loaded, expected);
    }

    /// Fails a set of tiles a fixed number of times before succeeding.
    struct FlakyGenerator {
        inner: HeightfieldGenerator,
        failures: HashMap<TileCoord, u32>,
    }

    impl TileGenerator for FlakyGenerator {
        fn generate(
            &mut self,
            coord: TileCoord,
            config: &TerrainConfig,
        ) -> Result<TileGeometry, TerrainError> {
            if let Some(left) = self.failures.get_mut(&coord) {
                if *left > 0 {
                    *left -= 1;
                    return Err(TerrainError::Generation {
                        coord,
                        reason: "simulated".into(),
                    });
                }
            }
            self.inner.generate(coord, config)
        }
    }

    #[test]
    fn radius_one_loads_nine_tiles() {
        let mut physics = PhysicsWorld::new(PhysicsConfig::default());
        let mut field = field(1);
        let changes = field.update(at(0, 0), &mut physics);

        assert_eq!(changes.loaded.len(), 9);
        assert!(changes.unloaded.is_empty());
        assert_window(&field, TileCoord::new(0, 0));
        assert_eq!(physics.body_count(), 9);
        assert_eq!(field.stats().total_loaded_tiles, 9);
    }

    #[test]
    fn stepping_one_tile_swaps_a_column() {
        let mut physics = PhysicsWorld::new(PhysicsConfig::default());
        let mut field = field(1);
        field.update(at(0, 0), &mut physics);

        let changes = field.update(at(1, 0), &mut physics);
        assert_eq!(changes.unloaded, coords(&[(-1, -1), (-1, 0), (-1, 1)]));
        assert_eq!(changes.loaded, coords(&[(2, -1), (2, 0), (2, 1)]));
        assert_eq!(field.loaded_count(), 9);
        assert_window(&field, TileCoord::new(1, 0));
        assert_eq!(field.center(), Some(TileCoord::new(1, 0)));
    }

    #[test]
    fn unchanged_anchor_is_idempotent() {
        let mut physics = PhysicsWorld::new(PhysicsConfig::default());
        let mut field = field(2);
        field.update(at(3, -4), &mut physics);
        let events = physics.events().len();

        // Moving within the same tile changes nothing either.
        let changes = field.update(at(3, -4) + Vec3::new(10.0, 5.0, -10.0), &mut physics);
        assert!(changes.is_empty());
        assert_eq!(physics.events().len(), events);
        assert_window(&field, TileCoord::new(3, -4));
    }

    #[test]
    fn teleport_replaces_whole_window() {
        let mut physics = PhysicsWorld::new(PhysicsConfig::default());
        let mut field = field(1);
        field.update(at(0, 0), &mut physics);

        let changes = field.update(at(100, -50), &mut physics);
        assert_eq!(changes.unloaded.len(), 9);
        assert_eq!(changes.loaded.len(), 9);
        assert_window(&field, TileCoord::new(100, -50));
        assert_eq!(physics.body_count(), 9);
    }

    #[test]
    fn unloaded_tiles_release_their_bodies_first() {
        use strider_physics::PhysicsEvent;

        let mut physics = PhysicsWorld::new(PhysicsConfig::default());
        let mut field = field(1);
        field.update(at(0, 0), &mut physics);
        let old = field.body_for(TileCoord::new(-1, 0)).unwrap();
        physics.drain_events();

        field.update(at(1, 0), &mut physics);
        assert!(!physics.contains(old));

        let events = physics.drain_events();
        let first_register = events
            .iter()
            .position(|e| matches!(e, PhysicsEvent::Registered { .. }))
            .unwrap();
        let last_unregister = events
            .iter()
            .rposition(|e| matches!(e, PhysicsEvent::Unregistered { .. }))
            .unwrap();
        assert!(last_unregister < first_register);
    }

    #[test]
    fn no_leaked_bodies_over_a_walk() {
        let mut physics = PhysicsWorld::new(PhysicsConfig::default());
        let mut field = field(2);
        let path = [(0, 0), (1, 0), (1, 1), (5, 5), (4, 5), (-3, 2), (-3, 2)];
        for (x, z) in path {
            field.update(at(x, z), &mut physics);
            assert_eq!(physics.body_count(), field.loaded_count());
            for coord in field.loaded_tiles() {
                let body = field.body_for(coord).unwrap();
                assert!(physics.contains(body));
            }
        }
        assert_eq!(field.clear(&mut physics), 25);
        assert_eq!(physics.body_count(), 0);
        assert_eq!(field.center(), None);
    }

    #[test]
    fn failed_tiles_retry_next_update() {
        let mut physics = PhysicsWorld::new(PhysicsConfig::default());
        let flaky = TileCoord::new(1, 1);
        let generator = FlakyGenerator {
            inner: HeightfieldGenerator::new(),
            failures: HashMap::from([(flaky, 1)]),
        };
        let config = TerrainConfig {
            resolution: 4,
            ..TerrainConfig::default()
        };
        let mut field = TerrainField::with_generator(config, Box::new(generator)).unwrap();

        let first = field.update(at(0, 0), &mut physics);
        assert_eq!(first.failed, vec![flaky]);
        assert_eq!(first.loaded.len(), 8);
        assert!(!field.is_loaded(flaky));
        assert_eq!(physics.body_count(), 8);

        let second = field.update(at(0, 0), &mut physics);
        assert_eq!(second.loaded, vec![flaky]);
        assert!(second.failed.is_empty());
        assert_window(&field, TileCoord::new(0, 0));
    }

    #[test]
    fn tile_bodies_are_static_heightfields_at_origin() {
        let mut physics = PhysicsWorld::new(PhysicsConfig::default());
        let mut field = field(0);
        field.update(at(2, -1), &mut physics);

        let body = physics
            .body(field.body_for(TileCoord::new(2, -1)).unwrap())
            .unwrap();
        assert!(body.kind.is_static());
        assert!(matches!(body.shape, BodyShape::Heightfield { .. }));
        assert_eq!(body.transform.position, Vec3::new(128.0, 0.0, -64.0));
    }

    #[test]
    fn non_finite_anchor_is_ignored() {
        let mut physics = PhysicsWorld::new(PhysicsConfig::default());
        let mut field = field(1);
        field.update(at(0, 0), &mut physics);
        let changes = field.update(Vec3::new(f32::NAN, 0.0, 0.0), &mut physics);
        assert!(changes.is_empty());
        assert_eq!(field.loaded_count(), 9);
    }

    #[test]
    fn anchor_beyond_tile_grid_is_ignored() {
        let mut physics = PhysicsWorld::new(PhysicsConfig::default());
        let mut field = field(1);
        field.update(at(0, 0), &mut physics);

        for far in [
            Vec3::new(1.0e12, 0.0, 0.0),
            Vec3::new(0.0, 0.0, -1.0e12),
            Vec3::new(f32::MAX, 0.0, f32::MIN),
        ] {
            let changes = field.update(far, &mut physics);
            assert!(changes.is_empty());
            assert_window(&field, TileCoord::new(0, 0));
            assert_eq!(physics.body_count(), 9);
        }
        assert_eq!(field.center(), Some(TileCoord::new(0, 0)));
    }

    #[test]
    fn render_draws_each_loaded_tile() {
        let mut physics = PhysicsWorld::new(PhysicsConfig::default());
        let mut field = field(1);
        field.update(at(0, 0), &mut physics);

        let mut backend = RecordingBackend::new();
        let mut batch = backend.create_batch(BatchKind::Depth);
        field.render(batch.as_mut(), None);
        let draws = backend.log().draws("depth");
        assert_eq!(draws.len(), 9);
        assert!(draws.iter().all(|d| d.shading.is_depth_only()));
        assert!(draws.iter().all(|d| matches!(d.mesh, Mesh::TerrainTile { .. })));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let bad = TerrainConfig {
            tile_size: 0.0,
            ..TerrainConfig::default()
        };
        assert!(matches!(
            TerrainField::new(bad),
            Err(TerrainError::InvalidConfig(_))
        ));
        assert_eq!(TerrainConfig::default().window_len(), 9);
    }
}
