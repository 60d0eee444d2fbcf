use std::time::{Duration, Instant};

use glam::Vec3;
use strider_input::{InputSource, Platform};
use strider_physics::{DebugDrawMode, PhysicsEvent, PhysicsWorld};
use strider_render::{
    ChaseCamera, ColorPipeline, Environment, Light, RenderBackend, RenderError, ShadowMap,
    ShadowPipeline, SkyBackdrop, Viewport,
};
use strider_stream::{TerrainError, TerrainField, TileChanges};

use crate::clock::{Clock, FrameTimer, SystemClock};
use crate::config::{ConfigError, EngineConfig};
use crate::disposer::DisposerRegistry;
use crate::scene::{SceneContext, SceneError, ScenePopulator};

/// Frame timings kept for the average/min/max readout.
const TIMER_HISTORY: usize = 120;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame orchestrator has been disposed")]
    Disposed,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Terrain(#[from] TerrainError),
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// One step of the frame, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FramePhase {
    ReadCharacter,
    UpdateAnchor,
    UpdateTerrain,
    UpdateCamera,
    StepPhysics,
    Clear,
    ShadowPass,
    ColorPass,
    DebugOverlay,
    PollController,
}

/// What a frame did.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// 1-based frame number.
    pub frame: u64,
    pub dt: f32,
    pub anchor: Vec3,
    pub phases: Vec<FramePhase>,
    pub tiles: TileChanges,
    pub substeps: u32,
    /// Depth map captured this frame. `None` when shadows are off.
    pub shadow_map: Option<ShadowMap>,
    pub overlay_draws: usize,
    /// Physics events since the previous frame, drained from the world.
    pub physics_events: Vec<PhysicsEvent>,
}

struct Resources {
    physics: PhysicsWorld,
    terrain: TerrainField,
    camera: ChaseCamera,
    sky: SkyBackdrop,
    shadow: ShadowPipeline,
    color: ColorPipeline,
    light: Light,
    disposers: DisposerRegistry,
}

impl Resources {
    /// Release order: bodies, registered disposables, pass batches, light target.
    fn dispose(self) {
        let Resources {
            physics,
            terrain,
            shadow,
            color,
            light,
            disposers,
            ..
        } = self;
        let bodies = physics.dispose();
        // Tile bodies went with the world.
        drop(terrain);
        let disposed = disposers.dispose_all();
        shadow.dispose();
        color.dispose();
        light.dispose();
        tracing::info!(bodies, disposed, "frame resources released");
    }
}

/// Runs the frame loop: streaming, physics, and both render passes in one
/// fixed order.
pub struct FrameOrchestrator<I: InputSource> {
    config: EngineConfig,
    input: I,
    clock: Box<dyn Clock>,
    resources: Option<Resources>,
    anchor: Vec3,
    frame: u64,
    timer: FrameTimer,
}

impl<I: InputSource> FrameOrchestrator<I> {
    /// Build every component and populate the scene. Any failure here is fatal.
    pub fn new(
        config: EngineConfig,
        input: I,
        backend: &mut dyn RenderBackend,
        populator: &mut dyn ScenePopulator,
    ) -> Result<Self, FrameError> {
        config.validate()?;

        let sky = SkyBackdrop::new(config.sky)?;
        let terrain = TerrainField::new(config.terrain)?;
        let camera = ChaseCamera::new(config.camera, config.viewport);
        let shadow_config = config.shadows.then_some(&config.shadow);
        let light = Light::from_config(&config.lighting, shadow_config, backend)?;
        let shadow = ShadowPipeline::new(backend);
        let color = ColorPipeline::new(backend);

        let mut resources = Resources {
            physics: PhysicsWorld::new(config.physics),
            terrain,
            camera,
            sky,
            shadow,
            color,
            light,
            disposers: DisposerRegistry::new(),
        };

        let populated = {
            let mut scene = SceneContext::new(&mut resources.physics, &mut resources.disposers);
            populator.populate(&mut scene)
        };
        if let Err(err) = populated {
            tracing::error!(%err, "scene population failed");
            resources.dispose();
            return Err(err.into());
        }

        tracing::info!(
            shadows = config.shadows,
            bodies = resources.physics.body_count(),
            disposables = resources.disposers.len(),
            "frame orchestrator ready"
        );
        let budget = Duration::from_secs_f32(config.physics.fixed_timestep);
        Ok(Self {
            config,
            input,
            clock: Box::new(SystemClock::default()),
            resources: Some(resources),
            anchor: Vec3::ZERO,
            frame: 0,
            timer: FrameTimer::new(TIMER_HISTORY, budget),
        })
    }

    /// Replace the frame clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Run one frame.
    pub fn frame(&mut self) -> Result<FrameReport, FrameError> {
        let res = self.resources.as_mut().ok_or(FrameError::Disposed)?;
        self.frame += 1;
        let _span = tracing::info_span!("frame", frame = self.frame).entered();
        let started = Instant::now();
        let dt = self.clock.delta();
        let mut phases = Vec::with_capacity(10);

        let character = self.input.character_transform();
        phases.push(FramePhase::ReadCharacter);

        self.anchor = character.w_axis.truncate();
        phases.push(FramePhase::UpdateAnchor);

        let tiles = res.terrain.update(self.anchor, &mut res.physics);
        phases.push(FramePhase::UpdateTerrain);

        res.camera.update(&character);
        phases.push(FramePhase::UpdateCamera);

        let substeps = res.physics.step(dt);
        phases.push(FramePhase::StepPhysics);

        res.color.clear(self.config.viewport, self.config.clear_color);
        phases.push(FramePhase::Clear);

        let mut shadow_map = None;
        if let Some(light) = res.light.shadow_mut() {
            let mut pass = res
                .shadow
                .begin(light, self.anchor, res.camera.direction())?;
            res.terrain.render(pass.batch(), None);
            res.physics.render(pass.batch(), None);
            shadow_map = Some(pass.finish());
            phases.push(FramePhase::ShadowPass);
        }

        let environment = Environment::new(self.config.lighting.ambient, res.light.params())
            .with_shadow_map(shadow_map);
        let view = res.camera.view_projection();
        {
            let mut pass = res.color.begin(&view)?;
            res.sky.render(pass.batch(), &view);
            res.terrain.render(pass.batch(), Some(&environment));
            res.physics.render(pass.batch(), Some(&environment));
            pass.finish();
        }
        phases.push(FramePhase::ColorPass);

        let mut overlay_draws = 0;
        if !res.physics.debug_mode().is_empty() {
            let mut pass = res.color.begin(&view)?;
            overlay_draws = res.physics.debug_draw(pass.batch());
            pass.finish();
            phases.push(FramePhase::DebugOverlay);
        }

        if self.input.platform() == Platform::Touch {
            self.input.poll_controller();
            phases.push(FramePhase::PollController);
        }

        let physics_events = res.physics.drain_events();
        let elapsed = started.elapsed();
        if self.timer.record(elapsed) {
            tracing::debug!(
                ?elapsed,
                budget = ?self.timer.budget(),
                "frame overran one physics step"
            );
        }
        tracing::trace!(
            dt,
            substeps,
            tiles_loaded = tiles.loaded.len(),
            tiles_unloaded = tiles.unloaded.len(),
            overlay_draws,
            events = physics_events.len(),
            "frame complete"
        );

        Ok(FrameReport {
            frame: self.frame,
            dt,
            anchor: self.anchor,
            phases,
            tiles,
            substeps,
            shadow_map,
            overlay_draws,
            physics_events,
        })
    }

    /// Release every resource. Returns `false` if already disposed.
    pub fn dispose(&mut self) -> bool {
        match self.resources.take() {
            Some(resources) => {
                resources.dispose();
                true
            }
            None => {
                tracing::debug!("dispose on an already disposed orchestrator");
                false
            }
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.resources.is_none()
    }

    /// Takes effect on the next frame.
    pub fn set_debug_mode(&mut self, mode: DebugDrawMode) -> Result<(), FrameError> {
        let res = self.resources.as_mut().ok_or(FrameError::Disposed)?;
        res.physics.set_debug_mode(mode);
        Ok(())
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<(), FrameError> {
        if viewport.width == 0 || viewport.height == 0 {
            return Err(RenderError::InvalidResource(format!(
                "viewport {}x{}",
                viewport.width, viewport.height
            ))
            .into());
        }
        let res = self.resources.as_mut().ok_or(FrameError::Disposed)?;
        res.camera.set_viewport(viewport);
        self.config.viewport = viewport;
        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Anchor computed by the last frame.
    pub fn anchor(&self) -> Vec3 {
        self.anchor
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn frame_timer(&self) -> &FrameTimer {
        &self.timer
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    pub fn physics(&self) -> Option<&PhysicsWorld> {
        self.resources.as_ref().map(|r| &r.physics)
    }

    pub fn physics_mut(&mut self) -> Option<&mut PhysicsWorld> {
        self.resources.as_mut().map(|r| &mut r.physics)
    }

    pub fn terrain(&self) -> Option<&TerrainField> {
        self.resources.as_ref().map(|r| &r.terrain)
    }

    pub fn camera(&self) -> Option<&ChaseCamera> {
        self.resources.as_ref().map(|r| &r.camera)
    }

    pub fn light(&self) -> Option<&Light> {
        self.resources.as_ref().map(|r| &r.light)
    }
}

impl<I: InputSource> Drop for FrameOrchestrator<I> {
    fn drop(&mut self) {
        self.dispose();
    }
}
