use std::path::PathBuf;

use clap::{Parser, Subcommand};
use glam::Vec3;
use strider_common::{Disposable, Transform};
use strider_core::{
    EngineConfig, FixedClock, FrameOrchestrator, SceneContext, SceneError, ScenePopulator,
};
use strider_input::{CharacterCommand, CharacterController, Platform};
use strider_physics::{BodyKind, BodyShape, DebugDrawMode};
use strider_render::RecordingBackend;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "strider-cli", about = "Headless driver for the strider frame loop")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print engine version and crate info
    Info,
    /// Print the default configuration as JSON
    Config,
    /// Walk the character across the terrain for a number of frames
    Run {
        /// Number of frames to run
        #[arg(short, long, default_value = "120")]
        frames: u64,
        /// Distance walked per frame
        #[arg(short, long, default_value = "2.0")]
        speed: f32,
        /// Disable the shadow pass
        #[arg(long)]
        no_shadows: bool,
        /// Draw the physics wireframe overlay
        #[arg(long)]
        wireframe: bool,
        /// Queue commands on the touch controller instead of applying them directly
        #[arg(long)]
        touch: bool,
        /// JSON engine configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Dump the draw log of the last frame
        #[arg(long)]
        trace: bool,
    },
}

/// A handle to a mesh the demo scene pretends to have uploaded.
struct DemoMesh(String);

impl Disposable for DemoMesh {
    fn name(&self) -> &str {
        &self.0
    }

    fn dispose(self: Box<Self>) {
        tracing::debug!(mesh = %self.0, "mesh released");
    }
}

/// A stack of crates and a ball dropped near the spawn point.
struct DemoScene;

impl ScenePopulator for DemoScene {
    fn populate(&mut self, scene: &mut SceneContext<'_>) -> Result<(), SceneError> {
        for i in 0..4 {
            scene.add_body(
                BodyShape::Box {
                    half_extents: Vec3::splat(0.5),
                },
                Transform::from_position(Vec3::new(4.0, 12.0 + i as f32 * 1.1, -6.0)),
                BodyKind::Dynamic { mass: 1.0 },
            )?;
        }
        scene.add_body(
            BodyShape::Sphere { radius: 0.75 },
            Transform::from_position(Vec3::new(-3.0, 15.0, -4.0)),
            BodyKind::Dynamic { mass: 3.0 },
        )?;
        scene.add_disposable(Box::new(DemoMesh("crate.obj".into())));
        scene.add_disposable(Box::new(DemoMesh("ball.obj".into())));
        Ok(())
    }
}

/// Walk the character for `frames` frames. Returns total tile loads and
/// unloads. The draw log holds only the last frame afterwards.
fn walk(
    orchestrator: &mut FrameOrchestrator<CharacterController>,
    backend: &RecordingBackend,
    frames: u64,
    speed: f32,
) -> anyhow::Result<(usize, usize)> {
    let mut loaded = 0;
    let mut unloaded = 0;
    for i in 0..frames {
        // Walk forward and veer a little every second.
        orchestrator.input_mut().send(CharacterCommand::forward(speed));
        if i % 60 == 59 {
            orchestrator.input_mut().send(CharacterCommand::Turn(0.3));
        }
        backend.log().clear();
        let report = orchestrator.frame()?;
        loaded += report.tiles.loaded.len();
        unloaded += report.tiles.unloaded.len();
        if !report.tiles.failed.is_empty() {
            println!("frame {}: {} tiles failed", report.frame, report.tiles.failed.len());
        }
    }
    Ok((loaded, unloaded))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Info => {
            println!("strider-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", strider_common::crate_info());
            println!("render: {}", strider_render::crate_info());
            println!("physics: {}", strider_physics::crate_info());
            println!("stream: {}", strider_stream::crate_info());
            println!("input: {}", strider_input::crate_info());
            println!("core: {}", strider_core::crate_info());
        }
        Commands::Config => {
            println!("{}", EngineConfig::default().to_json()?);
        }
        Commands::Run {
            frames,
            speed,
            no_shadows,
            wireframe,
            touch,
            config,
            trace,
        } => {
            let mut engine_config = match config {
                Some(path) => EngineConfig::load(&path)?,
                None => EngineConfig::default(),
            };
            if no_shadows {
                engine_config.shadows = false;
            }
            let dt = engine_config.physics.fixed_timestep;
            let platform = if touch { Platform::Touch } else { Platform::Desktop };

            let mut backend = RecordingBackend::new();
            let input = CharacterController::new(Vec3::new(0.0, 2.0, 0.0), platform);
            let mut orchestrator =
                FrameOrchestrator::new(engine_config, input, &mut backend, &mut DemoScene)?
                    .with_clock(FixedClock::new(dt));
            if wireframe {
                orchestrator.set_debug_mode(DebugDrawMode::WIREFRAME)?;
            }

            println!(
                "Running {frames} frames: shadows={}, platform={platform:?}",
                orchestrator.config().shadows
            );
            let (loaded, unloaded) = walk(&mut orchestrator, &backend, frames, speed)?;

            if let (Some(physics), Some(terrain)) = (orchestrator.physics(), orchestrator.terrain()) {
                let stats = physics.stats();
                println!(
                    "Physics: bodies={} (static={}, dynamic={}), substeps={}, hash={:#x}",
                    physics.body_count(),
                    stats.static_bodies,
                    stats.dynamic_bodies,
                    stats.total_substeps,
                    physics.state_hash()
                );
                println!(
                    "Terrain: center={:?}, loaded={}, total loads={loaded}, total unloads={unloaded}",
                    terrain.center(),
                    terrain.loaded_count()
                );
            }
            let timer = orchestrator.frame_timer();
            println!(
                "Frame time: avg={:?}, min={:?}, max={:?}, over budget={}/{}",
                timer.average(),
                timer.min(),
                timer.max(),
                timer.over_budget(),
                timer.total()
            );
            if trace {
                print!("{}", backend.log().summary());
            }

            orchestrator.dispose();
            println!("Released: {:?}", backend.log().released());
        }
    }

    Ok(())
}
