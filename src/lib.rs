#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Physics
//!
//! A voxel world engine with rigid-body physics, driven headlessly.
//!
//! The world is an unbounded grid of unit blocks stored in 16x256x16 chunks
//! that are generated on first touch, decorated across chunk borders and
//! merged with persisted edits. Boxes fall, slide and bounce through it under
//! a fixed-step simulation.
//!
//! ## Key Modules
//!
//! * `engine_state::voxels` - Blocks, chunks, generation, persistence and the world
//! * `engine_state::geometry` - Boxes and voxel ray traversal
//! * `engine_state::physics` - Rigid bodies, colliders and impulses
//! * `engine_state` - The driver tying the world, physics and the player together
//!
//! ## Usage
//!
//! ```no_run
//! fn main() {
//!     voxel_physics::run();
//! }
//! ```
//!
//! Set `VOXEL_CONFIG` to a JSON file to override the engine configuration,
//! and `RUST_LOG` to pick the log level.

use log::{debug, error, info, trace};
use web_time::{Duration, Instant};

pub mod engine_state;

pub use engine_state::config::EngineConfig;
pub use engine_state::{EngineError, EngineState, Frame, PlayerAction};

use engine_state::voxels::block::block_type::BlockType;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "VOXEL_CONFIG";

/// Frames simulated by the headless demo.
const DEMO_FRAMES: u32 = 600;

pub fn run() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();
    info!("Logger initialized");

    let config = match std::env::var(CONFIG_ENV) {
        Ok(path) => match EngineConfig::load(&path) {
            Ok(config) => {
                info!("Loaded config from {}", path);
                config
            }
            Err(e) => {
                error!("Failed to load config {}: {}", path, e);
                return;
            }
        },
        Err(_) => EngineConfig::default(),
    };

    if let Err(e) = run_demo(config) {
        error!("Engine stopped: {}", e);
    }
}

/// Walks the player around a fresh world with a scripted set of inputs.
fn run_demo(config: EngineConfig) -> Result<(), EngineError> {
    let started = Instant::now();
    let frame_time = Duration::from_secs_f64(1.0 / f64::from(config.tick_rate.max(1)));
    let mut engine = EngineState::new(config)?;
    info!(
        "World ready with {} chunks in {:?}",
        engine.world.chunk_count(),
        started.elapsed()
    );

    let mut steps = 0;
    for n in 0..DEMO_FRAMES {
        engine.set_player_actions(scripted_actions(n));
        steps += engine.advance(frame_time)?;

        let frame = engine.frame();
        if !frame.dirty.is_empty() {
            debug!("Chunks to rebuild: {:?}", frame.dirty);
        }
        trace!("{} chunks visible", frame.visible.len());
    }

    if let Some(body) = engine.player_body() {
        info!(
            "Ran {} steps in {:?}, player at {:?}",
            steps,
            started.elapsed(),
            body.position()
        );
    }
    Ok(())
}

fn scripted_actions(frame: u32) -> PlayerAction {
    let mut actions = PlayerAction {
        move_forward: frame < 240,
        move_right: (120..180).contains(&frame),
        ..PlayerAction::default()
    };
    match frame {
        60 | 200 => actions.jump = true,
        250 => actions.rotate_view = Some((300.0, 400.0)),
        260 => actions.break_block = true,
        300 => actions.place_block = Some(BlockType::WhiteWood),
        320 => actions.throw_pearl = true,
        400 => actions.toggle_fly = true,
        _ => {}
    }
    if (400..460).contains(&frame) {
        actions.move_up = true;
    }
    actions
}
