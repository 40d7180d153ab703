//! # Engine State Module
//!
//! The headless driver tying the voxel world, the physics engine and the
//! player together.
//!
//! ## Key Components
//!
//! * `EngineState` - The main state container for the engine
//! * `camera_state` - Keeps the eye on the player's body
//! * `clock` - Fixed-timestep accumulator
//! * `config` - JSON-loaded tunables
//! * `geometry` - Boxes and voxel rays
//! * `physics` - Rigid bodies against the world and each other
//! * `player` - Movement, reach and visibility from the player's eye
//! * `voxels` - Handles voxel data, chunks, and world generation
//!
//! ## Architecture
//!
//! `EngineState` owns every subsystem. Input arrives as a `PlayerAction`
//! snapshot and is applied at the start of the next fixed step, after which
//! the world spawns chunks around the player and the physics engine ticks.
//! A renderer asks for a `Frame` whenever it wants to draw.

use std::fmt;

use cgmath::{Matrix4, Point3, Vector3};
use log::{debug, info, trace, warn};
use web_time::Duration;

use camera_state::camera::Camera;
use clock::Clock;
use config::EngineConfig;
use geometry::RayHit;
use physics::{BodyHandle, PhysicsEngine, PhysicsError, RigidBody};
use player::Player;
use voxels::block::block_type::BlockType;
use voxels::chunk::{Chunk, ChunkOrigin};
use voxels::world::{World, WorldError};

pub mod camera_state;
pub mod clock;
pub mod config;
pub mod geometry;
pub mod physics;
pub mod player;
pub mod voxels;

const PEARL_MASS: f32 = 2.0;
const PEARL_SIZE: f32 = 0.25;
const PEARL_THROW_FORCE: f32 = 5000.0;

#[derive(Debug)]
pub enum EngineError {
    World(WorldError),
    Physics(PhysicsError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::World(e) => write!(f, "World error: {}", e),
            EngineError::Physics(e) => write!(f, "Physics error: {}", e),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::World(e) => Some(e),
            EngineError::Physics(e) => Some(e),
        }
    }
}

impl From<WorldError> for EngineError {
    fn from(e: WorldError) -> Self {
        EngineError::World(e)
    }
}

impl From<PhysicsError> for EngineError {
    fn from(e: PhysicsError) -> Self {
        EngineError::Physics(e)
    }
}

/// A thrown projectile, removed once its step budget runs out.
#[derive(Copy, Clone, Debug)]
struct Pearl {
    handle: BodyHandle,
    expires_at: u64,
}

/// Everything a renderer needs for one frame.
pub struct Frame<'a> {
    /// Chunks in view, oldest first.
    pub visible: Vec<&'a Chunk>,
    /// Chunks edited since the previous frame.
    pub dirty: Vec<ChunkOrigin>,
    pub view: Matrix4<f32>,
    /// Block the player is looking at.
    pub target: Option<RayHit>,
    pub pearls: Vec<Point3<f32>>,
    /// Fraction of a step already accumulated, for interpolating between steps.
    pub alpha: f32,
}

pub struct EngineState {
    pub config: EngineConfig,
    pub world: World,
    pub physics: PhysicsEngine,
    pub player: Player,
    /// Actions applied on the next step
    player_actions: PlayerAction,
    pearls: Vec<Pearl>,
    clock: Clock,
    target: Option<RayHit>,
}

impl EngineState {
    /// Creates the world described by `config` and drops the player onto it.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let world = World::from_config(config.world.clone());
        Self::with_world(config, world)
    }

    /// Drops the player onto an already constructed world.
    ///
    /// The spawn column is loaded first, so the player starts standing on the
    /// highest block there, or on `y = 0` above an empty column.
    pub fn with_world(config: EngineConfig, mut world: World) -> Result<Self, EngineError> {
        world.init();

        let [x, z] = config.player.spawn;
        world.spawn_surroundings(Point3::new(x, 0.0, z));
        world.drain_spawn_queue();

        let feet = world.ground(x, z).map_or(0.0, |ground| ground.j as f32 + 1.0);
        let eye = Point3::new(x, feet + config.player.height, z);

        let mut physics = PhysicsEngine::new(config.physics.clone());
        let player = Player::spawn(&mut physics, eye, &config.player, &config.physics)?;
        let clock = Clock::new(config.tick_rate, config.max_frame_secs);

        Ok(EngineState {
            config,
            world,
            physics,
            player,
            player_actions: PlayerAction::default(),
            pearls: Vec::new(),
            clock,
            target: None,
        })
    }

    /// The player's body.
    pub fn player_body(&self) -> Option<&RigidBody> {
        self.physics.body(self.player.handle())
    }

    pub fn camera(&self) -> &Camera {
        self.player.camera()
    }

    /// Block the player looked at during the last step.
    pub fn target(&self) -> Option<RayHit> {
        self.target
    }

    /// Steps simulated so far.
    pub fn steps(&self) -> u64 {
        self.clock.steps()
    }

    pub fn pearl_count(&self) -> usize {
        self.pearls.len()
    }

    /// Sets the input applied on the next step.
    pub fn set_player_actions(&mut self, actions: PlayerAction) {
        self.player_actions = actions;
    }

    /// Adds `elapsed` wall-clock time and runs every step it pays for.
    ///
    /// One-shot actions apply to the first step only; held movement keeps
    /// applying until the actions are replaced.
    ///
    /// # Returns
    /// The number of steps run.
    pub fn advance(&mut self, elapsed: Duration) -> Result<usize, EngineError> {
        self.clock.advance(elapsed);
        let mut steps = 0;
        while self.clock.should_simulate() {
            let actions = std::mem::take(&mut self.player_actions);
            self.player_actions = actions.held();
            self.step(&actions)?;
            steps += 1;
        }
        Ok(steps)
    }

    /// Runs one fixed step: actions, chunk spawning, physics, pearl expiry.
    pub fn step(&mut self, actions: &PlayerAction) -> Result<(), EngineError> {
        self.handle_actions(actions)?;

        let eye = self.player.eye();
        self.world.spawn_surroundings(eye);
        let spawned = self.world.process_spawn_queue();
        if spawned > 0 {
            trace!("Spawned {} chunks, {} still queued", spawned, self.world.queued_chunks());
        }

        let step = self.clock.step();
        self.physics
            .tick_with_observer(&mut self.world, step, &mut self.player.camera_state);
        self.clock.consume_step();

        self.expire_pearls();
        Ok(())
    }

    /// Collects what a renderer should draw now.
    pub fn frame(&mut self) -> Frame<'_> {
        let dirty = self.world.take_dirty_chunks();
        let pearls = self
            .pearls
            .iter()
            .filter_map(|pearl| self.physics.body(pearl.handle))
            .map(|body| body.position())
            .collect();

        let player = &self.player;
        let visible = self
            .world
            .collect_chunks(player.eye(), |chunk| !player.sees(chunk));

        Frame {
            visible,
            dirty,
            view: player.camera().calc_matrix(),
            target: self.target,
            pearls,
            alpha: self.clock.alpha(),
        }
    }

    fn handle_actions(&mut self, actions: &PlayerAction) -> Result<(), EngineError> {
        if let Some((delta_x, delta_y)) = actions.rotate_view {
            let sensitivity = self.config.player.look_sensitivity;
            self.player
                .camera_mut()
                .rotate(delta_x as f32, delta_y as f32, sensitivity);
        }

        let forward = axis(actions.move_forward, actions.move_backward);
        let right = axis(actions.move_right, actions.move_left);
        let movement = self.player.movement(forward, right);

        if let Some(body) = self.physics.body_mut(self.player.handle()) {
            if actions.toggle_fly {
                let flying = !body.flying();
                body.set_flying(flying);
                info!("Flying {}", if flying { "on" } else { "off" });
            }
            body.move_body(movement, actions.move_up);

            if actions.jump && body.grounded() && !body.flying() {
                let above_head = body.position() + Vector3::unit_y();
                if !self.world.block(above_head).active {
                    body.jump();
                }
            }
        }

        let ray = self.player.ray();
        let world = &mut self.world;
        self.target = ray.march(|cell| world.is_active(cell));

        if actions.break_block {
            if let Some(hit) = self.target {
                if self.world.break_block(hit.aabb.center())? {
                    self.target = None;
                }
            }
        }

        if let Some(block_type) = actions.place_block {
            self.place(block_type)?;
        }

        if actions.throw_pearl {
            self.throw_pearl()?;
        }
        Ok(())
    }

    /// Places against the targeted face, unless the new block would be inside the player.
    fn place(&mut self, block_type: BlockType) -> Result<(), EngineError> {
        let Some(RayHit {
            cell,
            face: Some(face),
            ..
        }) = self.target
        else {
            return Ok(());
        };
        let cell = cell + face.offset();

        if let Some(body) = self.physics.body(self.player.handle()) {
            let occupied = (0..body.rows()).any(|row| {
                let p = body.position() - Vector3::new(0.0, row as f32, 0.0);
                Point3::new(p.x.floor() as i32, p.y.floor() as i32, p.z.floor() as i32) == cell
            });
            if occupied {
                warn!("Refusing to place {} at {:?}, the player is there", block_type, cell);
                return Ok(());
            }
        }

        let center = Point3::new(cell.x as f32 + 0.5, cell.y as f32 + 0.5, cell.z as f32 + 0.5);
        self.world.place_block(center, block_type)?;
        Ok(())
    }

    fn throw_pearl(&mut self) -> Result<(), EngineError> {
        let Some(body) = self.physics.body(self.player.handle()) else {
            return Ok(());
        };
        let direction = self.player.camera().view_vec();
        let pearl = RigidBody::builder("pearl")
            .position(body.position() + direction)
            .mass(PEARL_MASS)
            .dimensions(PEARL_SIZE, PEARL_SIZE)
            .force(direction * PEARL_THROW_FORCE * PEARL_MASS)
            .speeds(&self.config.physics)
            .build()?;
        let handle = self.physics.register(pearl);

        let lifetime = self.config.player.pearl_lifetime_secs * self.config.tick_rate as f32;
        let expires_at = self.clock.steps() + lifetime.ceil().max(1.0) as u64;
        debug!("Threw pearl {:?}, expires at step {}", handle, expires_at);
        self.pearls.push(Pearl { handle, expires_at });
        Ok(())
    }

    fn expire_pearls(&mut self) {
        let now = self.clock.steps();
        let physics = &mut self.physics;
        self.pearls.retain(|pearl| {
            if pearl.expires_at > now {
                return true;
            }
            if let Some(body) = physics.unregister(pearl.handle) {
                debug!("Pearl {:?} expired at {:?}", pearl.handle, body.position());
            }
            false
        });
    }
}

fn axis(positive: bool, negative: bool) -> f32 {
    match (positive, negative) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    }
}

/// Represents player actions for one step
///
/// Movement flags describe keys being held. The rest are one-shot actions
/// that fire once.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct PlayerAction {
    /// Movement actions - true while the key is held
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    /// Rise while flying
    pub move_up: bool,

    /// View rotation - pointer delta since the last step
    pub rotate_view: Option<(f64, f64)>,

    pub jump: bool,
    pub toggle_fly: bool,
    /// Break the targeted block
    pub break_block: bool,
    /// Place a block of this type against the targeted face
    pub place_block: Option<BlockType>,
    pub throw_pearl: bool,
}

impl PlayerAction {
    /// The held movement keys only.
    pub fn held(&self) -> PlayerAction {
        PlayerAction {
            move_forward: self.move_forward,
            move_backward: self.move_backward,
            move_left: self.move_left,
            move_right: self.move_right,
            move_up: self.move_up,
            ..PlayerAction::default()
        }
    }
}
