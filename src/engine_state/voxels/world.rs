//! # World Module
//!
//! This module provides the `World` struct which manages a collection of chunks in the voxel world.
//! It serves as the central coordinator for chunk loading, unloading, and access.
//!
//! ## Architecture
//!
//! The world uses a sparse storage approach where only chunks that have been accessed are kept
//! in memory. Any position can be resolved to a block: if its chunk is missing, the chunk is
//! generated, decorated and merged with persisted edits before the lookup returns.
//!
//! ## Chunk Lifecycle
//!
//! - Spawned lazily on the first address miss, or ahead of time through the spawn queue
//! - Built from terrain, then persisted edits, then decoration
//! - Evicted by `collect_chunks` once its center is beyond the destroy radius
//! - Marked dirty whenever its content changes, so a renderer knows what to rebuild

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use cgmath::{MetricSpace, Point3};
use log::{debug, info, trace, warn};

use super::block::block_side::BlockSide;
use super::block::block_type::BlockType;
use super::block::{Block, BlockAddress};
use super::chunk::{Chunk, ChunkOrigin, CHUNK_HEIGHT, CHUNK_WIDTH};
use super::generation::{self, Decoration, DecorationWriter, Generator};
use super::persistence::{MemoryStore, Persistence, PersistenceError};
use crate::engine_state::config::WorldConfig;
use crate::engine_state::geometry::Aabb;

#[derive(Debug)]
pub enum WorldError {
    /// A chunk origin that is not a multiple of the chunk dimensions.
    MisalignedOrigin(Point3<i32>),
    Persistence(PersistenceError),
}

impl fmt::Display for WorldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldError::MisalignedOrigin(p) => {
                write!(f, "Misaligned chunk origin: ({}, {}, {})", p.x, p.y, p.z)
            }
            WorldError::Persistence(e) => write!(f, "Persistence error: {}", e),
        }
    }
}

impl std::error::Error for WorldError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorldError::MisalignedOrigin(_) => None,
            WorldError::Persistence(e) => Some(e),
        }
    }
}

impl From<PersistenceError> for WorldError {
    fn from(e: PersistenceError) -> Self {
        WorldError::Persistence(e)
    }
}

/// Receives chunks as they are evicted, e.g. to free their GPU buffers.
pub trait ChunkListener {
    fn chunk_evicted(&mut self, chunk: &Chunk);
}

/// Represents a voxel world composed of multiple chunks.
pub struct World {
    config: WorldConfig,
    chunks: HashMap<ChunkOrigin, Chunk>,
    generator: Box<dyn Generator>,
    persistence: Box<dyn Persistence>,
    listener: Option<Box<dyn ChunkListener>>,
    /// Decoration writes aimed at chunks that did not exist yet, one per block.
    deferred: HashMap<ChunkOrigin, HashMap<BlockAddress, Decoration>>,
    dirty: HashSet<ChunkOrigin>,
    spawn_queue: VecDeque<ChunkOrigin>,
    queued: HashSet<ChunkOrigin>,
    next_serial: u64,
}

impl World {
    /// Creates a new, empty world.
    ///
    /// # Arguments
    /// * `config` - Radii, world id and spawn budget
    /// * `generator` - Fills chunks on first access
    /// * `persistence` - Source and sink of player edits
    pub fn new(
        config: WorldConfig,
        generator: Box<dyn Generator>,
        persistence: Box<dyn Persistence>,
    ) -> Self {
        World {
            config,
            chunks: HashMap::new(),
            generator,
            persistence,
            listener: None,
            deferred: HashMap::new(),
            dirty: HashSet::new(),
            spawn_queue: VecDeque::new(),
            queued: HashSet::new(),
            next_serial: 0,
        }
    }

    /// Creates a world using the configured generator and an in-memory store.
    pub fn from_config(config: WorldConfig) -> Self {
        let generator = generation::from_config(&config);
        Self::new(config, generator, Box::new(MemoryStore::new()))
    }

    pub fn set_listener(&mut self, listener: Box<dyn ChunkListener>) {
        self.listener = Some(listener);
    }

    /// Maps a world position to its chunk origin and local index.
    pub fn resolve(&self, p: Point3<f32>) -> BlockAddress {
        Self::resolve_cell(Point3::new(
            p.x.floor() as i32,
            p.y.floor() as i32,
            p.z.floor() as i32,
        ))
    }

    pub fn resolve_cell(cell: Point3<i32>) -> BlockAddress {
        ChunkOrigin::containing(cell).address_of(cell)
    }

    /// The block at `p`, spawning its chunk if needed.
    pub fn block(&mut self, p: Point3<f32>) -> &Block {
        let address = self.resolve(p);
        self.block_at(address)
    }

    pub fn block_mut(&mut self, p: Point3<f32>) -> &mut Block {
        let address = self.resolve(p);
        self.materialize(address.origin)
            .block_mut(address.i, address.j, address.k)
    }

    pub fn block_at(&mut self, address: BlockAddress) -> &Block {
        self.materialize(address.origin)
            .block(address.i, address.j, address.k)
    }

    /// Box of the block in `cell` if that block is active.
    ///
    /// This is the predicate rays are marched against.
    pub fn is_active(&mut self, cell: Point3<i32>) -> Option<Aabb> {
        let address = Self::resolve_cell(cell);
        self.block_at(address).active.then(|| address.aabb())
    }

    /// Spawns the chunk at `origin` unless it is already loaded.
    ///
    /// # Returns
    /// The chunk, or `WorldError::MisalignedOrigin` if `origin` is not a chunk origin.
    pub fn spawn_chunk(&mut self, origin: Point3<i32>) -> Result<&Chunk, WorldError> {
        let origin = ChunkOrigin::new(origin)?;
        Ok(self.materialize(origin))
    }

    pub fn chunk(&self, origin: ChunkOrigin) -> Option<&Chunk> {
        self.chunks.get(&origin)
    }

    pub fn is_loaded(&self, origin: ChunkOrigin) -> bool {
        self.chunks.contains_key(&origin)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Number of decoration writes waiting for the chunk at `origin` to spawn.
    pub fn deferred_writes(&self, origin: ChunkOrigin) -> usize {
        self.deferred.get(&origin).map_or(0, HashMap::len)
    }

    fn materialize(&mut self, origin: ChunkOrigin) -> &mut Chunk {
        let chunk = match self.chunks.remove(&origin) {
            Some(chunk) => chunk,
            None => {
                let chunk = self.build_chunk(origin);
                self.dirty.insert(origin);
                chunk
            }
        };
        self.chunks.entry(origin).or_insert(chunk)
    }

    fn build_chunk(&mut self, origin: ChunkOrigin) -> Chunk {
        let terrain = self.generator.terrain(origin);
        self.next_serial += 1;
        let mut chunk = Chunk::new(origin, &terrain, self.next_serial);

        if let Some(persisted) = self.persistence.lookup(self.config.world_id, origin) {
            chunk.set_storage_id(persisted.id);
            for row in persisted.overrides {
                let in_bounds = row.i < CHUNK_WIDTH as usize
                    && row.j < CHUNK_HEIGHT as usize
                    && row.k < CHUNK_WIDTH as usize;
                if !in_bounds {
                    warn!("Ignoring out of range override {:?} in {}", row, origin);
                    continue;
                }
                chunk
                    .block_mut(row.i, row.j, row.k)
                    .set(row.block_type, row.active);
            }
        }

        if let Some(writes) = self.deferred.remove(&origin) {
            trace!("Applying {} deferred decorations to {}", writes.len(), origin);
            for (address, decoration) in writes {
                decoration.apply(chunk.block_mut(address.i, address.j, address.k));
            }
        }

        let mut writer = DecorationWriter::new();
        self.generator.decorate(&chunk, &mut writer);
        for (cell, decoration) in writer.into_writes() {
            let address = Self::resolve_cell(cell);
            if address.origin == origin {
                decoration.apply(chunk.block_mut(address.i, address.j, address.k));
            } else if let Some(neighbor) = self.chunks.get_mut(&address.origin) {
                decoration.apply(neighbor.block_mut(address.i, address.j, address.k));
                self.dirty.insert(address.origin);
            } else {
                self.deferred
                    .entry(address.origin)
                    .or_default()
                    .insert(address, decoration);
            }
        }

        debug!("Spawned chunk {} (serial {})", origin, chunk.serial());
        chunk
    }

    /// Boxes of the active blocks face-adjacent to any of the occupied cells.
    ///
    /// # Arguments
    /// * `cells` - Points inside the occupied cells, typically block centers
    pub fn surrounding_boxes(&mut self, cells: &[Point3<f32>]) -> Vec<Aabb> {
        let occupied: Vec<Point3<i32>> = cells.iter().map(|p| self.resolve(*p).cell()).collect();
        let mut visited = Vec::new();
        let mut boxes = Vec::new();

        for cell in &occupied {
            for side in BlockSide::all() {
                let neighbor = *cell + side.offset();
                if occupied.contains(&neighbor) || visited.contains(&neighbor) {
                    continue;
                }
                visited.push(neighbor);
                if let Some(aabb) = self.is_active(neighbor) {
                    boxes.push(aabb);
                }
            }
        }

        boxes
    }

    /// Chunks within the visible radius of `center` that `cull` keeps.
    ///
    /// Chunks beyond the destroy radius are evicted first and handed to the
    /// chunk listener.
    pub fn collect_chunks<F>(&mut self, center: Point3<f32>, mut cull: F) -> Vec<&Chunk>
    where
        F: FnMut(&Chunk) -> bool,
    {
        let destroy_radius = self.config.destroy_radius;
        let evicted: Vec<ChunkOrigin> = self
            .chunks
            .keys()
            .filter(|origin| origin.center().distance(center) > destroy_radius)
            .copied()
            .collect();
        for origin in evicted {
            if let Some(chunk) = self.chunks.remove(&origin) {
                self.dirty.remove(&origin);
                debug!("Evicted chunk {} (serial {})", origin, chunk.serial());
                if let Some(listener) = self.listener.as_mut() {
                    listener.chunk_evicted(&chunk);
                }
            }
        }

        // Respawning the writing chunk emits its spills again.
        let pending = self.deferred.len();
        self.deferred
            .retain(|origin, _| origin.center().distance(center) <= destroy_radius);
        if self.deferred.len() < pending {
            debug!(
                "Dropped deferred decorations for {} far chunks",
                pending - self.deferred.len()
            );
        }

        let visible_radius = self.config.visible_radius;
        let mut visible: Vec<&Chunk> = self
            .chunks
            .values()
            .filter(|chunk| chunk.center().distance(center) <= visible_radius && !cull(chunk))
            .collect();
        visible.sort_by_key(|chunk| chunk.serial());
        visible
    }

    /// Highest active block in the column at `(x, z)` with `y` in `[0, CHUNK_HEIGHT)`.
    pub fn ground(&mut self, x: f32, z: f32) -> Option<BlockAddress> {
        let base = self.resolve(Point3::new(x, 0.0, z));
        let top = self.materialize(base.origin).column_top(base.i, base.k)?;
        Some(BlockAddress { j: top, ..base })
    }

    /// Queues the missing chunks of the square around `p` that are close enough to see.
    pub fn spawn_surroundings(&mut self, p: Point3<f32>) {
        let radius = self.config.spawn_radius;
        let start = self.resolve(p).origin.offset(-radius, -radius);
        for x in 0..radius * 2 {
            for z in 0..radius * 2 {
                let origin = start.offset(x, z);
                if self.chunks.contains_key(&origin) || self.queued.contains(&origin) {
                    continue;
                }
                if origin.center().distance(p) > self.config.visible_radius {
                    continue;
                }
                self.queued.insert(origin);
                self.spawn_queue.push_back(origin);
            }
        }
    }

    /// Spawns up to `spawns_per_tick` queued chunks.
    ///
    /// # Returns
    /// How many chunks were actually spawned.
    pub fn process_spawn_queue(&mut self) -> usize {
        self.spawn_queued(self.config.spawns_per_tick)
    }

    /// Spawns every queued chunk.
    pub fn drain_spawn_queue(&mut self) -> usize {
        self.spawn_queued(usize::MAX)
    }

    pub fn queued_chunks(&self) -> usize {
        self.spawn_queue.len()
    }

    fn spawn_queued(&mut self, budget: usize) -> usize {
        let mut spawned = 0;
        while spawned < budget {
            let Some(origin) = self.spawn_queue.pop_front() else {
                break;
            };
            self.queued.remove(&origin);
            if !self.chunks.contains_key(&origin) {
                self.materialize(origin);
                spawned += 1;
            }
        }
        spawned
    }

    /// Spawns the initial square of chunks around the world origin.
    pub fn init(&mut self) {
        let n = self.config.initial_chunks;
        let home = ChunkOrigin::containing(Point3::new(0, 0, 0));
        for x in -n / 2..n - n / 2 {
            for z in -n / 2..n - n / 2 {
                self.materialize(home.offset(x, z));
            }
        }
        info!("World initialized with {} chunks", self.chunks.len());
    }

    /// Deactivates the block at `p`.
    ///
    /// # Returns
    /// `false` when there was nothing breakable there.
    pub fn break_block(&mut self, p: Point3<f32>) -> Result<bool, WorldError> {
        let changed = self.edit(p, |block| {
            if !block.active || !block.block_type.is_breakable() {
                return false;
            }
            block.active = false;
            true
        })?;
        if changed {
            info!("Broke block at {:?}", self.resolve(p).cell());
        }
        Ok(changed)
    }

    /// Places an active block of `block_type` at `p` if the cell is empty.
    pub fn place_block(&mut self, p: Point3<f32>, block_type: BlockType) -> Result<bool, WorldError> {
        let changed = self.edit(p, |block| {
            if block.active || !block_type.is_solid() {
                return false;
            }
            block.set(block_type, true);
            true
        })?;
        if changed {
            info!("Placed {} at {:?}", block_type, self.resolve(p).cell());
        }
        Ok(changed)
    }

    /// Overwrites the block at `p` unconditionally.
    pub fn set_block(
        &mut self,
        p: Point3<f32>,
        block_type: BlockType,
        active: bool,
    ) -> Result<(), WorldError> {
        self.edit(p, |block| {
            block.set(block_type, active);
            true
        })?;
        Ok(())
    }

    /// Applies `change` to the block at `p`, then persists and marks it if it changed.
    ///
    /// An edit the store rejects is rolled back, so memory never holds an
    /// unsaved edit.
    fn edit<F>(&mut self, p: Point3<f32>, change: F) -> Result<bool, WorldError>
    where
        F: FnOnce(&mut Block) -> bool,
    {
        let address = self.resolve(p);
        let world_id = self.config.world_id;
        let chunk = self.materialize(address.origin);
        let block = chunk.block_mut(address.i, address.j, address.k);
        let before = *block;
        if !change(block) {
            return Ok(false);
        }
        let block = *block;
        let storage_id = chunk.storage_id();

        let saved = self
            .persistence
            .save_block(world_id, address.origin, storage_id, &block);
        match saved {
            Ok(id) => {
                if let Some(chunk) = self.chunks.get_mut(&address.origin) {
                    chunk.set_storage_id(id);
                }
                self.dirty.insert(address.origin);
                Ok(true)
            }
            Err(e) => {
                warn!("Reverting unsaved edit at {:?}: {}", address.cell(), e);
                if let Some(chunk) = self.chunks.get_mut(&address.origin) {
                    *chunk.block_mut(address.i, address.j, address.k) = before;
                }
                Err(e.into())
            }
        }
    }

    /// Origins of every chunk changed since the last call, in a stable order.
    pub fn take_dirty_chunks(&mut self) -> Vec<ChunkOrigin> {
        let mut dirty: Vec<ChunkOrigin> = self.dirty.drain().collect();
        dirty.sort_by_key(|origin| {
            let p = origin.point();
            (p.x, p.y, p.z)
        });
        dirty
    }
}
