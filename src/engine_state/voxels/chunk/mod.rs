//! # Chunk Module
//!
//! This module provides the `Chunk` struct: a dense 16x256x16 column of
//! blocks anchored at an integer origin that is a multiple of the chunk
//! dimensions on every axis.
//!
//! ## Memory Layout
//!
//! Blocks are stored densely in row-major order (x, then z, then y), so the
//! local index of a block maps to its slot without any lookup:
//! `i + CHUNK_WIDTH * (k + CHUNK_WIDTH * j)`.

use std::fmt;

use cgmath::{Point3, Vector3};

use super::block::block_type::BlockType;
use super::block::{Block, BlockAddress};
use super::world::WorldError;
use crate::engine_state::geometry::Aabb;

/// Width and depth of a chunk in blocks.
pub const CHUNK_WIDTH: i32 = 16;
/// Height of a chunk in blocks.
pub const CHUNK_HEIGHT: i32 = 256;
/// The number of blocks in a single horizontal plane of a chunk.
pub const CHUNK_PLANE_SIZE: usize = (CHUNK_WIDTH * CHUNK_WIDTH) as usize;
/// The total number of blocks in a chunk.
pub const CHUNK_SIZE: usize = CHUNK_PLANE_SIZE * CHUNK_HEIGHT as usize;

/// Slot of a local index inside the dense block storage.
#[inline]
pub fn local_index(i: usize, j: usize, k: usize) -> usize {
    i + CHUNK_WIDTH as usize * k + CHUNK_PLANE_SIZE * j
}

/// An integer chunk origin, aligned to the chunk dimensions by construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChunkOrigin(Point3<i32>);

impl ChunkOrigin {
    /// Validates that `point` is a chunk origin.
    ///
    /// # Returns
    /// `WorldError::MisalignedOrigin` when any coordinate is not a multiple of
    /// the chunk dimension on its axis.
    pub fn new(point: Point3<i32>) -> Result<Self, WorldError> {
        let aligned = point.x.rem_euclid(CHUNK_WIDTH) == 0
            && point.y.rem_euclid(CHUNK_HEIGHT) == 0
            && point.z.rem_euclid(CHUNK_WIDTH) == 0;
        if aligned {
            Ok(ChunkOrigin(point))
        } else {
            Err(WorldError::MisalignedOrigin(point))
        }
    }

    /// The origin of the chunk containing the integer cell `cell`.
    pub fn containing(cell: Point3<i32>) -> Self {
        ChunkOrigin(Point3::new(
            cell.x - cell.x.rem_euclid(CHUNK_WIDTH),
            cell.y - cell.y.rem_euclid(CHUNK_HEIGHT),
            cell.z - cell.z.rem_euclid(CHUNK_WIDTH),
        ))
    }

    pub fn point(&self) -> Point3<i32> {
        self.0
    }

    /// Origin of the chunk `dx, dz` chunks away horizontally.
    pub fn offset(&self, dx: i32, dz: i32) -> ChunkOrigin {
        ChunkOrigin(self.0 + Vector3::new(dx * CHUNK_WIDTH, 0, dz * CHUNK_WIDTH))
    }

    /// Center of the chunk volume in world space.
    pub fn center(&self) -> Point3<f32> {
        Point3::new(
            (self.0.x + CHUNK_WIDTH / 2) as f32,
            (self.0.y + CHUNK_HEIGHT / 2) as f32,
            (self.0.z + CHUNK_WIDTH / 2) as f32,
        )
    }

    /// Address of a cell known to lie inside this chunk.
    pub(crate) fn address_of(&self, cell: Point3<i32>) -> BlockAddress {
        BlockAddress {
            origin: *self,
            i: (cell.x - self.0.x) as usize,
            j: (cell.y - self.0.y) as usize,
            k: (cell.z - self.0.z) as usize,
        }
    }
}

impl fmt::Display for ChunkOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0.x, self.0.y, self.0.z)
    }
}

/// Dense block types produced by a generator for one chunk.
///
/// `BlockType::Air` marks an inactive cell.
#[derive(Clone, Debug)]
pub struct TerrainGrid {
    types: Vec<BlockType>,
}

impl TerrainGrid {
    /// A grid filled with air.
    pub fn new() -> Self {
        TerrainGrid {
            types: vec![BlockType::Air; CHUNK_SIZE],
        }
    }

    pub fn get(&self, i: usize, j: usize, k: usize) -> BlockType {
        self.types[local_index(i, j, k)]
    }

    pub fn set(&mut self, i: usize, j: usize, k: usize, block_type: BlockType) {
        self.types[local_index(i, j, k)] = block_type;
    }
}

impl Default for TerrainGrid {
    fn default() -> Self {
        Self::new()
    }
}

/// A materialized 16x256x16 column of blocks.
#[derive(Clone, Debug)]
pub struct Chunk {
    origin: ChunkOrigin,
    blocks: Vec<Block>,
    storage_id: Option<i64>,
    serial: u64,
}

impl Chunk {
    /// Builds a chunk from generated terrain.
    ///
    /// # Arguments
    /// * `origin` - Where the chunk is anchored
    /// * `terrain` - Block types for every local index
    /// * `serial` - Identity of this particular spawn, unique per world
    pub fn new(origin: ChunkOrigin, terrain: &TerrainGrid, serial: u64) -> Self {
        let mut blocks = Vec::with_capacity(CHUNK_SIZE);
        for j in 0..CHUNK_HEIGHT as usize {
            for k in 0..CHUNK_WIDTH as usize {
                for i in 0..CHUNK_WIDTH as usize {
                    blocks.push(Block::new(terrain.get(i, j, k), i, j, k));
                }
            }
        }

        Chunk {
            origin,
            blocks,
            storage_id: None,
            serial,
        }
    }

    pub fn origin(&self) -> ChunkOrigin {
        self.origin
    }

    /// Spawn serial. A chunk that is evicted and spawned again gets a new one.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Id of this chunk in the persistence store, once it has one.
    pub fn storage_id(&self) -> Option<i64> {
        self.storage_id
    }

    pub(crate) fn set_storage_id(&mut self, id: i64) {
        self.storage_id = Some(id);
    }

    pub fn block(&self, i: usize, j: usize, k: usize) -> &Block {
        &self.blocks[local_index(i, j, k)]
    }

    pub fn block_mut(&mut self, i: usize, j: usize, k: usize) -> &mut Block {
        &mut self.blocks[local_index(i, j, k)]
    }

    /// Local height of the highest active block in column `(i, k)`.
    pub fn column_top(&self, i: usize, k: usize) -> Option<usize> {
        (0..CHUNK_HEIGHT as usize)
            .rev()
            .find(|&j| self.block(i, j, k).active)
    }

    pub fn center(&self) -> Point3<f32> {
        self.origin.center()
    }

    /// Bounding box of the whole chunk volume.
    pub fn aabb(&self) -> Aabb {
        let min = self.origin.point();
        let min = Point3::new(min.x as f32, min.y as f32, min.z as f32);
        Aabb::new(
            min,
            min + Vector3::new(CHUNK_WIDTH as f32, CHUNK_HEIGHT as f32, CHUNK_WIDTH as f32),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_must_be_aligned() {
        assert!(ChunkOrigin::new(Point3::new(-16, 256, 32)).is_ok());
        assert!(matches!(
            ChunkOrigin::new(Point3::new(8, 0, 0)),
            Err(WorldError::MisalignedOrigin(_))
        ));
        assert!(ChunkOrigin::new(Point3::new(0, 16, 0)).is_err());
    }

    #[test]
    fn containing_rounds_toward_negative_infinity() {
        let origin = ChunkOrigin::containing(Point3::new(-1, -1, 15));
        assert_eq!(origin.point(), Point3::new(-16, -256, 0));
        let address = origin.address_of(Point3::new(-1, -1, 15));
        assert_eq!((address.i, address.j, address.k), (15, 255, 15));
        assert_eq!(address.cell(), Point3::new(-1, -1, 15));
    }

    #[test]
    fn chunk_follows_terrain_and_knows_local_indices() {
        let mut terrain = TerrainGrid::new();
        terrain.set(3, 40, 7, BlockType::Stone);
        terrain.set(3, 41, 7, BlockType::DirtGrass);
        let origin = ChunkOrigin::new(Point3::new(16, 0, -32)).unwrap();
        let chunk = Chunk::new(origin, &terrain, 1);

        assert_eq!(chunk.column_top(3, 7), Some(41));
        assert_eq!(chunk.column_top(0, 0), None);

        let block = chunk.block(3, 40, 7);
        assert_eq!(block.block_type, BlockType::Stone);
        assert_eq!(block.local(), (3, 40, 7));
        assert_eq!(chunk.center(), Point3::new(24.0, 128.0, -24.0));
    }
}
