//! # Block Module
//!
//! This module provides the core block-related functionality for the voxel engine.
//! It includes block type definitions, block face handling, and block data structures.

use block_type::BlockType;
use cgmath::{Point3, Vector3};

use crate::engine_state::geometry::Aabb;
use crate::engine_state::voxels::chunk::ChunkOrigin;

pub mod block_side;
pub mod block_type;

/// The underlying integer type used to represent block types in memory.
pub type BlockTypeSize = u8;

/// Represents a single voxel block in the world.
///
/// A block is stored inside its chunk and knows its local index there. The
/// chunk it belongs to is identified by key through a [`BlockAddress`], never
/// by an owning pointer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub block_type: BlockType,
    /// Inactive blocks are empty space for collision and targeting.
    pub active: bool,
    i: u8,
    j: u8,
    k: u8,
}

impl Block {
    /// Creates a block of the given type at a local index.
    ///
    /// The block is active whenever its type is solid.
    pub fn new(block_type: BlockType, i: usize, j: usize, k: usize) -> Self {
        Block {
            block_type,
            active: block_type.is_solid(),
            i: i as u8,
            j: j as u8,
            k: k as u8,
        }
    }

    /// The block's index inside its chunk.
    pub fn local(&self) -> (usize, usize, usize) {
        (self.i as usize, self.j as usize, self.k as usize)
    }

    /// Replaces the block type and activity in one go.
    pub fn set(&mut self, block_type: BlockType, active: bool) {
        self.block_type = block_type;
        self.active = active && block_type.is_solid();
    }
}

/// Where a world position lives: the chunk origin plus the local index.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockAddress {
    pub origin: ChunkOrigin,
    pub i: usize,
    pub j: usize,
    pub k: usize,
}

impl BlockAddress {
    /// The integer world cell this address names.
    pub fn cell(&self) -> Point3<i32> {
        self.origin.point() + Vector3::new(self.i as i32, self.j as i32, self.k as i32)
    }

    /// Unit box of the addressed cell.
    pub fn aabb(&self) -> Aabb {
        Aabb::unit(self.cell())
    }

    pub fn center(&self) -> Point3<f32> {
        self.aabb().center()
    }
}
