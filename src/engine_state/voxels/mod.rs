//! # Voxel World
//!
//! This module contains the voxel storage of the engine: blocks, the chunks
//! that hold them, the generators that fill new chunks and the world that
//! addresses, spawns, edits and evicts them.
//!
//! ## Architecture
//!
//! * **Block**: block types, faces, and per-cell state
//! * **Chunk**: a dense 16x256x16 column of blocks at an aligned origin
//! * **Generation**: terrain and decoration passes for new chunks
//! * **Persistence**: per-block overrides that survive eviction
//! * **World**: the sparse chunk map and every spatial query on it
//!
//! ## Data Flow
//!
//! 1. World receives a request for a block
//! 2. World resolves the chunk origin and local index
//! 3. A missing chunk is generated, decorated and merged with stored edits
//! 4. Edits mark the chunk dirty and are written back to persistence

pub mod block;
pub mod chunk;
pub mod generation;
pub mod persistence;
pub mod world;
