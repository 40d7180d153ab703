//! # Persistence
//!
//! Player edits are stored as per-block overrides on top of generated
//! terrain. When a chunk is spawned, its overrides are applied to the fresh
//! terrain before decoration runs, so vegetation can grow back into cells a
//! player cleared. Block types are stored by their compact integer id.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::block::block_type::BlockType;
use super::block::{Block, BlockTypeSize};
use super::chunk::ChunkOrigin;

/// One stored block edit, addressed by local index inside its chunk.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockOverride {
    pub i: usize,
    pub j: usize,
    pub k: usize,
    #[serde(rename = "type", with = "block_id")]
    pub block_type: BlockType,
    pub active: bool,
}

/// Serializes a `BlockType` as its integer id.
mod block_id {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::{BlockType, BlockTypeSize};

    pub fn serialize<S: Serializer>(block_type: &BlockType, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(block_type.to_int())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BlockType, D::Error> {
        let id = BlockTypeSize::deserialize(deserializer)?;
        BlockType::from_int(id).map_err(de::Error::custom)
    }
}

impl From<&Block> for BlockOverride {
    fn from(block: &Block) -> Self {
        let (i, j, k) = block.local();
        BlockOverride {
            i,
            j,
            k,
            block_type: block.block_type,
            active: block.active,
        }
    }
}

/// Stored state of one chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct PersistedChunk {
    pub id: i64,
    pub overrides: Vec<BlockOverride>,
}

#[derive(Debug)]
pub enum PersistenceError {
    /// The store rejected or could not decode the data.
    Serialization(serde_json::Error),
    /// A stored row could not be written.
    Storage(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Serialization(e) => write!(f, "Serialization error: {}", e),
            PersistenceError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistenceError::Serialization(e) => Some(e),
            PersistenceError::Storage(_) => None,
        }
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        PersistenceError::Serialization(e)
    }
}

/// Storage for chunk overrides.
pub trait Persistence {
    /// Stored overrides of the chunk at `origin`, if the chunk was ever saved.
    fn lookup(&self, world_id: i64, origin: ChunkOrigin) -> Option<PersistedChunk>;

    /// Upserts a block edit.
    ///
    /// # Arguments
    /// * `storage_id` - The chunk's id from a previous save or lookup, if any
    ///
    /// # Returns
    /// The chunk's storage id, newly assigned when `storage_id` was `None`.
    fn save_block(
        &mut self,
        world_id: i64,
        origin: ChunkOrigin,
        storage_id: Option<i64>,
        block: &Block,
    ) -> Result<i64, PersistenceError>;
}

/// Serializable form of one stored chunk.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredChunk {
    world_id: i64,
    origin: [i32; 3],
    id: i64,
    blocks: Vec<BlockOverride>,
}

/// In-memory store, exportable as JSON.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ids: HashMap<(i64, [i32; 3]), i64>,
    chunks: BTreeMap<i64, StoredChunk>,
    next_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Number of chunks with at least one stored edit.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn to_json(&self) -> Result<String, PersistenceError> {
        let chunks: Vec<&StoredChunk> = self.chunks.values().collect();
        Ok(serde_json::to_string(&chunks)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        let chunks: Vec<StoredChunk> = serde_json::from_str(json)?;
        let mut store = MemoryStore::new();
        for chunk in chunks {
            if store.chunks.contains_key(&chunk.id) {
                return Err(PersistenceError::Storage(format!(
                    "duplicate chunk id {}",
                    chunk.id
                )));
            }
            store.next_id = store.next_id.max(chunk.id + 1);
            store.ids.insert((chunk.world_id, chunk.origin), chunk.id);
            store.chunks.insert(chunk.id, chunk);
        }
        Ok(store)
    }
}

fn key(origin: ChunkOrigin) -> [i32; 3] {
    let p = origin.point();
    [p.x, p.y, p.z]
}

impl Persistence for MemoryStore {
    fn lookup(&self, world_id: i64, origin: ChunkOrigin) -> Option<PersistedChunk> {
        let id = self.ids.get(&(world_id, key(origin)))?;
        let chunk = self.chunks.get(id)?;
        Some(PersistedChunk {
            id: *id,
            overrides: chunk.blocks.clone(),
        })
    }

    fn save_block(
        &mut self,
        world_id: i64,
        origin: ChunkOrigin,
        storage_id: Option<i64>,
        block: &Block,
    ) -> Result<i64, PersistenceError> {
        let id = match storage_id.or_else(|| self.ids.get(&(world_id, key(origin))).copied()) {
            Some(id) => id,
            None => {
                let id = self.next_id;
                self.next_id += 1;
                self.ids.insert((world_id, key(origin)), id);
                id
            }
        };

        let chunk = self.chunks.entry(id).or_insert_with(|| StoredChunk {
            world_id,
            origin: key(origin),
            id,
            blocks: Vec::new(),
        });
        let row = BlockOverride::from(block);
        match chunk
            .blocks
            .iter_mut()
            .find(|b| (b.i, b.j, b.k) == (row.i, row.j, row.k))
        {
            Some(existing) => *existing = row,
            None => chunk.blocks.push(row),
        }
        Ok(id)
    }
}
