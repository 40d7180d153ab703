//! # Block Type Module
//!
//! This module defines the different types of blocks in the voxel world.
//! It provides conversion from the compact integer form used by stored
//! overrides and lookup by the kebab-case names used in configuration files.

use std::{fmt, str::FromStr};

use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

use super::BlockTypeSize;

/// Enumerates all possible block types in the voxel world.
///
/// The `FromPrimitive` derive allows conversion from integers, which is
/// how block overrides are stored.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, FromPrimitive, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    /// Empty space. A block of this type is never active.
    Air,
    /// Unbreakable floor of the world.
    Bedrock,
    Stone,
    Dirt,
    /// Dirt with a grass top, the common surface block.
    DirtGrass,
    /// Dirt with a snow top, found on high ground in cold biomes.
    DirtSnow,
    DirtWetGrass,
    Sand,
    Wood,
    DarkWood,
    WhiteWood,
    Cactus,
    Leaves,
}

/// Lookup from configuration names to block types.
static BLOCK_NAMES: phf::Map<&'static str, BlockType> = phf::phf_map! {
    "air" => BlockType::Air,
    "bedrock" => BlockType::Bedrock,
    "stone" => BlockType::Stone,
    "dirt" => BlockType::Dirt,
    "dirt-grass" => BlockType::DirtGrass,
    "dirt-snow" => BlockType::DirtSnow,
    "dirt-wet-grass" => BlockType::DirtWetGrass,
    "sand" => BlockType::Sand,
    "wood" => BlockType::Wood,
    "dark-wood" => BlockType::DarkWood,
    "white-wood" => BlockType::WhiteWood,
    "cactus" => BlockType::Cactus,
    "leaves" => BlockType::Leaves,
};

/// Error returned when a block type name or id is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBlockType(pub String);

impl fmt::Display for UnknownBlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown block type: {}", self.0)
    }
}

impl std::error::Error for UnknownBlockType {}

impl BlockType {
    /// Converts a `BlockTypeSize` to a `BlockType`.
    ///
    /// # Arguments
    /// * `btype` - The block type as a `BlockTypeSize`
    ///
    /// # Returns
    /// The corresponding `BlockType`, or an error for ids outside the enum.
    pub fn from_int(btype: BlockTypeSize) -> Result<Self, UnknownBlockType> {
        num::FromPrimitive::from_u8(btype).ok_or_else(|| UnknownBlockType(btype.to_string()))
    }

    /// The compact id of this block type.
    pub fn to_int(self) -> BlockTypeSize {
        self as BlockTypeSize
    }

    /// Whether a block of this type can be active at all.
    pub fn is_solid(self) -> bool {
        self != BlockType::Air
    }

    /// Whether the player is allowed to remove this block.
    pub fn is_breakable(self) -> bool {
        !matches!(self, BlockType::Air | BlockType::Bedrock)
    }

    /// The kebab-case name of this block type.
    pub fn name(self) -> &'static str {
        BLOCK_NAMES
            .entries()
            .find(|(_, block_type)| **block_type == self)
            .map(|(name, _)| *name)
            .unwrap_or("air")
    }
}

impl FromStr for BlockType {
    type Err = UnknownBlockType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BLOCK_NAMES
            .get(s)
            .copied()
            .ok_or_else(|| UnknownBlockType(s.to_string()))
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
