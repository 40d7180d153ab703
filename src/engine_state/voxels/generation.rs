//! # Terrain Generation
//!
//! Generators produce the initial content of a chunk in two passes:
//!
//! 1. `terrain` fills a dense grid for the chunk alone, deterministically
//!    from the seed and the origin.
//! 2. `decorate` sees the finished chunk and emits writes through a
//!    [`DecorationWriter`]. Writes may land outside the chunk (a tree near
//!    the edge spills its leaves into the neighbour); the world applies or
//!    defers them.
//!
//! ## Key Components
//!
//! * `PerlinGenerator` - biomes, heights, caves and trees from fractal noise
//! * `FlatGenerator` - a flat slab plus hand-placed blocks, used by tests and demos
//! * `EmptyGenerator` - nothing but air

use std::collections::HashMap;

use cgmath::{InnerSpace, Point3, Vector3};
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use super::block::block_type::BlockType;
use super::block::Block;
use super::chunk::{Chunk, ChunkOrigin, TerrainGrid, CHUNK_HEIGHT, CHUNK_WIDTH};
use crate::engine_state::config::{GenerationMethod, WorldConfig};

/// Source of chunk content.
pub trait Generator {
    /// Block types for the chunk at `origin`. Must be deterministic.
    fn terrain(&self, origin: ChunkOrigin) -> TerrainGrid;

    /// Emits decoration writes for a freshly built chunk.
    fn decorate(&self, _chunk: &Chunk, _writer: &mut DecorationWriter) {}
}

/// A single decoration write.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Decoration {
    /// Overwrites the cell with an active block of this type.
    Replace(BlockType),
    /// Places an active block of this type only if the cell is empty.
    FillEmpty(BlockType),
}

impl Decoration {
    pub fn apply(self, block: &mut Block) {
        match self {
            Decoration::Replace(block_type) => block.set(block_type, true),
            Decoration::FillEmpty(block_type) => {
                if !block.active {
                    block.set(block_type, true);
                }
            }
        }
    }
}

/// Collects the writes a generator wants to make while decorating a chunk.
#[derive(Debug, Default)]
pub struct DecorationWriter {
    writes: Vec<(Point3<i32>, Decoration)>,
}

impl DecorationWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, cell: Point3<i32>, block_type: BlockType) {
        self.writes.push((cell, Decoration::Replace(block_type)));
    }

    pub fn fill_empty(&mut self, cell: Point3<i32>, block_type: BlockType) {
        self.writes.push((cell, Decoration::FillEmpty(block_type)));
    }

    pub(crate) fn into_writes(self) -> Vec<(Point3<i32>, Decoration)> {
        self.writes
    }
}

/// Builds the generator selected by the world configuration.
pub fn from_config(config: &WorldConfig) -> Box<dyn Generator> {
    match config.generation {
        GenerationMethod::Perlin => Box::new(PerlinGenerator::new(config.seed)),
        GenerationMethod::Flat => Box::new(FlatGenerator::new(config.flat_height, BlockType::DirtGrass)),
        GenerationMethod::Empty => Box::new(EmptyGenerator),
    }
}

/// Generates nothing but air.
#[derive(Copy, Clone, Debug, Default)]
pub struct EmptyGenerator;

impl Generator for EmptyGenerator {
    fn terrain(&self, _origin: ChunkOrigin) -> TerrainGrid {
        TerrainGrid::new()
    }
}

/// A flat slab filling every cell with world `y < height`, plus individual blocks.
#[derive(Clone, Debug)]
pub struct FlatGenerator {
    height: i32,
    block_type: BlockType,
    blocks: HashMap<Point3<i32>, BlockType>,
}

impl FlatGenerator {
    pub fn new(height: i32, block_type: BlockType) -> Self {
        FlatGenerator {
            height,
            block_type,
            blocks: HashMap::new(),
        }
    }

    /// A world without a slab.
    pub fn blank() -> Self {
        Self::new(i32::MIN, BlockType::Air)
    }

    /// Adds a single block at a world cell.
    pub fn with_block(mut self, cell: Point3<i32>, block_type: BlockType) -> Self {
        self.blocks.insert(cell, block_type);
        self
    }
}

impl Generator for FlatGenerator {
    fn terrain(&self, origin: ChunkOrigin) -> TerrainGrid {
        let mut terrain = TerrainGrid::new();
        let base = origin.point();

        let filled = self.height.saturating_sub(base.y).clamp(0, CHUNK_HEIGHT) as usize;
        for j in 0..filled {
            for k in 0..CHUNK_WIDTH as usize {
                for i in 0..CHUNK_WIDTH as usize {
                    terrain.set(i, j, k, self.block_type);
                }
            }
        }

        for (cell, block_type) in &self.blocks {
            if ChunkOrigin::containing(*cell) == origin {
                let address = origin.address_of(*cell);
                terrain.set(address.i, address.j, address.k, *block_type);
            }
        }

        terrain
    }
}

/// Maximum terrain height in blocks.
const TERRAIN_HEIGHT: f64 = 170.0;
/// Normalized cave noise above which a cell is carved out.
const CAVE_THRESHOLD: f64 = 0.725;
/// World height below which everything is stone.
const STONE_FLOOR: f64 = 0.25;
/// Snow caps cold biomes above this height.
const SNOW_LINE: f64 = 70.0;
/// Normalized tree distribution above which a column grows a tree.
const TREE_PROBABILITY: f64 = 0.65;
const TRUNK_HEIGHT: i32 = 7;
const LEAVES_WIDTH: i32 = 6;
const LEAVES_HEIGHT: i32 = 5;

/// Maps raw noise in roughly `[-1, 1]` to `[0, 1]`.
fn normalize(n: f64) -> f64 {
    ((n + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Sigmoid centered at 0.5 that maps `[0, 1]` onto `[0, 1]`.
fn normsigmoid(t: f64) -> f64 {
    (4.0 * t - 2.0).tanh() / 2.0 + 0.5
}

/// Noise-driven terrain with biomes, caves and trees.
pub struct PerlinGenerator {
    biome: Perlin,
    flat: Fbm<Perlin>,
    mountains: Fbm<Perlin>,
    caves: Fbm<Perlin>,
    trees: Perlin,
    fallout: Perlin,
}

impl PerlinGenerator {
    pub fn new(seed: i64) -> Self {
        let seed = seed as u32;
        PerlinGenerator {
            biome: Perlin::new(seed),
            flat: Fbm::<Perlin>::new(seed.wrapping_add(1))
                .set_octaves(4)
                .set_frequency(0.001)
                .set_persistence(0.7)
                .set_lacunarity(2.0),
            mountains: Fbm::<Perlin>::new(seed.wrapping_add(2))
                .set_octaves(8)
                .set_frequency(0.01),
            caves: Fbm::<Perlin>::new(seed.wrapping_add(3))
                .set_octaves(5)
                .set_frequency(0.1)
                .set_persistence(0.7),
            trees: Perlin::new(seed.wrapping_add(4)),
            fallout: Perlin::new(seed.wrapping_add(5)),
        }
    }

    /// Biome value in `[0, 1]` for a chunk. Low values are deserts.
    pub fn biome(&self, origin: ChunkOrigin) -> f64 {
        let p = origin.point();
        normsigmoid(normalize(
            self.biome.get([p.x as f64 * 0.0005, p.z as f64 * 0.0005]),
        ))
    }

    /// Terrain height of the world column `(x, z)` in a chunk of the given biome.
    pub fn height(&self, biome: f64, x: i32, z: i32) -> f64 {
        let point = [x as f64, z as f64];
        let flat = normalize(self.flat.get(point)) * TERRAIN_HEIGHT;
        let mountains = normalize(self.mountains.get(point)) * TERRAIN_HEIGHT;
        flat + normsigmoid(biome) * (mountains - flat)
    }

    fn is_cave(&self, cell: Point3<i32>) -> bool {
        normalize(self.caves.get([cell.x as f64, cell.y as f64, cell.z as f64])) > CAVE_THRESHOLD
    }

    fn surface_type(biome: f64, exposed: bool) -> BlockType {
        if biome <= 0.4 {
            BlockType::Sand
        } else if biome < 0.7 {
            if exposed {
                BlockType::DirtGrass
            } else {
                BlockType::Dirt
            }
        } else {
            BlockType::DirtWetGrass
        }
    }

    fn trunk_type(biome: f64, probability: f64) -> BlockType {
        if biome < 0.4 {
            return BlockType::Cactus;
        }
        // Wood variant is picked from the tree's own probability so it stays deterministic.
        let mut rng = fastrand::Rng::with_seed(probability.to_bits());
        match rng.u8(0..3) {
            0 => BlockType::DarkWood,
            1 => BlockType::WhiteWood,
            _ => BlockType::Wood,
        }
    }
}

impl Generator for PerlinGenerator {
    fn terrain(&self, origin: ChunkOrigin) -> TerrainGrid {
        let mut terrain = TerrainGrid::new();
        let base = origin.point();
        let biome = self.biome(origin);

        for k in 0..CHUNK_WIDTH as usize {
            for i in 0..CHUNK_WIDTH as usize {
                let x = base.x + i as i32;
                let z = base.z + k as i32;
                let height = self.height(biome, x, z);

                for j in (0..CHUNK_HEIGHT as usize).rev() {
                    let y = (base.y + j as i32) as f64;
                    if y > height || self.is_cave(Point3::new(x, y as i32, z)) {
                        continue;
                    }

                    let block_type = if y < STONE_FLOOR {
                        BlockType::Stone
                    } else if y > SNOW_LINE && biome >= 0.6 {
                        BlockType::DirtSnow
                    } else {
                        let covered = |depth: usize| {
                            j + depth < CHUNK_HEIGHT as usize
                                && terrain.get(i, j + depth, k).is_solid()
                        };
                        if (1..4).all(covered) {
                            BlockType::Stone
                        } else {
                            Self::surface_type(biome, !covered(1))
                        }
                    };
                    terrain.set(i, j, k, block_type);
                }
            }
        }

        terrain
    }

    fn decorate(&self, chunk: &Chunk, writer: &mut DecorationWriter) {
        let origin = chunk.origin();
        let base = origin.point();
        let biome = self.biome(origin);
        let leaves_center = Vector3::new(2.5, 0.0, 2.5);

        for k in 0..CHUNK_WIDTH as usize {
            for i in 0..CHUNK_WIDTH as usize {
                let x = base.x + i as i32;
                let z = base.z + k as i32;
                let probability = normalize(self.trees.get([x as f64 * 0.5, z as f64 * 0.5]));
                if probability <= TREE_PROBABILITY {
                    continue;
                }
                let Some(top) = chunk.column_top(i, k) else {
                    continue;
                };

                let ground = Point3::new(x, base.y + top as i32, z);
                let trunk = Self::trunk_type(biome, probability);
                for h in 1..TRUNK_HEIGHT {
                    writer.replace(ground + Vector3::new(0, h, 0), trunk);
                }

                if biome <= 0.4 {
                    continue;
                }

                let corner = ground + Vector3::new(-3, TRUNK_HEIGHT - 2, -3);
                for ly in 0..LEAVES_HEIGHT {
                    for lz in 0..LEAVES_WIDTH {
                        for lx in 0..LEAVES_WIDTH {
                            let local = Vector3::new(lx as f32, ly as f32, lz as f32);
                            let factor = (1.0 - (local - leaves_center).magnitude() / 2.5).max(0.0);
                            let cell = corner + Vector3::new(lx, ly, lz);
                            let noise = normalize(self.fallout.get([
                                cell.x as f64 * 0.55,
                                cell.y as f64 * 0.55,
                                cell.z as f64 * 0.55,
                            ]));
                            if noise * factor as f64 >= 0.05 {
                                writer.fill_empty(cell, BlockType::Leaves);
                            }
                        }
                    }
                }
            }
        }
    }
}
