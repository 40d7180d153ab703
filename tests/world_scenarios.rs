use std::cell::RefCell;
use std::rc::Rc;

use cgmath::Point3;
use web_time::Duration;

use voxel_physics::engine_state::config::{EngineConfig, GenerationMethod, WorldConfig};
use voxel_physics::engine_state::voxels::block::block_type::BlockType;
use voxel_physics::engine_state::voxels::block::Block;
use voxel_physics::engine_state::voxels::chunk::ChunkOrigin;
use voxel_physics::engine_state::voxels::generation::{FlatGenerator, PerlinGenerator};
use voxel_physics::engine_state::voxels::persistence::{
    MemoryStore, PersistedChunk, Persistence, PersistenceError,
};
use voxel_physics::engine_state::voxels::world::World;
use voxel_physics::{EngineState, PlayerAction};

/// A store that outlives the worlds using it.
#[derive(Clone, Default)]
struct SharedStore(Rc<RefCell<MemoryStore>>);

impl SharedStore {
    fn new() -> Self {
        SharedStore(Rc::new(RefCell::new(MemoryStore::new())))
    }
}

impl Persistence for SharedStore {
    fn lookup(&self, world_id: i64, origin: ChunkOrigin) -> Option<PersistedChunk> {
        self.0.borrow().lookup(world_id, origin)
    }

    fn save_block(
        &mut self,
        world_id: i64,
        origin: ChunkOrigin,
        storage_id: Option<i64>,
        block: &Block,
    ) -> Result<i64, PersistenceError> {
        self.0
            .borrow_mut()
            .save_block(world_id, origin, storage_id, block)
    }
}

fn flat_world(store: impl Persistence + 'static) -> World {
    World::new(
        WorldConfig::default(),
        Box::new(FlatGenerator::new(5, BlockType::Stone)),
        Box::new(store),
    )
}

#[test]
fn breaking_the_only_block_keeps_its_chunk() {
    let mut world = World::new(
        WorldConfig::default(),
        Box::new(FlatGenerator::blank().with_block(Point3::new(0, 0, 0), BlockType::Stone)),
        Box::new(MemoryStore::new()),
    );

    let p = Point3::new(0.5, 0.5, 0.5);
    assert!(world.block(p).active);
    let origin = world.resolve(p).origin;
    let serial = world.chunk(origin).unwrap().serial();

    assert!(world.break_block(p).unwrap());
    assert!(!world.break_block(p).unwrap());

    let block = world.block(p);
    assert!(!block.active);
    assert_eq!(block.block_type, BlockType::Stone);
    assert_eq!(world.chunk_count(), 1);
    assert_eq!(world.chunk(origin).unwrap().serial(), serial);
    assert_eq!(world.take_dirty_chunks(), vec![origin]);
}

#[test]
fn edits_are_merged_into_regenerated_chunks() {
    let store = SharedStore::new();
    {
        let mut world = flat_world(store.clone());
        assert!(world.place_block(Point3::new(3.5, 10.5, 3.5), BlockType::Sand).unwrap());
        assert!(world.break_block(Point3::new(1.5, 4.5, 1.5)).unwrap());
        assert!(world.place_block(Point3::new(-20.5, 7.5, 40.5), BlockType::Cactus).unwrap());
    }
    assert_eq!(store.0.borrow().chunk_count(), 2);

    let mut world = flat_world(store.clone());
    let placed = world.block(Point3::new(3.5, 10.5, 3.5));
    assert!(placed.active);
    assert_eq!(placed.block_type, BlockType::Sand);
    assert!(!world.block(Point3::new(1.5, 4.5, 1.5)).active);
    assert!(world.block(Point3::new(2.5, 4.5, 2.5)).active);
    assert_eq!(world.block(Point3::new(-20.5, 7.5, 40.5)).block_type, BlockType::Cactus);

    let json = store.0.borrow().to_json().unwrap();
    let restored = MemoryStore::from_json(&json).unwrap();
    let mut world = flat_world(restored);
    assert!(world.block(Point3::new(3.5, 10.5, 3.5)).active);
    assert!(!world.block(Point3::new(1.5, 4.5, 1.5)).active);
}

#[test]
fn perlin_terrain_is_deterministic_per_seed() {
    let make = || {
        World::new(
            WorldConfig::default(),
            Box::new(PerlinGenerator::new(7)),
            Box::new(MemoryStore::new()),
        )
    };
    let mut a = make();
    let mut b = make();
    for (x, z) in [(0.5, 0.5), (5.5, 11.5), (-3.5, -9.5)] {
        let ground_a = a.ground(x, z).map(|address| address.cell());
        let ground_b = b.ground(x, z).map(|address| address.cell());
        assert_eq!(ground_a, ground_b);
        let top = ground_a.unwrap();
        let p = Point3::new(top.x as f32 + 0.5, top.y as f32 + 0.5, top.z as f32 + 0.5);
        assert_eq!(a.block(p).block_type, b.block(p).block_type);
    }
}

#[test]
fn engine_walks_the_player_across_a_flat_world() {
    let config = EngineConfig {
        world: WorldConfig {
            generation: GenerationMethod::Flat,
            flat_height: 10,
            visible_radius: 200.0,
            spawn_radius: 1,
            initial_chunks: 2,
            ..WorldConfig::default()
        },
        ..EngineConfig::default()
    };
    let frame_time = Duration::from_secs_f64(1.0 / f64::from(config.tick_rate));
    let mut engine = EngineState::new(config).unwrap();

    for _ in 0..30 {
        engine.advance(frame_time).unwrap();
    }
    let start = engine.player_body().unwrap().position();

    engine.set_player_actions(PlayerAction {
        move_forward: true,
        ..PlayerAction::default()
    });
    for _ in 0..120 {
        engine.advance(frame_time).unwrap();
    }

    let body = engine.player_body().unwrap();
    assert!(body.grounded());
    assert!(body.position().x > start.x + 10.0, "x {}", body.position().x);
    assert!((body.shape().min.y - 10.0).abs() < 1e-3);
    assert_eq!(engine.steps(), 150);

    // Walking into the neighboring chunk queued and spawned more of the world.
    assert!(engine.world.chunk_count() > 4);
    let frame = engine.frame();
    assert!(!frame.visible.is_empty());
}
