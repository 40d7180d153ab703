//! # Physics Engine
//!
//! Fixed-step rigid-body simulation of boxes against the voxel world and
//! against each other.
//!
//! ## Tick
//!
//! A tick runs in two passes over the registered bodies, in registration
//! order:
//!
//! 1. **Setup**: every body records the boxes of the cells it occupies.
//! 2. **Update**: every body integrates gravity and accumulated force, guards
//!    against tunneling, and resolves ground, ceiling, wall and body contacts.
//!
//! Contacts are resolved by translating the body out of the collider and by
//! impulses that become forces for the next tick.
//!
//! ## Key Components
//!
//! * `PhysicsEngine` - owns the bodies and runs ticks
//! * `RigidBody` / `RigidBodyBuilder` - body state and its validated construction
//! * `ColliderClassifier` - decides what a nearby block is to a body
//! * `BodyObserver` - hears about bodies that opted in after each update

use std::collections::BTreeMap;
use std::fmt;

use cgmath::{InnerSpace, Point3, Vector3, Zero};
use log::{debug, trace};
use web_time::Duration;

use crate::engine_state::config::PhysicsConfig;
use crate::engine_state::geometry::{Axis, Ray};
use crate::engine_state::voxels::world::World;

pub mod collider;
pub mod impulse;
pub mod rigid_body;

pub use collider::{CenterHeuristic, ColliderClassifier, ColliderKind};
pub use rigid_body::{RigidBody, RigidBodyBuilder};

#[derive(Debug, Clone, PartialEq)]
pub enum PhysicsError {
    InvalidMass(f32),
    InvalidDimensions { width: f32, height: f32 },
}

impl fmt::Display for PhysicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicsError::InvalidMass(m) => write!(f, "Invalid mass: {}", m),
            PhysicsError::InvalidDimensions { width, height } => {
                write!(f, "Invalid dimensions: {} x {}", width, height)
            }
        }
    }
}

impl std::error::Error for PhysicsError {}

/// Identifies a registered body. Handles are never reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(u32);

/// Notified after each update of a body registered with `notify`.
pub trait BodyObserver {
    fn body_updated(&mut self, handle: BodyHandle, body: &RigidBody);
}

/// Observer that ignores every notification.
pub struct NoObserver;

impl BodyObserver for NoObserver {
    fn body_updated(&mut self, _handle: BodyHandle, _body: &RigidBody) {}
}

pub struct PhysicsEngine {
    config: PhysicsConfig,
    bodies: BTreeMap<BodyHandle, RigidBody>,
    next_handle: u32,
    classifier: Box<dyn ColliderClassifier>,
}

impl PhysicsEngine {
    pub fn new(config: PhysicsConfig) -> Self {
        Self::with_classifier(config, Box::new(CenterHeuristic))
    }

    pub fn with_classifier(config: PhysicsConfig, classifier: Box<dyn ColliderClassifier>) -> Self {
        PhysicsEngine {
            config,
            bodies: BTreeMap::new(),
            next_handle: 0,
            classifier,
        }
    }

    pub fn register(&mut self, body: RigidBody) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        trace!("Registered body {} as {:?}", body.name, handle);
        self.bodies.insert(handle, body);
        handle
    }

    pub fn unregister(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        self.bodies.remove(&handle)
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(&handle)
    }

    /// Mutable access for the between-tick controls.
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(&handle)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Advances every body by `delta`.
    pub fn tick(&mut self, world: &mut World, delta: Duration) {
        self.tick_with_observer(world, delta, &mut NoObserver);
    }

    /// Advances every body by `delta`, reporting opted-in bodies to `observer`.
    pub fn tick_with_observer(
        &mut self,
        world: &mut World,
        delta: Duration,
        observer: &mut dyn BodyObserver,
    ) {
        let dt = delta.as_secs_f32();
        if dt <= 0.0 {
            return;
        }

        for body in self.bodies.values_mut() {
            Self::setup(body, world);
        }

        let handles: Vec<BodyHandle> = self.bodies.keys().copied().collect();
        for handle in handles {
            let Some(mut body) = self.bodies.remove(&handle) else {
                continue;
            };
            self.update(&mut body, world, dt);
            if body.notify {
                observer.body_updated(handle, &body);
            }
            self.bodies.insert(handle, body);
        }
    }

    fn setup(body: &mut RigidBody, world: &mut World) {
        body.world_blocks = (0..body.rows())
            .map(|row| {
                let address = world.resolve(body.position - Vector3::new(0.0, row as f32, 0.0));
                world.block_at(address);
                address.aabb()
            })
            .collect();
    }

    /// Integrates one body. The body is not in `self.bodies` while this runs.
    fn update(&mut self, body: &mut RigidBody, world: &mut World, dt: f32) {
        let config = &self.config;

        if !body.flying {
            body.force.y += body.mass * -config.gravity;
        }
        let acceleration = body.force / body.mass;
        body.velocity += acceleration * dt;
        if body.flying {
            body.velocity *= config.flying_multiplier;
        }

        let old_position = body.position;
        body.translate(body.velocity * dt);
        body.force = Vector3::zero();

        let mut colliders = Vec::new();
        let movement = body.position - old_position;
        let distance = movement.magnitude();
        if distance >= config.tunneling_threshold {
            let direction = movement / distance;
            let ray = Ray::new(old_position, direction, distance);
            if let Some(hit) = ray.march(|cell| world.is_active(cell)) {
                debug!(
                    "Body {} would tunnel through {:?}, clamping at {:?}",
                    body.name, hit.cell, hit.point
                );
                body.set_position(hit.point - direction * config.tunneling_backoff);
                colliders.push(hit.aabb);
            }
        }

        let occupied: Vec<Point3<f32>> = body.world_blocks.iter().map(|b| b.center()).collect();
        colliders.extend(world.surrounding_boxes(&occupied));

        let mut ground_depth: Option<f32> = None;
        for collider in &colliders {
            match self.classifier.classify(collider, &body.world_blocks) {
                ColliderKind::Ground => {
                    if let Some(depth) = collider.intersection(&body.shape, Axis::Y) {
                        ground_depth = Some(ground_depth.map_or(depth, |d| d.max(depth)));
                    }
                }
                ColliderKind::Ceiling => {
                    if let Some(depth) = collider.intersection(&body.shape, Axis::Y) {
                        body.velocity.y = 0.0;
                        body.translate(Vector3::new(0.0, -depth, 0.0));
                    }
                }
                ColliderKind::Wall => {
                    if let Some(contact) = body.shape.intersection_xz(collider) {
                        if !body.static_impulses_disabled {
                            impulse::apply_static_impulse(
                                body,
                                contact.face.normal(),
                                dt,
                                config.wall_restitution,
                            );
                        }
                        body.translate(-contact.penetration);
                    }
                }
                ColliderKind::Unrelated => {}
            }
        }

        match ground_depth {
            Some(depth) => {
                body.grounded = true;
                if body.static_impulses_disabled {
                    body.velocity.y = 0.0;
                } else {
                    impulse::apply_static_impulse(
                        body,
                        Vector3::unit_y(),
                        dt,
                        config.ground_restitution,
                    );
                    impulse::apply_ground_friction(body, config.ground_friction);
                }
                body.translate(Vector3::new(0.0, depth, 0.0));
            }
            None => body.grounded = false,
        }

        let levels: Vec<f32> = body.world_blocks.iter().map(|b| b.center().y).collect();
        for other in self.bodies.values_mut() {
            let shares_level = other
                .world_blocks
                .iter()
                .any(|b| levels.contains(&b.center().y));
            if !shares_level {
                continue;
            }
            if let Some(contact) = body.shape.intersection_xz(&other.shape) {
                trace!("Body {} pushes off {}", body.name, other.name);
                impulse::apply_dynamic_impulse(
                    body,
                    other,
                    contact.face.normal(),
                    dt,
                    config.dynamic_restitution,
                );
                body.translate(-contact.penetration);
            }
        }

        let moved = (body.position - old_position).magnitude();
        body.trip_distance += moved;
        if moved == 0.0 {
            body.trip_distance = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::config::WorldConfig;
    use crate::engine_state::geometry::Aabb;
    use crate::engine_state::voxels::block::block_type::BlockType;
    use crate::engine_state::voxels::generation::{EmptyGenerator, FlatGenerator, Generator};
    use crate::engine_state::voxels::persistence::MemoryStore;

    fn world_with(generator: impl Generator + 'static) -> World {
        World::new(
            WorldConfig::default(),
            Box::new(generator),
            Box::new(MemoryStore::new()),
        )
    }

    fn sixtieth() -> Duration {
        Duration::from_secs_f32(1.0 / 60.0)
    }

    #[test]
    fn body_comes_to_rest_on_a_single_block() {
        let mut world = world_with(
            FlatGenerator::blank().with_block(Point3::new(0, 0, 0), BlockType::Stone),
        );
        let mut engine = PhysicsEngine::new(PhysicsConfig::default());
        let handle = engine.register(
            RigidBody::builder("crate")
                .position(Point3::new(0.5, 5.0, 0.5))
                .dimensions(0.5, 1.5)
                .mass(80.0)
                .build()
                .unwrap(),
        );

        for _ in 0..400 {
            engine.tick(&mut world, sixtieth());
        }

        let body = engine.body(handle).unwrap();
        assert!(body.grounded());
        assert!((body.shape().min.y - 1.0).abs() < 1e-3, "min y {}", body.shape().min.y);
        assert!(body.velocity().y.abs() < 0.5);
    }

    #[test]
    fn player_style_body_stops_dead_on_the_ground() {
        let mut world = world_with(FlatGenerator::new(1, BlockType::Stone));
        let mut engine = PhysicsEngine::new(PhysicsConfig::default());
        let handle = engine.register(
            RigidBody::builder("player")
                .position(Point3::new(0.5, 3.0, 0.5))
                .dimensions(0.5, 1.5)
                .mass(80.0)
                .static_impulses_disabled(true)
                .build()
                .unwrap(),
        );

        let mut landed_after = None;
        for tick in 0..120 {
            engine.tick(&mut world, sixtieth());
            if landed_after.is_none() && engine.body(handle).unwrap().grounded() {
                landed_after = Some(tick);
            }
        }

        assert!(landed_after.is_some());
        let body = engine.body(handle).unwrap();
        assert!(body.grounded());
        assert_eq!(body.velocity().y, 0.0);
        assert!((body.shape().min.y - 1.0).abs() < 1e-3);
    }

    /// Treats every nearby block as unrelated to the body.
    struct Ghost;

    impl ColliderClassifier for Ghost {
        fn classify(&self, _collider: &Aabb, _occupied: &[Aabb]) -> ColliderKind {
            ColliderKind::Unrelated
        }
    }

    #[test]
    fn classifier_decides_what_stops_a_body() {
        let drop_player = |mut engine: PhysicsEngine| {
            let mut world = world_with(FlatGenerator::new(1, BlockType::Stone));
            let handle = engine.register(
                RigidBody::builder("player")
                    .position(Point3::new(0.5, 3.0, 0.5))
                    .dimensions(0.5, 1.5)
                    .mass(80.0)
                    .static_impulses_disabled(true)
                    .build()
                    .unwrap(),
            );
            for _ in 0..40 {
                engine.tick(&mut world, sixtieth());
            }
            engine.unregister(handle).unwrap()
        };

        let standing = drop_player(PhysicsEngine::new(PhysicsConfig::default()));
        assert!(standing.grounded());
        assert!((standing.shape().min.y - 1.0).abs() < 1e-3);

        let falling = drop_player(PhysicsEngine::with_classifier(
            PhysicsConfig::default(),
            Box::new(Ghost),
        ));
        assert!(!falling.grounded());
        assert!(falling.shape().min.y < 0.0, "min y {}", falling.shape().min.y);
    }

    #[test]
    fn fast_body_is_clamped_before_the_floor() {
        let mut world = world_with(FlatGenerator::new(1, BlockType::Stone));
        let mut engine = PhysicsEngine::new(PhysicsConfig::default());
        let handle = engine.register(
            RigidBody::builder("bullet")
                .position(Point3::new(0.5, 10.0, 0.5))
                .velocity(Vector3::new(0.0, -600.0, 0.0))
                .dimensions(0.5, 1.5)
                .mass(80.0)
                .static_impulses_disabled(true)
                .build()
                .unwrap(),
        );

        engine.tick(&mut world, sixtieth());
        let body = engine.body(handle).unwrap();
        assert!(body.grounded());
        assert!(body.shape().max.y > 1.0);

        for _ in 0..5 {
            engine.tick(&mut world, sixtieth());
        }
        let body = engine.body(handle).unwrap();
        assert!(body.grounded());
        assert!((body.shape().min.y - 1.0).abs() < 1e-3);
    }

    #[test]
    fn walls_stop_horizontal_motion() {
        let mut world = world_with(
            FlatGenerator::new(1, BlockType::Stone)
                .with_block(Point3::new(2, 1, 0), BlockType::Stone)
                .with_block(Point3::new(2, 2, 0), BlockType::Stone),
        );
        let mut engine = PhysicsEngine::new(PhysicsConfig::default());
        let handle = engine.register(
            RigidBody::builder("walker")
                .position(Point3::new(0.5, 2.5, 0.5))
                .dimensions(0.5, 1.5)
                .mass(80.0)
                .static_impulses_disabled(true)
                .build()
                .unwrap(),
        );

        for _ in 0..120 {
            if let Some(body) = engine.body_mut(handle) {
                body.move_body(Vector3::new(3.0, 0.0, 0.0), false);
            }
            engine.tick(&mut world, sixtieth());
        }

        let body = engine.body(handle).unwrap();
        assert!(body.shape().max.x <= 2.0 + 1e-3, "max x {}", body.shape().max.x);
        assert!(body.shape().max.x > 1.9);
    }

    #[test]
    fn head_on_collision_exchanges_velocities() {
        let mut world = world_with(EmptyGenerator);
        let config = PhysicsConfig {
            dynamic_restitution: 1.0,
            ..PhysicsConfig::default()
        };
        let mut engine = PhysicsEngine::new(config);
        let make = |name: &str, x: f32, vx: f32| {
            RigidBody::builder(name)
                .position(Point3::new(x, 10.5, 0.5))
                .velocity(Vector3::new(vx, 0.0, 0.0))
                .dimensions(1.0, 1.0)
                .mass(80.0)
                .build()
                .unwrap()
        };
        let left = engine.register(make("left", 0.5, 4.0));
        let right = engine.register(make("right", 1.53125, -4.0));

        let dt = Duration::from_secs_f32(1.0 / 64.0);
        for _ in 0..4 {
            engine.tick(&mut world, dt);
        }

        let left = engine.body(left).unwrap().velocity();
        let right = engine.body(right).unwrap().velocity();
        assert!((left.x + 4.0).abs() < 0.15, "left vx {}", left.x);
        assert!((right.x - 4.0).abs() < 0.15, "right vx {}", right.x);
        assert_eq!(left.z, 0.0);
    }

    #[derive(Default)]
    struct Recorder(Vec<(BodyHandle, f32)>);

    impl BodyObserver for Recorder {
        fn body_updated(&mut self, handle: BodyHandle, body: &RigidBody) {
            self.0.push((handle, body.trip_distance()));
        }
    }

    #[test]
    fn only_opted_in_bodies_are_observed() {
        let mut world = world_with(FlatGenerator::new(1, BlockType::Stone));
        let mut engine = PhysicsEngine::new(PhysicsConfig::default());
        let watched = engine.register(
            RigidBody::builder("watched")
                .position(Point3::new(0.5, 2.5, 0.5))
                .dimensions(0.5, 1.5)
                .static_impulses_disabled(true)
                .notify(true)
                .build()
                .unwrap(),
        );
        engine.register(
            RigidBody::builder("quiet")
                .position(Point3::new(8.5, 2.5, 8.5))
                .build()
                .unwrap(),
        );

        let mut recorder = Recorder::default();
        for _ in 0..3 {
            engine.tick_with_observer(&mut world, sixtieth(), &mut recorder);
        }
        assert_eq!(recorder.0.len(), 3);
        assert!(recorder.0.iter().all(|(handle, _)| *handle == watched));
    }

    #[test]
    fn trip_distance_resets_when_standing_still() {
        let mut world = world_with(FlatGenerator::new(1, BlockType::Stone));
        let mut engine = PhysicsEngine::new(PhysicsConfig::default());
        let handle = engine.register(
            RigidBody::builder("walker")
                .position(Point3::new(0.5, 2.5, 0.5))
                .dimensions(0.5, 1.5)
                .mass(80.0)
                .static_impulses_disabled(true)
                .build()
                .unwrap(),
        );

        for _ in 0..30 {
            engine.body_mut(handle).unwrap().move_body(Vector3::new(0.0, 0.0, 2.0), false);
            engine.tick(&mut world, sixtieth());
        }
        assert!(engine.body(handle).unwrap().trip_distance() > 0.5);

        engine.body_mut(handle).unwrap().set_flying(true);
        engine.body_mut(handle).unwrap().move_body(Vector3::new(0.0, 0.0, 0.0), false);
        engine.tick(&mut world, sixtieth());
        assert_eq!(engine.body(handle).unwrap().trip_distance(), 0.0);
    }

    #[test]
    fn unregistered_bodies_stop_simulating() {
        let mut world = world_with(EmptyGenerator);
        let mut engine = PhysicsEngine::new(PhysicsConfig::default());
        let handle = engine.register(RigidBody::builder("gone").build().unwrap());
        assert_eq!(engine.len(), 1);
        let body = engine.unregister(handle).unwrap();
        assert_eq!(body.name(), "gone");
        engine.tick(&mut world, sixtieth());
        assert!(engine.body(handle).is_none());
        assert!(engine.is_empty());
    }
}
