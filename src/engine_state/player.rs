//! The player: a camera riding a rigid body.

use cgmath::{InnerSpace, Point3, Rad, Vector3, Zero};
use log::info;

use super::camera_state::{camera::Camera, CameraState};
use super::config::{PhysicsConfig, PlayerConfig};
use super::geometry::Ray;
use super::physics::{BodyHandle, PhysicsEngine, PhysicsError, RigidBody};
use super::voxels::chunk::Chunk;

pub struct Player {
    pub camera_state: CameraState,
    config: PlayerConfig,
}

impl Player {
    /// Registers the player's body with its top at `eye` and points the camera along +X.
    pub fn spawn(
        physics: &mut PhysicsEngine,
        eye: Point3<f32>,
        config: &PlayerConfig,
        physics_config: &PhysicsConfig,
    ) -> Result<Self, PhysicsError> {
        let body = RigidBody::builder("player")
            .position(eye)
            .mass(config.mass)
            .dimensions(config.width, config.height)
            .static_impulses_disabled(true)
            .notify(true)
            .speeds(physics_config)
            .build()?;
        let handle = physics.register(body);
        info!("Player spawned at {:?}", eye);

        let camera = Camera::new(eye, Rad(0.0), Rad(0.0));
        Ok(Player {
            camera_state: CameraState::new(camera, handle),
            config: config.clone(),
        })
    }

    pub fn handle(&self) -> BodyHandle {
        self.camera_state.follows
    }

    pub fn camera(&self) -> &Camera {
        &self.camera_state.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera_state.camera
    }

    pub fn eye(&self) -> Point3<f32> {
        self.camera_state.camera.position
    }

    /// Walking velocity for the given stick input, `1` being full forward or right.
    ///
    /// The direction is normalized on the XZ plane, then scaled by the player speed.
    pub fn movement(&self, forward: f32, right: f32) -> Vector3<f32> {
        let camera = self.camera();
        let movement = camera.forward() * forward + camera.right() * right;
        if movement.magnitude2() == 0.0 {
            return Vector3::zero();
        }
        movement.normalize() * self.config.speed
    }

    /// Line of sight from the eye, as long as the player's reach.
    pub fn ray(&self) -> Ray {
        let camera = self.camera();
        Ray::new(camera.position, camera.view_vec(), self.config.reach)
    }

    /// Whether `chunk` should be drawn.
    ///
    /// True when any corner of the chunk lies in front of the near plane, or
    /// the chunk is within the player radius.
    pub fn sees(&self, chunk: &Chunk) -> bool {
        let camera = self.camera();
        let aabb = chunk.aabb();
        let in_front = aabb
            .corners()
            .iter()
            .any(|corner| camera.near_plane_distance(*corner, self.config.near_plane) >= 0.0);
        in_front || aabb.distance(camera.position) < self.config.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::chunk::{ChunkOrigin, TerrainGrid};

    fn player() -> (PhysicsEngine, Player) {
        let mut physics = PhysicsEngine::new(PhysicsConfig::default());
        let player = Player::spawn(
            &mut physics,
            Point3::new(0.5, 70.0, 0.5),
            &PlayerConfig::default(),
            &PhysicsConfig::default(),
        )
        .unwrap();
        (physics, player)
    }

    #[test]
    fn spawned_body_is_a_notified_player() {
        let (physics, player) = player();
        let body = physics.body(player.handle()).unwrap();
        assert_eq!(body.name(), "player");
        assert_eq!(body.mass(), 80.0);
        assert!(body.static_impulses_disabled());
    }

    #[test]
    fn movement_is_normalized_to_player_speed() {
        let (_, player) = player();
        let diagonal = player.movement(1.0, 1.0);
        assert!((diagonal.magnitude() - 6.5).abs() < 1e-4);
        assert_eq!(diagonal.y, 0.0);
        assert_eq!(player.movement(0.0, 0.0), Vector3::zero());

        let forward = player.movement(1.0, 0.0);
        assert!((forward.x - 6.5).abs() < 1e-4);
    }

    #[test]
    fn sees_chunks_ahead_and_nearby() {
        let (_, mut player) = player();
        let terrain = TerrainGrid::new();
        let ahead = Chunk::new(ChunkOrigin::containing(Point3::new(64, 0, 0)), &terrain, 0);
        let behind = Chunk::new(ChunkOrigin::containing(Point3::new(-64, 0, 0)), &terrain, 1);
        let home = Chunk::new(ChunkOrigin::containing(Point3::new(-1, 0, 0)), &terrain, 2);

        assert!(player.sees(&ahead));
        assert!(!player.sees(&behind));
        // Behind the eye, but within the player radius.
        assert!(player.sees(&home));

        player.camera_mut().rotate(std::f32::consts::PI / 0.002, 0.0, 0.002);
        assert!(player.sees(&behind));
        assert_eq!(player.ray().length, 100.0);
    }
}
