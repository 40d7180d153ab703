//! # Rigid Bodies
//!
//! A body is a box hanging below its position: `position` is the top center,
//! so the box spans `position - (w/2, h, w/2)` to `position + (w/2, 0, w/2)`.
//! Only the physics engine writes body state during a tick; between ticks the
//! controls below are the only way to steer a body.

use cgmath::{EuclideanSpace, Point3, Vector3, Zero};

use super::PhysicsError;
use crate::engine_state::config::PhysicsConfig;
use crate::engine_state::geometry::Aabb;

#[derive(Clone, Debug)]
pub struct RigidBody {
    pub(super) name: String,
    pub(super) width: f32,
    pub(super) height: f32,
    pub(super) shape: Aabb,
    /// Boxes of the cells the body occupied at the start of the tick, top first.
    pub(super) world_blocks: Vec<Aabb>,
    pub(super) trip_distance: f32,
    pub(super) position: Point3<f32>,
    pub(super) velocity: Vector3<f32>,
    pub(super) force: Vector3<f32>,
    pub(super) mass: f32,
    pub(super) grounded: bool,
    pub(super) flying: bool,
    pub(super) static_impulses_disabled: bool,
    pub(super) notify: bool,
    pub(super) jump_speed: f32,
    pub(super) fly_speed: f32,
}

impl RigidBody {
    pub fn builder(name: impl Into<String>) -> RigidBodyBuilder {
        RigidBodyBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn velocity(&self) -> Vector3<f32> {
        self.velocity
    }

    /// Force accumulated for the next tick.
    pub fn force(&self) -> Vector3<f32> {
        self.force
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn shape(&self) -> Aabb {
        self.shape
    }

    pub fn world_blocks(&self) -> &[Aabb] {
        &self.world_blocks
    }

    pub fn grounded(&self) -> bool {
        self.grounded
    }

    pub fn flying(&self) -> bool {
        self.flying
    }

    pub fn static_impulses_disabled(&self) -> bool {
        self.static_impulses_disabled
    }

    /// Distance walked since the body last stood still.
    pub fn trip_distance(&self) -> f32 {
        self.trip_distance
    }

    /// Number of cell rows the body spans.
    pub fn rows(&self) -> usize {
        self.height.ceil() as usize
    }

    /// Box of a body of the given footprint whose top center is `position`.
    pub fn shape_at(position: Point3<f32>, width: f32, height: f32) -> Aabb {
        let half = width / 2.0;
        Aabb::new(
            position - Vector3::new(half, height, half),
            position + Vector3::new(half, 0.0, half),
        )
    }

    pub(super) fn set_position(&mut self, position: Point3<f32>) {
        self.position = position;
        self.shape = Self::shape_at(position, self.width, self.height);
    }

    pub(super) fn translate(&mut self, offset: Vector3<f32>) {
        self.set_position(self.position + offset);
    }

    /// Sets the horizontal velocity from `movement`.
    ///
    /// A flying body rises at the fly speed while `fly` is held and hovers
    /// otherwise. A walking body keeps its vertical velocity.
    pub fn move_body(&mut self, movement: Vector3<f32>, fly: bool) {
        self.velocity.x = movement.x;
        self.velocity.z = movement.z;
        if self.flying {
            self.velocity.y = if fly { self.fly_speed } else { 0.0 };
        }
    }

    /// Adds the jump speed upward. Whether the body may jump is up to the caller.
    pub fn jump(&mut self) {
        self.velocity.y += self.jump_speed;
        self.grounded = false;
    }

    pub fn set_flying(&mut self, flying: bool) {
        self.flying = flying;
    }
}

/// Validating constructor for [`RigidBody`].
#[derive(Clone, Debug)]
pub struct RigidBodyBuilder {
    name: String,
    position: Point3<f32>,
    velocity: Vector3<f32>,
    force: Vector3<f32>,
    mass: f32,
    width: f32,
    height: f32,
    flying: bool,
    static_impulses_disabled: bool,
    notify: bool,
    jump_speed: f32,
    fly_speed: f32,
}

impl RigidBodyBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        let defaults = PhysicsConfig::default();
        RigidBodyBuilder {
            name: name.into(),
            position: Point3::origin(),
            velocity: Vector3::zero(),
            force: Vector3::zero(),
            mass: 1.0,
            width: 1.0,
            height: 1.0,
            flying: false,
            static_impulses_disabled: false,
            notify: false,
            jump_speed: defaults.jump_speed,
            fly_speed: defaults.fly_speed,
        }
    }

    pub fn position(mut self, position: Point3<f32>) -> Self {
        self.position = position;
        self
    }

    pub fn velocity(mut self, velocity: Vector3<f32>) -> Self {
        self.velocity = velocity;
        self
    }

    /// Initial force, applied during the first tick.
    pub fn force(mut self, force: Vector3<f32>) -> Self {
        self.force = force;
        self
    }

    pub fn mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn dimensions(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn flying(mut self, flying: bool) -> Self {
        self.flying = flying;
        self
    }

    /// Ground and walls stop the body dead instead of bouncing it.
    pub fn static_impulses_disabled(mut self, disabled: bool) -> Self {
        self.static_impulses_disabled = disabled;
        self
    }

    /// Report the body to the tick observer after each update.
    pub fn notify(mut self, notify: bool) -> Self {
        self.notify = notify;
        self
    }

    /// Takes the jump and fly speeds from a physics config.
    pub fn speeds(mut self, config: &PhysicsConfig) -> Self {
        self.jump_speed = config.jump_speed;
        self.fly_speed = config.fly_speed;
        self
    }

    pub fn build(self) -> Result<RigidBody, PhysicsError> {
        if !self.mass.is_finite() || self.mass <= 0.0 {
            return Err(PhysicsError::InvalidMass(self.mass));
        }
        let valid = |d: f32| d.is_finite() && d > 0.0;
        if !valid(self.width) || !valid(self.height) {
            return Err(PhysicsError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }

        Ok(RigidBody {
            shape: RigidBody::shape_at(self.position, self.width, self.height),
            name: self.name,
            width: self.width,
            height: self.height,
            world_blocks: Vec::new(),
            trip_distance: 0.0,
            position: self.position,
            velocity: self.velocity,
            force: self.force,
            mass: self.mass,
            grounded: false,
            flying: self.flying,
            static_impulses_disabled: self.static_impulses_disabled,
            notify: self.notify,
            jump_speed: self.jump_speed,
            fly_speed: self.fly_speed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_bad_mass_and_dimensions() {
        for mass in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                RigidBody::builder("bad").mass(mass).build(),
                Err(PhysicsError::InvalidMass(_))
            ));
        }
        assert!(matches!(
            RigidBody::builder("flat").dimensions(1.0, 0.0).build(),
            Err(PhysicsError::InvalidDimensions { .. })
        ));
        assert!(RigidBody::builder("ok").mass(80.0).dimensions(0.5, 1.5).build().is_ok());
    }

    #[test]
    fn shape_hangs_below_the_position() {
        let body = RigidBody::builder("player")
            .position(Point3::new(1.0, 10.0, -2.0))
            .dimensions(0.5, 1.5)
            .build()
            .unwrap();
        assert_eq!(body.shape().min, Point3::new(0.75, 8.5, -2.25));
        assert_eq!(body.shape().max, Point3::new(1.25, 10.0, -1.75));
        assert_eq!(body.rows(), 2);
    }

    #[test]
    fn move_body_handles_flying_vertical_speed() {
        let mut body = RigidBody::builder("b")
            .velocity(Vector3::new(0.0, -3.0, 0.0))
            .build()
            .unwrap();
        body.move_body(Vector3::new(1.0, 7.0, 2.0), true);
        assert_eq!(body.velocity(), Vector3::new(1.0, -3.0, 2.0));

        body.set_flying(true);
        body.move_body(Vector3::new(0.0, 0.0, 0.0), true);
        assert_eq!(body.velocity().y, 5.0);
        body.move_body(Vector3::new(0.0, 0.0, 0.0), false);
        assert_eq!(body.velocity().y, 0.0);
    }

    #[test]
    fn jump_adds_speed_without_a_ground_check() {
        let mut body = RigidBody::builder("b").build().unwrap();
        body.jump();
        body.jump();
        assert_eq!(body.velocity().y, 18.0);
        assert!(!body.grounded());
    }
}
