//! Collision impulses.
//!
//! Impulses are turned into forces (`J / dt`) and applied on the next tick,
//! when the force is integrated.

use cgmath::{InnerSpace, Vector3};

use super::rigid_body::RigidBody;

/// Bounces `body` off an immovable surface with outward normal `normal`.
pub fn apply_static_impulse(body: &mut RigidBody, normal: Vector3<f32>, dt: f32, restitution: f32) {
    let impulse = normal * (-body.mass * (1.0 + restitution) * body.velocity.dot(normal));
    body.force += impulse / dt;
}

/// Opposes the body's velocity, scaled by the friction coefficient.
pub fn apply_ground_friction(body: &mut RigidBody, coefficient: f32) {
    body.force += -body.velocity * coefficient;
}

/// Exchanges momentum between two dynamic bodies along `normal`.
///
/// The force on `other` is additionally divided by its mass.
pub fn apply_dynamic_impulse(
    body: &mut RigidBody,
    other: &mut RigidBody,
    normal: Vector3<f32>,
    dt: f32,
    restitution: f32,
) {
    let relative = (body.velocity - other.velocity).dot(normal);
    let j = -(1.0 + restitution) * relative / (1.0 / body.mass + 1.0 / other.mass);
    body.force += normal * j / dt;
    other.force += normal * j / other.mass / dt;
}
