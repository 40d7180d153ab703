//! # Camera State
//!
//! Keeps the camera attached to the player's body. After each physics update
//! of the player the eye is moved to the body position, offset by a small
//! walking bob while the body is on the ground.
//!
//! ## Core Components
//! - `Camera`: eye position and yaw/pitch look
//! - `CameraState`: the camera plus the body it follows
//! - `walking_bob`: the bob offset for a trip distance

use cgmath::{Point3, Vector3};

use super::physics::{BodyHandle, BodyObserver, RigidBody};

pub mod camera;

/// Amplitude of the walking bob, in blocks.
const BOB_AMPLITUDE: f32 = 0.05;

/// Offset added to the eye after walking `trip_distance` since the last stop.
///
/// The bob ramps in over the first two blocks of a walk.
pub fn walking_bob(trip_distance: f32) -> Vector3<f32> {
    let d = trip_distance * 1.25 * (trip_distance / 2.0).min(1.0);
    let x = BOB_AMPLITUDE * (std::f32::consts::FRAC_PI_2 + d).cos();
    let y = BOB_AMPLITUDE * (std::f32::consts::FRAC_PI_2 - 2.0 * d).sin();
    Vector3::new(x, y, 0.0)
}

pub struct CameraState {
    pub camera: camera::Camera,
    /// Body whose updates move the camera.
    pub follows: BodyHandle,
}

impl CameraState {
    pub fn new(camera: camera::Camera, follows: BodyHandle) -> Self {
        CameraState { camera, follows }
    }

    /// Moves the eye to the body, bobbing while it walks on the ground.
    pub fn follow(&mut self, body: &RigidBody) {
        let position: Point3<f32> = body.position();
        self.camera.position = if body.grounded() {
            position + walking_bob(body.trip_distance())
        } else {
            position
        };
    }
}

impl BodyObserver for CameraState {
    fn body_updated(&mut self, handle: BodyHandle, body: &RigidBody) {
        if handle == self.follows {
            self.follow(body);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bob_is_at_rest_height_when_standing() {
        let rest = walking_bob(0.0);
        assert!(rest.x.abs() < 1e-6);
        assert!((rest.y - BOB_AMPLITUDE).abs() < 1e-6);
        assert_eq!(rest.z, 0.0);
    }

    #[test]
    fn bob_stays_within_its_amplitude() {
        for step in 0..200 {
            let bob = walking_bob(step as f32 * 0.1);
            assert!(bob.x.abs() <= BOB_AMPLITUDE + 1e-6);
            assert!(bob.y.abs() <= BOB_AMPLITUDE + 1e-6);
        }
        assert!(walking_bob(3.0).y < BOB_AMPLITUDE - 1e-3);
    }
}
