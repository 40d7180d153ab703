//! # Camera
//!
//! First-person eye: a position plus yaw/pitch angles. The view vector is
//! derived from the angles after every change, so it is always normalized.
//!
//! Yaw 0 looks along +X and grows toward +Z. Pitch is clamped just short of
//! straight up and down.

use cgmath::*;
use std::f32::consts::FRAC_PI_2;

/// Safe limit for pitch to prevent gimbal lock
const SAFE_FRAC_PI_2: f32 = FRAC_PI_2 - 0.0001;

#[derive(Clone, Debug)]
pub struct Camera {
    /// Eye position in world space
    pub position: Point3<f32>,
    /// Horizontal rotation (around Y axis) in radians
    pub yaw: Rad<f32>,
    /// Vertical rotation in radians
    pub pitch: Rad<f32>,
    view: Vector3<f32>,
}

impl Camera {
    /// Creates a camera at `position` looking along `yaw` and `pitch`.
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        let mut camera = Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
            view: Vector3::unit_x(),
        };
        camera.clamp_and_update();
        camera
    }

    /// Normalized direction the camera is facing.
    pub fn view_vec(&self) -> Vector3<f32> {
        self.view
    }

    /// Forward direction flattened onto the XZ plane.
    pub fn forward(&self) -> Vector3<f32> {
        let (yaw_sin, yaw_cos) = self.yaw.0.sin_cos();
        Vector3::new(yaw_cos, 0.0, yaw_sin)
    }

    /// Right-hand direction on the XZ plane, `forward x up`.
    pub fn right(&self) -> Vector3<f32> {
        let (yaw_sin, yaw_cos) = self.yaw.0.sin_cos();
        Vector3::new(-yaw_sin, 0.0, yaw_cos)
    }

    /// Turns the camera by a pointer delta, scaled by `sensitivity` radians per unit.
    ///
    /// Positive `delta_y` looks down, matching screen coordinates.
    pub fn rotate(&mut self, delta_x: f32, delta_y: f32, sensitivity: f32) {
        self.yaw += Rad(delta_x * sensitivity);
        self.pitch += Rad(-delta_y * sensitivity);
        self.clamp_and_update();
    }

    /// Signed distance of `point` in front of the plane `near` units ahead of the eye.
    pub fn near_plane_distance(&self, point: Point3<f32>, near: f32) -> f32 {
        let plane_point = self.position + self.view * near;
        (point - plane_point).dot(self.view)
    }

    /// World-to-view transform for a renderer.
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.view, Vector3::unit_y())
    }

    fn clamp_and_update(&mut self) {
        if self.pitch < -Rad(SAFE_FRAC_PI_2) {
            self.pitch = -Rad(SAFE_FRAC_PI_2);
        } else if self.pitch > Rad(SAFE_FRAC_PI_2) {
            self.pitch = Rad(SAFE_FRAC_PI_2);
        }

        let (yaw_sin, yaw_cos) = self.yaw.0.sin_cos();
        let (pitch_sin, pitch_cos) = self.pitch.0.sin_cos();
        self.view = Vector3::new(pitch_cos * yaw_cos, pitch_sin, pitch_cos * yaw_sin).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_is_clamped_short_of_vertical() {
        let mut camera = Camera::new(Point3::new(0.0, 0.0, 0.0), Rad(0.0), Rad(0.0));
        camera.rotate(0.0, -10_000.0, 0.01);
        assert!(camera.pitch.0 < FRAC_PI_2);
        assert!(camera.view_vec().y > 0.99);
        assert!((camera.view_vec().magnitude() - 1.0).abs() < 1e-5);

        camera.rotate(0.0, 20_000.0, 0.01);
        assert!(camera.pitch.0 > -FRAC_PI_2);
        assert!(camera.view_vec().y < -0.99);
    }

    #[test]
    fn horizontal_axes_ignore_pitch() {
        let camera = Camera::new(Point3::new(0.0, 0.0, 0.0), Deg(90.0), Deg(45.0));
        let forward = camera.forward();
        assert!(forward.x.abs() < 1e-6 && (forward.z - 1.0).abs() < 1e-6);
        let right = camera.right();
        assert!((right.x + 1.0).abs() < 1e-6 && right.z.abs() < 1e-6);
        assert!(camera.view_vec().y > 0.7);
    }

    #[test]
    fn near_plane_distance_is_signed() {
        let camera = Camera::new(Point3::new(0.0, 0.0, 0.0), Rad(0.0), Rad(0.0));
        assert!((camera.near_plane_distance(Point3::new(5.0, 3.0, 1.0), 0.1) - 4.9).abs() < 1e-5);
        assert!(camera.near_plane_distance(Point3::new(-1.0, 0.0, 0.0), 0.1) < 0.0);
    }
}
