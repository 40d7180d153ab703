//! # Geometry
//!
//! Axis-aligned bounding boxes and grid ray marching shared by the voxel world
//! and the physics engine.

pub mod aabb;
pub mod ray;

pub use aabb::{Aabb, XzContact};
pub use ray::{Ray, RayCells, RayHit, RayStep};

/// One of the three world axes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Index of this axis into cgmath points and vectors.
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn all() -> [Axis; 3] {
        [Axis::X, Axis::Y, Axis::Z]
    }
}
