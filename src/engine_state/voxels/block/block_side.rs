//! # Block Side Module
//!
//! This module defines the six faces of a voxel block and maps them to the
//! axis-aligned unit normals used by the collision and ray marching code.

use cgmath::Vector3;

use crate::engine_state::geometry::Axis;

/// Represents the six possible faces of a voxel block.
///
/// The order is: [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The front face (facing positive Z)
    FRONT = 0,

    /// The back face (facing negative Z)
    BACK = 1,

    /// The bottom face (facing negative Y)
    BOTTOM = 2,

    /// The top face (facing positive Y)
    TOP = 3,

    /// The left face (facing negative X)
    LEFT = 4,

    /// The right face (facing positive X)
    RIGHT = 5,
}

impl BlockSide {
    /// Returns an array containing all six block faces in a consistent order.
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::FRONT,
            BlockSide::BACK,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::LEFT,
            BlockSide::RIGHT,
        ]
    }

    /// Returns the face lying on `axis` whose outward normal points along `sign`.
    ///
    /// # Arguments
    /// * `axis` - The axis the face is perpendicular to
    /// * `sign` - Direction of the normal; any non-negative value selects the positive face
    pub fn from_axis(axis: Axis, sign: f32) -> BlockSide {
        let positive = sign >= 0.0;
        match (axis, positive) {
            (Axis::X, true) => BlockSide::RIGHT,
            (Axis::X, false) => BlockSide::LEFT,
            (Axis::Y, true) => BlockSide::TOP,
            (Axis::Y, false) => BlockSide::BOTTOM,
            (Axis::Z, true) => BlockSide::FRONT,
            (Axis::Z, false) => BlockSide::BACK,
        }
    }

    /// The axis this face is perpendicular to.
    pub fn axis(self) -> Axis {
        match self {
            BlockSide::LEFT | BlockSide::RIGHT => Axis::X,
            BlockSide::BOTTOM | BlockSide::TOP => Axis::Y,
            BlockSide::FRONT | BlockSide::BACK => Axis::Z,
        }
    }

    /// Unit outward normal of this face.
    pub fn normal(self) -> Vector3<f32> {
        let offset = self.offset();
        Vector3::new(offset.x as f32, offset.y as f32, offset.z as f32)
    }

    /// Integer offset from a block to its neighbour across this face.
    pub fn offset(self) -> Vector3<i32> {
        match self {
            BlockSide::FRONT => Vector3::new(0, 0, 1),
            BlockSide::BACK => Vector3::new(0, 0, -1),
            BlockSide::BOTTOM => Vector3::new(0, -1, 0),
            BlockSide::TOP => Vector3::new(0, 1, 0),
            BlockSide::LEFT => Vector3::new(-1, 0, 0),
            BlockSide::RIGHT => Vector3::new(1, 0, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normals_agree_with_axis_and_sign() {
        for side in BlockSide::all() {
            let normal = side.normal();
            let component = normal[side.axis().index()];
            assert_eq!(BlockSide::from_axis(side.axis(), component), side);
        }
    }

    #[test]
    fn zero_sign_selects_positive_face() {
        assert_eq!(BlockSide::from_axis(Axis::X, 0.0), BlockSide::RIGHT);
        assert_eq!(BlockSide::from_axis(Axis::X, -0.5), BlockSide::LEFT);
    }
}
