//! # Axis-Aligned Bounding Boxes
//!
//! `Aabb` is the only collision shape in the engine: every block is a unit
//! box and every rigid body is a box hanging below its position. All overlap
//! tests are inclusive, so boxes that merely touch count as intersecting.

use cgmath::{EuclideanSpace, InnerSpace, Point3, Vector3};

use super::Axis;
use crate::engine_state::voxels::block::block_side::BlockSide;

/// An axis-aligned box with `min <= max` on every axis.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

/// Result of a horizontal overlap test between two boxes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct XzContact {
    /// Translation to subtract from the first box to separate the pair.
    pub penetration: Vector3<f32>,
    /// Face of the first box that is in contact, pointing away from the other box.
    pub face: BlockSide,
}

impl Aabb {
    /// Creates a box from two opposite corners, in any order.
    pub fn new(a: Point3<f32>, b: Point3<f32>) -> Self {
        Aabb {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// The unit box occupying the integer cell `cell`.
    pub fn unit(cell: Point3<i32>) -> Self {
        let min = Point3::new(cell.x as f32, cell.y as f32, cell.z as f32);
        Aabb {
            min,
            max: min + Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn center(&self) -> Point3<f32> {
        self.min.midpoint(self.max)
    }

    /// Euclidean distance from `point` to the closest point of the box.
    ///
    /// # Returns
    /// Zero when the point lies inside the box or on its boundary.
    pub fn distance(&self, point: Point3<f32>) -> f32 {
        let outside = |p: f32, lo: f32, hi: f32| (lo - p).max(0.0).max(p - hi);
        Vector3::new(
            outside(point.x, self.min.x, self.max.x),
            outside(point.y, self.min.y, self.max.y),
            outside(point.z, self.min.z, self.max.z),
        )
        .magnitude()
    }

    /// One-dimensional overlap along `axis`.
    ///
    /// # Returns
    /// `Some(depth)` with `depth = min(self.max - other.min, other.max - self.min)`
    /// when the projections overlap or touch, `None` otherwise.
    pub fn intersection(&self, other: &Aabb, axis: Axis) -> Option<f32> {
        let a = axis.index();
        if self.min[a] <= other.max[a] && self.max[a] >= other.min[a] {
            Some((self.max[a] - other.min[a]).min(other.max[a] - self.min[a]))
        } else {
            None
        }
    }

    /// Horizontal overlap test, ignoring the Y axis.
    ///
    /// The axis with the smaller overlap depth is the separation axis, with
    /// ties going to X. The penetration is positive along that axis when the
    /// other box lies on the positive side of this one.
    pub fn intersection_xz(&self, other: &Aabb) -> Option<XzContact> {
        let overlaps = |axis: Axis| {
            let a = axis.index();
            if self.min[a] <= other.max[a] && self.max[a] >= other.min[a] {
                Some((self.max[a] - other.min[a], other.max[a] - self.min[a]))
            } else {
                None
            }
        };
        let (x1, x2) = overlaps(Axis::X)?;
        let (z1, z2) = overlaps(Axis::Z)?;

        let depth_x = x1.min(x2);
        let depth_z = z1.min(z2);
        let (axis, depth, overlap1, overlap2) = if depth_x <= depth_z {
            (Axis::X, depth_x, x1, x2)
        } else {
            (Axis::Z, depth_z, z1, z2)
        };

        let sign = if overlap2 - overlap1 >= 0.0 { 1.0 } else { -1.0 };
        let mut penetration = Vector3::new(0.0, 0.0, 0.0);
        penetration[axis.index()] = depth * sign;

        Some(XzContact {
            penetration,
            face: BlockSide::from_axis(axis, -sign),
        })
    }

    /// The eight corners of the box.
    pub fn corners(&self) -> [Point3<f32>; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Point3::new(lo.x, lo.y, lo.z),
            Point3::new(hi.x, lo.y, lo.z),
            Point3::new(lo.x, hi.y, lo.z),
            Point3::new(hi.x, hi.y, lo.z),
            Point3::new(lo.x, lo.y, hi.z),
            Point3::new(hi.x, lo.y, hi.z),
            Point3::new(lo.x, hi.y, hi.z),
            Point3::new(hi.x, hi.y, hi.z),
        ]
    }

    pub fn translate(&self, offset: Vector3<f32>) -> Aabb {
        Aabb {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Inclusive point containment.
    pub fn contains(&self, point: Point3<f32>) -> bool {
        Axis::all().iter().all(|axis| {
            let a = axis.index();
            point[a] >= self.min[a] && point[a] <= self.max[a]
        })
    }
}
