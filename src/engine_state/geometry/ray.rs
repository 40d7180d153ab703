//! # Ray Marching
//!
//! Grid traversal in the style of Amanatides and Woo: starting from the cell
//! that contains the origin, the ray visits every unit cell it passes
//! through, in order of increasing parametric distance.
//!
//! ## Key Components
//!
//! * `Ray` - origin, direction and maximum length
//! * `RayCells` - iterator over the visited cells
//! * `Ray::march` - first cell accepted by a predicate, with the face entered

use cgmath::{InnerSpace, Point3, Vector3};

use super::{Aabb, Axis};
use crate::engine_state::voxels::block::block_side::BlockSide;

/// A finite ray through the voxel grid.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
    pub length: f32,
}

/// A single cell visited by a ray.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayStep {
    pub cell: Point3<i32>,
    /// Parametric distance at which the ray entered the cell.
    pub t: f32,
    /// Face through which the cell was entered; `None` for the origin cell.
    pub face: Option<BlockSide>,
}

/// The first cell accepted by [`Ray::march`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayHit {
    pub cell: Point3<i32>,
    pub face: Option<BlockSide>,
    pub t: f32,
    /// `origin + direction * t`
    pub point: Point3<f32>,
    pub aabb: Aabb,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>, length: f32) -> Self {
        Ray {
            origin,
            direction,
            length,
        }
    }

    /// Iterates the cells the ray passes through, origin cell first.
    pub fn cells(&self) -> RayCells {
        RayCells::new(self)
    }

    /// Marches the ray until `find` returns a box for a cell.
    ///
    /// # Arguments
    /// * `find` - Returns the box of a cell that stops the ray, `None` to keep going
    ///
    /// # Returns
    /// The hit, or `None` when the ray runs out of length first.
    pub fn march<F>(&self, mut find: F) -> Option<RayHit>
    where
        F: FnMut(Point3<i32>) -> Option<Aabb>,
    {
        self.cells().find_map(|step| {
            find(step.cell).map(|aabb| RayHit {
                cell: step.cell,
                face: step.face,
                t: step.t,
                point: self.origin + self.direction * step.t,
                aabb,
            })
        })
    }
}

/// Iterator state for one ray traversal.
#[derive(Clone, Debug)]
pub struct RayCells {
    cell: Point3<i32>,
    step: [i32; 3],
    t_max: [f32; 3],
    t_delta: [f32; 3],
    radius: f32,
    t: f32,
    face: Option<BlockSide>,
    started: bool,
    done: bool,
}

/// Parametric distance from `s` to the next integer boundary when moving by `ds`.
fn boundary_distance(s: f32, ds: f32) -> f32 {
    if ds > 0.0 {
        (s.floor() + 1.0 - s) / ds
    } else if ds < 0.0 {
        (s - s.floor()) / -ds
    } else {
        f32::INFINITY
    }
}

impl RayCells {
    fn new(ray: &Ray) -> Self {
        let origin = ray.origin;
        let direction = ray.direction;
        let cell = Point3::new(
            origin.x.floor() as i32,
            origin.y.floor() as i32,
            origin.z.floor() as i32,
        );

        let mut step = [0; 3];
        let mut t_max = [f32::INFINITY; 3];
        let mut t_delta = [f32::INFINITY; 3];
        for axis in Axis::all() {
            let a = axis.index();
            let d = direction[a];
            if d != 0.0 {
                step[a] = if d > 0.0 { 1 } else { -1 };
                t_max[a] = boundary_distance(origin[a], d);
                t_delta[a] = step[a] as f32 / d;
            }
        }

        let radius = ray.length / direction.magnitude();
        RayCells {
            cell,
            step,
            t_max,
            t_delta,
            radius,
            t: 0.0,
            face: None,
            started: false,
            // A zero direction or a degenerate length visits the origin cell only.
            done: !radius.is_finite(),
        }
    }

    fn current(&self) -> RayStep {
        RayStep {
            cell: self.cell,
            t: self.t,
            face: self.face,
        }
    }

    /// Axis with the nearest boundary crossing. Ties go to X, then Z, then Y.
    fn next_axis(&self) -> Axis {
        [Axis::X, Axis::Z, Axis::Y]
            .into_iter()
            .fold(Axis::X, |best, axis| {
                if self.t_max[axis.index()] < self.t_max[best.index()] {
                    axis
                } else {
                    best
                }
            })
    }
}

impl Iterator for RayCells {
    type Item = RayStep;

    fn next(&mut self) -> Option<RayStep> {
        if !self.started {
            self.started = true;
            return Some(self.current());
        }
        if self.done {
            return None;
        }

        let axis = self.next_axis();
        let a = axis.index();
        if self.t_max[a] > self.radius {
            self.done = true;
            return None;
        }

        self.t = self.t_max[a];
        self.cell[a] += self.step[a];
        self.t_max[a] += self.t_delta[a];
        self.face = Some(BlockSide::from_axis(axis, -(self.step[a] as f32)));
        Some(self.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_are_face_adjacent_with_monotonic_t() {
        let ray = Ray::new(
            Point3::new(0.3, 10.7, -4.2),
            Vector3::new(0.6, -0.35, 0.72).normalize(),
            30.0,
        );
        let steps: Vec<RayStep> = ray.cells().collect();
        assert!(steps.len() > 10);
        assert_eq!(steps[0].cell, Point3::new(0, 10, -5));
        assert_eq!(steps[0].face, None);

        for pair in steps.windows(2) {
            let delta = pair[1].cell - pair[0].cell;
            assert_eq!(delta.x.abs() + delta.y.abs() + delta.z.abs(), 1);
            assert!(pair[1].t >= pair[0].t);
            let face = pair[1].face.unwrap();
            assert_eq!(face.offset(), -delta);
        }
        assert!(steps.last().unwrap().t <= 30.0);
    }

    #[test]
    fn march_reports_entry_face_and_point() {
        let ray = Ray::new(Point3::new(0.5, 0.5, 0.5), Vector3::new(1.0, 0.0, 0.0), 10.0);
        let hit = ray
            .march(|cell| (cell.x == 4).then(|| Aabb::unit(cell)))
            .unwrap();
        assert_eq!(hit.cell, Point3::new(4, 0, 0));
        assert_eq!(hit.face, Some(BlockSide::LEFT));
        assert!((hit.t - 3.5).abs() < 1e-5);
        assert!((hit.point.x - 4.0).abs() < 1e-5);
    }

    #[test]
    fn march_misses_beyond_length() {
        let ray = Ray::new(Point3::new(0.5, 0.5, 0.5), Vector3::new(0.0, -1.0, 0.0), 3.0);
        assert!(ray.march(|cell| (cell.y == -5).then(|| Aabb::unit(cell))).is_none());
        assert!(ray.march(|cell| (cell.y == -3).then(|| Aabb::unit(cell))).is_some());
    }

    #[test]
    fn origin_cell_hit_has_no_face() {
        let ray = Ray::new(Point3::new(-0.5, 2.5, -0.5), Vector3::new(0.0, 0.0, 1.0), 5.0);
        let hit = ray.march(|cell| Some(Aabb::unit(cell))).unwrap();
        assert_eq!(hit.cell, Point3::new(-1, 2, -1));
        assert_eq!(hit.face, None);
        assert_eq!(hit.t, 0.0);
    }

    #[test]
    fn zero_direction_visits_only_the_origin() {
        let ray = Ray::new(Point3::new(1.5, 1.5, 1.5), Vector3::new(0.0, 0.0, 0.0), 5.0);
        assert_eq!(ray.cells().count(), 1);
    }

    #[test]
    fn diagonal_ties_step_x_before_z_before_y() {
        let ray = Ray::new(Point3::new(0.5, 0.5, 0.5), Vector3::new(1.0, 1.0, 1.0), 2.0);
        let cells: Vec<Point3<i32>> = ray.cells().take(4).map(|s| s.cell).collect();
        assert_eq!(
            cells,
            vec![
                Point3::new(0, 0, 0),
                Point3::new(1, 0, 0),
                Point3::new(1, 0, 1),
                Point3::new(1, 1, 1),
            ]
        );
    }
}
