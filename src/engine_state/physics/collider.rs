//! Collider classification.
//!
//! Each tick a body collects the boxes of the active blocks around it. How a
//! box is treated (floor, ceiling, wall) is decided here, from the box and
//! the cells the body occupies.

use crate::engine_state::geometry::Aabb;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColliderKind {
    Ground,
    Ceiling,
    Wall,
    /// Touches the body diagonally or not at all.
    Unrelated,
}

pub trait ColliderClassifier {
    /// Classifies `collider` against the boxes of the occupied cells, top cell first.
    fn classify(&self, collider: &Aabb, occupied: &[Aabb]) -> ColliderKind;
}

/// Compares block centers: same column and below is ground, same column and
/// above is ceiling, same level is wall. The first occupied cell that
/// matches decides.
#[derive(Copy, Clone, Debug, Default)]
pub struct CenterHeuristic;

impl ColliderClassifier for CenterHeuristic {
    fn classify(&self, collider: &Aabb, occupied: &[Aabb]) -> ColliderKind {
        let c = collider.center();
        for cell in occupied {
            let o = cell.center();
            if c.x == o.x && c.z == o.z {
                return if c.y < o.y {
                    ColliderKind::Ground
                } else {
                    ColliderKind::Ceiling
                };
            }
            if c.y == o.y {
                return ColliderKind::Wall;
            }
        }
        ColliderKind::Unrelated
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Point3;

    use super::*;

    fn stack() -> Vec<Aabb> {
        vec![Aabb::unit(Point3::new(0, 5, 0)), Aabb::unit(Point3::new(0, 4, 0))]
    }

    #[test]
    fn classifies_by_relative_cell() {
        let classifier = CenterHeuristic;
        let occupied = stack();
        let kind = |cell: Point3<i32>| classifier.classify(&Aabb::unit(cell), &occupied);

        assert_eq!(kind(Point3::new(0, 3, 0)), ColliderKind::Ground);
        assert_eq!(kind(Point3::new(0, 6, 0)), ColliderKind::Ceiling);
        assert_eq!(kind(Point3::new(1, 5, 0)), ColliderKind::Wall);
        assert_eq!(kind(Point3::new(0, 4, -1)), ColliderKind::Wall);
        assert_eq!(kind(Point3::new(1, 3, 1)), ColliderKind::Unrelated);
    }
}
