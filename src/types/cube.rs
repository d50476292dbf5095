use serde::{Deserialize, Serialize};

use super::Point;

/// Axis-aligned cube (or box) in 3-D.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cube {
    pub min: Point,
    pub max: Point,
}

impl Cube {
    /// Cube spanning `center ± half_size` on every axis.
    pub fn around(center: Point, half_size: f32) -> Self {
        Self {
            min: center.offset(-half_size),
            max: center.offset(half_size),
        }
    }

    /// Ownership test: `min <= p < max` on every axis.
    ///
    /// Matches the `>= center` octant routing, so a point on a shared face
    /// belongs to exactly one of two neighbouring cells.
    pub fn contains_half_open(&self, p: Point) -> bool {
        p.x >= self.min.x
            && p.x < self.max.x
            && p.y >= self.min.y
            && p.y < self.max.y
            && p.z >= self.min.z
            && p.z < self.max.z
    }

    /// Query test: `min <= p <= max` on every axis.
    pub fn contains_inclusive(&self, p: Point) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Whether two boxes share any volume or boundary.
    pub fn overlaps(&self, other: &Cube) -> bool {
        !(self.max.x < other.min.x
            || self.min.x > other.max.x
            || self.max.y < other.min.y
            || self.min.y > other.max.y
            || self.max.z < other.min.z
            || self.min.z > other.max.z)
    }

    /// Squared distance from `p` to the nearest point of the box
    /// (zero when `p` is inside).
    pub fn distance_squared_to(&self, p: Point) -> f32 {
        let axis = |v: f32, lo: f32, hi: f32| {
            if v < lo {
                lo - v
            } else if v > hi {
                v - hi
            } else {
                0.0
            }
        };
        let dx = axis(p.x, self.min.x, self.max.x);
        let dy = axis(p.y, self.min.y, self.max.y);
        let dz = axis(p.z, self.min.z, self.max.z);
        dx * dx + dy * dy + dz * dz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> Cube {
        Cube::around(Point::new(0.0, 0.0, 0.0), 1.0)
    }

    #[test]
    fn around_derives_corners() {
        let c = Cube::around(Point::new(10.0, 20.0, 30.0), 5.0);
        assert_eq!(c.min, Point::new(5.0, 15.0, 25.0));
        assert_eq!(c.max, Point::new(15.0, 25.0, 35.0));
    }

    #[test]
    fn half_open_excludes_max_face() {
        let c = unit();
        assert!(c.contains_half_open(Point::new(-1.0, -1.0, -1.0)));
        assert!(!c.contains_half_open(Point::new(1.0, 0.0, 0.0)));
        assert!(c.contains_inclusive(Point::new(1.0, 0.0, 0.0)));
        assert!(!c.contains_inclusive(Point::new(1.0001, 0.0, 0.0)));
    }

    #[test]
    fn overlap_touching_faces_counts() {
        let a = unit();
        let b = Cube::around(Point::new(2.0, 0.0, 0.0), 1.0);
        let c = Cube::around(Point::new(3.5, 0.0, 0.0), 1.0);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn distance_to_box() {
        let c = unit();
        assert_eq!(c.distance_squared_to(Point::new(0.5, 0.5, 0.5)), 0.0);
        assert_eq!(c.distance_squared_to(Point::new(3.0, 0.0, 0.0)), 4.0);
        // nearest corner (1, 1, 1)
        assert_eq!(c.distance_squared_to(Point::new(2.0, 2.0, 2.0)), 3.0);
    }
}
