use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A position in 3-D space.
///
/// Equality is exact IEEE-754 comparison on each coordinate; there is no
/// epsilon. Search, delete and in-place updates all rely on it, so a point
/// read back from the tree compares equal to the value that was inserted.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Same coordinates offset by `d` on every axis.
    pub fn offset(self, d: f32) -> Self {
        Self::new(self.x + d, self.y + d, self.z + d)
    }

    /// Squared Euclidean distance to `other`.
    pub fn distance_squared(self, other: Point) -> f32 {
        Vec3::from(self).distance_squared(Vec3::from(other))
    }

    pub fn is_finite(self) -> bool {
        Vec3::from(self).is_finite()
    }
}

impl From<Vec3> for Point {
    fn from(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<Point> for Vec3 {
    fn from(p: Point) -> Self {
        Vec3::new(p.x, p.y, p.z)
    }
}

impl From<[f32; 3]> for Point {
    fn from(a: [f32; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}
