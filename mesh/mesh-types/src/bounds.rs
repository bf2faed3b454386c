//! Axis-aligned bounding box.

use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box in 3D space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3<f64>,
    /// Maximum corner.
    pub max: Point3<f64>,
}

impl Aabb {
    /// Create a bounding box from min/max corners.
    ///
    /// Corners are reordered so `min <= max` on each axis.
    #[must_use]
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// An empty box, ready to be grown with [`Aabb::grow`].
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Grow the box to contain a point.
    pub fn grow(&mut self, p: &Point3<f64>) {
        self.min = Point3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Point3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    /// Bounding box of a set of points. Returns `None` when empty.
    #[must_use]
    pub fn from_points<'a, I: IntoIterator<Item = &'a Point3<f64>>>(points: I) -> Option<Self> {
        let mut bb = Self::empty();
        let mut any = false;
        for p in points {
            bb.grow(p);
            any = true;
        }
        any.then_some(bb)
    }

    /// Squared distance from a point to this box (0 when inside).
    #[must_use]
    pub fn distance_squared(&self, p: &Point3<f64>) -> f64 {
        let dx = (self.min.x - p.x).max(0.0).max(p.x - self.max.x);
        let dy = (self.min.y - p.y).max(0.0).max(p.y - self.max.y);
        let dz = (self.min.z - p.z).max(0.0).max(p.z - self.max.z);
        dx * dx + dy * dy + dz * dz
    }

    /// Length of the box diagonal.
    #[must_use]
    pub fn diagonal(&self) -> f64 {
        (self.max - self.min).norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_reorders() {
        let bb = Aabb::new(Point3::new(1.0, 0.0, 2.0), Point3::new(0.0, 1.0, -1.0));
        assert_eq!(bb.min, Point3::new(0.0, 0.0, -1.0));
        assert_eq!(bb.max, Point3::new(1.0, 1.0, 2.0));
    }

    #[test]
    fn test_from_points() {
        let pts = [Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 3.0, 4.0)];
        let bb = Aabb::from_points(pts.iter()).unwrap();
        assert_eq!(bb.max, Point3::new(2.0, 3.0, 4.0));
        assert!(Aabb::from_points([].iter()).is_none());
    }

    #[test]
    fn test_distance_squared() {
        let bb = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        assert!(bb.distance_squared(&Point3::new(0.5, 0.5, 0.5)) < 1e-12);
        assert!((bb.distance_squared(&Point3::new(2.0, 0.5, 0.5)) - 1.0).abs() < 1e-12);
    }
}
