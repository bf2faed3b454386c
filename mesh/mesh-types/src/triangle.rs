//! Triangle utilities for geometric queries.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A triangle with concrete vertex positions.
///
/// Winding is counter-clockwise when viewed from the front (normal points
/// toward the viewer).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Triangle {
    /// First vertex.
    pub v0: Point3<f64>,
    /// Second vertex.
    pub v1: Point3<f64>,
    /// Third vertex.
    pub v2: Point3<f64>,
}

impl Triangle {
    /// Create a new triangle from three points.
    #[inline]
    #[must_use]
    pub const fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Compute the (unnormalized) face normal via cross product.
    ///
    /// The magnitude equals twice the triangle's area.
    #[inline]
    #[must_use]
    pub fn normal_unnormalized(&self) -> Vector3<f64> {
        let e1 = self.v1 - self.v0;
        let e2 = self.v2 - self.v0;
        e1.cross(&e2)
    }

    /// Compute the unit face normal.
    ///
    /// Returns `None` for degenerate triangles (zero area).
    #[must_use]
    pub fn normal(&self) -> Option<Vector3<f64>> {
        let n = self.normal_unnormalized();
        let len = n.norm();
        if len < 1e-20 {
            None
        } else {
            Some(n / len)
        }
    }

    /// Triangle area.
    #[inline]
    #[must_use]
    pub fn area(&self) -> f64 {
        0.5 * self.normal_unnormalized().norm()
    }

    /// Shape quality in `[0, 1]`: ratio of inradius-style quality to the
    /// equilateral optimum. Degenerate triangles score 0.
    #[must_use]
    pub fn quality(&self) -> f64 {
        let a = (self.v1 - self.v0).norm_squared();
        let b = (self.v2 - self.v1).norm_squared();
        let c = (self.v0 - self.v2).norm_squared();
        let denom = a + b + c;
        if denom < 1e-30 {
            return 0.0;
        }
        // 4*sqrt(3)*area / (a^2+b^2+c^2), 1.0 for equilateral
        4.0 * 3.0_f64.sqrt() * self.area() / denom
    }
}

/// Closest point on a triangle to a query point.
///
/// Standard region-classification algorithm over the triangle's barycentric
/// regions.
#[must_use]
#[allow(clippy::many_single_char_names)]
#[allow(clippy::similar_names)]
pub fn closest_point_on_triangle(tri: &Triangle, p: &Point3<f64>) -> Point3<f64> {
    let ab = tri.v1 - tri.v0;
    let ac = tri.v2 - tri.v0;
    let ap = p - tri.v0;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return tri.v0;
    }

    let bp = p - tri.v1;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return tri.v1;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return tri.v0 + ab * v;
    }

    let cp = p - tri.v2;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return tri.v2;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return tri.v0 + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return tri.v1 + (tri.v2 - tri.v1) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    tri.v0 + ab * v + ac * w
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_tri() -> Triangle {
        Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn test_area_and_normal() {
        let tri = unit_tri();
        assert!((tri.area() - 0.5).abs() < 1e-12);
        let n = tri.normal().unwrap();
        assert!((n.z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_quality_equilateral() {
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 3.0_f64.sqrt() / 2.0, 0.0),
        );
        assert!((tri.quality() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_quality_degenerate() {
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        );
        assert!(tri.quality() < 1e-12);
    }

    #[test]
    fn test_closest_point_inside() {
        let tri = unit_tri();
        let p = Point3::new(0.2, 0.2, 5.0);
        let c = closest_point_on_triangle(&tri, &p);
        assert!((c - Point3::new(0.2, 0.2, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_closest_point_vertex_region() {
        let tri = unit_tri();
        let p = Point3::new(-1.0, -1.0, 0.0);
        let c = closest_point_on_triangle(&tri, &p);
        assert!((c - Point3::new(0.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_closest_point_edge_region() {
        let tri = unit_tri();
        let p = Point3::new(0.5, -1.0, 0.0);
        let c = closest_point_on_triangle(&tri, &p);
        assert!((c - Point3::new(0.5, 0.0, 0.0)).norm() < 1e-12);
    }
}
