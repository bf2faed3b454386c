//! Quadric error metric for edge collapse.

use nalgebra::{Point3, Vector3};

/// Sum of squared point-to-plane distances, as a symmetric 4x4 matrix
/// stored as its upper triangle.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Quadric {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
    g: f64,
    h: f64,
    i: f64,
    j: f64,
}

impl Quadric {
    /// Quadric of a single plane with unit normal `n` through offset `d`
    /// (`n . p + d = 0`).
    pub(crate) fn from_plane(n: &Vector3<f64>, d: f64) -> Self {
        Self {
            a: n.x * n.x,
            b: n.x * n.y,
            c: n.x * n.z,
            d: n.x * d,
            e: n.y * n.y,
            f: n.y * n.z,
            g: n.y * d,
            h: n.z * n.z,
            i: n.z * d,
            j: d * d,
        }
    }

    pub(crate) fn add(&mut self, other: &Self) {
        self.a += other.a;
        self.b += other.b;
        self.c += other.c;
        self.d += other.d;
        self.e += other.e;
        self.f += other.f;
        self.g += other.g;
        self.h += other.h;
        self.i += other.i;
        self.j += other.j;
    }

    /// Error `v^T Q v` with `v = [x, y, z, 1]`.
    pub(crate) fn evaluate(&self, p: &Point3<f64>) -> f64 {
        let (x, y, z) = (p.x, p.y, p.z);
        x * (self.a * x + 2.0 * (self.b * y + self.c * z + self.d))
            + y * (self.e * y + 2.0 * (self.f * z + self.g))
            + z * (self.h * z + 2.0 * self.i)
            + self.j
    }

    /// Position minimizing the error, `None` when the 3x3 block is singular
    /// (planar or linear neighborhoods).
    pub(crate) fn optimal_point(&self) -> Option<Point3<f64>> {
        let det = self.a * (self.e * self.h - self.f * self.f)
            - self.b * (self.b * self.h - self.c * self.f)
            + self.c * (self.b * self.f - self.c * self.e);
        if det.abs() < 1e-10 {
            return None;
        }
        let inv = 1.0 / det;
        let m00 = (self.e * self.h - self.f * self.f) * inv;
        let m01 = (self.c * self.f - self.b * self.h) * inv;
        let m02 = (self.b * self.f - self.c * self.e) * inv;
        let m11 = (self.a * self.h - self.c * self.c) * inv;
        let m12 = (self.b * self.c - self.a * self.f) * inv;
        let m22 = (self.a * self.e - self.b * self.b) * inv;

        Some(Point3::new(
            -(m00 * self.d + m01 * self.g + m02 * self.i),
            -(m01 * self.d + m11 * self.g + m12 * self.i),
            -(m02 * self.d + m12 * self.g + m22 * self.i),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_distance() {
        let q = Quadric::from_plane(&Vector3::z(), 0.0);
        assert!(q.evaluate(&Point3::new(3.0, -2.0, 0.0)).abs() < 1e-12);
        assert!((q.evaluate(&Point3::new(0.0, 0.0, 2.0)) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_optimal_point_at_corner() {
        let mut q = Quadric::from_plane(&Vector3::x(), -1.0);
        q.add(&Quadric::from_plane(&Vector3::y(), -2.0));
        q.add(&Quadric::from_plane(&Vector3::z(), -3.0));
        let p = q.optimal_point().unwrap();
        assert!((p - Point3::new(1.0, 2.0, 3.0)).norm() < 1e-9);
    }

    #[test]
    fn test_singular_for_single_plane() {
        let q = Quadric::from_plane(&Vector3::z(), 0.0);
        assert!(q.optimal_point().is_none());
    }
}
