//! Vertex type.

use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A mesh vertex: a position plus a mutability flag.
///
/// Immutable vertices are hard constraints for every pass: no operator may
/// move, merge or remove them. The flag is set by the mutability tagger
/// (free borders, group boundaries, named groups) or by the sequencer when
/// it freezes externally inserted points.
///
/// # Example
///
/// ```
/// use mesh_types::{Vertex, Point3};
///
/// let v = Vertex::from_coords(1.0, 2.0, 3.0);
/// assert!(!v.immutable);
/// assert_eq!(v.position, Point3::new(1.0, 2.0, 3.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vertex {
    /// Position in 3D space.
    pub position: Point3<f64>,

    /// Hard constraint flag: when set, no pass may move or remove this vertex.
    pub immutable: bool,
}

impl Vertex {
    /// Create a mutable vertex at a position.
    #[inline]
    #[must_use]
    pub const fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            immutable: false,
        }
    }

    /// Create a mutable vertex from coordinates.
    #[inline]
    #[must_use]
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }

    /// Create an immutable vertex at a position.
    #[inline]
    #[must_use]
    pub const fn frozen(position: Point3<f64>) -> Self {
        Self {
            position,
            immutable: true,
        }
    }

    /// Euclidean distance to another vertex.
    #[inline]
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        (self.position - other.position).norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_coords() {
        let v = Vertex::from_coords(1.0, 2.0, 3.0);
        assert_eq!(v.position, Point3::new(1.0, 2.0, 3.0));
        assert!(!v.immutable);
    }

    #[test]
    fn test_frozen() {
        let v = Vertex::frozen(Point3::new(0.0, 0.0, 0.0));
        assert!(v.immutable);
    }

    #[test]
    fn test_distance() {
        let a = Vertex::from_coords(0.0, 0.0, 0.0);
        let b = Vertex::from_coords(3.0, 4.0, 0.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
    }
}
