//! Per-pass edit accounting.

/// Counts of the edits one operator pass performed.
///
/// The sequencer logs these after every stage and uses [`PassReport::is_noop`]
/// to detect convergence of iterated passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Vertices added by splitting or insertion.
    pub vertices_inserted: usize,
    /// Vertices removed by collapse or valence repair.
    pub vertices_removed: usize,
    /// Edges flipped.
    pub edges_swapped: usize,
    /// Edges collapsed.
    pub edges_collapsed: usize,
    /// Vertex moves accepted by smoothing.
    pub vertices_smoothed: usize,
    /// Candidate edits rejected by a constraint.
    pub rejected: usize,
}

impl PassReport {
    /// True when the pass changed nothing.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.vertices_inserted == 0
            && self.vertices_removed == 0
            && self.edges_swapped == 0
            && self.edges_collapsed == 0
            && self.vertices_smoothed == 0
    }

    /// Accumulate another report into this one.
    pub fn absorb(&mut self, other: &Self) {
        self.vertices_inserted += other.vertices_inserted;
        self.vertices_removed += other.vertices_removed;
        self.edges_swapped += other.edges_swapped;
        self.edges_collapsed += other.edges_collapsed;
        self.vertices_smoothed += other.vertices_smoothed;
        self.rejected += other.rejected;
    }
}

impl std::fmt::Display for PassReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "+{}v -{}v {}swap {}collapse {}smooth ({} rejected)",
            self.vertices_inserted,
            self.vertices_removed,
            self.edges_swapped,
            self.edges_collapsed,
            self.vertices_smoothed,
            self.rejected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop() {
        let mut r = PassReport::default();
        assert!(r.is_noop());
        r.rejected = 5;
        assert!(r.is_noop());
        r.edges_swapped = 1;
        assert!(!r.is_noop());
    }

    #[test]
    fn test_absorb() {
        let mut a = PassReport {
            vertices_inserted: 1,
            ..PassReport::default()
        };
        let b = PassReport {
            vertices_inserted: 2,
            edges_swapped: 3,
            ..PassReport::default()
        };
        a.absorb(&b);
        assert_eq!(a.vertices_inserted, 3);
        assert_eq!(a.edges_swapped, 3);
    }
}
