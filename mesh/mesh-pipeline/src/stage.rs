//! The canonical stage sequence.

use std::fmt;

/// The thirteen stages of a remeshing run, in execution order.
///
/// The ordering is load-bearing: feature curves are fixed before the
/// interior (stage 2 before 7), coarsening happens before refinement so
/// the refine pass never meets triangles it cannot subdivide, and
/// valence repair waits until the topology has stopped moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Forced point insertion, frozen immediately.
    ForcedInsertion,
    /// Feature-curve (skeleton/ridge) refinement.
    SkeletonRefine,
    /// Shape-improving swap with a bounded swap volume.
    CoarseningSwap,
    /// Coarse decimation well below target size.
    CoarseDecimate,
    /// External fronting tool insertion, output frozen.
    Fronting,
    /// Free-edge-only decimation.
    FreeEdgeDecimate,
    /// Metric-driven interior refinement at target size.
    MetricRefine,
    /// Swap at the relaxed coplanarity threshold.
    SafeSwap,
    /// Quality-aware smoothing, few iterations.
    Smooth,
    /// Swap targeting near-degenerate triangles only.
    QualitySwap,
    /// Decimate and swap again under a coarsened metric.
    Recoarsen,
    /// Unfreeze fronting points, then repair vertex valences.
    ValenceRepair,
    /// Final smoothing at a higher iteration count.
    FinalSmooth,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Self; 13] = [
        Self::ForcedInsertion,
        Self::SkeletonRefine,
        Self::CoarseningSwap,
        Self::CoarseDecimate,
        Self::Fronting,
        Self::FreeEdgeDecimate,
        Self::MetricRefine,
        Self::SafeSwap,
        Self::Smooth,
        Self::QualitySwap,
        Self::Recoarsen,
        Self::ValenceRepair,
        Self::FinalSmooth,
    ];

    /// One-based position in the sequence.
    #[must_use]
    pub fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|&s| s == self)
            .map_or(0, |i| i + 1)
    }

    /// Short stage name for logs and snapshot filenames.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ForcedInsertion => "forced-insertion",
            Self::SkeletonRefine => "skeleton-refine",
            Self::CoarseningSwap => "coarsening-swap",
            Self::CoarseDecimate => "coarse-decimate",
            Self::Fronting => "fronting",
            Self::FreeEdgeDecimate => "free-edge-decimate",
            Self::MetricRefine => "metric-refine",
            Self::SafeSwap => "safe-swap",
            Self::Smooth => "smooth",
            Self::QualitySwap => "quality-swap",
            Self::Recoarsen => "recoarsen",
            Self::ValenceRepair => "valence-repair",
            Self::FinalSmooth => "final-smooth",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{}", self.index(), self.name())
    }
}
