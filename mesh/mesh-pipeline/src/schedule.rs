//! Stage parameter schedule.
//!
//! Every stage derives its parameters from the run-level target size by
//! a fixed multiplicative schedule. The ratios are tuned so a coarse
//! stage never leaves triangles larger than the next refine stage can
//! subdivide; they are configuration defaults, not algorithmic truths.

/// Coarse decimation runs at this fraction of the target size.
pub const COARSE_RATIO: f64 = 0.3;

/// Free-edge decimation runs at this fraction of the target size.
pub const BORDER_RATIO: f64 = 0.06;

/// Only triangles with quality below `1 / ANGLE_QUALITY_RATIO` are
/// considered by the second quality swap.
pub const ANGLE_QUALITY_RATIO: f64 = 150.0;

/// Minimum normal dot product a swap may leave behind.
pub const MIN_COS_AFTER_SWAP: f64 = 0.3;

/// Relaxation factor of the smoothing passes.
pub const SMOOTH_RELAXATION: f64 = 0.6;

/// Iterations of the mid-pipeline smoothing pass.
pub const SMOOTH_ITERATIONS: u32 = 3;

/// Iterations of the final smoothing pass.
pub const FINAL_SMOOTH_ITERATIONS: u32 = 8;

/// Turn angle beyond which a beam polyline breaks at a corner during
/// reconciliation. 45 degrees of turn, an interior angle of 135 degrees.
pub const WIRE_FEATURE_ANGLE: f64 = 0.25 * std::f64::consts::PI;

/// Resampled wire points closer than this fraction of the wire size to
/// their predecessor are dropped.
pub const WIRE_SPACING_RATIO: f64 = 0.2;

/// Relaxed coplanarity used by the safe swap and final smoothing: never
/// stricter than 0.9 even when the run-level threshold is.
#[must_use]
pub fn safe_coplanarity(coplanarity: f64) -> f64 {
    coplanarity.max(0.9)
}

/// Bound on the tetrahedron volume a coarsening swap may sweep.
#[must_use]
pub fn max_swap_volume(target_size: f64) -> f64 {
    target_size.powi(3)
}

/// Longest edge a coarse collapse is allowed to create.
#[must_use]
pub fn coarse_max_edge(target_size: f64) -> f64 {
    target_size * std::f64::consts::SQRT_2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_coplanarity_relaxes_strict_thresholds() {
        assert!((safe_coplanarity(0.95) - 0.95).abs() < 1e-12);
        assert!((safe_coplanarity(0.5) - 0.9).abs() < 1e-12);
        assert!((safe_coplanarity(-1.1) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_coarse_stays_below_target() {
        let t = 2.0;
        assert!(COARSE_RATIO * t < t);
        assert!(BORDER_RATIO * t < COARSE_RATIO * t);
        assert!(coarse_max_edge(t) > t);
    }
}
