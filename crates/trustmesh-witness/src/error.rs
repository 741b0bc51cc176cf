//! Error types for witness operations.

use thiserror::Error;

/// Error type for witness selection and consensus aggregation.
///
/// Every rejection carries the shortfall (required vs. actual) so callers
/// can decide whether to relax policy, widen the candidate pool, or fall
/// back to another resolution strategy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WitnessError {
    /// The eligible candidate pool (or the responding quorum) is smaller
    /// than the number of witnesses required.
    #[error("insufficient witnesses: required {required}, available {available}")]
    InsufficientWitnesses {
        /// How many witnesses the policy requires.
        required: usize,
        /// How many were eligible or responded.
        available: usize,
    },

    /// Too few ratings survived outlier exclusion.
    #[error("no consensus: {inliers} inliers, at least {required} required")]
    NoConsensus {
        /// Ratings within outlier distance of the median.
        inliers: usize,
        /// The minimum inlier count.
        required: usize,
    },

    /// The inlier spread is wider than the policy tolerates.
    #[error("insufficient agreement: required {required}, actual {actual}")]
    InsufficientAgreement {
        /// The agreement level the policy requires.
        required: f64,
        /// The agreement the inliers achieved.
        actual: f64,
    },
}
