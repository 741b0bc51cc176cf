//! Error types for the reputation engine.

use thiserror::Error;

use crate::lineage::ForkType;

/// Error type for reputation operations.
///
/// Validation and protocol violations fail before any mutation; a record
/// is never left half-updated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReputationError {
    /// An outcome outside `[0, 1]` was submitted.
    #[error("invalid outcome {value}: must be within [0, 1]")]
    InvalidOutcome {
        /// The rejected outcome value.
        value: f64,
    },

    /// A negative weight or a fork/probation factor outside its domain.
    #[error("invalid evidence weight {value}: {reason}")]
    InvalidWeight {
        /// The rejected weight value.
        value: f64,
        /// Which constraint was violated.
        reason: &'static str,
    },

    /// A claimed fork weight exceeds the protocol maximum for its type.
    #[error(
        "protocol violation: {fork_type:?} fork claims weight {claimed}, maximum is {maximum}"
    )]
    ProtocolViolation {
        /// The fork type whose limit was exceeded.
        fork_type: ForkType,
        /// The weight the fork claimed.
        claimed: f64,
        /// The enforced maximum for this fork type.
        maximum: f64,
    },

    /// A fork lineage chain exceeds the bounded walk depth.
    #[error("fork lineage for `{agent_id}` exceeds maximum depth {max_depth}")]
    LineageDepthExceeded {
        /// The agent whose lineage is too deep.
        agent_id: String,
        /// The configured depth bound.
        max_depth: usize,
    },
}
