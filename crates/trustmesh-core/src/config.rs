//! Configuration types for the TrustMesh facade.

use serde::{Deserialize, Serialize};
use trustmesh_witness::{AggregationPolicy, SelectionPolicy};

/// Configuration for the [`crate::TrustMesh`] facade.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrustMeshConfig {
    /// Default trust gate applied by `evaluate_trust`.
    pub trust: TrustPolicy,

    /// Witness selection policy.
    pub selection: SelectionPolicy,

    /// Consensus aggregation policy.
    pub aggregation: AggregationPolicy,

    /// Witness solicitation settings.
    pub solicitation: SolicitationConfig,

    /// Optimistic-concurrency retry settings.
    pub retry: RetryConfig,
}

/// Thresholds an agent must clear to be trusted with a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustPolicy {
    /// Minimum reputation score.
    pub min_score: f64,

    /// Minimum effective sample size.
    pub min_confidence: f64,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self {
            min_score: 0.7,
            min_confidence: 10.0,
        }
    }
}

/// Witness solicitation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolicitationConfig {
    /// Per-witness response deadline, in milliseconds.
    pub deadline_ms: u64,

    /// Minimum responding witnesses to proceed with a reduced quorum;
    /// `None` means every selected witness must respond.
    pub min_responses: Option<usize>,
}

impl Default for SolicitationConfig {
    fn default() -> Self {
        Self {
            deadline_ms: 30_000,
            min_responses: Some(2),
        }
    }
}

/// Retry settings for conditional reputation writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts before giving up with a concurrency error.
    pub max_attempts: u32,

    /// Base backoff in milliseconds; attempt `n` waits `base * n`.
    pub base_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff_ms: 100,
        }
    }
}
