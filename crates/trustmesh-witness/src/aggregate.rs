//! # Consensus Aggregation
//!
//! Collapses independent witness ratings into a single outcome while
//! resisting individual outliers.
//!
//! ## Procedure
//!
//! 1. Compute the median of all ratings.
//! 2. Exclude any rating farther than the outlier distance (default 0.3)
//!    from the median.
//! 3. Require at least two inliers, else no consensus exists.
//! 4. Consensus value = median (default), mean, or trimmed mean of the
//!    inlier set, per policy.
//! 5. Agreement = `1 - (max - min)` over the inliers; a policy may demand
//!    a minimum agreement level.
//!
//! A single hostile or careless witness therefore cannot drag the
//! outcome: its rating is either excluded as an outlier or diluted by the
//! robust center.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Result, WitnessError};

/// How the consensus value is computed over the inlier set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusMethod {
    /// Median of the inliers (default; most outlier-resistant).
    Median,
    /// Arithmetic mean of the inliers.
    Mean,
    /// Mean after dropping the top and bottom `ceil(n/10)` inliers.
    TrimmedMean,
}

/// Policy for consensus aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationPolicy {
    /// The consensus method.
    pub method: ConsensusMethod,
    /// Maximum distance from the median before a rating is an outlier.
    pub outlier_distance: f64,
    /// Minimum inliers for a consensus to exist.
    pub min_inliers: usize,
    /// Required agreement level, if the policy demands one.
    pub min_agreement: Option<f64>,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self {
            method: ConsensusMethod::Median,
            outlier_distance: 0.3,
            min_inliers: 2,
            min_agreement: None,
        }
    }
}

/// The result of a successful aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusOutcome {
    /// The consensus rating.
    pub value: f64,
    /// `1 - (max - min)` over the inliers.
    pub agreement: f64,
    /// Ratings that survived outlier exclusion.
    pub inliers: Vec<f64>,
    /// Ratings excluded as outliers.
    pub outliers: Vec<f64>,
    /// The method that produced `value`.
    pub method: ConsensusMethod,
}

/// Aggregates witness ratings into a consensus outcome.
///
/// # Errors
///
/// - [`WitnessError::NoConsensus`] if fewer than `min_inliers` ratings
///   survive outlier exclusion
/// - [`WitnessError::InsufficientAgreement`] if the inlier spread exceeds
///   what the policy tolerates
pub fn aggregate(ratings: &[f64], policy: &AggregationPolicy) -> Result<ConsensusOutcome> {
    let center = median(ratings);

    let (inliers, outliers): (Vec<f64>, Vec<f64>) = ratings
        .iter()
        .partition(|rating| (**rating - center).abs() <= policy.outlier_distance);

    debug!(
        total = ratings.len(),
        inliers = inliers.len(),
        outliers = outliers.len(),
        median = center,
        "ratings partitioned"
    );

    if inliers.len() < policy.min_inliers {
        return Err(WitnessError::NoConsensus {
            inliers: inliers.len(),
            required: policy.min_inliers,
        });
    }

    let value = match policy.method {
        ConsensusMethod::Median => median(&inliers),
        ConsensusMethod::Mean => mean(&inliers),
        ConsensusMethod::TrimmedMean => trimmed_mean(&inliers),
    };

    let (min, max) = bounds(&inliers);
    let agreement = 1.0 - (max - min);

    if let Some(required) = policy.min_agreement {
        if agreement < required {
            return Err(WitnessError::InsufficientAgreement {
                required,
                actual: agreement,
            });
        }
    }

    Ok(ConsensusOutcome {
        value,
        agreement,
        inliers,
        outliers,
        method: policy.method,
    })
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean after dropping `ceil(n/10)` values from each end.
fn trimmed_mean(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let trim = sorted.len().div_ceil(10);
    if sorted.len() > 2 * trim {
        mean(&sorted[trim..sorted.len() - trim])
    } else {
        mean(&sorted)
    }
}

fn bounds(values: &[f64]) -> (f64, f64) {
    values.iter().fold((f64::MAX, f64::MIN), |(min, max), v| {
        (min.min(*v), max.max(*v))
    })
}
