//! Reputation data model.
//!
//! The [`ReputationRecord`] is the single logical document per agent on the
//! ledger. It is created with a neutral prior, mutated exclusively through
//! [`crate::bayesian::update`] and [`crate::lineage::fork`], and never
//! deleted; prior versions are archived under the agent's history path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bayesian;
use crate::lineage::ForkType;
use crate::probation::ProbationState;

/// Neutral prior injected at agent creation and fork re-basing.
///
/// `Beta(2, 2)` centers the score at 0.5 with enough mass that a single
/// outcome cannot saturate the estimate.
pub const NEUTRAL_PRIOR: f64 = 2.0;

/// Snapshot of the parent's belief at fork time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParentSnapshot {
    /// Parent's alpha at the moment of the fork.
    pub alpha: f64,
    /// Parent's beta at the moment of the fork.
    pub beta: f64,
}

/// One generation in an agent's fork lineage. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForkLineageEntry {
    /// The agent that was forked from.
    pub parent_id: String,
    /// Unique id of the fork event.
    pub fork_id: String,
    /// The declared fork type; bounds the inheritable weight.
    pub fork_type: ForkType,
    /// The effective (clamped) weight the child inherited at.
    pub fork_weight: f64,
    /// When the fork occurred.
    pub inherited_at: DateTime<Utc>,
    /// The parent's belief at fork time, for audit.
    pub parent_snapshot: ParentSnapshot,
}

/// An agent's reputation document.
///
/// # Invariants
///
/// - `alpha >= 0`, `beta >= 0`
/// - `score()` is in `[0, 1]`; `n_eff()` is non-decreasing except at fork
///   re-basing
/// - `last_session_id` is the exactly-once guard: an update carrying the
///   same session id as the last applied one is a duplicate and is skipped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationRecord {
    /// The agent this record scores.
    pub agent_id: String,
    /// Successful-evidence mass.
    pub alpha: f64,
    /// Unsuccessful-evidence mass.
    pub beta: f64,
    /// When the record was last mutated.
    pub last_updated: DateTime<Utc>,
    /// Session id of the last applied update (idempotence guard).
    pub last_session_id: Option<String>,
    /// Fork generations from the root agent down to this one.
    pub fork_lineage: Vec<ForkLineageEntry>,
    /// Probation state, present from the latest fork until exit is
    /// long past (kept for audit; `active` goes false on exit).
    pub probation: Option<ProbationState>,
    /// Signature by the agent that performed the last update, over the
    /// canonical encoding of the record minus this field.
    pub signature: Option<String>,
}

impl ReputationRecord {
    /// Creates a root agent's record with the neutral prior.
    pub fn new_root(agent_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            agent_id: agent_id.into(),
            alpha: NEUTRAL_PRIOR,
            beta: NEUTRAL_PRIOR,
            last_updated: now,
            last_session_id: None,
            fork_lineage: Vec::new(),
            probation: None,
            signature: None,
        }
    }

    /// Expected reliability, `alpha / (alpha + beta)`.
    pub fn score(&self) -> f64 {
        bayesian::score(self.alpha, self.beta)
    }

    /// Effective sample size, `alpha + beta`.
    pub fn n_eff(&self) -> f64 {
        self.alpha + self.beta
    }

    /// Variance of the Beta belief.
    pub fn variance(&self) -> f64 {
        bayesian::variance(self.alpha, self.beta)
    }

    /// Equal-tailed credible interval at the given confidence level.
    pub fn credible_interval(&self, confidence: f64) -> (f64, f64) {
        bayesian::credible_interval(self.alpha, self.beta, confidence)
    }

    /// Whether this agent is currently under active probation.
    ///
    /// Lazily detects time expiry, so a record whose probation window has
    /// passed reports false here even before the next update touches it.
    pub fn probation_active(&mut self, now: DateTime<Utc>) -> bool {
        match self.probation.as_mut() {
            Some(probation) => {
                probation.check_status(now);
                probation.active
            }
            None => false,
        }
    }

    /// The confidence multiplier the next update must use.
    pub fn probation_multiplier(&mut self, now: DateTime<Utc>) -> f64 {
        if self.probation_active(now) {
            crate::probation::CONFIDENCE_MULTIPLIER
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_root_neutral_prior() {
        let record = ReputationRecord::new_root("agent-1", Utc::now());
        assert_eq!(record.alpha, 2.0);
        assert_eq!(record.beta, 2.0);
        assert_eq!(record.score(), 0.5);
        assert_eq!(record.n_eff(), 4.0);
        assert!(record.fork_lineage.is_empty());
        assert!(record.probation.is_none());
    }

    #[test]
    fn test_serde_round_trip() {
        let record = ReputationRecord::new_root("agent-1", Utc::now());
        let json = serde_json::to_string(&record).unwrap();
        let parsed: ReputationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_no_probation_means_full_multiplier() {
        let mut record = ReputationRecord::new_root("agent-1", Utc::now());
        assert_eq!(record.probation_multiplier(Utc::now()), 1.0);
        assert!(!record.probation_active(Utc::now()));
    }
}
