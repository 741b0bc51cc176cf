//! # Witness Selection
//!
//! Picks independent third-party raters for a disputed session.
//!
//! ## Eligibility
//!
//! A candidate is eligible iff all of:
//!
//! | Check | Rule |
//! |-------|------|
//! | Reliability | `score >= min_score` (policy, typically 0.7–0.85) |
//! | Confidence | `n_eff >= min_confidence` (typically 50) |
//! | Independence | not a session participant |
//! | Anti-collusion | has witnessed at most 10% of each participant's recent sessions |
//!
//! ## Sortition
//!
//! Selection over the eligible pool is weighted random sampling without
//! replacement, weight = `score * min(n_eff / 100, 1.0)`: reliable,
//! well-established agents are favored but never guaranteed, which keeps
//! witness sets unpredictable to would-be colluders. The RNG is seedable
//! for reproducible tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Result, WitnessError};

/// A potential witness, with the reputation-derived fields eligibility
/// needs. The caller computes `participant_ratios` from the ledger: for
/// each session participant, the fraction of that participant's recent
/// sessions (lookback window) this candidate already witnessed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WitnessCandidate {
    /// The candidate agent.
    pub agent_id: String,
    /// The candidate's reputation score.
    pub score: f64,
    /// The candidate's effective sample size.
    pub n_eff: f64,
    /// Per-participant witnessed fraction over the lookback window.
    pub participant_ratios: Vec<f64>,
}

/// Policy governing eligibility and sortition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionPolicy {
    /// Minimum reputation score for a witness.
    pub min_score: f64,
    /// Minimum effective sample size for a witness.
    pub min_confidence: f64,
    /// Maximum witnessed fraction of any participant's recent sessions.
    pub max_witness_ratio: f64,
    /// Sessions per participant considered for the ratio.
    pub lookback: usize,
    /// Number of witnesses to select.
    pub required: usize,
    /// RNG seed for reproducible selection in tests.
    pub seed: Option<u64>,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            min_score: 0.75,
            min_confidence: 50.0,
            max_witness_ratio: 0.10,
            lookback: 100,
            required: 3,
            seed: None,
        }
    }
}

/// Eligibility filtering plus sortition.
#[derive(Debug, Clone)]
pub struct WitnessSelector {
    policy: SelectionPolicy,
}

impl WitnessSelector {
    /// Creates a selector with the given policy.
    pub fn new(policy: SelectionPolicy) -> Self {
        Self { policy }
    }

    /// The active policy.
    pub fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    /// Whether a single candidate is eligible for a session with the
    /// given participants.
    pub fn is_eligible(&self, candidate: &WitnessCandidate, participants: &[&str]) -> bool {
        if candidate.score < self.policy.min_score {
            return false;
        }
        if candidate.n_eff < self.policy.min_confidence {
            return false;
        }
        if participants.contains(&candidate.agent_id.as_str()) {
            return false;
        }
        candidate
            .participant_ratios
            .iter()
            .all(|ratio| *ratio <= self.policy.max_witness_ratio)
    }

    /// Selects `required` witnesses from the candidate pool.
    ///
    /// # Errors
    ///
    /// [`WitnessError::InsufficientWitnesses`] when fewer candidates pass
    /// eligibility than the policy requires.
    pub fn select(
        &self,
        candidates: &[WitnessCandidate],
        participants: &[&str],
    ) -> Result<Vec<WitnessCandidate>> {
        let eligible: Vec<&WitnessCandidate> = candidates
            .iter()
            .filter(|candidate| self.is_eligible(candidate, participants))
            .collect();

        debug!(
            pool = candidates.len(),
            eligible = eligible.len(),
            required = self.policy.required,
            "witness eligibility filtered"
        );

        if eligible.len() < self.policy.required {
            return Err(WitnessError::InsufficientWitnesses {
                required: self.policy.required,
                available: eligible.len(),
            });
        }

        let mut rng = match self.policy.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(sample_weighted(&mut rng, eligible, self.policy.required)
            .into_iter()
            .cloned()
            .collect())
    }
}

/// Sortition weight: reliability scaled by confidence, capped at full
/// weight once the candidate has 100 effective observations.
fn sortition_weight(candidate: &WitnessCandidate) -> f64 {
    candidate.score * (candidate.n_eff / 100.0).min(1.0)
}

/// Weighted sampling without replacement over the eligible pool.
fn sample_weighted<'a>(
    rng: &mut StdRng,
    mut pool: Vec<&'a WitnessCandidate>,
    count: usize,
) -> Vec<&'a WitnessCandidate> {
    let mut selected = Vec::with_capacity(count);
    while selected.len() < count && !pool.is_empty() {
        let total: f64 = pool.iter().map(|c| sortition_weight(c)).sum();
        let chosen = if total <= 0.0 {
            rng.gen_range(0..pool.len())
        } else {
            let mut roll = rng.gen::<f64>() * total;
            let mut index = pool.len() - 1;
            for (i, candidate) in pool.iter().enumerate() {
                roll -= sortition_weight(candidate);
                if roll <= 0.0 {
                    index = i;
                    break;
                }
            }
            index
        };
        selected.push(pool.swap_remove(chosen));
    }
    selected
}
