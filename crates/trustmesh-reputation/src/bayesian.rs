//! # Bayesian Online Update
//!
//! The single mutation path for an agent's Beta belief.
//!
//! ## Update Rule
//!
//! For an agreed outcome `o ∈ [0, 1]` with base weight `w`, cumulative
//! lineage factor `f ∈ (0, 1]` and probation multiplier `m ∈ {0.5, 1.0}`:
//!
//! ```text
//! effective = w * f * m
//! alpha' = alpha + o * effective
//! beta'  = beta  + (1 - o) * effective
//! ```
//!
//! Evidence mass is conserved: `(alpha' + beta') - (alpha + beta)` equals
//! exactly `effective`, which is what makes reputation auditable from the
//! ledger history alone.
//!
//! ## Validation
//!
//! Outcomes outside `[0, 1]` and negative weights are rejected before any
//! mutation. A weight of zero is a valid no-op, used for disputed or
//! invalidated sessions that must still be recorded as processed.

use chrono::{DateTime, Utc};
use statrs::distribution::{Beta, ContinuousCDF};
use tracing::debug;

use crate::models::ReputationRecord;
use crate::{ReputationError, Result};

/// The three factors that scale one outcome's evidence mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvidenceWeight {
    /// Base weight of the interaction (task importance).
    pub weight: f64,
    /// Cumulative fork lineage factor, in `(0, 1]`.
    pub fork_factor: f64,
    /// Probation multiplier: 0.5 while on probation, 1.0 otherwise.
    pub probation_multiplier: f64,
}

impl EvidenceWeight {
    /// Full-trust weight for an agent with no lineage discount and no
    /// probation.
    pub fn plain(weight: f64) -> Self {
        Self {
            weight,
            fork_factor: 1.0,
            probation_multiplier: 1.0,
        }
    }

    /// The effective evidence mass this update contributes.
    pub fn effective(&self) -> f64 {
        self.weight * self.fork_factor * self.probation_multiplier
    }

    fn validate(&self) -> Result<()> {
        if self.weight < 0.0 || !self.weight.is_finite() {
            return Err(ReputationError::InvalidWeight {
                value: self.weight,
                reason: "base weight must be finite and >= 0",
            });
        }
        if !(self.fork_factor > 0.0 && self.fork_factor <= 1.0) {
            return Err(ReputationError::InvalidWeight {
                value: self.fork_factor,
                reason: "fork factor must be within (0, 1]",
            });
        }
        if !(self.probation_multiplier == 0.5 || self.probation_multiplier == 1.0) {
            return Err(ReputationError::InvalidWeight {
                value: self.probation_multiplier,
                reason: "probation multiplier must be 0.5 or 1.0",
            });
        }
        Ok(())
    }
}

/// Applies one outcome to a reputation record.
///
/// Validates first, mutates second: on error the record is untouched.
/// Duplicate updates for the session already recorded in
/// `last_session_id` are skipped, which makes publish retries safe.
///
/// # Returns
///
/// `true` if the update was applied, `false` if it was a duplicate no-op.
///
/// # Errors
///
/// - [`ReputationError::InvalidOutcome`] if `outcome` is outside `[0, 1]`
/// - [`ReputationError::InvalidWeight`] if any weight factor is out of
///   domain
pub fn update(
    record: &mut ReputationRecord,
    outcome: f64,
    evidence: EvidenceWeight,
    session_id: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    if !(0.0..=1.0).contains(&outcome) || !outcome.is_finite() {
        return Err(ReputationError::InvalidOutcome { value: outcome });
    }
    evidence.validate()?;

    if record.last_session_id.as_deref() == Some(session_id) {
        debug!(
            agent = %record.agent_id,
            session = session_id,
            "duplicate update skipped"
        );
        return Ok(false);
    }

    let effective = evidence.effective();
    record.alpha += outcome * effective;
    record.beta += (1.0 - outcome) * effective;
    record.last_updated = now;
    record.last_session_id = Some(session_id.to_string());
    record.signature = None; // stale once the fields change; the writer re-signs

    debug!(
        agent = %record.agent_id,
        outcome,
        effective,
        score = record.score(),
        n_eff = record.n_eff(),
        "reputation updated"
    );
    Ok(true)
}

/// Expected reliability of a `Beta(alpha, beta)` belief.
pub fn score(alpha: f64, beta: f64) -> f64 {
    let n = alpha + beta;
    if n <= 0.0 {
        return 0.5;
    }
    alpha / n
}

/// Variance of a `Beta(alpha, beta)` belief; always within `[0, 0.25]`.
pub fn variance(alpha: f64, beta: f64) -> f64 {
    let n = alpha + beta;
    if n <= 0.0 {
        return 0.25;
    }
    (alpha * beta) / (n * n * (n + 1.0))
}

/// Equal-tailed credible interval at confidence level `c`.
///
/// Evaluates the Beta quantile function at `(1-c)/2` and `1-(1-c)/2`.
/// Degenerate parameters fall back to the full `[0, 1]` interval rather
/// than panicking, since a record with no evidence mass has no meaningful
/// interval anyway.
pub fn credible_interval(alpha: f64, beta: f64, confidence: f64) -> (f64, f64) {
    let confidence = confidence.clamp(0.0, 1.0);
    let tail = (1.0 - confidence) / 2.0;
    match Beta::new(alpha, beta) {
        Ok(dist) => (dist.inverse_cdf(tail), dist.inverse_cdf(1.0 - tail)),
        Err(_) => (0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReputationRecord;

    fn root() -> ReputationRecord {
        ReputationRecord::new_root("agent-1", Utc::now())
    }

    #[test]
    fn test_golden_update_sequence() {
        // Worked case from the protocol definition: three events over a
        // fresh record.
        let mut record = root();

        update(&mut record, 1.0, EvidenceWeight::plain(1.0), "s1", Utc::now()).unwrap();
        assert_eq!(record.alpha, 3.0);
        assert_eq!(record.beta, 2.0);
        assert!((record.score() - 0.60).abs() < 1e-9);

        let halved = EvidenceWeight {
            weight: 2.0,
            fork_factor: 0.5,
            probation_multiplier: 1.0,
        };
        update(&mut record, 0.0, halved, "s2", Utc::now()).unwrap();
        assert_eq!(record.alpha, 3.0);
        assert_eq!(record.beta, 3.0);
        assert!((record.score() - 0.50).abs() < 1e-9);

        update(&mut record, 1.0, EvidenceWeight::plain(3.0), "s3", Utc::now()).unwrap();
        assert_eq!(record.alpha, 6.0);
        assert_eq!(record.beta, 3.0);
        assert!((record.score() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_evidence_mass_conservation() {
        let cases = [
            (1.0, 1.0, 1.0, 1.0),
            (0.3, 2.0, 0.5, 1.0),
            (0.7, 1.5, 0.25, 0.5),
            (0.0, 4.0, 1.0, 0.5),
        ];
        for (outcome, weight, fork_factor, multiplier) in cases {
            let mut record = root();
            let before = record.n_eff();
            let evidence = EvidenceWeight {
                weight,
                fork_factor,
                probation_multiplier: multiplier,
            };
            update(&mut record, outcome, evidence, "s", Utc::now()).unwrap();
            let gained = record.n_eff() - before;
            assert!(
                (gained - weight * fork_factor * multiplier).abs() < 1e-12,
                "mass not conserved for outcome {outcome}"
            );
        }
    }

    #[test]
    fn test_invalid_outcome_rejected_without_mutation() {
        let mut record = root();
        let before = record.clone();

        for bad in [-0.1, 1.1, f64::NAN, f64::INFINITY] {
            let err = update(&mut record, bad, EvidenceWeight::plain(1.0), "s", Utc::now())
                .unwrap_err();
            assert!(matches!(err, ReputationError::InvalidOutcome { .. }));
        }
        assert_eq!(record, before);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut record = root();
        let err = update(&mut record, 0.5, EvidenceWeight::plain(-1.0), "s", Utc::now())
            .unwrap_err();
        assert!(matches!(err, ReputationError::InvalidWeight { .. }));
    }

    #[test]
    fn test_zero_weight_is_valid_noop() {
        let mut record = root();
        let applied =
            update(&mut record, 1.0, EvidenceWeight::plain(0.0), "s", Utc::now()).unwrap();
        assert!(applied);
        assert_eq!(record.alpha, 2.0);
        assert_eq!(record.beta, 2.0);
        // The session is still marked processed.
        assert_eq!(record.last_session_id.as_deref(), Some("s"));
    }

    #[test]
    fn test_duplicate_session_skipped() {
        let mut record = root();
        assert!(update(&mut record, 1.0, EvidenceWeight::plain(1.0), "s1", Utc::now()).unwrap());
        assert!(!update(&mut record, 1.0, EvidenceWeight::plain(1.0), "s1", Utc::now()).unwrap());
        assert_eq!(record.alpha, 3.0);
    }

    #[test]
    fn test_score_and_variance_bounds() {
        let params = [(2.0, 2.0), (0.1, 99.0), (1000.0, 1.0), (3.0, 3.0)];
        for (alpha, beta) in params {
            let s = score(alpha, beta);
            let v = variance(alpha, beta);
            assert!((0.0..=1.0).contains(&s));
            assert!((0.0..=0.25).contains(&v));
        }
    }

    #[test]
    fn test_credible_interval_brackets_score() {
        let (lo, hi) = credible_interval(6.0, 3.0, 0.95);
        let s = score(6.0, 3.0);
        assert!(lo < s && s < hi);
        assert!((0.0..=1.0).contains(&lo));
        assert!((0.0..=1.0).contains(&hi));

        // More evidence tightens the interval.
        let (lo2, hi2) = credible_interval(60.0, 30.0, 0.95);
        assert!(hi2 - lo2 < hi - lo);
    }

    #[test]
    fn test_credible_interval_degenerate_params() {
        assert_eq!(credible_interval(0.0, 0.0, 0.95), (0.0, 1.0));
    }
}
