//! # Dispute Resolution
//!
//! When bilateral ratings diverge, the session is blocked until one of
//! three strategies terminates the dispute:
//!
//! | Strategy            | Outcome method      | Notes                           |
//! |---------------------|---------------------|---------------------------------|
//! | Witness consensus   | `WitnessConsensus`  | Robust aggregate of attestations|
//! | Human adjudication  | `HumanAdjudication` | Externally supplied outcome     |
//! | Default policy      | `DefaultPolicy`     | Mechanical rule, last resort    |
//!
//! Strategies are tried in the caller's order: a failed witness consensus
//! leaves the dispute unresolved so the caller can escalate to
//! adjudication or fall back to a default rule. Only an operator may
//! abandon a dispute outright, which terminates the session without any
//! reputation effect.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use trustmesh_witness::{aggregate, AggregationPolicy, WitnessAttestation};

use crate::models::{
    DisputeResolution, DisputeStatus, OutcomeMethod, SessionRecord, SessionState,
};
use crate::{Result, SessionError};

/// Mechanical last-resort rules when no better strategy is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultRule {
    /// Take the lower of the two ratings. Biases against the provider,
    /// which keeps "dispute and hope" unprofitable for providers.
    Conservative,
    /// Take the mean of the two ratings.
    Split,
    /// Declare the session invalid: it publishes for the audit trail but
    /// carries no reputation-bearing outcome.
    Null,
}

/// A terminal strategy for a dispute.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Aggregate witness attestations into a consensus outcome.
    WitnessConsensus {
        /// The collected attestations.
        attestations: Vec<WitnessAttestation>,
        /// How to aggregate them.
        policy: AggregationPolicy,
    },
    /// An outcome supplied by a human adjudicator.
    Adjudicated {
        /// The adjudicated outcome, in `[0, 1]`.
        outcome: f64,
    },
    /// A mechanical default rule over the original ratings.
    Default(DefaultRule),
}

/// Moves a disputed session into `Resolving`.
///
/// # Errors
///
/// [`SessionError::InvalidTransition`] unless the session is `Disputed`.
pub fn begin_resolution(record: &mut SessionRecord) -> Result<()> {
    if record.state != SessionState::Disputed {
        return Err(SessionError::InvalidTransition {
            action: "begin resolution",
            state: record.state,
        });
    }
    record.state = SessionState::Resolving;
    Ok(())
}

/// Applies a resolution strategy to a disputed session.
///
/// On success the dispute is terminally `Resolved`, the session moves to
/// `Resolved`, and the outcome block records how the value was reached.
/// A failed witness consensus leaves the dispute open (the attestations
/// are still recorded) so the caller can try another strategy.
///
/// # Errors
///
/// - [`SessionError::InvalidTransition`] unless the session is
///   `Disputed` or `Resolving`
/// - [`SessionError::InvalidRating`] for an adjudicated outcome outside
///   `[0, 1]`
/// - [`SessionError::Witness`] when consensus cannot be reached
pub fn resolve(
    record: &mut SessionRecord,
    resolution: Resolution,
    now: DateTime<Utc>,
) -> Result<()> {
    if !matches!(
        record.state,
        SessionState::Disputed | SessionState::Resolving
    ) {
        return Err(SessionError::InvalidTransition {
            action: "resolve dispute",
            state: record.state,
        });
    }
    record.state = SessionState::Resolving;

    let (method, terminal) = match resolution {
        Resolution::WitnessConsensus {
            attestations,
            policy,
        } => {
            let ratings: Vec<f64> = attestations.iter().map(|a| a.rating).collect();
            record.outcome.witness_ratings = attestations;
            match aggregate(&ratings, &policy) {
                Ok(outcome) => {
                    record.outcome.consensus_achieved = true;
                    info!(
                        session = %record.session_id,
                        value = outcome.value,
                        agreement = outcome.agreement,
                        outliers = outcome.outliers.len(),
                        "witness consensus reached"
                    );
                    (
                        OutcomeMethod::WitnessConsensus,
                        DisputeResolution::Outcome(outcome.value),
                    )
                }
                Err(err) => {
                    record.outcome.consensus_achieved = false;
                    warn!(
                        session = %record.session_id,
                        error = %err,
                        "witness consensus failed, dispute remains open"
                    );
                    return Err(err.into());
                }
            }
        }
        Resolution::Adjudicated { outcome } => {
            if !(0.0..=1.0).contains(&outcome) || !outcome.is_finite() {
                return Err(SessionError::InvalidRating { value: outcome });
            }
            (
                OutcomeMethod::HumanAdjudication,
                DisputeResolution::Outcome(outcome),
            )
        }
        Resolution::Default(rule) => {
            let terminal = match (rule, record.outcome.ratings.both()) {
                (DefaultRule::Conservative, Some((provider, requester))) => {
                    DisputeResolution::Outcome(provider.min(requester))
                }
                (DefaultRule::Split, Some((provider, requester))) => {
                    DisputeResolution::Outcome((provider + requester) / 2.0)
                }
                // A null rule, or a dispute raised before both ratings
                // landed, voids the outcome.
                _ => DisputeResolution::Invalid,
            };
            (OutcomeMethod::DefaultPolicy, terminal)
        }
    };

    if let Some(dispute) = record.dispute.as_mut() {
        dispute.status = DisputeStatus::Resolved;
        dispute.resolution_method = Some(method);
        dispute.resolution = Some(terminal);
        dispute.resolved_at = Some(now);
    }
    match terminal {
        DisputeResolution::Outcome(value) => {
            record.outcome.agreed_outcome = Some(value);
            record.outcome.method = Some(method);
        }
        DisputeResolution::Invalid => {
            record.outcome.agreed_outcome = None;
            record.outcome.method = Some(method);
        }
    }
    record.state = SessionState::Resolved;
    info!(
        session = %record.session_id,
        ?method,
        resolution = ?terminal,
        "dispute resolved"
    );
    Ok(())
}

/// Marks a dispute as awaiting an external adjudicator.
///
/// The session stays blocked; this only records that escalation happened.
pub fn escalate_to_adjudicator(record: &mut SessionRecord) -> Result<()> {
    if !matches!(
        record.state,
        SessionState::Disputed | SessionState::Resolving
    ) {
        return Err(SessionError::InvalidTransition {
            action: "escalate dispute",
            state: record.state,
        });
    }
    record.state = SessionState::Resolving;
    if let Some(dispute) = record.dispute.as_mut() {
        dispute.status = DisputeStatus::AwaitingAdjudicator;
    }
    Ok(())
}

/// Operator-only: abandons an unresolvable dispute.
///
/// The session terminates with no reputation effect and never publishes.
///
/// # Errors
///
/// [`SessionError::InvalidTransition`] if there is no open dispute.
pub fn abandon(record: &mut SessionRecord, now: DateTime<Utc>) -> Result<()> {
    if !record.dispute_unresolved() {
        return Err(SessionError::InvalidTransition {
            action: "abandon dispute",
            state: record.state,
        });
    }
    if let Some(dispute) = record.dispute.as_mut() {
        dispute.status = DisputeStatus::Abandoned;
        dispute.resolved_at = Some(now);
    }
    record.outcome.agreed_outcome = None;
    record.state = SessionState::Abandoned;
    warn!(session = %record.session_id, "dispute abandoned by operator");
    Ok(())
}
