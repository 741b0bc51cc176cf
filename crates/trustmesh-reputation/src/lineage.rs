//! # Fork Lineage
//!
//! A fork is a discrete event marking a change to an agent's underlying
//! implementation. Trust does not carry over for free: each fork type has
//! a protocol-enforced maximum weight at which the child may inherit the
//! parent's evidence, and starts a probation period.
//!
//! | Fork type | Max weight | Probation |
//! |-----------|-----------|-----------|
//! | `bugfix` | 1.0 | 7 days |
//! | `major` | 0.5 | 14 days |
//! | `override` | 0.1 | 30 days |
//!
//! ## Re-basing
//!
//! At fork time the child's belief becomes
//! `Beta(parent.alpha * w + 2, parent.beta * w + 2)`: the discounted
//! parent evidence plus a fresh neutral prior, so even an `override` fork
//! never starts at zero confidence.
//!
//! ## Cumulative Lineage Factor
//!
//! An agent N generations from the root carries the product of every
//! ancestor's effective fork weight as a discount on all future evidence.
//! The walk is bounded by [`MAX_LINEAGE_DEPTH`] and memoized per agent;
//! the memo is invalidated only when that agent forks again.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{ForkLineageEntry, ParentSnapshot, ReputationRecord, NEUTRAL_PRIOR};
use crate::probation::ProbationState;
use crate::{ReputationError, Result};

/// Bound on the ancestor-chain walk; adversarially long fork chains fail
/// instead of being silently truncated.
pub const MAX_LINEAGE_DEPTH: usize = 32;

/// The kind of implementation change a fork declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForkType {
    /// Behavior-preserving fix; trust carries at full weight.
    Bugfix,
    /// Substantial change; trust carries at half weight.
    Major,
    /// Replacement of core behavior; trust barely carries.
    Override,
}

impl ForkType {
    /// The protocol-enforced maximum inheritable weight.
    pub const fn max_weight(self) -> f64 {
        match self {
            ForkType::Bugfix => 1.0,
            ForkType::Major => 0.5,
            ForkType::Override => 0.1,
        }
    }

    /// Probation period length for this fork type.
    pub const fn probation_days(self) -> i64 {
        match self {
            ForkType::Bugfix => 7,
            ForkType::Major => 14,
            ForkType::Override => 30,
        }
    }
}

/// Creates a forked child record from a parent.
///
/// The claimed weight is checked against the fork type's maximum before
/// anything is computed; the effective weight is `min(claimed, maximum)`
/// (a claim at or below the maximum is taken as-is).
///
/// # Errors
///
/// [`ReputationError::ProtocolViolation`] if `claimed_weight` exceeds the
/// type maximum, and [`ReputationError::LineageDepthExceeded`] if the
/// parent chain is already at the depth bound.
pub fn fork(
    parent: &ReputationRecord,
    child_id: impl Into<String>,
    fork_id: impl Into<String>,
    fork_type: ForkType,
    claimed_weight: f64,
    now: DateTime<Utc>,
) -> Result<ReputationRecord> {
    let maximum = fork_type.max_weight();
    if claimed_weight > maximum || claimed_weight < 0.0 || !claimed_weight.is_finite() {
        warn!(
            parent = %parent.agent_id,
            ?fork_type,
            claimed_weight,
            maximum,
            "fork weight rejected"
        );
        return Err(ReputationError::ProtocolViolation {
            fork_type,
            claimed: claimed_weight,
            maximum,
        });
    }
    if parent.fork_lineage.len() >= MAX_LINEAGE_DEPTH {
        return Err(ReputationError::LineageDepthExceeded {
            agent_id: parent.agent_id.clone(),
            max_depth: MAX_LINEAGE_DEPTH,
        });
    }

    let child_id = child_id.into();
    let effective = claimed_weight.min(maximum);

    let mut lineage = parent.fork_lineage.clone();
    lineage.push(ForkLineageEntry {
        parent_id: parent.agent_id.clone(),
        fork_id: fork_id.into(),
        fork_type,
        fork_weight: effective,
        inherited_at: now,
        parent_snapshot: ParentSnapshot {
            alpha: parent.alpha,
            beta: parent.beta,
        },
    });

    let child = ReputationRecord {
        agent_id: child_id.clone(),
        // Discounted inheritance plus neutral prior: a fork never starts
        // at zero confidence.
        alpha: parent.alpha * effective + NEUTRAL_PRIOR,
        beta: parent.beta * effective + NEUTRAL_PRIOR,
        last_updated: now,
        last_session_id: None,
        fork_lineage: lineage,
        probation: Some(ProbationState::begin(fork_type, now)),
        signature: None,
    };

    debug!(
        parent = %parent.agent_id,
        child = %child_id,
        ?fork_type,
        effective,
        child_score = child.score(),
        "fork created"
    );
    Ok(child)
}

/// Computes cumulative lineage factors with a per-agent memo.
///
/// The factor for a record is the product of every lineage entry's
/// effective weight. Entries are themselves re-validated against their
/// type maxima, so a forged record claiming an over-limit inherited
/// weight is rejected on read as well as on write.
#[derive(Debug, Default)]
pub struct LineageResolver {
    max_depth: usize,
    // agent id -> (lineage length when computed, factor)
    cache: HashMap<String, (usize, f64)>,
}

impl LineageResolver {
    /// Creates a resolver with the default depth bound.
    pub fn new() -> Self {
        Self::with_max_depth(MAX_LINEAGE_DEPTH)
    }

    /// Creates a resolver with a custom depth bound.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            cache: HashMap::new(),
        }
    }

    /// Returns the cumulative lineage factor for a record, in `(0, 1]`.
    ///
    /// Memoized per agent; the memo entry is reused until the agent's
    /// lineage grows (a new fork event).
    ///
    /// # Errors
    ///
    /// [`ReputationError::LineageDepthExceeded`] for chains past the depth
    /// bound, [`ReputationError::ProtocolViolation`] for entries carrying
    /// an over-limit weight.
    pub fn factor(&mut self, record: &ReputationRecord) -> Result<f64> {
        if let Some((len, factor)) = self.cache.get(&record.agent_id) {
            if *len == record.fork_lineage.len() {
                return Ok(*factor);
            }
        }

        if record.fork_lineage.len() > self.max_depth {
            return Err(ReputationError::LineageDepthExceeded {
                agent_id: record.agent_id.clone(),
                max_depth: self.max_depth,
            });
        }

        let mut factor = 1.0;
        for entry in &record.fork_lineage {
            let maximum = entry.fork_type.max_weight();
            if entry.fork_weight > maximum || entry.fork_weight <= 0.0 {
                return Err(ReputationError::ProtocolViolation {
                    fork_type: entry.fork_type,
                    claimed: entry.fork_weight,
                    maximum,
                });
            }
            factor *= entry.fork_weight;
        }

        self.cache
            .insert(record.agent_id.clone(), (record.fork_lineage.len(), factor));
        Ok(factor)
    }

    /// Drops the memo for an agent; called when a new fork event occurs.
    pub fn invalidate(&mut self, agent_id: &str) {
        self.cache.remove(agent_id);
    }
}
