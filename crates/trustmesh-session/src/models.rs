//! Session data model.
//!
//! The [`SessionRecord`] is created on handshake acceptance with all
//! outcome and timestamp fields null, mutated jointly by both
//! participants through the work and outcome phases, and becomes
//! immutable once both signatures are present and the record is
//! published.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trustmesh_witness::WitnessAttestation;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Handshake accepted; nothing has happened yet.
    Created,
    /// The provider started the task.
    WorkStarted,
    /// The task finished; duration recorded.
    WorkCompleted,
    /// Waiting for one or both outcome ratings.
    OutcomePending,
    /// Ratings converged bilaterally.
    Agreed,
    /// Ratings diverged; a dispute record exists.
    Disputed,
    /// A resolution strategy is in flight.
    Resolving,
    /// The dispute reached a terminal outcome.
    Resolved,
    /// Both participants signed the record.
    Signed,
    /// The record is on the ledger; terminal.
    Published,
    /// Published with no reputation-bearing outcome (null resolution);
    /// terminal.
    PublishedInvalid,
    /// An operator explicitly abandoned an unresolvable dispute;
    /// terminal.
    Abandoned,
}

impl SessionState {
    /// Whether the session can never change again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Published | SessionState::PublishedInvalid | SessionState::Abandoned
        )
    }
}

/// The two sides of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    /// The agent performing the task; its reputation is updated.
    Provider,
    /// The agent that requested the task.
    Requester,
}

/// The participants of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participants {
    /// The evaluated agent.
    pub provider_id: String,
    /// The requesting agent.
    pub requester_id: String,
}

impl Participants {
    /// The agent id for a given party.
    pub fn id_of(&self, party: Party) -> &str {
        match party {
            Party::Provider => &self.provider_id,
            Party::Requester => &self.requester_id,
        }
    }
}

/// The pair of outcome ratings, one per participant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Ratings {
    /// The provider's self-rating of the outcome.
    pub provider: Option<f64>,
    /// The requester's rating of the outcome.
    pub requester: Option<f64>,
}

impl Ratings {
    /// Both ratings, once present.
    pub fn both(&self) -> Option<(f64, f64)> {
        Some((self.provider?, self.requester?))
    }
}

/// How the agreed outcome was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeMethod {
    /// Ratings converged within the divergence threshold.
    Bilateral,
    /// Witness consensus resolved a dispute.
    WitnessConsensus,
    /// A human adjudicator resolved a dispute.
    HumanAdjudication,
    /// A default-policy rule resolved a dispute.
    DefaultPolicy,
}

/// The outcome block of a session record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionOutcome {
    /// The participants' ratings.
    pub ratings: Ratings,
    /// The finalized outcome, absent for null resolutions.
    pub agreed_outcome: Option<f64>,
    /// How the outcome was reached.
    pub method: Option<OutcomeMethod>,
    /// Witness attestations, when a dispute went to witness review.
    pub witness_ratings: Vec<WitnessAttestation>,
    /// Whether witness consensus was achieved.
    pub consensus_achieved: bool,
}

/// The participants' signatures over the canonical record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signatures {
    /// Provider's hex signature.
    pub provider: Option<String>,
    /// Requester's hex signature.
    pub requester: Option<String>,
}

/// Proof of ledger publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerProof {
    /// SHA-256 content id of the published payload.
    pub content_id: String,
    /// When the write succeeded.
    pub published_at: DateTime<Utc>,
}

/// Status of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    /// Raised, no strategy chosen yet.
    Open,
    /// Suspended until an external adjudicator responds.
    AwaitingAdjudicator,
    /// Terminally resolved.
    Resolved,
    /// Explicitly abandoned by an operator.
    Abandoned,
}

/// How a dispute terminated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeResolution {
    /// A concrete outcome value was determined.
    Outcome(f64),
    /// The session was declared invalid; no reputation update.
    Invalid,
}

/// Record of a rating disagreement and its resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisputeRecord {
    /// Unique dispute id.
    pub dispute_id: String,
    /// The contested session.
    pub session_id: String,
    /// `|provider_rating - requester_rating|` at dispute time.
    pub divergence: f64,
    /// The diverging ratings.
    pub ratings: Ratings,
    /// The strategy that terminated the dispute, once one has.
    pub resolution_method: Option<OutcomeMethod>,
    /// Current status.
    pub status: DisputeStatus,
    /// The terminal resolution, once reached.
    pub resolution: Option<DisputeResolution>,
    /// When the dispute terminated.
    pub resolved_at: Option<DateTime<Utc>>,
}

/// A bilateral interaction record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Unique session id.
    pub session_id: String,
    /// The handshake that created the session.
    pub handshake_id: String,
    /// The two agents involved.
    pub participants: Participants,
    /// Human-readable description of the task.
    pub task_summary: String,
    /// Lifecycle state.
    pub state: SessionState,
    /// Outcome block; ratings fill in during the outcome phase.
    pub outcome: SessionOutcome,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When work started.
    pub work_started_at: Option<DateTime<Utc>>,
    /// When work completed.
    pub work_completed_at: Option<DateTime<Utc>>,
    /// `work_completed_at - work_started_at`, in seconds.
    pub actual_duration_secs: Option<i64>,
    /// The provider's probation multiplier, snapshotted at creation so
    /// the evidence weighting of this session is fixed and auditable.
    pub probation_multiplier_snapshot: f64,
    /// Witnesses attached to the session, if any.
    pub witnesses: Vec<String>,
    /// Dispute record, present once ratings diverged.
    pub dispute: Option<DisputeRecord>,
    /// Participant signatures.
    pub signatures: Signatures,
    /// Publication proof, present once on the ledger.
    pub ledger_proof: Option<LedgerProof>,
}

impl SessionRecord {
    /// Whether both participants have signed.
    pub fn fully_signed(&self) -> bool {
        self.signatures.provider.is_some() && self.signatures.requester.is_some()
    }

    /// Whether this session carries a reputation-bearing outcome.
    pub fn has_valid_outcome(&self) -> bool {
        self.outcome.agreed_outcome.is_some()
    }

    /// Whether the session's dispute, if any, still lacks a terminal
    /// outcome.
    pub fn dispute_unresolved(&self) -> bool {
        match &self.dispute {
            Some(dispute) => !matches!(
                dispute.status,
                DisputeStatus::Resolved | DisputeStatus::Abandoned
            ),
            None => false,
        }
    }
}
