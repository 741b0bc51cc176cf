//! # Session Coordinator
//!
//! Drives a [`SessionRecord`] through its lifecycle state machine. Every
//! transition validates the current state first; an operation attempted
//! out of order fails with `InvalidTransition` and leaves the record
//! untouched.
//!
//! The coordinator owns only in-record state; cross-agent consistency is
//! the ledger's job. Publication writes the record and its per-agent
//! pointers through the [`LedgerClient`] contract and attaches the
//! returned content id as proof.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use trustmesh_ledger::{paths, LedgerClient};

use crate::agreement::{check_agreement, AgreementVerdict, DIVERGENCE_THRESHOLD};
use crate::models::{
    DisputeRecord, DisputeStatus, LedgerProof, OutcomeMethod, Participants, Party, Ratings,
    SessionOutcome, SessionRecord, SessionState, Signatures,
};
use crate::signing::{signing_bytes, verify_record_signature, Ed25519Signer};
use crate::{Result, SessionError};

/// What `record_outcome` decided.
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeDecision {
    /// Ratings converged; the session moved to `Agreed`.
    Agreed {
        /// The bilateral outcome.
        outcome: f64,
    },
    /// Ratings diverged; the session moved to `Disputed`.
    Disputed {
        /// The dispute raised for the session.
        dispute: DisputeRecord,
    },
}

/// The session lifecycle state machine.
#[derive(Debug, Clone)]
pub struct SessionCoordinator {
    divergence_threshold: f64,
}

impl Default for SessionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionCoordinator {
    /// Creates a coordinator with the protocol divergence threshold.
    pub fn new() -> Self {
        Self {
            divergence_threshold: DIVERGENCE_THRESHOLD,
        }
    }

    /// Creates a session record on handshake acceptance.
    ///
    /// Outcome and work timestamps start null. The provider's probation
    /// multiplier is snapshotted here so this session's evidence weight
    /// is fixed at creation regardless of when the outcome lands.
    pub fn create(
        &self,
        handshake_id: impl Into<String>,
        provider_id: impl Into<String>,
        requester_id: impl Into<String>,
        task_summary: impl Into<String>,
        probation_multiplier: f64,
        now: DateTime<Utc>,
    ) -> SessionRecord {
        let session_id = Uuid::new_v4().to_string();
        debug!(session = %session_id, "session created");
        SessionRecord {
            session_id,
            handshake_id: handshake_id.into(),
            participants: Participants {
                provider_id: provider_id.into(),
                requester_id: requester_id.into(),
            },
            task_summary: task_summary.into(),
            state: SessionState::Created,
            outcome: SessionOutcome::default(),
            created_at: now,
            work_started_at: None,
            work_completed_at: None,
            actual_duration_secs: None,
            probation_multiplier_snapshot: probation_multiplier,
            witnesses: Vec::new(),
            dispute: None,
            signatures: Signatures::default(),
            ledger_proof: None,
        }
    }

    /// Marks work as started.
    pub fn start_work(&self, record: &mut SessionRecord, now: DateTime<Utc>) -> Result<()> {
        self.expect_state(record, SessionState::Created, "start work")?;
        record.work_started_at = Some(now);
        record.state = SessionState::WorkStarted;
        Ok(())
    }

    /// Marks work as completed and records the actual duration.
    pub fn complete_work(&self, record: &mut SessionRecord, now: DateTime<Utc>) -> Result<()> {
        self.expect_state(record, SessionState::WorkStarted, "complete work")?;
        record.work_completed_at = Some(now);
        record.actual_duration_secs = record
            .work_started_at
            .map(|started| (now - started).num_seconds());
        record.state = SessionState::WorkCompleted;
        Ok(())
    }

    /// Submits one party's outcome rating.
    ///
    /// The first rating moves the session to `OutcomePending`; once both
    /// are present the bilateral agreement check runs automatically.
    pub fn submit_rating(
        &self,
        record: &mut SessionRecord,
        party: Party,
        rating: f64,
        now: DateTime<Utc>,
    ) -> Result<Option<OutcomeDecision>> {
        if !matches!(
            record.state,
            SessionState::WorkCompleted | SessionState::OutcomePending
        ) {
            return Err(SessionError::InvalidTransition {
                action: "submit rating",
                state: record.state,
            });
        }
        if !(0.0..=1.0).contains(&rating) || !rating.is_finite() {
            return Err(SessionError::InvalidRating { value: rating });
        }

        match party {
            Party::Provider => record.outcome.ratings.provider = Some(rating),
            Party::Requester => record.outcome.ratings.requester = Some(rating),
        }
        record.state = SessionState::OutcomePending;

        match record.outcome.ratings.both() {
            Some((provider, requester)) => self
                .decide_outcome(record, provider, requester, now)
                .map(Some),
            None => Ok(None),
        }
    }

    /// Records both ratings at once and runs the agreement check.
    pub fn record_outcome(
        &self,
        record: &mut SessionRecord,
        provider_rating: f64,
        requester_rating: f64,
        now: DateTime<Utc>,
    ) -> Result<OutcomeDecision> {
        if !matches!(
            record.state,
            SessionState::WorkCompleted | SessionState::OutcomePending
        ) {
            return Err(SessionError::InvalidTransition {
                action: "record outcome",
                state: record.state,
            });
        }
        // Validate both before mutating either.
        let verdict = check_agreement(provider_rating, requester_rating)?;
        record.outcome.ratings = Ratings {
            provider: Some(provider_rating),
            requester: Some(requester_rating),
        };
        self.apply_verdict(record, verdict, now)
    }

    fn decide_outcome(
        &self,
        record: &mut SessionRecord,
        provider_rating: f64,
        requester_rating: f64,
        now: DateTime<Utc>,
    ) -> Result<OutcomeDecision> {
        let verdict = check_agreement(provider_rating, requester_rating)?;
        self.apply_verdict(record, verdict, now)
    }

    fn apply_verdict(
        &self,
        record: &mut SessionRecord,
        verdict: AgreementVerdict,
        _now: DateTime<Utc>,
    ) -> Result<OutcomeDecision> {
        match verdict {
            AgreementVerdict::Agreed { outcome, divergence } => {
                record.outcome.agreed_outcome = Some(outcome);
                record.outcome.method = Some(OutcomeMethod::Bilateral);
                record.state = SessionState::Agreed;
                info!(
                    session = %record.session_id,
                    outcome,
                    divergence,
                    "bilateral agreement"
                );
                Ok(OutcomeDecision::Agreed { outcome })
            }
            AgreementVerdict::Diverged { divergence } => {
                let dispute = DisputeRecord {
                    dispute_id: Uuid::new_v4().to_string(),
                    session_id: record.session_id.clone(),
                    divergence,
                    ratings: record.outcome.ratings,
                    resolution_method: None,
                    status: DisputeStatus::Open,
                    resolution: None,
                    resolved_at: None,
                };
                record.dispute = Some(dispute.clone());
                record.state = SessionState::Disputed;
                warn!(
                    session = %record.session_id,
                    divergence,
                    threshold = self.divergence_threshold,
                    "ratings diverged, dispute raised"
                );
                Ok(OutcomeDecision::Disputed { dispute })
            }
        }
    }

    /// Applies one party's signature over the canonical record bytes.
    ///
    /// Allowed only after the outcome is finalized (`Agreed` or
    /// `Resolved`); once both parties have signed, the session moves to
    /// `Signed`.
    ///
    /// # Errors
    ///
    /// - `DisputeUnresolved` while a dispute lacks a terminal outcome
    /// - `InvalidTransition` if the outcome phase is not finished
    pub fn sign(
        &self,
        record: &mut SessionRecord,
        party: Party,
        signer: &Ed25519Signer,
    ) -> Result<()> {
        if record.dispute_unresolved() {
            return Err(SessionError::DisputeUnresolved {
                session_id: record.session_id.clone(),
            });
        }
        if !matches!(
            record.state,
            SessionState::Agreed | SessionState::Resolved | SessionState::Signed
        ) {
            return Err(SessionError::InvalidTransition {
                action: "sign",
                state: record.state,
            });
        }

        let bytes = signing_bytes(record)?;
        let signature = signer.sign(&bytes);
        match party {
            Party::Provider => record.signatures.provider = Some(signature),
            Party::Requester => record.signatures.requester = Some(signature),
        }
        if record.fully_signed() {
            record.state = SessionState::Signed;
            debug!(session = %record.session_id, "both signatures present");
        }
        Ok(())
    }

    /// Verifies both stored signatures against the parties' public keys.
    ///
    /// # Errors
    ///
    /// [`SessionError::Signature`] on absence or mismatch.
    pub fn verify_signatures(
        &self,
        record: &SessionRecord,
        provider_public_key_hex: &str,
        requester_public_key_hex: &str,
    ) -> Result<()> {
        verify_record_signature(
            record,
            record.signatures.provider.as_deref(),
            provider_public_key_hex,
        )?;
        verify_record_signature(
            record,
            record.signatures.requester.as_deref(),
            requester_public_key_hex,
        )
    }

    /// Publishes a fully signed session to the ledger.
    ///
    /// Writes the session record plus the two per-agent pointers, and
    /// attaches the resulting [`LedgerProof`]. A session whose dispute
    /// terminated without a valid outcome (null resolution) lands in
    /// `PublishedInvalid` instead of `Published`.
    ///
    /// Publication is idempotent at the ledger level; the caller's
    /// reputation trigger is separately guarded per session id.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless the session is `Signed`;
    /// `DisputeUnresolved` if a dispute is somehow still open.
    pub async fn publish(
        &self,
        record: &mut SessionRecord,
        ledger: &dyn LedgerClient,
        now: DateTime<Utc>,
    ) -> Result<LedgerProof> {
        if record.dispute_unresolved() {
            return Err(SessionError::DisputeUnresolved {
                session_id: record.session_id.clone(),
            });
        }
        self.expect_state(record, SessionState::Signed, "publish")?;

        // The published payload carries signatures but not the proof,
        // which only exists once the write succeeds.
        let payload = serde_json::to_vec(&*record)?;
        let content_id = ledger.put(&paths::session(&record.session_id), &payload).await?;

        let session_path = paths::session(&record.session_id);
        for agent in [
            &record.participants.provider_id,
            &record.participants.requester_id,
        ] {
            ledger
                .put(
                    &paths::session_by_agent(agent, record.created_at, &record.session_id),
                    session_path.as_bytes(),
                )
                .await?;
        }
        if let Some(dispute) = &record.dispute {
            ledger
                .put(
                    &paths::dispute(&record.session_id),
                    &serde_json::to_vec(dispute)?,
                )
                .await?;
        }

        let proof = LedgerProof {
            content_id,
            published_at: now,
        };
        record.ledger_proof = Some(proof.clone());
        record.state = if record.has_valid_outcome() {
            SessionState::Published
        } else {
            SessionState::PublishedInvalid
        };
        info!(
            session = %record.session_id,
            content_id = %proof.content_id,
            state = ?record.state,
            "session published"
        );
        Ok(proof)
    }

    fn expect_state(
        &self,
        record: &SessionRecord,
        expected: SessionState,
        action: &'static str,
    ) -> Result<()> {
        if record.state != expected {
            return Err(SessionError::InvalidTransition {
                action,
                state: record.state,
            });
        }
        Ok(())
    }
}
