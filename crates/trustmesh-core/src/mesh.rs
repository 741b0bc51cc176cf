//! The unified TrustMesh facade.
//!
//! [`TrustMesh`] wires the reputation math, the session lifecycle and the
//! witness machinery together over one shared [`LedgerClient`], and is
//! the only component that performs reputation writes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use trustmesh_ledger::LedgerClient;
use trustmesh_ledger::paths;
use trustmesh_reputation::{
    fork, update, EvidenceWeight, ForkType, LineageResolver, ReputationRecord,
};
use trustmesh_session::{
    dispute, OutcomeDecision, Party, Resolution, SessionCoordinator, SessionRecord, SessionState,
};
use trustmesh_session::signing::Ed25519Signer;
use trustmesh_witness::{
    solicit, QuorumPolicy, WitnessCandidate, WitnessClient, WitnessSelector,
};

use crate::collaborators::{AllowAll, Authorizer, ExperienceSink, NullExperienceSink};
use crate::config::{TrustMeshConfig, TrustPolicy};
use crate::decision::{TrustDecision, TrustShortfall};
use crate::store::ReputationStore;
use crate::Result;

/// The TrustMesh facade.
///
/// One instance per node, shared behind `Arc`; interior state is limited
/// to the lineage memo, so all methods take `&mut self` only where that
/// memo is touched.
///
/// # Example
///
/// ```rust,ignore
/// let ledger = Arc::new(SledLedger::open("./trustmesh.db")?);
/// let mut mesh = TrustMesh::new(TrustMeshConfig::default(), ledger);
///
/// let decision = mesh.evaluate_trust("agent-1", &policy).await?;
/// if decision.accept {
///     let session = mesh.create_session(token, "h1", "agent-1", "me", "task").await?;
/// }
/// ```
pub struct TrustMesh {
    /// Configuration.
    config: TrustMeshConfig,

    /// Shared ledger handle, also used directly for witness assembly.
    ledger: Arc<dyn LedgerClient>,

    /// Versioned reputation persistence.
    store: ReputationStore,

    /// Session lifecycle state machine.
    coordinator: SessionCoordinator,

    /// Memoized fork-lineage factors.
    lineage: LineageResolver,

    /// Authorization collaborator.
    authorizer: Arc<dyn Authorizer>,

    /// Capability-experience collaborator.
    experience: Arc<dyn ExperienceSink>,
}

impl TrustMesh {
    /// Creates a facade with permissive no-op collaborators.
    pub fn new(config: TrustMeshConfig, ledger: Arc<dyn LedgerClient>) -> Self {
        let store = ReputationStore::with_retry(Arc::clone(&ledger), config.retry.clone());
        Self {
            config,
            ledger,
            store,
            coordinator: SessionCoordinator::new(),
            lineage: LineageResolver::new(),
            authorizer: Arc::new(AllowAll),
            experience: Arc::new(NullExperienceSink),
        }
    }

    /// Attaches the node's updater signing identity; reputation records
    /// written from here on carry its signature.
    pub fn with_node_signer(mut self, signer: Arc<Ed25519Signer>) -> Self {
        self.store = self.store.clone().with_signer(signer);
        self
    }

    /// Replaces the collaborators.
    pub fn with_collaborators(
        mut self,
        authorizer: Arc<dyn Authorizer>,
        experience: Arc<dyn ExperienceSink>,
    ) -> Self {
        self.authorizer = authorizer;
        self.experience = experience;
        self
    }

    /// The underlying reputation store.
    pub fn store(&self) -> &ReputationStore {
        &self.store
    }

    /// Registers a new root agent with the neutral prior.
    pub async fn register_agent(
        &self,
        agent_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ReputationRecord> {
        let record = ReputationRecord::new_root(agent_id, now);
        self.store.insert(&record).await?;
        info!(agent = agent_id, "agent registered");
        Ok(record)
    }

    /// Returns an agent's current reputation record.
    pub async fn query_reputation(&self, agent_id: &str) -> Result<ReputationRecord> {
        self.store.require(agent_id).await
    }

    /// Evaluates an agent against a trust policy.
    ///
    /// An unknown agent is a rejection, not an error: the decision
    /// carries the `UnknownAgent` shortfall.
    pub async fn evaluate_trust(
        &self,
        agent_id: &str,
        policy: &TrustPolicy,
    ) -> Result<TrustDecision> {
        let Some(record) = self.store.load(agent_id).await? else {
            return Ok(TrustDecision::reject(
                0.0,
                0.0,
                vec![TrustShortfall::UnknownAgent],
            ));
        };

        let score = record.score();
        let confidence = record.n_eff();
        let mut shortfalls = Vec::new();
        if score < policy.min_score {
            shortfalls.push(TrustShortfall::ScoreBelowMinimum {
                required: policy.min_score,
                actual: score,
            });
        }
        if confidence < policy.min_confidence {
            shortfalls.push(TrustShortfall::ConfidenceBelowMinimum {
                required: policy.min_confidence,
                actual: confidence,
            });
        }

        debug!(
            agent = agent_id,
            score,
            confidence,
            accept = shortfalls.is_empty(),
            "trust evaluated"
        );
        if shortfalls.is_empty() {
            Ok(TrustDecision::accept(score, confidence))
        } else {
            Ok(TrustDecision::reject(score, confidence, shortfalls))
        }
    }

    /// Registers a fork of an existing agent.
    ///
    /// The child's record is derived from the parent per the fork type's
    /// inheritance rule and written as a fresh document; the parent is
    /// untouched.
    pub async fn register_fork(
        &mut self,
        parent_id: &str,
        child_id: &str,
        fork_id: &str,
        fork_type: ForkType,
        claimed_weight: f64,
        now: DateTime<Utc>,
    ) -> Result<ReputationRecord> {
        let parent = self.store.require(parent_id).await?;
        let child = fork(&parent, child_id, fork_id, fork_type, claimed_weight, now)?;
        self.store.insert(&child).await?;
        self.lineage.invalidate(child_id);
        info!(
            parent = parent_id,
            child = child_id,
            ?fork_type,
            "fork registered"
        );
        Ok(child)
    }

    /// Creates a session between two agents after an authorization check.
    ///
    /// The provider's probation multiplier is snapshotted into the
    /// session here, so the evidence weighting of this session is fixed
    /// no matter when its outcome finally lands.
    pub async fn create_session(
        &self,
        token: &str,
        handshake_id: &str,
        provider_id: &str,
        requester_id: &str,
        task_summary: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionRecord> {
        self.authorizer
            .check_authorization(token, task_summary)
            .await?;
        let mut provider = self.store.require(provider_id).await?;
        let multiplier = provider.probation_multiplier(now);
        Ok(self.coordinator.create(
            handshake_id,
            provider_id,
            requester_id,
            task_summary,
            multiplier,
            now,
        ))
    }

    /// Marks session work as started.
    pub fn start_work(&self, session: &mut SessionRecord, now: DateTime<Utc>) -> Result<()> {
        Ok(self.coordinator.start_work(session, now)?)
    }

    /// Marks session work as completed.
    pub fn complete_work(&self, session: &mut SessionRecord, now: DateTime<Utc>) -> Result<()> {
        Ok(self.coordinator.complete_work(session, now)?)
    }

    /// Records both participants' outcome ratings.
    pub fn record_outcome(
        &self,
        session: &mut SessionRecord,
        provider_rating: f64,
        requester_rating: f64,
        now: DateTime<Utc>,
    ) -> Result<OutcomeDecision> {
        Ok(self
            .coordinator
            .record_outcome(session, provider_rating, requester_rating, now)?)
    }

    /// Applies a resolution strategy to a disputed session.
    pub fn resolve_dispute(
        &self,
        session: &mut SessionRecord,
        resolution: Resolution,
        now: DateTime<Utc>,
    ) -> Result<()> {
        Ok(dispute::resolve(session, resolution, now)?)
    }

    /// Resolves a dispute by witness review: select, solicit, aggregate.
    ///
    /// Witnesses are drawn from the ledger per the selection policy,
    /// solicited concurrently under the configured deadline, and their
    /// attestations aggregated per the aggregation policy.
    pub async fn resolve_by_witness_review(
        &self,
        session: &mut SessionRecord,
        client: Arc<dyn WitnessClient>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let candidates = self.witness_candidates(session).await?;
        let selector = WitnessSelector::new(self.config.selection.clone());
        let participants = [
            session.participants.provider_id.as_str(),
            session.participants.requester_id.as_str(),
        ];
        let selected = selector.select(&candidates, &participants)?;
        let witness_ids: Vec<String> =
            selected.into_iter().map(|c| c.agent_id).collect();
        session.witnesses = witness_ids.clone();

        let quorum = match self.config.solicitation.min_responses {
            Some(min) => QuorumPolicy::ReducedQuorum { min },
            None => QuorumPolicy::Abort,
        };
        let attestations = solicit(
            client,
            &witness_ids,
            &session.session_id,
            Duration::from_millis(self.config.solicitation.deadline_ms),
            quorum,
        )
        .await?;

        self.resolve_dispute(
            session,
            Resolution::WitnessConsensus {
                attestations,
                policy: self.config.aggregation.clone(),
            },
            now,
        )
    }

    /// Applies one participant's signature.
    pub fn sign_session(
        &self,
        session: &mut SessionRecord,
        party: Party,
        signer: &Ed25519Signer,
    ) -> Result<()> {
        Ok(self.coordinator.sign(session, party, signer)?)
    }

    /// Publishes a signed session and applies its reputation effect.
    ///
    /// The provider's record is updated under optimistic concurrency; the
    /// per-session duplicate guard makes publish retries safe. A session
    /// without a valid outcome (null resolution) publishes for the audit
    /// trail but contributes no evidence.
    ///
    /// Re-invoking on an already-published session is allowed: the ledger
    /// write is skipped and only the reputation trigger re-runs. This is
    /// how a caller recovers when the ledger half landed but the
    /// reputation write failed (say, with persistent contention).
    pub async fn publish_session(
        &mut self,
        session: &mut SessionRecord,
        weight: f64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !matches!(
            session.state,
            SessionState::Published | SessionState::PublishedInvalid
        ) {
            self.coordinator
                .publish(session, self.ledger.as_ref(), now)
                .await?;
        }

        let Some(outcome) = session.outcome.agreed_outcome else {
            info!(
                session = %session.session_id,
                "published without outcome, no reputation effect"
            );
            return Ok(());
        };

        let provider_id = session.participants.provider_id.clone();
        let session_id = session.session_id.clone();
        let disputed = session.dispute.is_some();
        let multiplier = session.probation_multiplier_snapshot;
        let lineage = &mut self.lineage;

        self.store
            .update_with(&provider_id, now, |record| {
                let evidence = EvidenceWeight {
                    weight,
                    fork_factor: lineage.factor(record)?,
                    probation_multiplier: multiplier,
                };
                let applied = update(record, outcome, evidence, &session_id, now)?;
                if applied {
                    if let Some(probation) = record.probation.as_mut() {
                        probation.record_task(&session_id, outcome, disputed, now);
                    }
                }
                Ok(())
            })
            .await?;

        self.experience
            .increment_experience(&provider_id, &session.task_summary, outcome)
            .await;
        Ok(())
    }

    /// Assembles the witness candidate pool from the ledger.
    ///
    /// Every agent with a current reputation record is a candidate except
    /// the participants themselves; the anti-collusion ratios are derived
    /// from each participant's recent published sessions.
    async fn witness_candidates(
        &self,
        session: &SessionRecord,
    ) -> Result<Vec<WitnessCandidate>> {
        let participants = [
            session.participants.provider_id.as_str(),
            session.participants.requester_id.as_str(),
        ];

        // Witness sets of each participant's last `lookback` sessions;
        // pointer keys embed the creation timestamp, so the listing is
        // chronological and its tail is the newest sessions. One ledger
        // pass shared by every candidate.
        let mut recent_witness_sets: Vec<Vec<Vec<String>>> = Vec::new();
        for participant in participants {
            let pointers = self
                .ledger
                .list(&paths::session_by_agent_prefix(participant))
                .await?;
            let window = pointers
                .iter()
                .rev()
                .take(self.config.selection.lookback)
                .collect::<Vec<_>>();

            let mut sets = Vec::new();
            for pointer in window {
                let Some(target) = self.ledger.get(pointer).await? else {
                    continue;
                };
                let session_path = String::from_utf8_lossy(&target).into_owned();
                if let Some(payload) = self.ledger.get(&session_path).await? {
                    let published: SessionRecord = serde_json::from_slice(&payload)?;
                    sets.push(published.witnesses);
                }
            }
            recent_witness_sets.push(sets);
        }

        let mut candidates = Vec::new();
        for path in self.ledger.list("reputation/").await? {
            let Some(agent_id) = path
                .strip_prefix("reputation/")
                .and_then(|rest| rest.strip_suffix("/current"))
            else {
                continue; // history entries
            };
            if participants.contains(&agent_id) {
                continue;
            }
            let Some(payload) = self.ledger.get(&path).await? else {
                continue;
            };
            let record: ReputationRecord = serde_json::from_slice(&payload)?;

            let participant_ratios = recent_witness_sets
                .iter()
                .map(|sets| {
                    if sets.is_empty() {
                        return 0.0;
                    }
                    let witnessed = sets
                        .iter()
                        .filter(|witnesses| witnesses.iter().any(|w| w == agent_id))
                        .count();
                    witnessed as f64 / sets.len() as f64
                })
                .collect();

            candidates.push(WitnessCandidate {
                agent_id: agent_id.to_string(),
                score: record.score(),
                n_eff: record.n_eff(),
                participant_ratios,
            });
        }

        debug!(
            session = %session.session_id,
            pool = candidates.len(),
            "witness candidate pool assembled"
        );
        Ok(candidates)
    }
}

impl std::fmt::Debug for TrustMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustMesh")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
