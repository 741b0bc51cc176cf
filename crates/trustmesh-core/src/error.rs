//! Error types for the TrustMesh facade.

use thiserror::Error;

/// Error type for facade operations.
///
/// Component errors pass through unchanged so callers can match on the
/// structured reasons (`ProtocolViolation`, `InsufficientWitnesses`,
/// `DisputeUnresolved`, ...); the facade adds only the concerns it owns:
/// authorization, agent existence and write contention.
#[derive(Debug, Error)]
pub enum TrustError {
    /// A reputation-math invariant was violated.
    #[error(transparent)]
    Reputation(#[from] trustmesh_reputation::ReputationError),

    /// A session lifecycle rule was violated.
    #[error(transparent)]
    Session(#[from] trustmesh_session::SessionError),

    /// Witness selection, solicitation or aggregation failed.
    #[error(transparent)]
    Witness(#[from] trustmesh_witness::WitnessError),

    /// The ledger failed.
    #[error(transparent)]
    Ledger(#[from] trustmesh_ledger::LedgerError),

    /// A document could not be encoded or decoded.
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// The authorization collaborator rejected the request.
    #[error("unauthorized: {reason}")]
    Unauthorized {
        /// Why the collaborator refused.
        reason: String,
    },

    /// No reputation record exists for the agent.
    #[error("unknown agent `{agent_id}`")]
    UnknownAgent {
        /// The missing agent.
        agent_id: String,
    },

    /// A record already exists where a fresh one was to be created.
    #[error("agent `{agent_id}` already has a reputation record")]
    AgentExists {
        /// The conflicting agent.
        agent_id: String,
    },

    /// A conditional write kept losing to concurrent writers.
    #[error("write contention persisted after {attempts} attempts")]
    Concurrency {
        /// How many attempts were made before giving up.
        attempts: u32,
    },
}
