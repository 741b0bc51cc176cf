//! Error types for session operations.

use thiserror::Error;

use crate::models::SessionState;

/// Error type for the session lifecycle.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A rating outside `[0, 1]` was submitted.
    #[error("invalid rating {value}: must be within [0, 1]")]
    InvalidRating {
        /// The rejected rating.
        value: f64,
    },

    /// An operation was attempted in a state that does not allow it.
    #[error("invalid transition: cannot {action} while {state:?}")]
    InvalidTransition {
        /// The operation that was attempted.
        action: &'static str,
        /// The state the session was in.
        state: SessionState,
    },

    /// A signature is missing, malformed, or fails verification.
    #[error("signature error: {reason}")]
    Signature {
        /// What went wrong.
        reason: String,
    },

    /// Sign/publish attempted while the dispute lacks a terminal outcome.
    #[error("dispute on session `{session_id}` is unresolved")]
    DisputeUnresolved {
        /// The blocked session.
        session_id: String,
    },

    /// Witness machinery failed during dispute resolution.
    #[error("witness error: {0}")]
    Witness(#[from] trustmesh_witness::WitnessError),

    /// The ledger refused or failed the publication write.
    #[error("ledger error: {0}")]
    Ledger(#[from] trustmesh_ledger::LedgerError),

    /// The record could not be canonically encoded.
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}
