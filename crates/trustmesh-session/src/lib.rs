//! # TrustMesh Session
//!
//! The interaction lifecycle between two agents: from mutual agreement to
//! interact, through bilateral outcome rating, to a signed record
//! published on the ledger, with dispute resolution in between when the
//! parties disagree.
//!
//! ## Lifecycle
//!
//! ```text
//! Created ─▶ WorkStarted ─▶ WorkCompleted ─▶ OutcomePending
//!                                                 │
//!                          divergence <= 0.15     │     divergence > 0.15
//!                       ┌─────────────────────────┴──────────────────┐
//!                       ▼                                            ▼
//!                    Agreed                                      Disputed
//!                       │                                            │
//!                       │                                        Resolving ──▶ Abandoned
//!                       │                                            │
//!                       │                                        Resolved
//!                       └──────────────┬─────────────────────────────┘
//!                                      ▼
//!                                   Signed ─▶ Published | PublishedInvalid
//! ```
//!
//! ## Guarantees
//!
//! - A disputed session cannot be signed or published until a resolution
//!   strategy terminates the dispute; there is no silent averaging.
//! - Signatures cover the canonical encoding of the record minus the
//!   signature and ledger-proof fields, so both parties and any verifier
//!   compute identical bytes.
//! - Once both signatures are present and the record is published, it is
//!   immutable.

pub mod agreement;
pub mod coordinator;
pub mod dispute;
pub mod models;
pub mod signing;

mod error;

pub use agreement::{check_agreement, AgreementVerdict, DIVERGENCE_THRESHOLD};
pub use coordinator::{OutcomeDecision, SessionCoordinator};
pub use dispute::{
    abandon, begin_resolution, escalate_to_adjudicator, resolve, DefaultRule, Resolution,
};
pub use error::SessionError;
pub use models::{
    DisputeRecord, DisputeStatus, LedgerProof, OutcomeMethod, Participants, Party, Ratings,
    SessionOutcome, SessionRecord, SessionState,
};
pub use signing::{signing_bytes, verify_detached, Ed25519Signer};

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
