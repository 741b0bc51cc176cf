//! # TrustMesh Core
//!
//! Unified facade for the TrustMesh reputation substrate.
//! Orchestrates the reputation math, the session lifecycle and the
//! witness machinery over one shared ledger.
//!
//! ## Responsibilities
//!
//! | Concern | Component | Mechanism |
//! |---------|-----------|-----------|
//! | Belief | `trustmesh-reputation` | Beta-Bernoulli online updates |
//! | Lineage | `trustmesh-reputation` | Typed forks, bounded inheritance, probation |
//! | Interaction | `trustmesh-session` | Bilateral lifecycle, signing, disputes |
//! | Oversight | `trustmesh-witness` | Sortition, solicitation, robust consensus |
//! | Persistence | `trustmesh-ledger` | Versioned CAS, canonical encoding, archival |
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                       TRUSTMESH CORE                          │
//! ├───────────────────────────────────────────────────────────────┤
//! │                                                               │
//! │                    ┌─────────────────┐                        │
//! │                    │    TrustMesh    │  ← Unified Facade      │
//! │                    └────────┬────────┘                        │
//! │                             │                                 │
//! │        ┌──────────────┬─────┴────────┬──────────────┐         │
//! │        ▼              ▼              ▼              ▼         │
//! │  ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐    │
//! │  │Reputation│   │ Session  │   │ Witness  │   │  Ledger  │    │
//! │  │   Math   │   │Lifecycle │   │Oversight │   │  Client  │    │
//! │  └──────────┘   └──────────┘   └──────────┘   └────┬─────┘    │
//! │                                                    │          │
//! └────────────────────────────────────────────────────┼──────────┘
//!                                                      ▼
//!                                          shared append-only store
//! ```
//!
//! ## Guarantees
//!
//! - Reputation writes are optimistic: read versioned, mutate, write
//!   conditionally, retry on conflict; concurrent updates are never lost.
//! - Each published session updates the provider's belief exactly once,
//!   no matter how often publication is retried.
//! - Rejections are structured: a trust decision names its shortfalls, a
//!   protocol violation names the claimed and maximum weights.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trustmesh_core::{TrustMesh, TrustMeshConfig, TrustPolicy};
//!
//! let ledger = Arc::new(SledLedger::open("./trustmesh.db")?);
//! let mut mesh = TrustMesh::new(TrustMeshConfig::default(), ledger);
//!
//! let decision = mesh.evaluate_trust("agent-1", &TrustPolicy::default()).await?;
//! if !decision.accept {
//!     eprintln!("rejected: {}", decision.reason());
//! }
//! ```

mod collaborators;
mod config;
mod decision;
mod error;
mod mesh;
mod store;

pub use collaborators::{AllowAll, Authorizer, ExperienceSink, NullExperienceSink};
pub use config::{RetryConfig, SolicitationConfig, TrustMeshConfig, TrustPolicy};
pub use decision::{TrustDecision, TrustShortfall};
pub use error::TrustError;
pub use mesh::TrustMesh;
pub use store::{record_signing_bytes, verify_record, ReputationStore};

// Re-export component types for convenience
pub use trustmesh_ledger::{LedgerClient, MemoryLedger, SledLedger};
pub use trustmesh_reputation::{EvidenceWeight, ForkType, ReputationRecord};
pub use trustmesh_session::{
    DefaultRule, Ed25519Signer, OutcomeDecision, Party, Resolution, SessionRecord, SessionState,
};
pub use trustmesh_witness::{
    AggregationPolicy, QuorumPolicy, SelectionPolicy, WitnessAttestation, WitnessClient,
};

/// Core result type for facade operations.
pub type Result<T> = std::result::Result<T, TrustError>;
