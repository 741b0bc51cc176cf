//! # TrustMesh Ledger
//!
//! Append-only ledger contract and storage backends for the TrustMesh
//! behavioral-trust substrate.
//!
//! Every piece of shared trust state (reputation records, session records,
//! dispute records) lives behind the narrow [`LedgerClient`] interface.
//! Agents never share memory; all coordination passes through the ledger,
//! and consistency is guaranteed only at the conditional write.
//!
//! ## Components
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`canonical`] | Deterministic byte encoding for signing and hashing |
//! | [`client`] | The `LedgerClient` contract (get/put/versioned-put/list) |
//! | [`paths`] | The ledger path scheme (`reputation/...`, `sessions/...`) |
//! | [`memory`] | In-memory backend for tests and single-process use |
//! | [`store`] | Sled-backed durable backend |
//!
//! ## Consistency Model
//!
//! - `put` is an unconditional overwrite (the version still advances).
//! - `put_if_version` is a compare-and-swap on the entry's version; a
//!   `false` return means a concurrent writer won and the caller must
//!   re-read and retry.
//! - Writers of reputation and session documents archive the prior version
//!   under a history path before overwriting the current one
//!   ([`LedgerClient::archive_then_put`]), so score history is never lost.

pub mod canonical;
pub mod client;
pub mod memory;
pub mod paths;
pub mod store;

mod error;

pub use client::{ContentId, LedgerClient};
pub use error::LedgerError;
pub use memory::MemoryLedger;
pub use store::SledLedger;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
