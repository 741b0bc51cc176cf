//! Error types for ledger operations.

use thiserror::Error;

/// Error type for ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    /// A stored payload could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored entry is structurally invalid (truncated version prefix,
    /// non-UTF-8 path key).
    #[error("corrupt ledger entry at `{path}`")]
    Corrupt {
        /// The path of the corrupt entry.
        path: String,
    },
}
