//! # The LedgerClient Contract
//!
//! The narrow interface every TrustMesh component uses to reach the shared
//! append-only store. The substrate assumes only this contract, never the
//! engine behind it: a sled database ([`crate::SledLedger`]), an in-memory
//! map ([`crate::MemoryLedger`]), or a remote content-addressed service.
//!
//! ## Versioning
//!
//! Every path carries a monotonically increasing `u64` version, starting
//! at 1 on first write. [`LedgerClient::put_if_version`] is the optimistic
//! concurrency primitive: it succeeds only when the caller's expected
//! version still matches, so two racing writers cannot silently overwrite
//! each other. `expected = 0` asserts the path does not exist yet.
//!
//! ## History Archival
//!
//! Reputation and session documents are never deleted, only superseded.
//! [`LedgerClient::archive_then_put`] copies the prior payload to a history
//! path before overwriting the current one.

use async_trait::async_trait;

use crate::canonical::content_id;
use crate::Result;

/// Hex-encoded SHA-256 of a published payload; proof of what was written.
pub type ContentId = String;

/// Contract for the append-only shared ledger.
///
/// Implementations must be safe to share across tasks (`Send + Sync`); the
/// substrate wraps them in `Arc` and issues concurrent reads and
/// conditional writes.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Writes a payload unconditionally and returns its content id.
    ///
    /// The path's version still advances, so concurrent conditional
    /// writers observe the change.
    async fn put(&self, path: &str, payload: &[u8]) -> Result<ContentId>;

    /// Reads the payload at a path, or `None` if absent.
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Reads the payload and its current version, or `None` if absent.
    async fn get_versioned(&self, path: &str) -> Result<Option<(Vec<u8>, u64)>>;

    /// Conditionally writes a payload if the path's version still equals
    /// `expected` (0 for "must not exist").
    ///
    /// Returns `false` when a concurrent writer got there first; the
    /// caller re-reads and retries. Neither update is lost.
    async fn put_if_version(&self, path: &str, payload: &[u8], expected: u64) -> Result<bool>;

    /// Lists all paths under a prefix, in lexicographic order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Archives the current payload under `history_path`, then overwrites
    /// `current_path` with the new payload.
    ///
    /// This is the mandated write discipline for reputation and session
    /// documents: prior versions are archived, never destroyed.
    async fn archive_then_put(
        &self,
        current_path: &str,
        history_path: &str,
        payload: &[u8],
    ) -> Result<ContentId> {
        if let Some(prior) = self.get(current_path).await? {
            self.put(history_path, &prior).await?;
        }
        self.put(current_path, payload).await
    }

    /// Versioned variant of [`Self::archive_then_put`]: archives the prior
    /// payload, then attempts the conditional overwrite.
    ///
    /// Returns `Some(content_id)` on success, `None` on version conflict.
    /// On conflict the archive copy is harmless: history paths are
    /// timestamped and idempotent for identical payloads.
    async fn archive_then_put_if_version(
        &self,
        current_path: &str,
        history_path: &str,
        payload: &[u8],
        expected: u64,
    ) -> Result<Option<ContentId>> {
        if expected > 0 {
            if let Some(prior) = self.get(current_path).await? {
                self.put(history_path, &prior).await?;
            }
        }
        if self.put_if_version(current_path, payload, expected).await? {
            Ok(Some(content_id(payload)))
        } else {
            Ok(None)
        }
    }
}
