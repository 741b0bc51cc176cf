//! # Durable Ledger Backend
//!
//! Sled-backed implementation of the [`LedgerClient`] contract. This is the
//! single-node deployment shape: every document lives in one tree, keyed by
//! its ledger path, with an 8-byte big-endian version prefixed to the
//! payload so conditional writes can compare-and-swap atomically.
//!
//! ## Storage Layout
//!
//! | Tree | Key | Value |
//! |------|-----|-------|
//! | `documents` | ledger path (UTF-8) | `version_be(8) || payload` |
//!
//! ## Concurrency
//!
//! Sled's `compare_and_swap` on the whole value (version + payload) gives
//! the lost-update guarantee: a writer holding a stale version observes a
//! CAS failure and must re-read. Unconditional `put` retries its CAS
//! internally until it lands, so the version always advances.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::canonical::content_id;
use crate::client::{ContentId, LedgerClient};
use crate::{LedgerError, Result};

/// Tree holding all ledger documents.
const DOCUMENT_TREE: &str = "documents";

/// Length of the big-endian version prefix.
const VERSION_LEN: usize = 8;

/// Sled-backed [`LedgerClient`].
///
/// # Example
///
/// ```rust,no_run
/// use trustmesh_ledger::{LedgerClient, SledLedger};
///
/// # async fn demo() -> trustmesh_ledger::Result<()> {
/// let ledger = SledLedger::open("./trustmesh.db")?;
/// ledger.put("reputation/agent-1/current", b"{}").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SledLedger {
    db: sled::Db,
    documents: sled::Tree,
}

impl SledLedger {
    /// Opens or creates a ledger database at the given path.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Database` if the path is invalid, permissions
    /// are insufficient, or the database is corrupted.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        let documents = db.open_tree(DOCUMENT_TREE)?;
        Ok(SledLedger { db, documents })
    }

    /// Creates a temporary in-memory-backed ledger for testing.
    pub fn temporary() -> Result<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        let documents = db.open_tree(DOCUMENT_TREE)?;
        Ok(SledLedger { db, documents })
    }

    /// Flushes pending writes to disk.
    pub fn flush(&self) -> Result<usize> {
        Ok(self.db.flush()?)
    }

    fn decode(path: &str, raw: &[u8]) -> Result<(u64, Vec<u8>)> {
        if raw.len() < VERSION_LEN {
            return Err(LedgerError::Corrupt {
                path: path.to_string(),
            });
        }
        let mut version_bytes = [0u8; VERSION_LEN];
        version_bytes.copy_from_slice(&raw[..VERSION_LEN]);
        Ok((u64::from_be_bytes(version_bytes), raw[VERSION_LEN..].to_vec()))
    }

    fn encode(version: u64, payload: &[u8]) -> Vec<u8> {
        let mut value = Vec::with_capacity(VERSION_LEN + payload.len());
        value.extend_from_slice(&version.to_be_bytes());
        value.extend_from_slice(payload);
        value
    }
}

#[async_trait]
impl LedgerClient for SledLedger {
    async fn put(&self, path: &str, payload: &[u8]) -> Result<ContentId> {
        // CAS loop so the version prefix stays consistent under
        // concurrent unconditional writes.
        loop {
            let current = self.documents.get(path.as_bytes())?;
            let version = match &current {
                Some(raw) => Self::decode(path, raw)?.0,
                None => 0,
            };
            let next = Self::encode(version + 1, payload);
            let swap = self.documents.compare_and_swap(
                path.as_bytes(),
                current.as_ref().map(|v| v.as_ref()),
                Some(next.as_slice()),
            )?;
            if swap.is_ok() {
                debug!(path, version = version + 1, "ledger put");
                return Ok(content_id(payload));
            }
        }
    }

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        match self.documents.get(path.as_bytes())? {
            Some(raw) => Ok(Some(Self::decode(path, &raw)?.1)),
            None => Ok(None),
        }
    }

    async fn get_versioned(&self, path: &str) -> Result<Option<(Vec<u8>, u64)>> {
        match self.documents.get(path.as_bytes())? {
            Some(raw) => {
                let (version, payload) = Self::decode(path, &raw)?;
                Ok(Some((payload, version)))
            }
            None => Ok(None),
        }
    }

    async fn put_if_version(&self, path: &str, payload: &[u8], expected: u64) -> Result<bool> {
        let current = self.documents.get(path.as_bytes())?;
        let version = match &current {
            Some(raw) => Self::decode(path, raw)?.0,
            None => 0,
        };
        if version != expected {
            debug!(path, expected, actual = version, "version mismatch");
            return Ok(false);
        }
        let next = Self::encode(expected + 1, payload);
        let swap = self.documents.compare_and_swap(
            path.as_bytes(),
            current.as_ref().map(|v| v.as_ref()),
            Some(next.as_slice()),
        )?;
        Ok(swap.is_ok())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut paths = Vec::new();
        for result in self.documents.scan_prefix(prefix.as_bytes()) {
            let (key, _) = result?;
            let path = String::from_utf8(key.to_vec()).map_err(|_| LedgerError::Corrupt {
                path: String::from_utf8_lossy(&key).into_owned(),
            })?;
            paths.push(path);
        }
        Ok(paths)
    }
}

impl std::fmt::Debug for SledLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledLedger")
            .field("documents", &self.documents.len())
            .finish()
    }
}
