//! In-memory ledger backend.
//!
//! Backs tests and single-process simulations. Implements the same
//! versioning discipline as the durable backend, so optimistic-concurrency
//! behavior (including lost-update prevention) can be exercised without a
//! database on disk.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::canonical::content_id;
use crate::client::{ContentId, LedgerClient};
use crate::Result;

/// In-memory [`LedgerClient`] backed by a `BTreeMap`.
///
/// The map is ordered so prefix listing matches the durable backend's
/// lexicographic iteration.
#[derive(Default)]
pub struct MemoryLedger {
    entries: Mutex<BTreeMap<String, (u64, Vec<u8>)>>,
}

impl MemoryLedger {
    /// Creates an empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored paths.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("ledger lock poisoned").len()
    }

    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn put(&self, path: &str, payload: &[u8]) -> Result<ContentId> {
        let mut entries = self.entries.lock().expect("ledger lock poisoned");
        let version = entries.get(path).map_or(0, |(v, _)| *v);
        entries.insert(path.to_string(), (version + 1, payload.to_vec()));
        Ok(content_id(payload))
    }

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.lock().expect("ledger lock poisoned");
        Ok(entries.get(path).map(|(_, payload)| payload.clone()))
    }

    async fn get_versioned(&self, path: &str) -> Result<Option<(Vec<u8>, u64)>> {
        let entries = self.entries.lock().expect("ledger lock poisoned");
        Ok(entries
            .get(path)
            .map(|(version, payload)| (payload.clone(), *version)))
    }

    async fn put_if_version(&self, path: &str, payload: &[u8], expected: u64) -> Result<bool> {
        let mut entries = self.entries.lock().expect("ledger lock poisoned");
        let current = entries.get(path).map_or(0, |(v, _)| *v);
        if current != expected {
            return Ok(false);
        }
        entries.insert(path.to_string(), (current + 1, payload.to_vec()));
        Ok(true)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.lock().expect("ledger lock poisoned");
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(path, _)| path.starts_with(prefix))
            .map(|(path, _)| path.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get() {
        let ledger = MemoryLedger::new();
        let id = ledger.put("a/b", b"payload").await.unwrap();
        assert_eq!(id.len(), 64);
        assert_eq!(ledger.get("a/b").await.unwrap().unwrap(), b"payload");
        assert!(ledger.get("a/missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_versions_advance() {
        let ledger = MemoryLedger::new();
        assert!(ledger.get_versioned("k").await.unwrap().is_none());

        ledger.put("k", b"v1").await.unwrap();
        let (_, v1) = ledger.get_versioned("k").await.unwrap().unwrap();
        assert_eq!(v1, 1);

        ledger.put("k", b"v2").await.unwrap();
        let (payload, v2) = ledger.get_versioned("k").await.unwrap().unwrap();
        assert_eq!(v2, 2);
        assert_eq!(payload, b"v2");
    }

    #[tokio::test]
    async fn test_conditional_write() {
        let ledger = MemoryLedger::new();

        // Create requires expected = 0.
        assert!(ledger.put_if_version("k", b"v1", 0).await.unwrap());
        assert!(!ledger.put_if_version("k", b"stale", 0).await.unwrap());

        // Update requires the current version.
        assert!(ledger.put_if_version("k", b"v2", 1).await.unwrap());
        assert!(!ledger.put_if_version("k", b"stale", 1).await.unwrap());
        assert_eq!(ledger.get("k").await.unwrap().unwrap(), b"v2");
    }

    #[tokio::test]
    async fn test_list_prefix() {
        let ledger = MemoryLedger::new();
        ledger.put("sessions/a", b"1").await.unwrap();
        ledger.put("sessions/b", b"2").await.unwrap();
        ledger.put("reputation/x/current", b"3").await.unwrap();

        let sessions = ledger.list("sessions/").await.unwrap();
        assert_eq!(sessions, vec!["sessions/a", "sessions/b"]);
        assert_eq!(ledger.list("disputes/").await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_archive_then_put() {
        let ledger = MemoryLedger::new();
        ledger.put("doc/current", b"old").await.unwrap();

        ledger
            .archive_then_put("doc/current", "doc/history/t1", b"new")
            .await
            .unwrap();

        assert_eq!(ledger.get("doc/current").await.unwrap().unwrap(), b"new");
        assert_eq!(
            ledger.get("doc/history/t1").await.unwrap().unwrap(),
            b"old"
        );
    }
}
