//! # Optimistic-Concurrency Reputation Store
//!
//! All reputation writes go through [`ReputationStore::update_with`]:
//! read the current record and its version, apply the mutation, then
//! conditionally write back at that version. A concurrent writer makes
//! the conditional write fail, in which case the loser re-reads the
//! fresh record and re-applies its mutation; neither update is lost.
//!
//! Contention is retried with linearly growing backoff (attempt `n`
//! waits `base * n`); persistent contention surfaces as
//! [`TrustError::Concurrency`] with the attempt count.
//!
//! Every successful overwrite first archives the prior version under the
//! agent's history path, so the full update trail stays auditable.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use trustmesh_ledger::{canonical, paths, LedgerClient};
use trustmesh_reputation::ReputationRecord;
use trustmesh_session::signing::{verify_detached, Ed25519Signer};

use crate::config::RetryConfig;
use crate::{Result, TrustError};

/// The bytes an updater signature is computed over: the canonical
/// encoding of the record with the `signature` field nulled.
pub fn record_signing_bytes(record: &ReputationRecord) -> Result<Vec<u8>> {
    let mut unsigned = record.clone();
    unsigned.signature = None;
    let value = serde_json::to_value(&unsigned)?;
    Ok(canonical::canonicalize(&value).into_bytes())
}

/// Verifies a record's updater signature against the node public key.
///
/// # Errors
///
/// [`TrustError::Unauthorized`] if the signature is absent or does not
/// verify.
pub fn verify_record(record: &ReputationRecord, public_key_hex: &str) -> Result<()> {
    let Some(signature) = record.signature.as_deref() else {
        return Err(TrustError::Unauthorized {
            reason: "updater signature absent".to_string(),
        });
    };
    let bytes = record_signing_bytes(record)?;
    if verify_detached(&bytes, signature, public_key_hex) {
        Ok(())
    } else {
        Err(TrustError::Unauthorized {
            reason: "updater signature does not verify against canonical record bytes"
                .to_string(),
        })
    }
}

/// Versioned reputation persistence over a [`LedgerClient`].
#[derive(Clone)]
pub struct ReputationStore {
    ledger: Arc<dyn LedgerClient>,
    retry: RetryConfig,
    signer: Option<Arc<Ed25519Signer>>,
}

impl ReputationStore {
    /// Creates a store with the default retry settings.
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self::with_retry(ledger, RetryConfig::default())
    }

    /// Creates a store with explicit retry settings.
    pub fn with_retry(ledger: Arc<dyn LedgerClient>, retry: RetryConfig) -> Self {
        Self {
            ledger,
            retry,
            signer: None,
        }
    }

    /// Attaches the node's updater identity; every record written from
    /// here on carries its signature over the canonical record bytes.
    pub fn with_signer(mut self, signer: Arc<Ed25519Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    fn apply_signature(&self, record: &mut ReputationRecord) -> Result<()> {
        if let Some(signer) = &self.signer {
            let bytes = record_signing_bytes(record)?;
            record.signature = Some(signer.sign(&bytes));
        }
        Ok(())
    }

    /// Loads an agent's current reputation record, if one exists.
    pub async fn load(&self, agent_id: &str) -> Result<Option<ReputationRecord>> {
        match self.ledger.get(&paths::reputation_current(agent_id)).await? {
            Some(payload) => Ok(Some(serde_json::from_slice(&payload)?)),
            None => Ok(None),
        }
    }

    /// Loads an agent's record, failing if none exists.
    pub async fn require(&self, agent_id: &str) -> Result<ReputationRecord> {
        self.load(agent_id)
            .await?
            .ok_or_else(|| TrustError::UnknownAgent {
                agent_id: agent_id.to_string(),
            })
    }

    /// Writes a brand-new record; the path must not exist yet.
    ///
    /// # Errors
    ///
    /// [`TrustError::AgentExists`] if a record is already present, which
    /// also covers two racing registrations of the same agent.
    pub async fn insert(&self, record: &ReputationRecord) -> Result<()> {
        let mut record = record.clone();
        self.apply_signature(&mut record)?;
        let payload = serde_json::to_vec(&record)?;
        let created = self
            .ledger
            .put_if_version(&paths::reputation_current(&record.agent_id), &payload, 0)
            .await?;
        if !created {
            return Err(TrustError::AgentExists {
                agent_id: record.agent_id.clone(),
            });
        }
        debug!(agent = %record.agent_id, "reputation record created");
        Ok(())
    }

    /// Applies a mutation to an agent's record under optimistic
    /// concurrency, returning the record as written.
    ///
    /// The mutation closure may run several times, once per attempt, each
    /// time over the freshest record; it must therefore be idempotent in
    /// effect (the Bayesian update's per-session duplicate guard already
    /// is).
    ///
    /// # Errors
    ///
    /// - [`TrustError::UnknownAgent`] if no record exists
    /// - [`TrustError::Concurrency`] after `max_attempts` lost races
    /// - whatever the mutation itself fails with, propagated unchanged
    pub async fn update_with<F>(
        &self,
        agent_id: &str,
        now: DateTime<Utc>,
        mut mutate: F,
    ) -> Result<ReputationRecord>
    where
        F: FnMut(&mut ReputationRecord) -> Result<()>,
    {
        let current_path = paths::reputation_current(agent_id);

        for attempt in 1..=self.retry.max_attempts {
            let (payload, version) = self
                .ledger
                .get_versioned(&current_path)
                .await?
                .ok_or_else(|| TrustError::UnknownAgent {
                    agent_id: agent_id.to_string(),
                })?;
            let mut record: ReputationRecord = serde_json::from_slice(&payload)?;

            mutate(&mut record)?;
            // The mutation invalidated any stale signature; re-sign the
            // fresh bytes before they hit the ledger.
            self.apply_signature(&mut record)?;

            let updated = serde_json::to_vec(&record)?;
            let written = self
                .ledger
                .archive_then_put_if_version(
                    &current_path,
                    &paths::reputation_history(agent_id, now),
                    &updated,
                    version,
                )
                .await?;

            if written.is_some() {
                debug!(agent = agent_id, attempt, "reputation write committed");
                return Ok(record);
            }

            warn!(
                agent = agent_id,
                attempt,
                max_attempts = self.retry.max_attempts,
                "reputation write lost a race, retrying"
            );
            tokio::time::sleep(Duration::from_millis(
                self.retry.base_backoff_ms * u64::from(attempt),
            ))
            .await;
        }

        Err(TrustError::Concurrency {
            attempts: self.retry.max_attempts,
        })
    }

    /// Lists the archived history paths for an agent, oldest first.
    pub async fn history(&self, agent_id: &str) -> Result<Vec<String>> {
        Ok(self
            .ledger
            .list(&paths::reputation_history_prefix(agent_id))
            .await?)
    }
}

impl std::fmt::Debug for ReputationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReputationStore")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustmesh_ledger::MemoryLedger;
    use trustmesh_reputation::{update, EvidenceWeight};

    fn store() -> ReputationStore {
        let retry = RetryConfig {
            max_attempts: 5,
            base_backoff_ms: 1, // keep tests fast
        };
        ReputationStore::with_retry(Arc::new(MemoryLedger::new()), retry)
    }

    #[tokio::test]
    async fn test_insert_then_load() {
        let store = store();
        let record = ReputationRecord::new_root("a1", Utc::now());
        store.insert(&record).await.unwrap();

        let loaded = store.load("a1").await.unwrap().unwrap();
        assert_eq!(loaded, record);
        assert!(store.load("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_double_insert_rejected() {
        let store = store();
        let record = ReputationRecord::new_root("a1", Utc::now());
        store.insert(&record).await.unwrap();

        let err = store.insert(&record).await.unwrap_err();
        assert!(matches!(err, TrustError::AgentExists { .. }));
    }

    #[tokio::test]
    async fn test_update_archives_prior_version() {
        let store = store();
        store
            .insert(&ReputationRecord::new_root("a1", Utc::now()))
            .await
            .unwrap();

        let updated = store
            .update_with("a1", Utc::now(), |record| {
                update(record, 1.0, EvidenceWeight::plain(1.0), "s1", Utc::now())?;
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(updated.alpha, 3.0);

        let history = store.history("a1").await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_agent() {
        let store = store();
        let err = store
            .update_with("ghost", Utc::now(), |_| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(err, TrustError::UnknownAgent { .. }));
    }

    #[tokio::test]
    async fn test_racing_updates_both_apply() {
        let store = store();
        store
            .insert(&ReputationRecord::new_root("a1", Utc::now()))
            .await
            .unwrap();

        // Two concurrent updates for different sessions: the loser must
        // retry over the winner's record, and both must land.
        let (first, second) = tokio::join!(
            store.update_with("a1", Utc::now(), |record| {
                update(record, 1.0, EvidenceWeight::plain(1.0), "s1", Utc::now())?;
                Ok(())
            }),
            store.update_with("a1", Utc::now(), |record| {
                update(record, 0.0, EvidenceWeight::plain(1.0), "s2", Utc::now())?;
                Ok(())
            }),
        );
        first.unwrap();
        second.unwrap();

        let record = store.load("a1").await.unwrap().unwrap();
        assert_eq!(record.alpha, 3.0);
        assert_eq!(record.beta, 3.0);
        assert_eq!(record.n_eff(), 6.0);
    }

    #[tokio::test]
    async fn test_signer_attaches_verifiable_signature() {
        let signer = Arc::new(Ed25519Signer::generate());
        let store = store().with_signer(Arc::clone(&signer));
        store
            .insert(&ReputationRecord::new_root("a1", Utc::now()))
            .await
            .unwrap();

        let loaded = store.load("a1").await.unwrap().unwrap();
        assert!(loaded.signature.is_some());
        verify_record(&loaded, &signer.public_key_hex()).unwrap();

        // Updates re-sign the mutated record.
        let updated = store
            .update_with("a1", Utc::now(), |record| {
                update(record, 1.0, EvidenceWeight::plain(1.0), "s1", Utc::now())?;
                Ok(())
            })
            .await
            .unwrap();
        verify_record(&updated, &signer.public_key_hex()).unwrap();

        // A doctored record no longer verifies.
        let mut doctored = updated.clone();
        doctored.alpha += 1.0;
        assert!(verify_record(&doctored, &signer.public_key_hex()).is_err());

        // An unsigned record is rejected outright.
        let unsigned = ReputationRecord::new_root("a2", Utc::now());
        assert!(verify_record(&unsigned, &signer.public_key_hex()).is_err());
    }

    #[tokio::test]
    async fn test_mutation_error_propagates_without_write() {
        let store = store();
        store
            .insert(&ReputationRecord::new_root("a1", Utc::now()))
            .await
            .unwrap();

        let err = store
            .update_with("a1", Utc::now(), |record| {
                update(record, 2.0, EvidenceWeight::plain(1.0), "s1", Utc::now())?;
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TrustError::Reputation(_)));

        let record = store.load("a1").await.unwrap().unwrap();
        assert_eq!(record.alpha, 2.0);
        assert!(store.history("a1").await.unwrap().is_empty());
    }
}
