//! # Witness Solicitation
//!
//! Fans rating requests out to the selected witnesses concurrently, with
//! a per-witness deadline. Witnesses that miss the deadline are treated
//! as absent; what happens then is a policy decision:
//!
//! - [`QuorumPolicy::ReducedQuorum`]: proceed as long as a minimum
//!   number responded, with the reduced count disclosed to the caller
//!   (the aggregation result will carry correspondingly fewer inliers,
//!   i.e. visibly higher uncertainty).
//! - [`QuorumPolicy::Abort`]: any missing witness aborts resolution.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::models::WitnessAttestation;
use crate::{Result, WitnessError};

/// Transport-side contract for reaching a witness.
///
/// The substrate does not know how witnesses are contacted; implementors
/// bridge to whatever transport the deployment uses. Returning `None`
/// means the witness declined or could not be reached.
#[async_trait]
pub trait WitnessClient: Send + Sync {
    /// Requests a rating of the given session from one witness.
    async fn request_rating(
        &self,
        witness_id: &str,
        session_id: &str,
    ) -> Option<WitnessAttestation>;
}

/// What to do when witnesses miss the solicitation deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuorumPolicy {
    /// Proceed if at least `min` witnesses responded.
    ReducedQuorum {
        /// Minimum responding witnesses.
        min: usize,
    },
    /// Abort unless every selected witness responded.
    Abort,
}

/// Solicits ratings from all witnesses concurrently.
///
/// Each request races a `deadline` timer; responses arriving after the
/// deadline are discarded. The fan-out is concurrent, so total wall time
/// is bounded by one deadline, not one per witness.
///
/// # Errors
///
/// [`WitnessError::InsufficientWitnesses`] when the responding quorum is
/// below what `policy` allows.
pub async fn solicit(
    client: Arc<dyn WitnessClient>,
    witnesses: &[String],
    session_id: &str,
    deadline: Duration,
    policy: QuorumPolicy,
) -> Result<Vec<WitnessAttestation>> {
    let mut requests = Vec::with_capacity(witnesses.len());
    for witness_id in witnesses {
        let client = Arc::clone(&client);
        let witness_id = witness_id.clone();
        let session_id = session_id.to_string();
        requests.push(tokio::spawn(async move {
            tokio::time::timeout(deadline, client.request_rating(&witness_id, &session_id))
                .await
                .ok()
                .flatten()
        }));
    }

    let mut attestations = Vec::new();
    for request in requests {
        // A panicked request task counts as a missing witness.
        if let Ok(Some(attestation)) = request.await {
            attestations.push(attestation);
        }
    }

    let responded = attestations.len();
    if responded < witnesses.len() {
        warn!(
            session = session_id,
            selected = witnesses.len(),
            responded,
            "witnesses missed the solicitation deadline"
        );
    }

    let min_required = match policy {
        QuorumPolicy::ReducedQuorum { min } => min,
        QuorumPolicy::Abort => witnesses.len(),
    };
    if responded < min_required {
        return Err(WitnessError::InsufficientWitnesses {
            required: min_required,
            available: responded,
        });
    }

    debug!(session = session_id, responded, "solicitation complete");
    Ok(attestations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    /// Test double: responds for some witnesses, hangs for others.
    struct ScriptedClient {
        responsive: Vec<String>,
    }

    #[async_trait]
    impl WitnessClient for ScriptedClient {
        async fn request_rating(
            &self,
            witness_id: &str,
            _session_id: &str,
        ) -> Option<WitnessAttestation> {
            if self.responsive.iter().any(|w| w == witness_id) {
                Some(WitnessAttestation::new(witness_id, 0.8, Utc::now()))
            } else {
                // Simulate an unreachable witness.
                tokio::time::sleep(Duration::from_secs(60)).await;
                None
            }
        }
    }

    fn witnesses(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_all_witnesses_respond() {
        let client = Arc::new(ScriptedClient {
            responsive: witnesses(&["w1", "w2", "w3"]),
        });
        let result = solicit(
            client,
            &witnesses(&["w1", "w2", "w3"]),
            "s1",
            Duration::from_millis(200),
            QuorumPolicy::Abort,
        )
        .await
        .unwrap();
        assert_eq!(result.len(), 3);
    }

    #[tokio::test]
    async fn test_reduced_quorum_proceeds() {
        let client = Arc::new(ScriptedClient {
            responsive: witnesses(&["w1", "w2"]),
        });
        let result = solicit(
            client,
            &witnesses(&["w1", "w2", "w3"]),
            "s1",
            Duration::from_millis(50),
            QuorumPolicy::ReducedQuorum { min: 2 },
        )
        .await
        .unwrap();
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_reduced_quorum_still_has_a_floor() {
        let client = Arc::new(ScriptedClient {
            responsive: witnesses(&["w1"]),
        });
        let err = solicit(
            client,
            &witnesses(&["w1", "w2", "w3"]),
            "s1",
            Duration::from_millis(50),
            QuorumPolicy::ReducedQuorum { min: 2 },
        )
        .await
        .unwrap_err();
        assert_eq!(
            err,
            WitnessError::InsufficientWitnesses {
                required: 2,
                available: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_abort_policy_requires_everyone() {
        let client = Arc::new(ScriptedClient {
            responsive: witnesses(&["w1", "w2"]),
        });
        let err = solicit(
            client,
            &witnesses(&["w1", "w2", "w3"]),
            "s1",
            Duration::from_millis(50),
            QuorumPolicy::Abort,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WitnessError::InsufficientWitnesses { .. }));
    }
}
