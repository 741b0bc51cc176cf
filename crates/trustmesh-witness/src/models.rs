//! Witness data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a witness came to be attached to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    /// Weighted random selection without replacement.
    Sortition,
    /// Explicitly appointed by an operator or adjudicator.
    Appointed,
}

/// A witness's signed rating of a disputed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WitnessAttestation {
    /// The witnessing agent.
    pub witness_id: String,
    /// How this witness was selected.
    pub selection_method: SelectionMethod,
    /// The witness's independent outcome rating, in `[0, 1]`.
    pub rating: f64,
    /// Free-form justification.
    pub notes: Option<String>,
    /// When the attestation was produced.
    pub timestamp: DateTime<Utc>,
    /// Signature over the attestation's canonical encoding.
    pub signature: Option<String>,
}

impl WitnessAttestation {
    /// Creates an unsigned sortition attestation.
    pub fn new(witness_id: impl Into<String>, rating: f64, now: DateTime<Utc>) -> Self {
        Self {
            witness_id: witness_id.into(),
            selection_method: SelectionMethod::Sortition,
            rating,
            notes: None,
            timestamp: now,
            signature: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attestation_serde_round_trip() {
        let attestation = WitnessAttestation::new("w1", 0.85, Utc::now());
        let json = serde_json::to_string(&attestation).unwrap();
        assert!(json.contains("\"sortition\""));
        let parsed: WitnessAttestation = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, attestation);
    }
}
