//! Trust decisions.
//!
//! `evaluate_trust` never answers with a bare boolean: a rejection names
//! the exact shortfalls so the requesting agent knows what would have to
//! change, and an acceptance carries the numbers it was based on.

use serde::{Deserialize, Serialize};

/// A structured reason an agent fell short of a trust policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TrustShortfall {
    /// No reputation record exists for the agent.
    UnknownAgent,
    /// The score is below the policy minimum.
    ScoreBelowMinimum {
        /// The policy minimum.
        required: f64,
        /// The agent's actual score.
        actual: f64,
    },
    /// The effective sample size is below the policy minimum.
    ConfidenceBelowMinimum {
        /// The policy minimum.
        required: f64,
        /// The agent's actual effective sample size.
        actual: f64,
    },
}

impl std::fmt::Display for TrustShortfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrustShortfall::UnknownAgent => write!(f, "no reputation record"),
            TrustShortfall::ScoreBelowMinimum { required, actual } => {
                write!(f, "score {actual:.3} below required {required:.3}")
            }
            TrustShortfall::ConfidenceBelowMinimum { required, actual } => {
                write!(f, "confidence {actual:.1} below required {required:.1}")
            }
        }
    }
}

/// The outcome of a trust evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustDecision {
    /// Whether the agent cleared the policy.
    pub accept: bool,
    /// The agent's reputation score at evaluation time.
    pub score: f64,
    /// The agent's effective sample size at evaluation time.
    pub confidence: f64,
    /// Every policy check the agent failed; empty on acceptance.
    pub shortfalls: Vec<TrustShortfall>,
}

impl TrustDecision {
    /// An accepting decision.
    pub fn accept(score: f64, confidence: f64) -> Self {
        Self {
            accept: true,
            score,
            confidence,
            shortfalls: Vec::new(),
        }
    }

    /// A rejecting decision with its shortfalls.
    pub fn reject(score: f64, confidence: f64, shortfalls: Vec<TrustShortfall>) -> Self {
        Self {
            accept: false,
            score,
            confidence,
            shortfalls,
        }
    }

    /// Human-readable summary of why the agent was rejected.
    pub fn reason(&self) -> String {
        if self.accept {
            return "accepted".to_string();
        }
        self.shortfalls
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_joins_shortfalls() {
        let decision = TrustDecision::reject(
            0.5,
            4.0,
            vec![
                TrustShortfall::ScoreBelowMinimum {
                    required: 0.7,
                    actual: 0.5,
                },
                TrustShortfall::ConfidenceBelowMinimum {
                    required: 10.0,
                    actual: 4.0,
                },
            ],
        );
        assert!(!decision.accept);
        let reason = decision.reason();
        assert!(reason.contains("score 0.500"));
        assert!(reason.contains("confidence 4.0"));
    }

    #[test]
    fn test_accept_has_no_shortfalls() {
        let decision = TrustDecision::accept(0.9, 50.0);
        assert!(decision.accept);
        assert!(decision.shortfalls.is_empty());
        assert_eq!(decision.reason(), "accepted");
    }

    #[test]
    fn test_shortfall_serde_tagging() {
        let json = serde_json::to_string(&TrustShortfall::UnknownAgent).unwrap();
        assert_eq!(json, "{\"kind\":\"unknown_agent\"}");
    }
}
