//! # Bilateral Outcome Agreement
//!
//! When both participants have rated a session, their ratings either
//! converge (the session outcome is the mean and no third party is ever
//! involved) or diverge past the protocol threshold, in which case a
//! dispute is raised and publication is blocked until it resolves.
//!
//! The threshold is deliberately tight (0.15 on a `[0, 1]` scale):
//! honest parties observing the same work rarely disagree by more, and a
//! loose threshold would let a malicious party drag an outcome toward its
//! preferred value while staying "in agreement".

use tracing::debug;

use crate::{Result, SessionError};

/// Maximum rating divergence for bilateral agreement.
pub const DIVERGENCE_THRESHOLD: f64 = 0.15;

/// The verdict of the bilateral divergence check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AgreementVerdict {
    /// Ratings converged; the agreed outcome is their mean.
    Agreed {
        /// The bilateral outcome.
        outcome: f64,
        /// The observed divergence.
        divergence: f64,
    },
    /// Ratings diverged; a dispute must be raised.
    Diverged {
        /// The observed divergence.
        divergence: f64,
    },
}

/// Runs the bilateral divergence check over two ratings.
///
/// # Errors
///
/// [`SessionError::InvalidRating`] if either rating is outside `[0, 1]`.
/// Validation happens before any state is touched.
pub fn check_agreement(provider_rating: f64, requester_rating: f64) -> Result<AgreementVerdict> {
    for rating in [provider_rating, requester_rating] {
        if !(0.0..=1.0).contains(&rating) || !rating.is_finite() {
            return Err(SessionError::InvalidRating { value: rating });
        }
    }

    let divergence = (provider_rating - requester_rating).abs();
    let verdict = if divergence <= DIVERGENCE_THRESHOLD {
        AgreementVerdict::Agreed {
            outcome: (provider_rating + requester_rating) / 2.0,
            divergence,
        }
    } else {
        AgreementVerdict::Diverged { divergence }
    };

    debug!(provider_rating, requester_rating, divergence, ?verdict, "agreement checked");
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agreement_within_threshold_is_mean() {
        match check_agreement(0.9, 0.8).unwrap() {
            AgreementVerdict::Agreed { outcome, divergence } => {
                assert!((outcome - 0.85).abs() < 1e-9);
                assert!((divergence - 0.1).abs() < 1e-9);
            }
            other => panic!("expected agreement, got {other:?}"),
        }
    }

    #[test]
    fn test_exactly_at_threshold_agrees() {
        assert!(matches!(
            check_agreement(1.0, 0.85).unwrap(),
            AgreementVerdict::Agreed { .. }
        ));
    }

    #[test]
    fn test_divergence_past_threshold_disputes() {
        match check_agreement(0.9, 0.4).unwrap() {
            AgreementVerdict::Diverged { divergence } => {
                assert!((divergence - 0.5).abs() < 1e-9);
            }
            other => panic!("expected divergence, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_ratings_rejected() {
        for (a, b) in [(-0.1, 0.5), (0.5, 1.2), (f64::NAN, 0.5)] {
            assert!(matches!(
                check_agreement(a, b).unwrap_err(),
                SessionError::InvalidRating { .. }
            ));
        }
    }

    #[test]
    fn test_identical_ratings() {
        match check_agreement(0.7, 0.7).unwrap() {
            AgreementVerdict::Agreed { outcome, divergence } => {
                assert_eq!(outcome, 0.7);
                assert_eq!(divergence, 0.0);
            }
            other => panic!("expected agreement, got {other:?}"),
        }
    }
}
