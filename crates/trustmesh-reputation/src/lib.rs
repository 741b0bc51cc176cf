//! # TrustMesh Reputation Engine
//!
//! Online Bayesian reliability estimation for autonomous agents, with
//! protocol-enforced trust discounting when an agent's implementation
//! changes (a "fork").
//!
//! ## Model
//!
//! Each agent's reliability is a Beta-distributed belief `Beta(alpha, beta)`:
//!
//! | Quantity | Formula | Meaning |
//! |----------|---------|---------|
//! | score | `alpha / (alpha + beta)` | Expected reliability in `[0, 1]` |
//! | n_eff | `alpha + beta` | Effective sample size (confidence proxy) |
//! | variance | `a*b / ((a+b)^2 * (a+b+1))` | Uncertainty of the estimate |
//!
//! Every agreed interaction outcome shifts the belief by its effective
//! evidence weight; forks re-base the belief at a discounted weight plus a
//! neutral prior, and probation halves evidence weight until the agent
//! re-proves itself.
//!
//! ## Components
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`bayesian`] | Online update, score/variance/credible-interval math |
//! | [`lineage`] | Fork-type weight enforcement, cumulative lineage factor |
//! | [`probation`] | Post-fork probation state machine |
//! | [`models`] | `ReputationRecord` and its invariants |
//!
//! ## Invariants
//!
//! - `score` is always in `[0, 1]`, `variance` in `[0, 0.25]`
//! - `n_eff` is non-decreasing except at explicit fork re-basing
//! - Updates validate before mutating; a failed update leaves the record
//!   untouched
//! - A claimed fork weight above its type's maximum is always rejected

pub mod bayesian;
pub mod lineage;
pub mod models;
pub mod probation;

mod error;

pub use bayesian::{update, EvidenceWeight};
pub use error::ReputationError;
pub use lineage::{fork, ForkType, LineageResolver, MAX_LINEAGE_DEPTH};
pub use models::{ForkLineageEntry, ParentSnapshot, ReputationRecord};
pub use probation::{ProbationExit, ProbationState, ProbationTaskEntry};

/// Result type for reputation operations.
pub type Result<T> = std::result::Result<T, ReputationError>;
