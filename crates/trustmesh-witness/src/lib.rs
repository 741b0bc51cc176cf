//! # TrustMesh Witness
//!
//! Third-party adjudication machinery for disputed sessions: selecting
//! independent witnesses, soliciting their ratings, and aggregating those
//! ratings into an outlier-resistant consensus.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────────┐
//! │   Selector   │───▶│ Solicitation │───▶│    Aggregator    │
//! │ (eligibility │    │  (fan-out +  │    │ (median, outlier │
//! │ + sortition) │    │  deadlines)  │    │  cut, agreement) │
//! └──────────────┘    └──────────────┘    └──────────────────┘
//! ```
//!
//! ## Anti-Collusion
//!
//! A candidate that has already witnessed more than 10% of a participant's
//! recent sessions is ineligible, regardless of its own reputation: a
//! consistently co-appearing witness is indistinguishable from a colluding
//! one, so the protocol refuses the pairing outright.

pub mod aggregate;
pub mod models;
pub mod selector;
pub mod solicit;

mod error;

pub use aggregate::{aggregate, AggregationPolicy, ConsensusMethod, ConsensusOutcome};
pub use error::WitnessError;
pub use models::{SelectionMethod, WitnessAttestation};
pub use selector::{SelectionPolicy, WitnessCandidate, WitnessSelector};
pub use solicit::{solicit, QuorumPolicy, WitnessClient};

/// Result type for witness operations.
pub type Result<T> = std::result::Result<T, WitnessError>;
