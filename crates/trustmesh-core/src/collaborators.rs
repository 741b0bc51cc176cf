//! Collaborator contracts the facade consumes but does not implement.
//!
//! Authorization tokens and capability counters belong to the surrounding
//! platform; TrustMesh only defines the seams and ships permissive no-op
//! implementations for deployments that do not wire them up.

use async_trait::async_trait;

use crate::{Result, TrustError};

/// Checks whether a token authorizes running a task.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Returns `Ok(())` if the token authorizes the task.
    ///
    /// # Errors
    ///
    /// [`TrustError::Unauthorized`] with a structured reason otherwise.
    async fn check_authorization(&self, token: &str, task: &str) -> Result<()>;
}

/// Accepts capability-experience notifications after published outcomes.
///
/// Experience counters live outside the reputation substrate; this sink is
/// notified once per published session, after the reputation update.
#[async_trait]
pub trait ExperienceSink: Send + Sync {
    /// Records one outcome against an agent's domain experience.
    async fn increment_experience(&self, agent_id: &str, domain: &str, outcome: f64);
}

/// Authorizer that accepts everything except empty tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn check_authorization(&self, token: &str, _task: &str) -> Result<()> {
        if token.is_empty() {
            return Err(TrustError::Unauthorized {
                reason: "empty authorization token".to_string(),
            });
        }
        Ok(())
    }
}

/// Experience sink that discards notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullExperienceSink;

#[async_trait]
impl ExperienceSink for NullExperienceSink {
    async fn increment_experience(&self, _agent_id: &str, _domain: &str, _outcome: f64) {}
}
