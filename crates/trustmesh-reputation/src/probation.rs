//! # Probation State Machine
//!
//! After a fork, the child agent serves a probation period during which
//! all of its evidence counts at half weight. Probation ends by whichever
//! comes first:
//!
//! - **Time expiry**: the fork type's probation window passes. Detected
//!   lazily on the next status check; nothing fires at the exact instant.
//! - **Task completion**: the agent accumulates enough qualifying
//!   outcomes (at least 0.7, undisputed). Fires synchronously on the
//!   update that reaches the threshold.
//!
//! ```text
//! None ──fork──▶ Active ──┬─▶ Exited(TimeExpired)
//!                         └─▶ Exited(TasksCompleted)
//! ```
//!
//! The exit transition is observable exactly once; afterward the state is
//! kept for audit with `active = false` and the multiplier reverts to 1.0
//! until the next fork event.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::lineage::ForkType;

/// Multiplier applied to all evidence while probation is active.
pub const CONFIDENCE_MULTIPLIER: f64 = 0.5;

/// Qualifying tasks needed to exit probation early.
pub const REQUIRED_TASKS: u32 = 10;

/// Minimum outcome for a task to qualify toward probation exit.
pub const SUCCESS_THRESHOLD: f64 = 0.7;

/// How a probation period ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbationExit {
    /// The probation window elapsed before enough qualifying tasks.
    TimeExpired,
    /// The agent completed the required qualifying tasks early.
    TasksCompleted,
}

/// One task considered during probation, kept for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbationTaskEntry {
    /// The session that produced the outcome.
    pub session_id: String,
    /// The agreed outcome value.
    pub outcome: f64,
    /// Whether the task counted toward exit.
    pub qualified: bool,
    /// When it was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Probation state attached to a reputation record after a fork.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbationState {
    /// Whether probation is still in force.
    pub active: bool,
    /// The fork type that triggered this probation.
    pub fork_type: ForkType,
    /// Start of the probation window.
    pub started_at: DateTime<Utc>,
    /// End of the probation window.
    pub expires_at: DateTime<Utc>,
    /// Evidence multiplier while active.
    pub confidence_multiplier: f64,
    /// Qualifying tasks accumulated so far.
    pub successful_tasks: u32,
    /// Qualifying tasks required for early exit.
    pub required_tasks: u32,
    /// How probation ended, once it has.
    pub exit: Option<ProbationExit>,
    /// Audit log of considered tasks.
    pub task_log: Vec<ProbationTaskEntry>,
}

impl ProbationState {
    /// Starts probation for a fresh fork of the given type.
    pub fn begin(fork_type: ForkType, now: DateTime<Utc>) -> Self {
        Self {
            active: true,
            fork_type,
            started_at: now,
            expires_at: now + Duration::days(fork_type.probation_days()),
            confidence_multiplier: CONFIDENCE_MULTIPLIER,
            successful_tasks: 0,
            required_tasks: REQUIRED_TASKS,
            exit: None,
            task_log: Vec::new(),
        }
    }

    /// Lazily detects time expiry.
    ///
    /// Returns the exit reason only on the call that performs the
    /// transition; later calls return `None` (the exit is observable
    /// exactly once).
    pub fn check_status(&mut self, now: DateTime<Utc>) -> Option<ProbationExit> {
        if self.active && now > self.expires_at {
            self.transition(ProbationExit::TimeExpired);
            return Some(ProbationExit::TimeExpired);
        }
        None
    }

    /// Records a session outcome against the probation counters.
    ///
    /// A qualifying outcome (>= [`SUCCESS_THRESHOLD`], undisputed) counts
    /// toward early exit; the exit fires synchronously the moment the
    /// threshold is reached. If the window has already expired, the time
    /// exit wins, whichever condition triggers first.
    pub fn record_task(
        &mut self,
        session_id: &str,
        outcome: f64,
        disputed: bool,
        now: DateTime<Utc>,
    ) -> Option<ProbationExit> {
        if !self.active {
            return None;
        }
        if let Some(exit) = self.check_status(now) {
            return Some(exit);
        }

        let qualified = outcome >= SUCCESS_THRESHOLD && !disputed;
        self.task_log.push(ProbationTaskEntry {
            session_id: session_id.to_string(),
            outcome,
            qualified,
            recorded_at: now,
        });

        if qualified {
            self.successful_tasks += 1;
            if self.successful_tasks >= self.required_tasks {
                self.transition(ProbationExit::TasksCompleted);
                return Some(ProbationExit::TasksCompleted);
            }
        }
        None
    }

    /// The multiplier the next update must use, with lazy expiry applied.
    pub fn multiplier(&mut self, now: DateTime<Utc>) -> f64 {
        self.check_status(now);
        if self.active {
            self.confidence_multiplier
        } else {
            1.0
        }
    }

    fn transition(&mut self, exit: ProbationExit) {
        self.active = false;
        self.exit = Some(exit);
        info!(
            ?exit,
            fork_type = ?self.fork_type,
            tasks = self.successful_tasks,
            "probation exited"
        );
    }
}
