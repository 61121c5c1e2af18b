//! Polling-session state machine.
//!
//! A `PollSession` decides what a status response means (keep going, retry,
//! finalize after the display delay, abort). Timers and requests live in the
//! tracker; this type only sees results and instants.

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::config::PollPolicy;
use crate::data::StatusError;
use crate::models::{JobStatus, ProgressState};

/// Terminal failures surfaced to whoever started the session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    #[error("job {test_id}: gave up after {attempts} failed status requests (last: {last})")]
    RetriesExhausted {
        test_id: String,
        attempts: u32,
        last: StatusError,
    },

    #[error("job {test_id}: no result after {}s", .elapsed.as_secs())]
    TimedOut { test_id: String, elapsed: Duration },

    #[error("job {test_id}: status request failed: {source}")]
    Status {
        test_id: String,
        #[source]
        source: StatusError,
    },

    #[error("job {test_id} failed: {reason}")]
    JobFailed { test_id: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(ProgressState),
    Failed(ProgressState),
}

impl JobOutcome {
    pub fn snapshot(&self) -> &ProgressState {
        match self {
            JobOutcome::Completed(s) | JobOutcome::Failed(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickVerdict {
    /// Job still running; store the snapshot and keep polling.
    Progress(ProgressState),
    /// Retryable failure inside budget.
    Retry { attempt: u32, error: StatusError },
    /// Job finished; report after `after` has elapsed.
    Finalize { outcome: JobOutcome, after: Duration },
    Abort(TrackerError),
}

#[derive(Debug, Clone)]
pub struct PollSession {
    test_id: String,
    started_at: Instant,
    error_count: u32,
    policy: PollPolicy,
}

impl PollSession {
    pub fn new(test_id: impl Into<String>, started_at: Instant, policy: PollPolicy) -> Self {
        Self {
            test_id: test_id.into(),
            started_at,
            error_count: 0,
            policy,
        }
    }

    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Absolute ceiling, checked independently of per-tick outcomes.
    pub fn check_deadline(&self, now: Instant) -> Option<TrackerError> {
        let elapsed = now.saturating_duration_since(self.started_at);
        (elapsed > self.policy.max_polling_duration).then(|| TrackerError::TimedOut {
            test_id: self.test_id.clone(),
            elapsed,
        })
    }

    /// Remaining part of the minimum display time, zero if already spent.
    pub fn display_delay(&self, now: Instant) -> Duration {
        let shown = now.saturating_duration_since(self.started_at);
        self.policy.min_display_time.saturating_sub(shown)
    }

    pub fn on_status(
        &mut self,
        result: Result<ProgressState, StatusError>,
        now: Instant,
    ) -> TickVerdict {
        match result {
            Ok(state) => {
                self.error_count = 0;
                let state = state.normalized();
                match state.status {
                    JobStatus::Running => TickVerdict::Progress(state),
                    JobStatus::Completed => TickVerdict::Finalize {
                        after: self.display_delay(now),
                        outcome: JobOutcome::Completed(state),
                    },
                    JobStatus::Error => TickVerdict::Finalize {
                        after: self.display_delay(now),
                        outcome: JobOutcome::Failed(state),
                    },
                }
            }
            Err(error) if error.is_retryable() => {
                self.error_count += 1;
                if self.error_count <= self.policy.max_retries {
                    TickVerdict::Retry {
                        attempt: self.error_count,
                        error,
                    }
                } else {
                    TickVerdict::Abort(TrackerError::RetriesExhausted {
                        test_id: self.test_id.clone(),
                        attempts: self.error_count,
                        last: error,
                    })
                }
            }
            Err(error) => TickVerdict::Abort(TrackerError::Status {
                test_id: self.test_id.clone(),
                source: error,
            }),
        }
    }
}
