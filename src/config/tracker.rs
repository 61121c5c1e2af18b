use std::time::Duration;

/// Retry and timing rules for one job-progress polling session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between status requests. The first request goes out immediately.
    pub poll_interval: Duration,
    /// Retryable failures tolerated before the session is abandoned.
    pub max_retries: u32,
    /// Absolute ceiling on a session, measured from `start_session`.
    pub max_polling_duration: Duration,
    /// Minimum time between `start_session` and the terminal callback.
    pub min_display_time: Duration,
}

pub const TRACKER: PollPolicy = PollPolicy {
    poll_interval: Duration::from_millis(1000),
    max_retries: 3,
    max_polling_duration: Duration::from_millis(120_000),
    min_display_time: Duration::from_millis(5000),
};

impl Default for PollPolicy {
    fn default() -> Self {
        TRACKER
    }
}
