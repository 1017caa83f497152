//! Requeue scheduling
//!
//! Two fixed intervals and nothing else: the long interval after a cycle that
//! completed (including one that matched no objects), the short interval after
//! a cycle that could not enumerate. No backoff growth, no failure cap.

use super::config::ScheduleConfig;
use super::types::Error;
use kube::runtime::controller::Action;
use std::time::Duration;

/// Short interval used by the reference cadence, in seconds
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(60);

/// Ratio between the long and the short interval in the reference cadence
pub const RESYNC_MULTIPLIER: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduler {
    resync_interval: Duration,
    retry_interval: Duration,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::from_retry_interval(DEFAULT_RETRY_INTERVAL)
    }
}

impl Scheduler {
    pub fn new(resync_interval: Duration, retry_interval: Duration) -> Self {
        Self {
            resync_interval,
            retry_interval,
        }
    }

    /// Long interval at five times the short one
    pub fn from_retry_interval(retry_interval: Duration) -> Self {
        Self::new(retry_interval * RESYNC_MULTIPLIER, retry_interval)
    }

    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self::new(config.resync_interval(), config.retry_interval())
    }

    pub fn resync_interval(&self) -> Duration {
        self.resync_interval
    }

    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    /// Delay before the next cycle given how this one ended
    pub fn next<T>(&self, outcome: &Result<T, Error>) -> Duration {
        match outcome {
            Ok(_) => self.resync_interval,
            Err(e) if e.is_retryable() => self.retry_interval,
            // A misconfigured alert will not fix itself within the short interval
            Err(_) => self.resync_interval,
        }
    }

    pub fn on_success(&self) -> Action {
        Action::requeue(self.resync_interval)
    }

    pub fn on_failure(&self, error: &Error) -> Action {
        if error.is_retryable() {
            Action::requeue(self.retry_interval)
        } else {
            Action::requeue(self.resync_interval)
        }
    }
}
