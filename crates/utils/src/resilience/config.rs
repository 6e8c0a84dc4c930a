//! Retry configuration

use std::time::Duration;
use ticketry_core::{Error, ErrorKind};

/// Pause between conflict retries unless overridden
const DEFAULT_CONFLICT_DELAY: Duration = Duration::from_millis(5);

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: usize,
    /// Pause between attempts
    pub delay: Duration,
}

impl RetryConfig {
    /// Retry only write conflicts, with a short fixed pause between attempts
    pub fn for_conflicts(max_retries: usize) -> Self {
        Self {
            max_retries,
            delay: DEFAULT_CONFLICT_DELAY,
        }
    }

    /// Same policy with a different pause between attempts
    pub fn with_fixed_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Total number of attempts, the first one included
    pub fn max_attempts(&self) -> usize {
        self.max_retries + 1
    }

    /// Only optimistic-concurrency conflicts are worth another attempt
    pub fn should_retry(&self, error: &Error) -> bool {
        error.kind() == ErrorKind::Conflict
    }

    /// Pause before the retry following `attempt`
    pub fn calculate_delay(&self, _attempt: usize) -> Duration {
        self.delay
    }
}
