use std::time::Duration;

/// Seconds between polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Shortest interval a configured poll period is raised to
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Request attempts per poll, including retries after re-authentication
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Largest multiplier exponential backoff will apply to the interval
const MAX_BACKOFF_SHIFT: u32 = 16;

/// Wait policy between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Always wait the poll interval.
    #[default]
    Fixed,
    /// Double the wait after each consecutive failed tick, up to `max`.
    Exponential { max: Duration },
}

impl Backoff {
    pub fn delay(&self, interval: Duration, consecutive_failures: u32) -> Duration {
        match *self {
            Backoff::Fixed => interval,
            Backoff::Exponential { max } => {
                let factor = 1u32 << consecutive_failures.min(MAX_BACKOFF_SHIFT);
                interval.saturating_mul(factor).min(max.max(interval))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::Fixed,
        }
    }
}
