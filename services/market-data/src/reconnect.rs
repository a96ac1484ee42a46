//! Reconnect backoff for the upstream feed
//!
//! Exponential: `initial`, doubling on every consecutive failure, capped at
//! `max`. A session that delivered ticks resets the delay.

use std::time::Duration;

/// Configuration for the reconnect delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// First delay after a drop (default: 1s).
    pub initial: Duration,
    /// Ceiling for the delay (default: 30s).
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    pub fn start(&self) -> Backoff {
        Backoff {
            policy: *self,
            next: self.initial,
            attempts: 0,
        }
    }
}

/// Running backoff state for one upstream connection.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    next: Duration,
    attempts: u32,
}

impl Backoff {
    /// Delay before the next attempt; advances the state.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next.min(self.policy.max);
        self.next = (self.next * 2).min(self.policy.max);
        self.attempts += 1;
        delay
    }

    pub fn reset(&mut self) {
        self.next = self.policy.initial;
        self.attempts = 0;
    }

    /// Consecutive failed attempts since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
