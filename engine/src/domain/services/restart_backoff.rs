//! Restart backoff policy
//!
//! Sliding one-hour window of restart attempts per unit with an exponential,
//! capped delay between attempts.

use crate::domain::constants::{
    RESTART_BACKOFF_BASE, RESTART_LIMIT_PER_WINDOW, RESTART_MAX_BACKOFF_SEC, RESTART_WINDOW_SEC,
};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartDecision {
    /// Wait this long, then restart
    Backoff(Duration),
    /// Too many restarts inside the window; the unit stays failed
    LimitReached { attempts: usize },
}

#[derive(Debug, Clone)]
pub struct RestartTracker {
    attempts: VecDeque<Instant>,
    window: Duration,
    limit: usize,
    max_backoff: Duration,
}

impl Default for RestartTracker {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(RESTART_WINDOW_SEC),
            RESTART_LIMIT_PER_WINDOW,
            Duration::from_secs(RESTART_MAX_BACKOFF_SEC),
        )
    }
}

impl RestartTracker {
    pub fn new(window: Duration, limit: usize, max_backoff: Duration) -> Self {
        Self {
            attempts: VecDeque::new(),
            window,
            limit,
            max_backoff,
        }
    }

    /// Drop attempts older than the window and decide what to do next
    pub fn decide(&mut self, now: Instant) -> RestartDecision {
        self.prune(now);
        let count = self.attempts.len();
        if count >= self.limit {
            return RestartDecision::LimitReached { attempts: count };
        }
        RestartDecision::Backoff(backoff_for(count, self.max_backoff))
    }

    pub fn record(&mut self, at: Instant) {
        self.attempts.push_back(at);
    }

    pub fn attempts_in_window(&mut self, now: Instant) -> usize {
        self.prune(now);
        self.attempts.len()
    }

    fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.attempts.front() {
            if now.saturating_duration_since(*oldest) > self.window {
                self.attempts.pop_front();
            } else {
                break;
            }
        }
    }
}

/// `min(2^count, max)` seconds
pub fn backoff_for(count: usize, max: Duration) -> Duration {
    let exponent = u32::try_from(count).unwrap_or(u32::MAX);
    let seconds = RESTART_BACKOFF_BASE
        .checked_pow(exponent)
        .unwrap_or(u64::MAX);
    Duration::from_secs(seconds).min(max)
}
