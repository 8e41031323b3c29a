//! Per-operation retry budget.
//! Tracks wall-clock time spent against a timeout and sleeps between attempts.

use std::thread;
use std::time::{Duration, Instant};

use super::schedule::RetrySchedule;

/// Mutable retry state threaded through one operation's loop.
///
/// `timeout == 0` disables retries: the first failure is final.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    timeout: Duration,
    elapsed: Duration,
    attempt: u32,
    schedule: RetrySchedule,
    started: Instant,
}

impl RetryBudget {
    pub fn new(timeout: Duration, schedule: RetrySchedule) -> Self {
        Self {
            timeout,
            elapsed: Duration::ZERO,
            attempt: 0,
            schedule,
            started: Instant::now(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Number of retries performed so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Total attempts including the first one.
    pub fn attempts_made(&self) -> u32 {
        self.attempt.saturating_add(1)
    }

    pub fn retries_enabled(&self) -> bool {
        !self.timeout.is_zero()
    }

    fn refresh(&mut self) {
        // Instant is monotonic; max() keeps the invariant explicit.
        self.elapsed = self.elapsed.max(self.started.elapsed());
    }

    pub fn is_exhausted(&mut self) -> bool {
        self.refresh();
        self.elapsed >= self.timeout
    }

    /// Delay for the next retry, clamped to what is left of the budget.
    /// `None` once the budget is spent.
    pub fn next_wait(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        let remaining = self.timeout - self.elapsed;
        Some(self.schedule.next_delay(self.attempt).min(remaining))
    }

    /// Sleep for the next scheduled delay. `before_sleep` sees the budget and the
    /// delay about to be slept, so callers can report progress.
    /// Returns false without sleeping when the budget is exhausted.
    pub fn backoff(&mut self, before_sleep: impl FnOnce(&RetryBudget, Duration)) -> bool {
        let Some(delay) = self.next_wait() else {
            return false;
        };
        before_sleep(self, delay);
        thread::sleep(delay);
        self.attempt = self.attempt.saturating_add(1);
        self.refresh();
        true
    }
}
