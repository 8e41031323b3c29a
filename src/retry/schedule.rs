//! Backoff delay schedules.
//!
//! Both schedules double from their starting delay and then hold at one second.
//! They are pure functions of the attempt index; callers keep the index.

use std::time::Duration;

/// Upper bound for any single backoff delay.
pub const MAX_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrySchedule {
    /// 25, 50, 100, 200, 400, 800, 1000, 1000, ... ms
    Standard,
    /// 50, 100, 200, 400, 800, 1000, 1000, ... ms (file copy and delete)
    FileOperation,
}

impl RetrySchedule {
    fn initial_ms(self) -> u64 {
        match self {
            RetrySchedule::Standard => 25,
            RetrySchedule::FileOperation => 50,
        }
    }

    /// Delay to wait before retry number `attempt` (0-based).
    pub fn next_delay(self, attempt: u32) -> Duration {
        let cap = MAX_DELAY.as_millis() as u64;
        // 1000 ms is reached well before a shift of 6, so clamp the exponent.
        let ms = self.initial_ms().saturating_mul(1u64 << attempt.min(6));
        Duration::from_millis(ms.min(cap))
    }

    /// Restartable iterator over the schedule. Never ends.
    pub fn delays(self) -> impl Iterator<Item = Duration> {
        (0u32..).map(move |attempt| self.next_delay(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: &[u64]) -> Vec<Duration> {
        v.iter().copied().map(Duration::from_millis).collect()
    }

    #[test]
    fn standard_sequence() {
        let got: Vec<_> = RetrySchedule::Standard.delays().take(9).collect();
        assert_eq!(got, ms(&[25, 50, 100, 200, 400, 800, 1000, 1000, 1000]));
    }

    #[test]
    fn file_operation_sequence() {
        let got: Vec<_> = RetrySchedule::FileOperation.delays().take(8).collect();
        assert_eq!(got, ms(&[50, 100, 200, 400, 800, 1000, 1000, 1000]));
    }

    #[test]
    fn huge_attempt_index_stays_capped() {
        assert_eq!(RetrySchedule::Standard.next_delay(u32::MAX), MAX_DELAY);
        assert_eq!(RetrySchedule::FileOperation.next_delay(64), MAX_DELAY);
    }

    #[test]
    fn iterator_restarts_from_zero() {
        let first: Vec<_> = RetrySchedule::Standard.delays().take(3).collect();
        let again: Vec<_> = RetrySchedule::Standard.delays().take(3).collect();
        assert_eq!(first, again);
    }
}
