//! Retry primitives shared by every operation: delay schedules, the per-call
//! budget, and the progress notification channel.

pub mod budget;
pub mod schedule;

pub use budget::RetryBudget;
pub use schedule::RetrySchedule;

use std::path::Path;
use std::time::Duration;

/// Progress event passed to the caller's sink. Ephemeral; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryNotification {
    /// true for "about to retry"; false for the single "giving up" event.
    pub is_retry: bool,
    pub is_directory: bool,
    pub message: String,
}

/// Callback invoked on every retry. A notification only: it cannot stop the loop.
pub type OnRetry<'a> = &'a (dyn Fn(&RetryNotification) + 'a);

/// Optional sink wrapper so call sites don't branch on `Option` everywhere.
#[derive(Clone, Copy, Default)]
pub(crate) struct Notifier<'a> {
    sink: Option<OnRetry<'a>>,
}

impl<'a> Notifier<'a> {
    pub(crate) fn new(sink: Option<OnRetry<'a>>) -> Self {
        Self { sink }
    }

    /// Report a pending wait of `delay` before retrying `what` on `path`.
    pub(crate) fn retry(
        &self,
        what: &str,
        path: &Path,
        is_directory: bool,
        budget: &RetryBudget,
        delay: Duration,
    ) {
        if let Some(sink) = self.sink {
            sink(&RetryNotification {
                is_retry: true,
                is_directory,
                message: format!(
                    "Waiting {} ms to retry {what} '{}' (attempt {}, {} of {} ms elapsed)",
                    delay.as_millis(),
                    dunce::simplified(path).display(),
                    budget.attempts_made() + 1,
                    budget.elapsed().as_millis(),
                    budget.timeout().as_millis()
                ),
            });
        }
    }

    pub(crate) fn gave_up(&self, what: &str, path: &Path, is_directory: bool, budget: &RetryBudget) {
        if let Some(sink) = self.sink {
            sink(&RetryNotification {
                is_retry: false,
                is_directory,
                message: format!(
                    "Gave up trying to {what} '{}' after {} attempt(s)",
                    dunce::simplified(path).display(),
                    budget.attempts_made()
                ),
            });
        }
    }
}

impl std::fmt::Debug for Notifier<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("sink", &self.sink.is_some())
            .finish()
    }
}
