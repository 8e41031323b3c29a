//! Single-file deletion with a bounded retry budget.
//!
//! Each attempt clears blocking attributes and then deletes. Any failure is retried
//! on the file-operation schedule until the budget runs out; a target that is
//! already gone (before, during or after the loop) counts as deleted.
//!
//! Two entry points with different failure visibility:
//! - `try_delete`: ordinary failure is `Ok(false)`; only bad arguments are errors.
//! - `delete`: failure is `Err(DeleteError::Exhausted)` carrying the first error seen.

use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::errors::{DeleteError, FailureKind};
use crate::fs_ops::attributes::AttributeNormalizer;
use crate::fs_ops::guard::{self, Operation};
use crate::fs_ops::helpers;
use crate::fs_ops::reconcile::{Expect, reconcile};
use crate::fs_ops::target::FileTarget;
use crate::platform::FileSystem;
use crate::retry::{Notifier, OnRetry, RetryBudget, RetrySchedule};

#[derive(Debug)]
pub struct FileDeleter<'a, F: FileSystem + ?Sized> {
    fs: &'a F,
    notifier: Notifier<'a>,
}

impl<'a, F: FileSystem + ?Sized> FileDeleter<'a, F> {
    pub fn new(fs: &'a F) -> Self {
        Self {
            fs,
            notifier: Notifier::default(),
        }
    }

    /// Report every retry wait to `on_retry`.
    pub fn with_notifier(mut self, on_retry: OnRetry<'a>) -> Self {
        self.notifier = Notifier::new(Some(on_retry));
        self
    }

    pub(crate) fn notifying(mut self, notifier: Notifier<'a>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Delete `path`, returning whether it is gone. `timeout == 0` makes one attempt.
    pub fn try_delete(&self, path: &Path, timeout: Duration) -> Result<bool, DeleteError> {
        match self.delete(path, timeout) {
            Ok(()) => Ok(true),
            Err(DeleteError::Exhausted { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Delete `path` or fail with the first error seen once the budget is spent.
    pub fn delete(&self, path: &Path, timeout: Duration) -> Result<(), DeleteError> {
        guard::validate(Operation::DeleteFile, &[("path", path)])?;

        let target = FileTarget::probe(self.fs, path);
        if !target.existed_at_start() {
            if self.fs.dir_exists(path) {
                return Err(DeleteError::NotAFile(path.to_path_buf()));
            }
            trace!(path = %path.display(), "already absent; nothing to delete");
            return Ok(());
        }

        let normalizer = AttributeNormalizer::new(self.fs);
        let mut budget = RetryBudget::new(timeout, RetrySchedule::FileOperation);
        let mut first_error: Option<io::Error> = None;
        let notifier = self.notifier;

        loop {
            match self.attempt(&normalizer, &target) {
                Ok(()) => {
                    if budget.attempt() > 0 {
                        debug!(
                            path = %path.display(),
                            attempts = budget.attempts_made(),
                            "deleted after retrying"
                        );
                    }
                    return Ok(());
                }
                Err(e) => {
                    trace!(path = %path.display(), kind = %FailureKind::of(&e), error = %e, "delete attempt failed");
                    first_error.get_or_insert(e);
                }
            }
            let retried = budget.backoff(|b, delay| {
                debug!(
                    path = %path.display(),
                    attempt = b.attempts_made(),
                    delay_ms = delay.as_millis() as u64,
                    elapsed_ms = b.elapsed().as_millis() as u64,
                    "retrying delete"
                );
                notifier.retry("delete", path, false, b, delay);
            });
            if !retried {
                break;
            }
        }

        // Another process may have removed it while we were failing.
        if !target.exists_now(self.fs) {
            debug!(path = %path.display(), "target vanished after failed attempts");
            return Ok(());
        }

        if budget.retries_enabled() {
            notifier.gave_up("delete", path, false, &budget);
        }
        let source = first_error.unwrap_or_else(|| io::Error::other("delete failed"));
        warn!("{}", helpers::describe("delete", path, &source));
        Err(DeleteError::Exhausted {
            path: path.to_path_buf(),
            attempts: budget.attempts_made(),
            timeout,
            source,
        })
    }

    fn attempt(&self, normalizer: &AttributeNormalizer<'_, F>, target: &FileTarget) -> io::Result<()> {
        if let Err(e) = normalizer.clear_blocking(target.path()) {
            // Still try the delete; it reports the real problem.
            trace!(path = %target.path().display(), error = %e, "could not clear attributes");
        }
        let reported = self.fs.raw_delete_file(target.path());
        reconcile(reported, Expect::Absent, || target.exists_now(self.fs))
    }
}
