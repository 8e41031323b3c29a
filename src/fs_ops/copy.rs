//! Resilient single-file copy:
//! - Waits for a removable source drive to come back (within the budget)
//! - Waits for a locked source to be released
//! - Optionally rolls an existing, different destination into its backup series
//! - Creates the destination directory, clears blocking attributes, copies with retry
//! - Reconciles the primitive's outcome against the destination actually existing

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use crate::config::{self, Config};
use crate::errors::{CopyError, FailureKind};
use crate::fs_ops::attributes::AttributeNormalizer;
use crate::fs_ops::delete::FileDeleter;
use crate::fs_ops::guard::{self, Operation};
use crate::fs_ops::helpers;
use crate::fs_ops::reconcile::{Expect, reconcile};
use crate::fs_ops::rollover::RolloverNamer;
use crate::fs_ops::target::FileTarget;
use crate::platform::{Attributes, FileSystem};
use crate::retry::{Notifier, OnRetry, RetryBudget, RetrySchedule};

/// Attributes that stop a destination from being overwritten.
const DESTINATION_BLOCKING: Attributes = Attributes::READ_ONLY.union(Attributes::HIDDEN);

#[derive(Debug)]
pub struct FileCopier<'a, F: FileSystem + ?Sized> {
    fs: &'a F,
    notifier: Notifier<'a>,
    archive_folder: Option<PathBuf>,
    max_backups: u32,
}

impl<'a, F: FileSystem + ?Sized> FileCopier<'a, F> {
    pub fn new(fs: &'a F) -> Self {
        Self {
            fs,
            notifier: Notifier::default(),
            archive_folder: None,
            max_backups: config::DEFAULT_MAX_BACKUPS,
        }
    }

    pub fn from_config(fs: &'a F, cfg: &Config) -> Self {
        Self {
            archive_folder: cfg.archive_folder.clone(),
            max_backups: cfg.max_backups,
            ..Self::new(fs)
        }
    }

    pub fn with_notifier(mut self, on_retry: OnRetry<'a>) -> Self {
        self.notifier = Notifier::new(Some(on_retry));
        self
    }

    /// Where rolled-over destinations go; `None` keeps them beside the destination.
    pub fn with_archive_folder(mut self, folder: Option<PathBuf>) -> Self {
        self.archive_folder = folder;
        self
    }

    pub fn with_max_backups(mut self, max_backups: u32) -> Self {
        self.max_backups = max_backups;
        self
    }

    /// Copy `source` over `destination`.
    ///
    /// Returns `Ok(false)` when the copy still fails once the budget is spent.
    /// `timeout == 0` disables every wait: a missing drive or locked source fails at once.
    ///
    /// `timeout` covers the whole call. Each phase (drive wait, lock wait, rollover,
    /// destination clearing, copy) gets only what the earlier phases left over; once
    /// it is used up the remaining phases make a single attempt each.
    pub fn copy(
        &self,
        source: &Path,
        destination: &Path,
        rollover: bool,
        timeout: Duration,
    ) -> Result<bool, CopyError> {
        guard::validate(
            Operation::Copy,
            &[("source", source), ("destination", destination)],
        )?;

        let started = Instant::now();
        let remaining = || timeout.saturating_sub(started.elapsed());

        let src = FileTarget::probe(self.fs, source);
        if !src.existed_at_start() {
            self.wait_for_source_drive(source, remaining())?;
        }
        if !timeout.is_zero() {
            self.wait_until_unlocked(source, remaining())?;
        }

        let dst = FileTarget::probe(self.fs, destination);
        if rollover && dst.existed_at_start() && !self.same_content(source, destination) {
            RolloverNamer::new(self.fs)
                .notifying(self.notifier)
                .with_timeout(remaining())
                .rollover(destination, self.archive_folder.as_deref(), self.max_backups)?;
        }

        self.ensure_parent(destination)?;
        self.clear_destination(&dst, !timeout.is_zero(), remaining());
        self.copy_with_retry(source, destination, remaining())
    }

    /// Source is missing. If its drive is present that is final; otherwise wait for
    /// the drive on the standard schedule until the budget runs out.
    fn wait_for_source_drive(&self, source: &Path, timeout: Duration) -> Result<(), CopyError> {
        let not_found = || CopyError::SourceNotFound(source.to_path_buf());
        let Some(drive) = self.fs.drive_of(source) else {
            return Err(not_found());
        };
        if self.fs.drive_exists(&drive) {
            return Err(not_found());
        }

        let mut budget = RetryBudget::new(timeout, RetrySchedule::Standard);
        let notifier = self.notifier;
        while budget.backoff(|b, delay| {
            debug!(drive = %drive, delay_ms = delay.as_millis() as u64, "waiting for source drive");
            notifier.retry("reach the drive of", source, false, b, delay);
        }) {
            if self.fs.drive_exists(&drive) {
                info!(drive = %drive, "source drive is back");
                return if self.fs.file_exists(source) {
                    Ok(())
                } else {
                    Err(not_found())
                };
            }
        }

        if budget.retries_enabled() {
            notifier.gave_up("reach the drive of", source, false, &budget);
        }
        warn!(drive = %drive, path = %source.display(), "source drive not found");
        Err(CopyError::DriveNotFound {
            path: source.to_path_buf(),
            drive: drive.to_string(),
            waited: budget.elapsed(),
        })
    }

    fn wait_until_unlocked(&self, source: &Path, timeout: Duration) -> Result<(), CopyError> {
        let mut budget = RetryBudget::new(timeout, RetrySchedule::FileOperation);
        let notifier = self.notifier;
        while self.fs.is_file_locked(source) {
            let waited = budget.backoff(|b, delay| {
                debug!(path = %source.display(), delay_ms = delay.as_millis() as u64, "source is locked");
                notifier.retry("read locked file", source, false, b, delay);
            });
            if !waited {
                notifier.gave_up("read locked file", source, false, &budget);
                return Err(CopyError::Timeout {
                    path: source.to_path_buf(),
                    waited: budget.elapsed(),
                });
            }
        }
        Ok(())
    }

    /// Unreadable files count as different, so the destination gets backed up.
    fn same_content(&self, source: &Path, destination: &Path) -> bool {
        match self.fs.files_have_same_content(source, destination) {
            Ok(same) => {
                if same {
                    debug!(path = %destination.display(), "destination already identical; no rollover");
                }
                same
            }
            Err(e) => {
                trace!(error = %e, "content comparison failed; treating as different");
                false
            }
        }
    }

    fn ensure_parent(&self, destination: &Path) -> Result<(), CopyError> {
        let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) else {
            return Ok(());
        };
        if self.fs.dir_exists(parent) {
            return Ok(());
        }
        if let Some(drive) = self.fs.drive_of(destination)
            && !self.fs.drive_exists(&drive)
        {
            return Err(CopyError::DriveNotFound {
                path: destination.to_path_buf(),
                drive: drive.to_string(),
                waited: Duration::ZERO,
            });
        }
        self.fs
            .create_dir_all(parent)
            .map_err(|source| CopyError::CreateParent {
                path: parent.to_path_buf(),
                source,
            })?;
        trace!(path = %parent.display(), "created destination directory");
        Ok(())
    }

    /// Existing Read-Only or Hidden destination: with retries enabled, hand it to the
    /// retrying deleter; otherwise just clear those attributes. Failures here are left
    /// for the copy loop to report.
    fn clear_destination(&self, dst: &FileTarget, retries: bool, timeout: Duration) {
        if !dst.exists_now(self.fs) {
            return;
        }
        let blocking = match self.fs.attributes(dst.path()) {
            Ok(attrs) => attrs.intersects(DESTINATION_BLOCKING.intersection(Attributes::CLEARABLE)),
            Err(_) => false,
        };
        if !blocking {
            return;
        }
        if retries {
            let deleted = FileDeleter::new(self.fs)
                .notifying(self.notifier)
                .try_delete(dst.path(), timeout)
                .unwrap_or(false);
            if !deleted {
                debug!(path = %dst.path().display(), "could not remove protected destination");
            }
        } else if let Err(e) =
            AttributeNormalizer::with_mask(self.fs, DESTINATION_BLOCKING).clear_blocking(dst.path())
        {
            debug!(path = %dst.path().display(), error = %e, "could not clear destination attributes");
        }
    }

    fn copy_with_retry(
        &self,
        source: &Path,
        destination: &Path,
        timeout: Duration,
    ) -> Result<bool, CopyError> {
        let mut budget = RetryBudget::new(timeout, RetrySchedule::FileOperation);
        let mut first_error: Option<io::Error> = None;
        let notifier = self.notifier;

        loop {
            let reported = self.fs.raw_copy(source, destination, true).map(|_| ());
            match reconcile(reported, Expect::Present, || self.fs.file_exists(destination)) {
                Ok(()) => {
                    debug!(
                        src = %source.display(),
                        dst = %destination.display(),
                        attempts = budget.attempts_made(),
                        "copied"
                    );
                    return Ok(true);
                }
                Err(_) if self.fs.dir_exists(destination) => {
                    return Err(CopyError::DestinationIsDirectory(destination.to_path_buf()));
                }
                Err(e) => {
                    let kind = FailureKind::of(&e);
                    trace!(dst = %destination.display(), kind = %kind, error = %e, "copy attempt failed");
                    if kind.clears_with_attributes()
                        && let Err(ae) = AttributeNormalizer::with_mask(self.fs, DESTINATION_BLOCKING)
                            .clear_blocking(destination)
                    {
                        trace!(error = %ae, "could not clear destination attributes");
                    }
                    first_error.get_or_insert(e);
                }
            }
            let retried = budget.backoff(|b, delay| {
                debug!(
                    path = %destination.display(),
                    attempt = b.attempts_made(),
                    delay_ms = delay.as_millis() as u64,
                    elapsed_ms = b.elapsed().as_millis() as u64,
                    "retrying copy"
                );
                notifier.retry("copy to", destination, false, b, delay);
            });
            if !retried {
                break;
            }
        }

        if budget.retries_enabled() {
            notifier.gave_up("copy to", destination, false, &budget);
        }
        if let Some(e) = first_error {
            warn!("{}", helpers::describe("copy to", destination, &e));
        }
        Ok(false)
    }
}
