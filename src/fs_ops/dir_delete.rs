//! Directory tree removal.
//!
//! Walks the tree with an explicit stack, so depth is bounded by memory rather
//! than the call stack. For every directory:
//! 1. clear its blocking attributes and list it (listing is retried),
//! 2. delete its files through `FileDeleter`, stopping at the first failure,
//! 3. queue its subdirectories,
//! 4. once everything below is gone, remove the empty directory in a retry loop.
//!
//! Entries named like the reserved system-metadata directory are never touched.
//! Partial deletion is possible: on failure the caller gets `false` and whatever
//! was already removed stays removed.

use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::config::{self, Config};
use crate::errors::DeleteError;
use crate::fs_ops::attributes::AttributeNormalizer;
use crate::fs_ops::delete::FileDeleter;
use crate::fs_ops::guard::{self, Operation};
use crate::fs_ops::helpers;
use crate::fs_ops::reconcile::{Expect, reconcile};
use crate::platform::{DirEntryInfo, FileSystem};
use crate::retry::{Notifier, OnRetry, RetryBudget, RetrySchedule};

enum Frame {
    /// Empty the directory's files and queue its subdirectories.
    Enter(PathBuf),
    /// Remove the directory; everything below it is already gone.
    Leave(PathBuf),
}

#[derive(Debug)]
pub struct DirectoryDeleter<'a, F: FileSystem + ?Sized> {
    fs: &'a F,
    notifier: Notifier<'a>,
    timeout: Duration,
    reserved_dir_name: String,
    settle_pause: Duration,
}

impl<'a, F: FileSystem + ?Sized> DirectoryDeleter<'a, F> {
    pub fn new(fs: &'a F) -> Self {
        Self {
            fs,
            notifier: Notifier::default(),
            timeout: config::DEFAULT_TIMEOUT,
            reserved_dir_name: config::DEFAULT_RESERVED_DIR_NAME.to_string(),
            settle_pause: config::DEFAULT_SETTLE_PAUSE,
        }
    }

    pub fn from_config(fs: &'a F, cfg: &Config) -> Self {
        Self::new(fs)
            .with_timeout(cfg.timeout)
            .with_reserved_dir_name(&cfg.reserved_dir_name)
            .with_settle_pause(cfg.settle_pause)
    }

    pub fn with_notifier(mut self, on_retry: OnRetry<'a>) -> Self {
        self.notifier = Notifier::new(Some(on_retry));
        self
    }

    /// Budget used by `delete_contents`, which takes no timeout of its own.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_reserved_dir_name(mut self, name: &str) -> Self {
        self.reserved_dir_name = name.to_string();
        self
    }

    /// Pause after deleting a batch of files; zero disables it.
    pub fn with_settle_pause(mut self, pause: Duration) -> Self {
        self.settle_pause = pause;
        self
    }

    /// Remove `path` and everything below it. A missing directory is a no-op success.
    pub fn delete_tree(&self, path: &Path, timeout: Duration) -> Result<bool, DeleteError> {
        guard::validate(Operation::DeleteDirectory, &[("path", path)])?;
        if !self.fs.dir_exists(path) {
            if self.fs.file_exists(path) {
                return Err(DeleteError::NotADirectory(path.to_path_buf()));
            }
            trace!(path = %path.display(), "directory already absent");
            return Ok(true);
        }
        let removed = self.walk(path, timeout, None, true);
        if removed {
            info!(path = %path.display(), "removed directory tree");
        }
        Ok(removed)
    }

    /// Remove everything inside `path` but keep `path` itself. A top-level entry
    /// named `exclude` is left alone.
    pub fn delete_contents(&self, path: &Path, exclude: Option<&str>) -> Result<bool, DeleteError> {
        guard::validate(Operation::DeleteDirectory, &[("path", path)])?;
        if !self.fs.dir_exists(path) {
            if self.fs.file_exists(path) {
                return Err(DeleteError::NotADirectory(path.to_path_buf()));
            }
            trace!(path = %path.display(), "directory already absent");
            return Ok(true);
        }
        let emptied = self.walk(path, self.timeout, exclude, false);
        if emptied {
            info!(path = %path.display(), "emptied directory");
        }
        Ok(emptied)
    }

    fn walk(&self, root: &Path, timeout: Duration, exclude: Option<&str>, remove_root: bool) -> bool {
        let files = FileDeleter::new(self.fs).notifying(self.notifier);
        let normalizer = AttributeNormalizer::new(self.fs);

        let mut stack = Vec::new();
        if remove_root {
            stack.push(Frame::Leave(root.to_path_buf()));
        }
        stack.push(Frame::Enter(root.to_path_buf()));

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(dir) => {
                    if let Err(e) = normalizer.clear_blocking(&dir) {
                        trace!(path = %dir.display(), error = %e, "could not clear directory attributes");
                    }
                    let Some(entries) = self.list(&dir, timeout) else {
                        return false;
                    };
                    let exclude = if dir == root { exclude } else { None };
                    let mut deleted = 0usize;
                    for entry in entries {
                        if self.is_skipped(&entry, exclude) {
                            trace!(path = %entry.path.display(), "skipping reserved entry");
                            continue;
                        }
                        if entry.is_dir {
                            stack.push(Frame::Leave(entry.path.clone()));
                            stack.push(Frame::Enter(entry.path));
                            continue;
                        }
                        match files.try_delete(&entry.path, timeout) {
                            Ok(true) => deleted += 1,
                            Ok(false) | Err(_) => {
                                warn!(path = %entry.path.display(), "could not delete file; aborting directory removal");
                                return false;
                            }
                        }
                    }
                    if deleted > 0 && !self.settle_pause.is_zero() {
                        thread::sleep(self.settle_pause);
                    }
                }
                Frame::Leave(dir) => {
                    if !self.remove_empty(&dir, timeout) {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn is_skipped(&self, entry: &DirEntryInfo, exclude: Option<&str>) -> bool {
        let name = entry.name.to_string_lossy();
        let reserved = entry.is_dir && name.eq_ignore_ascii_case(&self.reserved_dir_name);
        let excluded = exclude.is_some_and(|x| name.eq_ignore_ascii_case(x));
        reserved || excluded
    }

    /// List `dir`, retrying transient enumeration failures. A vanished directory lists as empty.
    fn list(&self, dir: &Path, timeout: Duration) -> Option<Vec<DirEntryInfo>> {
        let mut budget = RetryBudget::new(timeout, RetrySchedule::Standard);
        let mut first_error: Option<io::Error> = None;
        loop {
            match self.fs.list_dir(dir) {
                Ok(entries) => return Some(entries),
                Err(_) if !self.fs.dir_exists(dir) => return Some(Vec::new()),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
            let notifier = self.notifier;
            if !budget.backoff(|b, delay| notifier.retry("list", dir, true, b, delay)) {
                break;
            }
        }
        if budget.retries_enabled() {
            self.notifier.gave_up("list", dir, true, &budget);
        }
        if let Some(e) = first_error {
            warn!("{}", helpers::describe("list directory", dir, &e));
        }
        None
    }

    /// Remove an empty directory. Retried because removal can fail for a while
    /// after the last child is gone.
    fn remove_empty(&self, dir: &Path, timeout: Duration) -> bool {
        let normalizer = AttributeNormalizer::new(self.fs);
        let mut budget = RetryBudget::new(timeout, RetrySchedule::Standard);
        let mut first_error: Option<io::Error> = None;
        let notifier = self.notifier;
        loop {
            if let Err(e) = normalizer.clear_blocking(dir) {
                trace!(path = %dir.display(), error = %e, "could not clear directory attributes");
            }
            let reported = self.fs.raw_delete_empty_dir(dir);
            match reconcile(reported, Expect::Absent, || self.fs.dir_exists(dir)) {
                Ok(()) => {
                    trace!(path = %dir.display(), "removed directory");
                    return true;
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
            let retried = budget.backoff(|b, delay| {
                debug!(
                    path = %dir.display(),
                    attempt = b.attempts_made(),
                    delay_ms = delay.as_millis() as u64,
                    elapsed_ms = b.elapsed().as_millis() as u64,
                    "retrying directory removal"
                );
                notifier.retry("remove directory", dir, true, b, delay);
            });
            if !retried {
                break;
            }
        }
        if budget.retries_enabled() {
            notifier.gave_up("remove directory", dir, true, &budget);
        }
        if let Some(e) = first_error {
            warn!("{}", helpers::describe("remove directory", dir, &e));
        }
        false
    }
}
