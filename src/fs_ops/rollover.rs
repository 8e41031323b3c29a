//! Numbered backup rotation.
//!
//! `File.txt` rolls to `File(1).txt`, `File(2).txt`, ... up to `max_backups`.
//! The highest index is always the most recently displaced file. Existing backups
//! are packed into `(1)..(n)` in age order and the target takes `(n+1)`. When the
//! series is full, `(1)` (the oldest) is deleted, the rest shift down by one, and
//! the target takes the highest slot.
//!
//! With an archive folder the backups live there instead of beside the file.
//! Moves into the archive fall back to copy + delete across devices.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::config::{self, Config};
use crate::errors::RolloverError;
use crate::fs_ops::delete::FileDeleter;
use crate::fs_ops::guard::{self, Operation};
use crate::fs_ops::reconcile::{Expect, reconcile};
use crate::platform::FileSystem;
use crate::retry::{Notifier, OnRetry};

/// Path of backup number `index` for `path`: `{stem}({index}).{ext}`, placed in
/// `archive_folder` when given, else next to `path`.
pub fn backup_path(path: &Path, archive_folder: Option<&Path>, index: u32) -> PathBuf {
    let stem: OsString = path
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| path.as_os_str().to_os_string());
    let mut name = stem;
    name.push(format!("({index})"));
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    let dir = match archive_folder {
        Some(a) => a.to_path_buf(),
        None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    dir.join(name)
}

#[derive(Debug)]
pub struct RolloverNamer<'a, F: FileSystem + ?Sized> {
    fs: &'a F,
    notifier: Notifier<'a>,
    /// Budget for deleting the oldest backup.
    timeout: Duration,
}

impl<'a, F: FileSystem + ?Sized> RolloverNamer<'a, F> {
    pub fn new(fs: &'a F) -> Self {
        Self {
            fs,
            notifier: Notifier::default(),
            timeout: config::DEFAULT_TIMEOUT,
        }
    }

    pub fn from_config(fs: &'a F, cfg: &Config) -> Self {
        Self::new(fs).with_timeout(cfg.timeout)
    }

    pub fn with_notifier(mut self, on_retry: OnRetry<'a>) -> Self {
        self.notifier = Notifier::new(Some(on_retry));
        self
    }

    pub(crate) fn notifying(mut self, notifier: Notifier<'a>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Move `path` into the backup series. A missing `path` is a no-op.
    /// `max_backups == 0` keeps no backups: the file is deleted.
    pub fn rollover(
        &self,
        path: &Path,
        archive_folder: Option<&Path>,
        max_backups: u32,
    ) -> Result<(), RolloverError> {
        guard::validate(Operation::Rollover, &[("path", path)])?;
        if let Some(archive) = archive_folder {
            guard::validate(Operation::Rollover, &[("archive folder", archive)])?;
        }
        if !self.fs.file_exists(path) {
            trace!(path = %path.display(), "nothing to roll over");
            return Ok(());
        }
        if max_backups == 0 {
            self.deleter().delete(path, self.timeout)?;
            info!(path = %path.display(), "no backups kept; removed file");
            return Ok(());
        }

        if let Some(archive) = archive_folder
            && !self.fs.dir_exists(archive)
        {
            self.fs
                .create_dir_all(archive)
                .map_err(|source| io_error("create archive folder", archive, source))?;
        }

        let slot = |i: u32| backup_path(path, archive_folder, i);
        let present: Vec<u32> = (1..=max_backups)
            .filter(|&i| self.fs.file_exists(&slot(i)))
            .collect();

        let target_slot = if present.len() as u32 >= max_backups {
            self.deleter().delete(&slot(1), self.timeout)?;
            for i in 2..=max_backups {
                self.move_file(&slot(i), &slot(i - 1))?;
            }
            max_backups
        } else {
            // Close gaps oldest-first; each destination index is at most its source.
            for (new_index, &old_index) in (1u32..).zip(&present) {
                if new_index != old_index {
                    self.move_file(&slot(old_index), &slot(new_index))?;
                }
            }
            present.len() as u32 + 1
        };

        let dest = slot(target_slot);
        self.move_file(path, &dest)?;
        info!(path = %path.display(), backup = %dest.display(), "rolled over");
        Ok(())
    }

    fn deleter(&self) -> FileDeleter<'a, F> {
        FileDeleter::new(self.fs).notifying(self.notifier)
    }

    /// Rename, or copy + delete when the rename cannot cross devices.
    fn move_file(&self, from: &Path, to: &Path) -> Result<(), RolloverError> {
        let renamed = self.fs.rename(from, to);
        let renamed = reconcile(renamed, Expect::Present, || self.fs.file_exists(to));
        match renamed {
            Ok(()) => {
                trace!(from = %from.display(), to = %to.display(), "renamed");
                Ok(())
            }
            Err(e) if is_cross_device(&e) => {
                debug!(from = %from.display(), to = %to.display(), "rename crosses devices; copying");
                self.fs
                    .raw_copy(from, to, false)
                    .map_err(|source| io_error("copy", from, source))?;
                self.deleter().delete(from, self.timeout)?;
                Ok(())
            }
            Err(source) => Err(io_error("rename", from, source)),
        }
    }
}

fn io_error(op: &'static str, path: &Path, source: io::Error) -> RolloverError {
    RolloverError::Io {
        op,
        path: path.to_path_buf(),
        source,
    }
}

fn is_cross_device(e: &io::Error) -> bool {
    #[cfg(unix)]
    const CROSS_DEVICE: i32 = libc::EXDEV;
    #[cfg(windows)]
    const CROSS_DEVICE: i32 = 17; // ERROR_NOT_SAME_DEVICE
    #[cfg(not(any(unix, windows)))]
    const CROSS_DEVICE: i32 = -1;
    e.kind() == io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(CROSS_DEVICE)
}
