//! Shared fixtures for integration tests.
//!
//! `ScriptedFs` delegates to the real filesystem but can be told to fail in the
//! ways removable media and busy files fail in practice: drives that drop out
//! and come back, denied deletes, held locks, directory removals that lag.

#![allow(dead_code)]

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use resilient_fs::platform::DirEntryInfo;
use resilient_fs::{Attributes, Drive, FileSystem, OsFileSystem, RetryNotification};

#[derive(Debug, Default)]
pub struct ScriptedFs {
    inner: OsFileSystem,
    deny_delete: Mutex<HashSet<PathBuf>>,
    missing_drive: Mutex<Option<Drive>>,
    replug_at: Mutex<Option<Instant>>,
    rmdir_failures_left: AtomicUsize,
    force_locked: AtomicBool,
    spurious_copy_error: AtomicBool,
    pub raw_deletes: AtomicUsize,
    pub raw_copies: AtomicUsize,
    pub raw_rmdirs: AtomicUsize,
}

impl ScriptedFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delete of `path` fails with "permission denied", forever.
    pub fn deny_delete(&self, path: &Path) {
        self.deny_delete.lock().unwrap().insert(path.to_path_buf());
    }

    /// Paths under `root` report a drive that does not exist.
    pub fn unplug(&self, root: &Path) {
        *self.missing_drive.lock().unwrap() = Some(Drive::new(root));
    }

    /// The unplugged drive comes back `after` from now.
    pub fn replug_after(&self, after: Duration) {
        *self.replug_at.lock().unwrap() = Some(Instant::now() + after);
    }

    /// The next `n` empty-directory removals fail even though the directory is empty.
    pub fn fail_rmdir(&self, n: usize) {
        self.rmdir_failures_left.store(n, Ordering::SeqCst);
    }

    pub fn rmdirs(&self) -> usize {
        self.raw_rmdirs.load(Ordering::SeqCst)
    }

    pub fn set_locked(&self, locked: bool) {
        self.force_locked.store(locked, Ordering::SeqCst);
    }

    /// Copies succeed on disk but report an error carrying OS code 0.
    pub fn report_spurious_copy_errors(&self) {
        self.spurious_copy_error.store(true, Ordering::SeqCst);
    }

    pub fn deletes(&self) -> usize {
        self.raw_deletes.load(Ordering::SeqCst)
    }

    /// The scripted drive, whether or not it is currently plugged in.
    fn scripted_drive(&self) -> Option<Drive> {
        self.missing_drive.lock().unwrap().clone()
    }

    fn is_unplugged(&self, drive: &Drive) -> bool {
        if self.scripted_drive().as_ref() != Some(drive) {
            return false;
        }
        match *self.replug_at.lock().unwrap() {
            Some(at) => Instant::now() < at,
            None => true,
        }
    }

    /// Paths on a drive that is currently gone do not exist.
    fn on_missing_drive(&self, path: &Path) -> bool {
        self.scripted_drive()
            .is_some_and(|d| path.starts_with(d.root()) && self.is_unplugged(&d))
    }
}

impl FileSystem for ScriptedFs {
    fn file_exists(&self, path: &Path) -> bool {
        !self.on_missing_drive(path) && self.inner.file_exists(path)
    }

    fn dir_exists(&self, path: &Path) -> bool {
        !self.on_missing_drive(path) && self.inner.dir_exists(path)
    }

    fn attributes(&self, path: &Path) -> io::Result<Attributes> {
        self.inner.attributes(path)
    }

    fn set_attributes(&self, path: &Path, attrs: Attributes) -> io::Result<()> {
        self.inner.set_attributes(path, attrs)
    }

    fn raw_copy(&self, src: &Path, dst: &Path, overwrite: bool) -> io::Result<u64> {
        self.raw_copies.fetch_add(1, Ordering::SeqCst);
        let copied = self.inner.raw_copy(src, dst, overwrite)?;
        if self.spurious_copy_error.load(Ordering::SeqCst) {
            return Err(io::Error::from_raw_os_error(0));
        }
        Ok(copied)
    }

    fn raw_delete_file(&self, path: &Path) -> io::Result<()> {
        self.raw_deletes.fetch_add(1, Ordering::SeqCst);
        if self.deny_delete.lock().unwrap().contains(path) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        self.inner.raw_delete_file(path)
    }

    fn raw_delete_empty_dir(&self, path: &Path) -> io::Result<()> {
        self.raw_rmdirs.fetch_add(1, Ordering::SeqCst);
        let scripted_failure = self
            .rmdir_failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scripted_failure {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        self.inner.raw_delete_empty_dir(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.inner.rename(from, to)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.inner.create_dir_all(path)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        self.inner.list_dir(path)
    }

    fn drive_of(&self, path: &Path) -> Option<Drive> {
        match self.scripted_drive() {
            Some(d) if path.starts_with(d.root()) => Some(d),
            _ => self.inner.drive_of(path),
        }
    }

    fn drive_exists(&self, drive: &Drive) -> bool {
        if self.is_unplugged(drive) {
            return false;
        }
        self.inner.drive_exists(drive)
    }

    fn is_file_locked(&self, path: &Path) -> bool {
        self.force_locked.load(Ordering::SeqCst) || self.inner.is_file_locked(path)
    }

    fn files_have_same_content(&self, a: &Path, b: &Path) -> io::Result<bool> {
        self.inner.files_have_same_content(a, b)
    }
}

/// Collects notifications for later inspection.
#[derive(Debug, Default)]
pub struct Recorder {
    events: Mutex<Vec<RetryNotification>>,
}

impl Recorder {
    pub fn record(&self, n: &RetryNotification) {
        self.events.lock().unwrap().push(n.clone());
    }

    pub fn events(&self) -> Vec<RetryNotification> {
        self.events.lock().unwrap().clone()
    }
}
