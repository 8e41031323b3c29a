//! File lock probing and lock fixtures.
//!
//! Design:
//! - `is_locked` opens the file and tries a non-blocking shared lock (fs2: flock on
//!   Unix, LockFileEx on Windows). A conflicting exclusive lock held through any
//!   other handle, in this process or another, reports the file as locked.
//! - On Windows an open that fails with a sharing violation also counts as locked.
//! - `hold_lock` / `lock_for` take an exclusive lock for tests and tools that need to
//!   simulate a busy writer. `lock_for` releases from a detached thread and returns
//!   as soon as the lock is held.
//!
//! fs2 methods are called through the trait path: std has inherent `File` lock
//! methods with the same names and different signatures.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::trace;

use crate::errors::FailureKind;

/// True when another handle holds a conflicting lock on `path`.
/// Missing or unreadable files are not considered locked.
pub fn is_locked(path: &Path) -> bool {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            return matches!(
                FailureKind::of(&e),
                FailureKind::SharingViolation | FailureKind::Locked
            );
        }
    };
    match FileExt::try_lock_shared(&file) {
        Ok(()) => {
            let _ = FileExt::unlock(&file);
            false
        }
        Err(e) => {
            let contended = e.kind() == fs2::lock_contended_error().kind()
                || matches!(FailureKind::of(&e), FailureKind::Locked);
            trace!(path = %path.display(), error = %e, contended, "lock probe failed");
            contended
        }
    }
}

/// RAII guard for an exclusive lock taken with `hold_lock`.
#[derive(Debug)]
pub struct FileLockGuard {
    file: File,
    path: PathBuf,
}

impl FileLockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        trace!(path = %self.path.display(), "released file lock");
    }
}

/// Take an exclusive lock on `path` until the guard is dropped. Blocks until acquired.
pub fn hold_lock(path: &Path) -> io::Result<FileLockGuard> {
    let file = OpenOptions::new().read(true).open(path)?;
    FileExt::lock_exclusive(&file)?;
    trace!(path = %path.display(), "acquired file lock");
    Ok(FileLockGuard {
        file,
        path: path.to_path_buf(),
    })
}

/// Lock `path` now and release it after `hold` from a detached thread.
///
/// Returns once the lock is held; the handle can be joined to wait for the release.
pub fn lock_for(path: &Path, hold: Duration) -> io::Result<JoinHandle<()>> {
    let guard = hold_lock(path)?;
    let handle = thread::Builder::new()
        .name("lock-release".into())
        .spawn(move || {
            thread::sleep(hold);
            drop(guard);
        })?;
    Ok(handle)
}
