//! Typed error definitions for resilient_fs.
//! One enum per public operation plus a small failure taxonomy used by the retry loops.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::fs_ops::guard::Operation;

/// Argument problems. Never retried: a bad argument does not become good on retry.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("{operation}: {argument} path is missing")]
    Missing {
        operation: Operation,
        argument: &'static str,
    },

    #[error("{operation}: source and destination are the same path: {}", path.display())]
    SameSourceAndDestination { operation: Operation, path: PathBuf },
}

#[derive(Debug, Error)]
pub enum DeleteError {
    #[error(transparent)]
    InvalidPath(#[from] PathError),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Not a file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error(
        "Failed to delete '{}' after {attempts} attempt(s) within {} ms: {source}",
        path.display(),
        timeout.as_millis()
    )]
    Exhausted {
        path: PathBuf,
        attempts: u32,
        timeout: Duration,
        /// First error seen, not the last one.
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum CopyError {
    #[error(transparent)]
    InvalidPath(#[from] PathError),

    #[error("Source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Drive {drive} for '{}' not found after waiting {} ms", path.display(), waited.as_millis())]
    DriveNotFound {
        path: PathBuf,
        drive: String,
        waited: Duration,
    },

    #[error("Timed out after {} ms waiting for '{}' to be unlocked", waited.as_millis(), path.display())]
    Timeout { path: PathBuf, waited: Duration },

    #[error("Destination is an existing directory, not a file path: {}", .0.display())]
    DestinationIsDirectory(PathBuf),

    #[error("Failed to create destination directory '{}': {source}", path.display())]
    CreateParent {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Rollover(#[from] RolloverError),
}

#[derive(Debug, Error)]
pub enum RolloverError {
    #[error(transparent)]
    InvalidPath(#[from] PathError),

    #[error(transparent)]
    Delete(#[from] DeleteError),

    #[error("Rollover failed to {op} '{}': {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Coarse classification of a platform failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Target absent. Success for deletes, failure for copy sources.
    NotFound,
    /// The volume holding the path is gone or not ready (removable media).
    DriveNotReady,
    /// A byte-range or whole-file lock held by another process.
    Locked,
    /// Another handle was opened without sharing.
    SharingViolation,
    /// Access denied; often caused by a blocking attribute.
    PermissionDenied,
    Other,
}

impl FailureKind {
    /// Classify an io::Error, preferring the raw OS code over `ErrorKind`.
    pub fn of(e: &io::Error) -> Self {
        if let Some(code) = e.raw_os_error()
            && let Some(kind) = Self::from_os_code(code)
        {
            return kind;
        }
        match e.kind() {
            io::ErrorKind::NotFound => FailureKind::NotFound,
            io::ErrorKind::PermissionDenied => FailureKind::PermissionDenied,
            io::ErrorKind::WouldBlock => FailureKind::Locked,
            _ => FailureKind::Other,
        }
    }

    #[cfg(windows)]
    fn from_os_code(code: i32) -> Option<Self> {
        match code {
            2 | 3 => Some(FailureKind::NotFound), // FILE / PATH NOT FOUND
            5 => Some(FailureKind::PermissionDenied), // ERROR_ACCESS_DENIED
            15 | 21 => Some(FailureKind::DriveNotReady), // INVALID_DRIVE / NOT_READY
            32 => Some(FailureKind::SharingViolation),
            33 => Some(FailureKind::Locked), // ERROR_LOCK_VIOLATION
            _ => None,
        }
    }

    #[cfg(unix)]
    fn from_os_code(code: i32) -> Option<Self> {
        match code {
            libc::ENOENT => Some(FailureKind::NotFound),
            libc::EACCES | libc::EPERM | libc::EROFS => Some(FailureKind::PermissionDenied),
            libc::ENODEV | libc::ENXIO => Some(FailureKind::DriveNotReady),
            libc::EBUSY | libc::ETXTBSY => Some(FailureKind::Locked),
            _ => None,
        }
    }

    #[cfg(not(any(unix, windows)))]
    fn from_os_code(_code: i32) -> Option<Self> {
        None
    }

    /// Whether clearing blocking attributes may turn this failure into success.
    pub fn clears_with_attributes(self) -> bool {
        matches!(self, FailureKind::PermissionDenied)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::NotFound => "not found",
            FailureKind::DriveNotReady => "drive not ready",
            FailureKind::Locked => "locked",
            FailureKind::SharingViolation => "sharing violation",
            FailureKind::PermissionDenied => "permission denied",
            FailureKind::Other => "other",
        };
        f.write_str(s)
    }
}
