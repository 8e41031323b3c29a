//! Core library for `resilient_fs`.
//!
//! Copy, delete and rollover operations that keep trying through locked files,
//! blocking attributes and removable drives that drop out for a moment. Every
//! operation is synchronous and holds no state between calls.
//!
//! The component types in `fs_ops` take any `FileSystem`; the free functions
//! below run them against the real filesystem with a given `Config`.

pub mod config;
pub mod errors;
pub mod fs_ops;
pub mod logging;
pub mod platform;
pub mod retry;

use std::path::Path;

pub use config::{Config, LogLevel, default_config_path, default_log_path, path_has_symlink_ancestor};
pub use errors::{CopyError, DeleteError, FailureKind, PathError, RolloverError};
pub use fs_ops::{
    AttributeNormalizer, DirectoryDeleter, FileCopier, FileDeleter, FileTarget, Operation,
    PreviousAttributes, RolloverNamer,
};
pub use logging::init_tracing;
pub use platform::{Attributes, Drive, FileSystem, OsFileSystem};
pub use retry::{OnRetry, RetryBudget, RetryNotification, RetrySchedule};

/// Delete a file, failing with the first error once `cfg.timeout` is spent.
pub fn delete_file(cfg: &Config, path: &Path) -> Result<(), DeleteError> {
    FileDeleter::new(&OsFileSystem).delete(path, cfg.timeout)
}

/// Delete a file; `Ok(false)` when it could not be removed within `cfg.timeout`.
pub fn try_delete_file(cfg: &Config, path: &Path) -> Result<bool, DeleteError> {
    FileDeleter::new(&OsFileSystem).try_delete(path, cfg.timeout)
}

/// Remove a directory tree.
pub fn delete_directory(cfg: &Config, path: &Path) -> Result<bool, DeleteError> {
    DirectoryDeleter::from_config(&OsFileSystem, cfg).delete_tree(path, cfg.timeout)
}

/// Empty a directory, keeping it and an optional top-level entry named `exclude`.
pub fn delete_directory_contents(
    cfg: &Config,
    path: &Path,
    exclude: Option<&str>,
) -> Result<bool, DeleteError> {
    DirectoryDeleter::from_config(&OsFileSystem, cfg).delete_contents(path, exclude)
}

/// Copy `source` over `destination`, rolling a different existing destination
/// into its backup series when `rollover` is set.
pub fn copy_file(
    cfg: &Config,
    source: &Path,
    destination: &Path,
    rollover: bool,
) -> Result<bool, CopyError> {
    FileCopier::from_config(&OsFileSystem, cfg).copy(source, destination, rollover, cfg.timeout)
}

/// Move `path` into its backup series using the configured archive folder and bound.
pub fn rollover(cfg: &Config, path: &Path) -> Result<(), RolloverError> {
    RolloverNamer::from_config(&OsFileSystem, cfg).rollover(
        path,
        cfg.archive_folder.as_deref(),
        cfg.max_backups,
    )
}
