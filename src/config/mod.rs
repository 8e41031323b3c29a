//! Config module (modularized).
//! Provides configuration types, default paths and XML loading.
//!
//! Nothing here is consulted implicitly: operations take their settings from a
//! `Config` the caller loaded, or from the defaults below.

pub mod paths;
pub mod types;
pub mod xml;

use std::time::Duration;

pub use paths::{default_config_path, default_log_path, path_has_symlink_ancestor};
pub use types::{Config, LogLevel};
pub use xml::{CONFIG_ENV_VAR, create_template_config, load_config_from_path};

/// Retry budget for one operation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);
/// Backups kept by a rollover.
pub const DEFAULT_MAX_BACKUPS: u32 = 5;
/// Per-volume system metadata directory that directory deletion never touches.
pub const DEFAULT_RESERVED_DIR_NAME: &str = "System Volume Information";
/// Pause after deleting a batch of files, for removable media that lag behind.
pub const DEFAULT_SETTLE_PAUSE: Duration = Duration::from_millis(20);
