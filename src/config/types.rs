//! Core configuration types.
//! - Config holds runtime settings with sensible defaults.
//! - LogLevel represents verbosity with simple parsing helpers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::{
    DEFAULT_MAX_BACKUPS, DEFAULT_RESERVED_DIR_NAME, DEFAULT_SETTLE_PAUSE, DEFAULT_TIMEOUT,
};

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// Retry progress
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Settings shared by the operations. Built fresh per use; never global.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Retry budget per operation; zero disables retries
    pub timeout: Duration,
    /// Numbered backups kept by rollover
    pub max_backups: u32,
    /// Where rollover puts backups; None keeps them beside the file
    pub archive_folder: Option<PathBuf>,
    /// Directory name that directory deletion skips
    pub reserved_dir_name: String,
    /// Pause after bulk file deletions
    pub settle_pause: Duration,
    /// Log verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_backups: DEFAULT_MAX_BACKUPS,
            archive_folder: None,
            reserved_dir_name: DEFAULT_RESERVED_DIR_NAME.to_string(),
            settle_pause: DEFAULT_SETTLE_PAUSE,
            log_level: LogLevel::Normal,
            log_file: None,
        }
    }
}

impl Config {
    /// Defaults with an explicit retry budget.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }
}
