//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde).
//! - `Config::load` picks the file: RESILIENT_FS_CONFIG if set, else the default path.
//! - Can write a commented template for users to edit.
//!
//! Notes:
//! - Unknown XML fields are an error, to surface misconfigurations early.
//! - Empty elements mean "use the default".

use anyhow::{Context, Result, anyhow, bail};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use super::paths::{default_config_path, path_has_symlink_ancestor};
use super::types::{Config, LogLevel};
use super::{DEFAULT_MAX_BACKUPS, DEFAULT_RESERVED_DIR_NAME, DEFAULT_SETTLE_PAUSE, DEFAULT_TIMEOUT};
use crate::platform::write_config_secure_new_0600;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "RESILIENT_FS_CONFIG";

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    #[serde(rename = "timeout_ms", default, deserialize_with = "de_trimmed_opt")]
    timeout_ms: Option<u64>,
    #[serde(rename = "max_backups", default, deserialize_with = "de_trimmed_opt")]
    max_backups: Option<u32>,
    #[serde(rename = "archive_folder")]
    archive_folder: Option<String>,
    #[serde(rename = "reserved_dir_name")]
    reserved_dir_name: Option<String>,
    #[serde(rename = "settle_pause_ms", default, deserialize_with = "de_trimmed_opt")]
    settle_pause_ms: Option<u64>,
    #[serde(rename = "log_level")]
    log_level: Option<String>,
    #[serde(rename = "log_file")]
    log_file: Option<String>,
}

// Numbers may be padded with whitespace; an empty element means unset.
fn de_trimmed_opt<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    use serde::de::Error;
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<T>().map(Some).map_err(D::Error::custom),
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|t| !t.is_empty())
}

// Map XmlConfig -> Config
fn xml_to_config(parsed: XmlConfig) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(ms) = parsed.timeout_ms {
        cfg.timeout = Duration::from_millis(ms);
    }
    if let Some(n) = parsed.max_backups {
        cfg.max_backups = n;
    }
    if let Some(ms) = parsed.settle_pause_ms {
        cfg.settle_pause = Duration::from_millis(ms);
    }
    cfg.archive_folder = non_empty(parsed.archive_folder.as_deref()).map(PathBuf::from);
    if let Some(name) = non_empty(parsed.reserved_dir_name.as_deref()) {
        cfg.reserved_dir_name = name.to_string();
    }
    if let Some(level) = non_empty(parsed.log_level.as_deref()) {
        cfg.log_level = level.parse::<LogLevel>().map_err(|e| anyhow!(e))?;
    }
    cfg.log_file = non_empty(parsed.log_file.as_deref()).map(PathBuf::from);

    Ok(cfg)
}

/// Parse a Config from XML text.
pub fn parse_config(xml: &str) -> Result<Config> {
    let parsed: XmlConfig = from_xml_str(xml).context("parse config xml")?;
    xml_to_config(parsed)
}

/// Load a Config from a specific XML file path.
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    xml_to_config(parsed).with_context(|| format!("invalid config '{}'", path.display()))
}

impl Config {
    /// Load the effective configuration.
    ///
    /// - RESILIENT_FS_CONFIG set: that file must exist and parse.
    /// - Otherwise the default path is used when present; a missing file means defaults.
    pub fn load() -> Result<Config> {
        if let Some(p) = env::var_os(CONFIG_ENV_VAR) {
            let path = PathBuf::from(p);
            if path.as_os_str().is_empty() {
                bail!("{CONFIG_ENV_VAR} is set but empty");
            }
            debug!(path = %path.display(), "loading config from {CONFIG_ENV_VAR}");
            return load_config_from_path(&path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => {
                debug!(path = %path.display(), "loading config from default path");
                load_config_from_path(&path)
            }
            _ => Ok(Config::default()),
        }
    }
}

/// Write a commented template config at `path`. Refuses symlinked ancestors and
/// never overwrites an existing file.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create config directory '{}'", parent.display()))?;
    }

    let content = format!(
        "<!--\n  resilient_fs configuration (XML)\n\n    timeout_ms         -> retry budget per operation in milliseconds (0 = no retries)\n    max_backups        -> numbered backups kept by rollover (0 = keep none)\n    archive_folder     -> directory for backups (empty = beside the file)\n    reserved_dir_name  -> directory name never touched by directory deletion\n    settle_pause_ms    -> pause after bulk deletions in milliseconds\n    log_level          -> quiet | normal | info | debug\n    log_file           -> path to log file (optional)\n-->\n<config>\n  <timeout_ms>{}</timeout_ms>\n  <max_backups>{}</max_backups>\n  <archive_folder></archive_folder>\n  <reserved_dir_name>{}</reserved_dir_name>\n  <settle_pause_ms>{}</settle_pause_ms>\n  <log_level>normal</log_level>\n  <log_file></log_file>\n</config>\n",
        DEFAULT_TIMEOUT.as_millis(),
        DEFAULT_MAX_BACKUPS,
        DEFAULT_RESERVED_DIR_NAME,
        DEFAULT_SETTLE_PAUSE.as_millis(),
    );

    write_config_secure_new_0600(path, content.as_bytes())
        .with_context(|| format!("write template config '{}'", path.display()))?;
    info!("Created template config at {}", path.display());
    Ok(())
}
