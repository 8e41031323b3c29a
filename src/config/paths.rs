//! Where resilient_fs looks for its files, and the symlink check used before
//! writing to any of them. Nothing here creates directories.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "resilient_fs";
const CONFIG_FILE: &str = "config.xml";
const LOG_FILE: &str = "resilient_fs.log";

/// `<base>/resilient_fs/<file>`, with `base` from `dirs` or, failing that,
/// `$HOME` joined with the XDG-style `fallback` components.
fn app_file(base: Option<PathBuf>, fallback: &[&str], file: &str) -> Option<PathBuf> {
    let base = base.or_else(|| {
        dirs::home_dir().map(|home| fallback.iter().fold(home, |dir, part| dir.join(part)))
    })?;
    Some(base.join(APP_DIR).join(file))
}

/// `<config dir>/resilient_fs/config.xml`.
pub fn default_config_path() -> Option<PathBuf> {
    app_file(dirs::config_dir(), &[".config"], CONFIG_FILE)
}

/// `<data dir>/resilient_fs/resilient_fs.log`.
pub fn default_log_path() -> Option<PathBuf> {
    app_file(dirs::data_dir(), &[".local", "share"], LOG_FILE)
}

/// True when some ancestor of `path` is a symlink, dangling ones included.
/// Ancestors that do not exist yet are skipped; other stat errors are returned.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    for ancestor in path.ancestors().skip(1) {
        if ancestor.as_os_str().is_empty() {
            continue;
        }
        match fs::symlink_metadata(ancestor) {
            Ok(meta) if meta.file_type().is_symlink() => return Ok(true),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(false)
}
