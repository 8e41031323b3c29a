//! Unix implementations of platform helpers.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Component, Path, PathBuf};

use super::{Attributes, Drive};

/// Open log file for appending; set 0600 only when creating a new file.
/// If the file already exists, its permissions are left alone.
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let existed = path.exists();
    let f = OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o600) // applies on create
        .open(path)?;
    if !existed {
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    Ok(f)
}

/// Create a new file with mode 0600 and write `bytes`. Fails if the path exists
/// or is a symlink.
pub fn write_config_secure_new_0600(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut f = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .custom_flags(libc::O_NOFOLLOW)
        .open(path)?;
    f.write_all(bytes)?;
    f.sync_all()
}

pub(super) const CLEARABLE: Attributes = Attributes::READ_ONLY;

/// No path-length rewriting on Unix.
pub(super) fn long_path(path: &Path) -> Cow<'_, Path> {
    Cow::Borrowed(path)
}

/// READ_ONLY when no write bit is set; HIDDEN for dot-files.
pub(super) fn get_attributes(path: &Path) -> io::Result<Attributes> {
    let meta = fs::symlink_metadata(path)?;
    let mut attrs = Attributes::empty();
    if meta.permissions().readonly() {
        attrs = attrs.union(Attributes::READ_ONLY);
    }
    let hidden = path
        .file_name()
        .and_then(OsStr::to_str)
        .map(|n| n.starts_with('.'))
        .unwrap_or(false);
    if hidden {
        attrs = attrs.union(Attributes::HIDDEN);
    }
    Ok(attrs)
}

/// Only READ_ONLY is settable: it toggles the owner write bit (or all write bits when set).
pub(super) fn set_attributes(path: &Path, attrs: Attributes) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.file_type().is_symlink() {
        // chmod would follow the link; leave the target alone.
        return Ok(());
    }
    let mut perms = meta.permissions();
    let want_ro = attrs.contains(Attributes::READ_ONLY);
    if want_ro == perms.readonly() {
        return Ok(());
    }
    if want_ro {
        perms.set_mode(perms.mode() & !0o222);
    } else {
        perms.set_mode(perms.mode() | 0o200);
    }
    fs::set_permissions(path, perms)
}

/// Removable mounts get their own drive; everything else lives on `/`.
///
/// `/media/<user>/<label>` is recognized when `<user>` is the current user,
/// otherwise `/media/<label>`.
pub(super) fn drive_of(path: &Path) -> Option<Drive> {
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(path)
    };
    let names: Vec<&OsStr> = abs
        .components()
        .filter_map(|c| match c {
            Component::Normal(n) => Some(n),
            _ => None,
        })
        .collect();

    let user = std::env::var_os("USER");
    let depth = match names.first().and_then(|n| n.to_str()) {
        Some("Volumes") | Some("mnt") => 2,
        Some("media") => {
            if user.as_deref().is_some_and(|u| names.get(1) == Some(&u)) {
                3
            } else {
                2
            }
        }
        Some("run") if names.get(1).and_then(|n| n.to_str()) == Some("media") => 4,
        _ => 0,
    };

    let mut root = PathBuf::from("/");
    if depth > 0 && names.len() >= depth {
        for n in &names[..depth] {
            root.push(n);
        }
    }
    Some(Drive::new(root))
}
