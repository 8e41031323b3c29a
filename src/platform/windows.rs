//! Windows implementations of platform helpers.
//!
//! Notes:
//! - Attributes go through GetFileAttributesW / SetFileAttributesW.
//! - Paths of 248+ characters get the `\\?\` prefix before any call.

use std::borrow::Cow;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::iter::once;
use std::os::windows::ffi::OsStrExt;
use std::path::{Component, Path, PathBuf, Prefix};

use windows_sys::Win32::Storage::FileSystem::{
    GetFileAttributesW, SetFileAttributesW, FILE_ATTRIBUTE_NORMAL, INVALID_FILE_ATTRIBUTES,
};

use super::{Attributes, Drive};

// MAX_PATH minus room for an 8.3 file name, as CreateDirectory requires.
const LONG_PATH_THRESHOLD: usize = 248;

// READONLY | HIDDEN | SYSTEM | ARCHIVE | NORMAL | TEMPORARY | OFFLINE | NOT_CONTENT_INDEXED
const SETTABLE_MASK: u32 = 0x1 | 0x2 | 0x4 | 0x20 | 0x80 | 0x100 | 0x1000 | 0x2000;

/// Open log file for appending (no ACL changes).
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Create a new file and write `bytes`. Fails if the path exists.
pub fn write_config_secure_new_0600(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut f = OpenOptions::new().write(true).create_new(true).open(path)?;
    f.write_all(bytes)?;
    f.sync_all()
}

pub(super) const CLEARABLE: Attributes = Attributes::BLOCKING;

pub(super) fn long_path(path: &Path) -> Cow<'_, Path> {
    let raw = path.as_os_str();
    if raw.len() < LONG_PATH_THRESHOLD || !path.is_absolute() {
        return Cow::Borrowed(path);
    }
    let text = raw.to_string_lossy();
    if text.starts_with(r"\\?\") {
        return Cow::Borrowed(path);
    }
    if let Some(rest) = text.strip_prefix(r"\\") {
        return Cow::Owned(PathBuf::from(format!(r"\\?\UNC\{rest}")));
    }
    let mut prefixed = OsString::from(r"\\?\");
    prefixed.push(raw);
    Cow::Owned(PathBuf::from(prefixed))
}

fn wide(path: &Path) -> Vec<u16> {
    path.as_os_str().encode_wide().chain(once(0)).collect()
}

pub(super) fn get_attributes(path: &Path) -> io::Result<Attributes> {
    let w = wide(path);
    let bits = unsafe { GetFileAttributesW(w.as_ptr()) };
    if bits == INVALID_FILE_ATTRIBUTES {
        return Err(io::Error::last_os_error());
    }
    Ok(Attributes::from_bits(bits))
}

pub(super) fn set_attributes(path: &Path, attrs: Attributes) -> io::Result<()> {
    let w = wide(path);
    let mut bits = attrs.bits() & SETTABLE_MASK;
    if bits == 0 {
        bits = FILE_ATTRIBUTE_NORMAL;
    }
    let ok = unsafe { SetFileAttributesW(w.as_ptr(), bits) };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Drive letter root (`C:\`) or UNC share root (`\\server\share\`).
pub(super) fn drive_of(path: &Path) -> Option<Drive> {
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(path)
    };
    match abs.components().next()? {
        Component::Prefix(p) => match p.kind() {
            Prefix::Disk(letter) | Prefix::VerbatimDisk(letter) => {
                Some(Drive::new(format!("{}:\\", letter as char)))
            }
            Prefix::UNC(server, share) | Prefix::VerbatimUNC(server, share) => {
                let mut root = OsString::from(r"\\");
                root.push(server);
                root.push(r"\");
                root.push(share);
                root.push(r"\");
                Some(Drive::new(root))
            }
            _ => None,
        },
        _ => None,
    }
}
