//! Platform-specific helpers.
//! This module hides OS differences (Unix/Windows) behind a uniform API so
//! the rest of the codebase can remain platform-agnostic.
//!
//! The `FileSystem` trait is the set of black-box primitives the retrying
//! operations are built from. `OsFileSystem` is the real implementation; tests
//! wrap it to inject locks, denied deletes or vanished drives.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
use unix as os;
#[cfg(windows)]
use windows as os;

use filetime::FileTime;
use std::borrow::Cow;
use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::trace;
use walkdir::WalkDir;

pub use os::{open_log_file_secure_append, write_config_secure_new_0600};

/// File attribute bits, Win32-compatible values.
///
/// On Unix only READ_ONLY (no write bits) and HIDDEN (leading dot) are reported;
/// HIDDEN cannot be cleared there and SYSTEM never appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Attributes(u32);

impl Attributes {
    pub const READ_ONLY: Attributes = Attributes(0x1);
    pub const HIDDEN: Attributes = Attributes(0x2);
    pub const SYSTEM: Attributes = Attributes(0x4);
    /// Attributes that make a delete or overwrite fail until cleared.
    pub const BLOCKING: Attributes = Attributes(0x1 | 0x2 | 0x4);
    /// The subset of BLOCKING this platform can actually change.
    pub const CLEARABLE: Attributes = os::CLEARABLE;

    pub const fn empty() -> Self {
        Attributes(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Attributes(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Attributes) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Attributes) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn union(self, other: Attributes) -> Self {
        Attributes(self.0 | other.0)
    }

    pub const fn intersection(self, other: Attributes) -> Self {
        Attributes(self.0 & other.0)
    }

    pub const fn difference(self, other: Attributes) -> Self {
        Attributes(self.0 & !other.0)
    }
}

/// The volume a path lives on: a drive letter / UNC share on Windows,
/// a removable mount root or `/` on Unix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Drive {
    root: PathBuf,
}

impl Drive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl fmt::Display for Drive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root.display())
    }
}

/// One entry of a single-level directory listing. Symlinks are never reported as directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub path: PathBuf,
    pub name: OsString,
    pub is_dir: bool,
}

/// Synchronous filesystem primitives consumed by the retrying operations.
pub trait FileSystem {
    /// True for regular files and symlinks (including dangling ones).
    fn file_exists(&self, path: &Path) -> bool;
    fn dir_exists(&self, path: &Path) -> bool;
    fn attributes(&self, path: &Path) -> io::Result<Attributes>;
    fn set_attributes(&self, path: &Path, attrs: Attributes) -> io::Result<()>;
    /// Copy contents; preserves the source modification time.
    fn raw_copy(&self, src: &Path, dst: &Path, overwrite: bool) -> io::Result<u64>;
    fn raw_delete_file(&self, path: &Path) -> io::Result<()>;
    fn raw_delete_empty_dir(&self, path: &Path) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>>;
    fn drive_of(&self, path: &Path) -> Option<Drive>;
    fn drive_exists(&self, drive: &Drive) -> bool;
    /// True when another handle holds a conflicting lock on the file.
    fn is_file_locked(&self, path: &Path) -> bool;
    fn files_have_same_content(&self, a: &Path, b: &Path) -> io::Result<bool>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

/// Rewrite `path` for platforms with legacy path-length limits (identity elsewhere).
pub fn long_path(path: &Path) -> Cow<'_, Path> {
    os::long_path(path)
}

impl FileSystem for OsFileSystem {
    fn file_exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(long_path(path))
            .map(|m| !m.is_dir())
            .unwrap_or(false)
    }

    fn dir_exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(long_path(path))
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    fn attributes(&self, path: &Path) -> io::Result<Attributes> {
        os::get_attributes(&long_path(path))
    }

    fn set_attributes(&self, path: &Path, attrs: Attributes) -> io::Result<()> {
        os::set_attributes(&long_path(path), attrs)
    }

    fn raw_copy(&self, src: &Path, dst: &Path, overwrite: bool) -> io::Result<u64> {
        let src = long_path(src);
        let dst = long_path(dst);
        if !overwrite && fs::symlink_metadata(&dst).is_ok() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("destination exists: {}", dst.display()),
            ));
        }
        let bytes = fs::copy(&src, &dst)?;
        // Mirror the platform copy primitive, which keeps the modification time.
        if let Ok(meta) = fs::metadata(&src) {
            let mtime = FileTime::from_last_modification_time(&meta);
            if let Err(e) = filetime::set_file_mtime(&dst, mtime) {
                trace!(path = %dst.display(), error = %e, "could not carry modification time");
            }
        }
        Ok(bytes)
    }

    fn raw_delete_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(long_path(path))
    }

    fn raw_delete_empty_dir(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir(long_path(path))
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(long_path(from), long_path(to))
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(long_path(path))
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let root = long_path(path);
        let mut out = Vec::new();
        for entry in WalkDir::new(&root).min_depth(1).max_depth(1).follow_links(false) {
            let entry = entry.map_err(io::Error::from)?;
            out.push(DirEntryInfo {
                // Report children under the caller's spelling, not the prefixed one.
                path: path.join(entry.file_name()),
                name: entry.file_name().to_os_string(),
                is_dir: entry.file_type().is_dir(),
            });
        }
        Ok(out)
    }

    fn drive_of(&self, path: &Path) -> Option<Drive> {
        os::drive_of(path)
    }

    fn drive_exists(&self, drive: &Drive) -> bool {
        drive.root().is_dir()
    }

    fn is_file_locked(&self, path: &Path) -> bool {
        crate::fs_ops::lock::is_locked(&long_path(path))
    }

    fn files_have_same_content(&self, a: &Path, b: &Path) -> io::Result<bool> {
        same_content(&long_path(a), &long_path(b))
    }
}

/// Byte-for-byte comparison; lengths first so differing sizes never read data.
fn same_content(a: &Path, b: &Path) -> io::Result<bool> {
    const BUF_SIZE: usize = 64 * 1024;

    let fa = File::open(a)?;
    let fb = File::open(b)?;
    if fa.metadata()?.len() != fb.metadata()?.len() {
        return Ok(false);
    }

    let mut ra = BufReader::with_capacity(BUF_SIZE, fa);
    let mut rb = BufReader::with_capacity(BUF_SIZE, fb);
    let mut buf_a = vec![0u8; BUF_SIZE];
    let mut buf_b = vec![0u8; BUF_SIZE];
    loop {
        let n = read_full(&mut ra, &mut buf_a)?;
        let m = read_full(&mut rb, &mut buf_b)?;
        if n != m || buf_a[..n] != buf_b[..m] {
            return Ok(false);
        }
        if n == 0 {
            return Ok(true);
        }
    }
}

/// Fill `buf` unless EOF comes first; returns bytes read.
fn read_full(r: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn attribute_set_operations() {
        let a = Attributes::READ_ONLY.union(Attributes::HIDDEN);
        assert!(a.contains(Attributes::READ_ONLY));
        assert!(a.intersects(Attributes::BLOCKING));
        assert!(!a.difference(Attributes::BLOCKING).intersects(Attributes::BLOCKING));
        assert_eq!(Attributes::empty().bits(), 0);
    }

    #[test]
    fn same_content_detects_equal_and_different() {
        let td = tempdir().unwrap();
        let a = td.path().join("a");
        let b = td.path().join("b");
        let c = td.path().join("c");
        let d = td.path().join("d");
        fs::write(&a, b"same bytes").unwrap();
        fs::write(&b, b"same bytes").unwrap();
        fs::write(&c, b"same bytez").unwrap();
        fs::write(&d, b"short").unwrap();
        let osfs = OsFileSystem;
        assert!(osfs.files_have_same_content(&a, &b).unwrap());
        assert!(!osfs.files_have_same_content(&a, &c).unwrap());
        assert!(!osfs.files_have_same_content(&a, &d).unwrap());
    }

    #[test]
    fn same_content_across_buffer_boundary() {
        let td = tempdir().unwrap();
        let a = td.path().join("big.a");
        let b = td.path().join("big.b");
        let mut data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&a, &data).unwrap();
        let last = data.len() - 1;
        data[last] ^= 0xff;
        fs::write(&b, &data).unwrap();
        assert!(!OsFileSystem.files_have_same_content(&a, &b).unwrap());
    }

    #[test]
    fn list_dir_reports_files_and_dirs() {
        let td = tempdir().unwrap();
        fs::write(td.path().join("f.txt"), b"x").unwrap();
        fs::create_dir(td.path().join("sub")).unwrap();
        fs::write(td.path().join("sub").join("deep.txt"), b"y").unwrap();
        let mut entries = OsFileSystem.list_dir(td.path()).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "f.txt");
        assert!(!entries[0].is_dir);
        assert_eq!(entries[1].name, "sub");
        assert!(entries[1].is_dir);
        assert_eq!(entries[1].path, td.path().join("sub"));
    }

    #[test]
    fn raw_copy_refuses_existing_without_overwrite() {
        let td = tempdir().unwrap();
        let src = td.path().join("s");
        let dst = td.path().join("d");
        fs::write(&src, b"new").unwrap();
        fs::write(&dst, b"old").unwrap();
        let err = OsFileSystem.raw_copy(&src, &dst, false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(OsFileSystem.raw_copy(&src, &dst, true).unwrap(), 3);
        assert_eq!(fs::read(&dst).unwrap(), b"new");
    }

    #[test]
    fn raw_copy_keeps_modification_time() {
        let td = tempdir().unwrap();
        let src = td.path().join("s");
        let dst = td.path().join("d");
        fs::write(&src, b"data").unwrap();
        let past = FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(&src, past).unwrap();
        OsFileSystem.raw_copy(&src, &dst, true).unwrap();
        let got = FileTime::from_last_modification_time(&fs::metadata(&dst).unwrap());
        assert_eq!(got.unix_seconds(), past.unix_seconds());
    }

    #[test]
    fn exists_checks_distinguish_kinds() {
        let td = tempdir().unwrap();
        let f = td.path().join("f");
        fs::write(&f, b"").unwrap();
        assert!(OsFileSystem.file_exists(&f));
        assert!(!OsFileSystem.dir_exists(&f));
        assert!(OsFileSystem.dir_exists(td.path()));
        assert!(!OsFileSystem.file_exists(td.path()));
        assert!(!OsFileSystem.file_exists(&td.path().join("missing")));
    }
}
