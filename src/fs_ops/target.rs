//! A filesystem entry as seen by one operation call.

use std::path::{Path, PathBuf};

use crate::platform::FileSystem;

/// Logical handle to one file for the duration of one operation.
/// Created at the start of a call and dropped when it returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTarget {
    path: PathBuf,
    existed_at_start: bool,
}

impl FileTarget {
    /// Record whether `path` exists as a file right now.
    pub fn probe<F: FileSystem + ?Sized>(fs: &F, path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            existed_at_start: fs.file_exists(path),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn existed_at_start(&self) -> bool {
        self.existed_at_start
    }

    /// Fresh existence check; does not update `existed_at_start`.
    pub fn exists_now<F: FileSystem + ?Sized>(&self, fs: &F) -> bool {
        fs.file_exists(&self.path)
    }
}
