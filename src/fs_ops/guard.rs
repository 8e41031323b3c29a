//! Argument validation run by every public operation before any I/O.

use std::fmt;
use std::path::Path;

use crate::errors::PathError;

/// The public operation being validated; used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Copy,
    DeleteFile,
    DeleteDirectory,
    Rollover,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Copy => "copy",
            Operation::DeleteFile => "delete file",
            Operation::DeleteDirectory => "delete directory",
            Operation::Rollover => "rollover",
        };
        f.write_str(s)
    }
}

/// Validate `paths` for `op`. Each entry pairs an argument name with its value.
///
/// Rejects empty paths, and for `Copy` rejects a destination equal to the source
/// under case-insensitive comparison. Touches nothing on disk.
pub fn validate(op: Operation, paths: &[(&'static str, &Path)]) -> Result<(), PathError> {
    for &(argument, path) in paths {
        if path.as_os_str().is_empty() {
            return Err(PathError::Missing {
                operation: op,
                argument,
            });
        }
    }

    if op == Operation::Copy
        && let [(_, src), (_, dst), ..] = paths
        && same_path(src, dst)
    {
        return Err(PathError::SameSourceAndDestination {
            operation: op,
            path: src.to_path_buf(),
        });
    }
    Ok(())
}

/// Textual comparison: verbatim prefixes stripped, separators unified,
/// trailing separators ignored, case folded.
pub fn same_path(a: &Path, b: &Path) -> bool {
    normalized(a) == normalized(b)
}

fn normalized(p: &Path) -> String {
    let text = dunce::simplified(p).to_string_lossy().replace('\\', "/");
    let trimmed = text.trim_end_matches('/');
    let trimmed = if trimmed.is_empty() { "/" } else { trimmed };
    trimmed.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_is_missing() {
        let err = validate(Operation::DeleteFile, &[("path", Path::new(""))]).unwrap_err();
        assert!(matches!(err, PathError::Missing { argument: "path", .. }));
        assert!(err.to_string().contains("delete file"));
    }

    #[test]
    fn copy_rejects_same_path_case_insensitively() {
        let err = validate(
            Operation::Copy,
            &[("source", Path::new("/Data/File.TXT")), ("destination", Path::new("/data/file.txt"))],
        )
        .unwrap_err();
        assert!(matches!(err, PathError::SameSourceAndDestination { .. }));
    }

    #[test]
    fn copy_rejects_trailing_separator_and_backslash_variants() {
        assert!(same_path(Path::new("C:\\X\\y.txt"), Path::new("c:/x/Y.txt")));
        assert!(same_path(Path::new("/a/b/"), Path::new("/a/b")));
    }

    #[test]
    fn only_copy_compares_paths() {
        validate(
            Operation::Rollover,
            &[("path", Path::new("/a")), ("archive", Path::new("/a"))],
        )
        .unwrap();
    }

    #[test]
    fn distinct_paths_pass() {
        validate(
            Operation::Copy,
            &[("source", Path::new("/a/x.txt")), ("destination", Path::new("/a/y.txt"))],
        )
        .unwrap();
    }
}
