//! Diagnostic helpers for io errors.
//!
//! Turns an io::Error into a human-friendly line with the operation, the path,
//! a platform-aware hint and the raw OS code. Used in warnings emitted when a
//! retry budget runs out.

use std::io;
use std::path::Path;

/// Short actionable hint for well-known failures, by raw OS code first, then by kind.
pub fn hint(e: &io::Error) -> Option<&'static str> {
    if let Some(code) = e.raw_os_error() {
        #[cfg(unix)]
        {
            let h = match code {
                libc::EACCES | libc::EPERM => {
                    Some("permission denied; check ownership and write permissions")
                }
                libc::EBUSY => Some("resource busy; another process is using it"),
                libc::ETXTBSY => Some("text file busy; the file is being executed"),
                libc::ENOENT => Some("path not found"),
                libc::ENOTEMPTY => Some("directory not empty; something was added concurrently"),
                libc::EROFS => Some("read-only filesystem"),
                libc::ENODEV | libc::ENXIO => Some("device not present; removable media unplugged?"),
                libc::ENAMETOOLONG => Some("filename or path too long"),
                libc::ENOSPC => Some("insufficient space on device"),
                _ => None,
            };
            if h.is_some() {
                return h;
            }
        }
        #[cfg(windows)]
        {
            let h = match code {
                5 => Some("access denied; a read-only attribute or ACL blocks this"),
                32 => Some("sharing violation; file is in use"),
                33 => Some("lock violation; part of the file is locked"),
                2 | 3 => Some("path not found"),
                21 => Some("device not ready; removable media unplugged?"),
                145 => Some("directory not empty"),
                206 => Some("filename or path too long"),
                112 => Some("insufficient disk space"),
                _ => None,
            };
            if h.is_some() {
                return h;
            }
        }
        let _ = code;
    }
    match e.kind() {
        io::ErrorKind::PermissionDenied => Some("permission denied"),
        io::ErrorKind::NotFound => Some("path not found"),
        io::ErrorKind::AlreadyExists => Some("already exists"),
        io::ErrorKind::WouldBlock => Some("locked by another handle"),
        _ => None,
    }
}

/// "`op` '`path`': `error` (`hint`) [os code: N]"
pub fn describe(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{} '{}': {}", op, dunce::simplified(path).display(), e);
    if let Some(h) = hint(e) {
        msg.push_str(&format!(" ({h})"));
    }
    if let Some(code) = e.raw_os_error() {
        msg.push_str(&format!(" [os code: {code}]"));
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notfound_fallback_hint_includes_path() {
        let p = Path::new("/nonexistent/path/for/test");
        let msg = describe("delete", p, &io::Error::from(io::ErrorKind::NotFound));
        assert!(msg.contains("delete"));
        assert!(msg.contains("/nonexistent/path/for/test"));
        assert!(msg.contains("path not found"));
        assert!(!msg.contains("os code"));
    }

    #[cfg(unix)]
    #[test]
    fn busy_hint_and_os_code() {
        let msg = describe("delete", Path::new("/tmp/x"), &io::Error::from_raw_os_error(libc::EBUSY));
        assert!(msg.contains("resource busy"), "msg was: {msg}");
        assert!(msg.contains("os code"));
    }

    #[test]
    fn unknown_errors_have_no_hint() {
        assert!(hint(&io::Error::other("weird")).is_none());
    }
}
