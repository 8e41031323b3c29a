//! Reconcile what a primitive reported with what is actually on disk.
//!
//! Platform copy/delete calls occasionally disagree with reality: an error that
//! carries a "success" code, or a success whose effect is not visible. Every
//! mutating call site runs its outcome through `reconcile` with an independent
//! existence check instead of trusting the primitive.

use std::io;

/// The state the path should be in after a successful call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Copy and rename targets.
    Present,
    /// Delete targets.
    Absent,
}

/// Combine a primitive's result with a fresh existence check.
///
/// - `Absent`: the entry being gone is success, whatever was reported (another
///   process may have removed it, or the primitive returned not-found).
/// - `Present`: an error is reclassified as success only when it carries OS code 0
///   and the destination exists; a pre-existing destination must not mask real errors.
/// - A reported success whose effect is not visible becomes a failure.
pub fn reconcile(
    reported: io::Result<()>,
    expect: Expect,
    exists: impl FnOnce() -> bool,
) -> io::Result<()> {
    let present = exists();
    match (reported, expect) {
        (Ok(()), Expect::Present) if present => Ok(()),
        (Ok(()), Expect::Absent) if !present => Ok(()),
        (Ok(()), Expect::Present) => Err(io::Error::new(
            io::ErrorKind::NotFound,
            "reported success but the destination does not exist",
        )),
        (Ok(()), Expect::Absent) => Err(io::Error::other(
            "reported success but the entry still exists",
        )),
        (Err(_), Expect::Absent) if !present => Ok(()),
        (Err(e), Expect::Present) if present && is_success_code(&e) => Ok(()),
        (Err(e), _) => Err(e),
    }
}

fn is_success_code(e: &io::Error) -> bool {
    e.raw_os_error() == Some(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn denied() -> io::Error {
        io::Error::from(io::ErrorKind::PermissionDenied)
    }

    #[test]
    fn success_code_error_with_destination_is_success() {
        let spurious = io::Error::from_raw_os_error(0);
        assert!(reconcile(Err(spurious), Expect::Present, || true).is_ok());
    }

    #[test]
    fn real_error_is_kept_even_if_destination_exists() {
        let err = reconcile(Err(denied()), Expect::Present, || true).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn reported_copy_without_destination_is_failure() {
        let err = reconcile(Ok(()), Expect::Present, || false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn vanished_target_is_a_successful_delete() {
        assert!(reconcile(Err(denied()), Expect::Absent, || false).is_ok());
        let nf = io::Error::from(io::ErrorKind::NotFound);
        assert!(reconcile(Err(nf), Expect::Absent, || false).is_ok());
    }

    #[test]
    fn delete_that_left_the_entry_is_failure() {
        assert!(reconcile(Ok(()), Expect::Absent, || true).is_err());
        assert!(reconcile(Err(denied()), Expect::Absent, || true).is_err());
    }
}
