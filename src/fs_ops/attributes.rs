//! Blocking-attribute normalization.
//! Clears Read-Only / Hidden / System before a destructive operation and can put
//! them back afterwards. Touches metadata only, never content.

use std::io;
use std::path::Path;
use tracing::trace;

use crate::errors::FailureKind;
use crate::platform::{Attributes, FileSystem};

/// What `clear_blocking` found and changed. `restore` uses it to undo exactly that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreviousAttributes {
    original: Option<Attributes>,
    cleared: Attributes,
}

impl PreviousAttributes {
    /// Attributes before clearing; `None` when the path did not exist.
    pub fn original(&self) -> Option<Attributes> {
        self.original
    }

    pub fn cleared(&self) -> Attributes {
        self.cleared
    }

    /// Nothing was cleared, so there is nothing to restore.
    pub fn was_normal(&self) -> bool {
        self.cleared == Attributes::empty()
    }
}

#[derive(Debug)]
pub struct AttributeNormalizer<'a, F: FileSystem + ?Sized> {
    fs: &'a F,
    mask: Attributes,
}

impl<'a, F: FileSystem + ?Sized> AttributeNormalizer<'a, F> {
    /// Clears Read-Only, Hidden and System (delete semantics).
    pub fn new(fs: &'a F) -> Self {
        Self {
            fs,
            mask: Attributes::BLOCKING,
        }
    }

    /// Clears only the given attributes.
    pub fn with_mask(fs: &'a F, mask: Attributes) -> Self {
        Self { fs, mask }
    }

    /// Clear blocking attributes on `path`. Idempotent: an already-normal or missing
    /// path is left untouched and reported as normal.
    pub fn clear_blocking(&self, path: &Path) -> io::Result<PreviousAttributes> {
        let attrs = match self.fs.attributes(path) {
            Ok(a) => a,
            Err(e) if FailureKind::of(&e) == FailureKind::NotFound => {
                return Ok(PreviousAttributes::default());
            }
            Err(e) => return Err(e),
        };
        let blocking =
            Attributes::from_bits(attrs.bits() & self.mask.bits() & Attributes::CLEARABLE.bits());
        if blocking == Attributes::empty() {
            return Ok(PreviousAttributes {
                original: Some(attrs),
                cleared: Attributes::empty(),
            });
        }
        self.fs.set_attributes(path, attrs.difference(blocking))?;
        trace!(path = %path.display(), cleared = blocking.bits(), "cleared blocking attributes");
        Ok(PreviousAttributes {
            original: Some(attrs),
            cleared: blocking,
        })
    }

    /// Put back what `clear_blocking` removed. No-op for a normal record or a vanished path.
    pub fn restore(&self, path: &Path, previous: PreviousAttributes) -> io::Result<()> {
        if previous.was_normal() {
            return Ok(());
        }
        let current = match self.fs.attributes(path) {
            Ok(a) => a,
            Err(e) if FailureKind::of(&e) == FailureKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        self.fs.set_attributes(path, current.union(previous.cleared))
    }
}
