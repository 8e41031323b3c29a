//! Filesystem operations: modularized.
//!
//! Leaf-first: `guard` and `attributes` are used by `delete`, which `dir_delete`,
//! `rollover` and `copy` build on. Every operation takes a `FileSystem` so the
//! primitives can be swapped in tests.

pub mod attributes;
pub mod copy;
pub mod delete;
pub mod dir_delete;
pub mod guard;
pub mod helpers;
pub mod lock;
pub mod reconcile;
pub mod rollover;
pub mod target;

pub use attributes::{AttributeNormalizer, PreviousAttributes};
pub use copy::FileCopier;
pub use delete::FileDeleter;
pub use dir_delete::DirectoryDeleter;
pub use guard::{Operation, same_path, validate};
pub use lock::{FileLockGuard, hold_lock, is_locked, lock_for};
pub use rollover::{RolloverNamer, backup_path};
pub use target::FileTarget;
