mod common;

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use assert_fs::prelude::*;
use common::{Recorder, ScriptedFs};
use resilient_fs::{Config, DirectoryDeleter, RetryNotification, delete_directory, delete_directory_contents};

fn make_readonly(p: &Path) {
    let mut perms = fs::metadata(p).unwrap().permissions();
    perms.set_readonly(true);
    fs::set_permissions(p, perms).unwrap();
}

#[test]
fn removes_tree_with_read_only_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    let a = temp.child("a");
    a.child("f1.txt").write_str("one").unwrap();
    a.child("b").child("f2.txt").write_str("two").unwrap();
    make_readonly(a.child("f1.txt").path());

    let removed = delete_directory(&Config::default(), a.path()).unwrap();
    assert!(removed);
    assert!(!a.path().exists());
}

#[test]
fn contents_only_keeps_the_root() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("x.txt").write_str("x").unwrap();
    temp.child("keep").child("k.txt").write_str("k").unwrap();
    temp.child("sub").child("y.txt").write_str("y").unwrap();

    let ok = delete_directory_contents(&Config::default(), temp.path(), Some("keep")).unwrap();
    assert!(ok);
    assert!(temp.path().is_dir());
    assert!(temp.child("keep").child("k.txt").path().exists());
    assert!(!temp.child("x.txt").path().exists());
    assert!(!temp.child("sub").path().exists());
}

#[test]
fn stuck_file_aborts_and_leaves_partial_tree() {
    let temp = assert_fs::TempDir::new().unwrap();
    let root = temp.child("tree");
    root.child("stuck.txt").write_str("s").unwrap();
    root.child("sub").child("other.txt").write_str("o").unwrap();

    let sfs = ScriptedFs::new();
    sfs.deny_delete(root.child("stuck.txt").path());

    let rec = Recorder::default();
    let sink = |n: &RetryNotification| rec.record(n);
    let timeout = Duration::from_millis(150);
    let start = Instant::now();
    let removed = DirectoryDeleter::new(&sfs)
        .with_settle_pause(Duration::ZERO)
        .with_notifier(&sink)
        .delete_tree(root.path(), timeout)
        .unwrap();

    assert!(!removed);
    assert!(start.elapsed() >= timeout);
    assert!(root.child("stuck.txt").path().exists());
    // Subdirectories are entered only after their parent's files are gone.
    assert!(root.child("sub").child("other.txt").path().exists());

    let events = rec.events();
    assert!(events.iter().any(|e| e.is_retry));
    assert!(events.iter().any(|e| !e.is_retry), "a final give-up event is sent");
}

#[test]
fn uses_configured_reserved_name() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child(".Trashes").child("t").write_str("t").unwrap();
    temp.child("user.txt").write_str("u").unwrap();

    let cfg = Config {
        reserved_dir_name: ".Trashes".to_string(),
        settle_pause: Duration::ZERO,
        ..Config::default()
    };
    let ok = DirectoryDeleter::from_config(&resilient_fs::OsFileSystem, &cfg)
        .delete_contents(temp.path(), None)
        .unwrap();
    assert!(ok);
    assert!(temp.child(".Trashes").child("t").path().exists());
    assert!(!temp.child("user.txt").path().exists());
}

#[test]
fn lagging_directory_removal_is_retried() {
    let temp = assert_fs::TempDir::new().unwrap();
    let root = temp.child("cache");
    root.child("a.tmp").write_str("a").unwrap();
    root.child("nested").child("b.tmp").write_str("b").unwrap();

    let sfs = ScriptedFs::new();
    sfs.fail_rmdir(3);

    let rec = Recorder::default();
    let sink = |n: &RetryNotification| rec.record(n);
    let removed = DirectoryDeleter::new(&sfs)
        .with_settle_pause(Duration::ZERO)
        .with_notifier(&sink)
        .delete_tree(root.path(), Duration::from_secs(2))
        .unwrap();

    assert!(removed);
    assert!(!root.path().exists());
    // Two directories, three scripted failures before the removals succeed.
    assert_eq!(sfs.rmdirs(), 5);
    let events = rec.events();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.is_retry && e.is_directory));
}
