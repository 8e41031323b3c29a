use std::fs;

use assert_fs::prelude::*;
use resilient_fs::fs_ops::backup_path;
use resilient_fs::{Config, OsFileSystem, RolloverNamer, rollover};

fn backups(dir: &std::path::Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().contains('('))
        .count()
}

#[test]
fn series_stays_bounded_and_newest_is_highest() {
    for n in [1u32, 2, 5] {
        let temp = assert_fs::TempDir::new().unwrap();
        let base = temp.child("File.txt");
        let namer = RolloverNamer::new(&OsFileSystem);

        let mut last = String::new();
        for i in 0..(n + 5) {
            last = format!("content {i}");
            base.write_str(&last).unwrap();
            namer.rollover(base.path(), None, n).unwrap();
            assert!(!base.path().exists());
        }

        assert_eq!(backups(temp.path()), n as usize, "max_backups = {n}");
        let newest = backup_path(base.path(), None, n);
        assert_eq!(fs::read_to_string(newest).unwrap(), last);
        assert!(!backup_path(base.path(), None, n + 1).exists());
    }
}

#[test]
fn oldest_surviving_backup_is_index_one() {
    let temp = assert_fs::TempDir::new().unwrap();
    let base = temp.child("log.txt");
    let cfg = Config {
        max_backups: 3,
        ..Config::default()
    };
    for i in 0..6 {
        base.write_str(&format!("v{i}")).unwrap();
        rollover(&cfg, base.path()).unwrap();
    }
    // v0..v2 were dropped in order.
    assert_eq!(fs::read_to_string(temp.path().join("log(1).txt")).unwrap(), "v3");
    assert_eq!(fs::read_to_string(temp.path().join("log(2).txt")).unwrap(), "v4");
    assert_eq!(fs::read_to_string(temp.path().join("log(3).txt")).unwrap(), "v5");
}

#[test]
fn archive_series_is_separate_from_siblings() {
    let temp = assert_fs::TempDir::new().unwrap();
    let base = temp.child("data.bin");
    temp.child("data(1).bin").write_str("unrelated sibling").unwrap();
    let archive = temp.path().join("archive");
    let cfg = Config {
        archive_folder: Some(archive.clone()),
        max_backups: 2,
        ..Config::default()
    };
    base.write_str("a").unwrap();
    rollover(&cfg, base.path()).unwrap();

    assert_eq!(fs::read_to_string(archive.join("data(1).bin")).unwrap(), "a");
    assert_eq!(
        fs::read_to_string(temp.path().join("data(1).bin")).unwrap(),
        "unrelated sibling"
    );
}

#[test]
fn empty_path_is_rejected() {
    let err = rollover(&Config::default(), std::path::Path::new("")).unwrap_err();
    assert!(matches!(err, resilient_fs::RolloverError::InvalidPath(_)));
}

#[test]
fn gapped_series_is_packed_without_dropping_a_backup() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("File(1).txt").write_str("old1").unwrap();
    temp.child("File(3).txt").write_str("old3").unwrap();
    let base = temp.child("File.txt");
    base.write_str("current").unwrap();

    RolloverNamer::new(&OsFileSystem)
        .rollover(base.path(), None, 3)
        .unwrap();

    assert!(!base.path().exists());
    assert_eq!(backups(temp.path()), 3);
    assert_eq!(fs::read_to_string(temp.path().join("File(1).txt")).unwrap(), "old1");
    assert_eq!(fs::read_to_string(temp.path().join("File(2).txt")).unwrap(), "old3");
    assert_eq!(fs::read_to_string(temp.path().join("File(3).txt")).unwrap(), "current");
}

#[test]
fn gap_at_the_start_is_closed() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("a(2).log").write_str("b2").unwrap();
    let base = temp.child("a.log");
    base.write_str("now").unwrap();

    RolloverNamer::new(&OsFileSystem)
        .rollover(base.path(), None, 5)
        .unwrap();

    assert_eq!(fs::read_to_string(temp.path().join("a(1).log")).unwrap(), "b2");
    assert_eq!(fs::read_to_string(temp.path().join("a(2).log")).unwrap(), "now");
    assert_eq!(backups(temp.path()), 2);
}
