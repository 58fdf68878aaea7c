//! The `alx` binary with process workers

mod common;

use common::gc_install;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn alx(args: &[&str], dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_alx"))
        .args(["--worker", "process"])
        .args(args)
        .arg(dir)
        .env_remove("ALX_WORKER")
        .env_remove("ALX_ROOT")
        .env("RUST_LOG", "warn")
        .output()
        .unwrap()
}

#[test]
fn test_check_reports_validity() {
    let dir = tempfile::tempdir().unwrap();
    assert!(!alx(&["check"], dir.path()).status.success());

    gc_install(dir.path(), "GEAE", "8P");
    assert!(alx(&["check"], dir.path()).status.success());
}

#[test]
fn test_export_in_worker_process() {
    let dir = tempfile::tempdir().unwrap();
    gc_install(dir.path(), "GEAE", "8P");

    let output = alx(&["export", "weapon"], dir.path());
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let csv = fs::read_to_string(dir.path().join("data/weapon.csv")).unwrap();
    assert_eq!(csv.lines().count(), 1 + 0x50);
    assert!(csv.starts_with("Entry ID,Name,"));
}

#[test]
fn test_failed_worker_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    gc_install(dir.path(), "GEAE", "8P");
    let dol = dir.path().join("root/&&systemdata/Start.dol");

    assert!(alx(&["export", "ship-cannon"], dir.path()).status.success());
    let before = fs::read(&dol).unwrap();

    // a negative value in an unsigned column fails inside the child
    let csv = dir.path().join("data/shipcannon.csv");
    let text = fs::read_to_string(&csv).unwrap();
    let edited: Vec<String> = text
        .lines()
        .map(|line| {
            let mut cells: Vec<&str> = line.split(',').collect();
            if cells[0] == "2" {
                cells[2] = "-500";
            }
            cells.join(",")
        })
        .collect();
    fs::write(&csv, edited.join("\n") + "\n").unwrap();

    let output = alx(&["import", "ship_cannon"], dir.path());
    assert!(!output.status.success());
    assert_eq!(fs::read(&dol).unwrap(), before);
}

#[test]
fn test_unknown_kind() {
    let dir = tempfile::tempdir().unwrap();
    gc_install(dir.path(), "GEAE", "8P");
    assert!(!alx(&["export", "airship"], dir.path()).status.success());
}
