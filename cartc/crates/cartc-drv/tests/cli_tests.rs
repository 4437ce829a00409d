//! End-to-end runs of the `cartc` binary over real configuration files.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cartc() -> Command {
    Command::cargo_bin("cartc").expect("binary builds")
}

fn write_cfg(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("config written");
    path
}

#[test]
fn test_lists_variants_by_shortname() {
    let dir = TempDir::new().expect("tempdir");
    let cfg = write_cfg(
        &dir,
        "tests.cfg",
        "variants:\n    - a:\n        x = 1\n    - b:\n        x = 2\n",
    );
    cartc()
        .arg(&cfg)
        .assert()
        .success()
        .stdout(predicate::str::contains("dict    1:  a"))
        .stdout(predicate::str::contains("dict    2:  b"));
}

#[test]
fn test_fullname_shows_axis_labels() {
    let dir = TempDir::new().expect("tempdir");
    let cfg = write_cfg(
        &dir,
        "tests.cfg",
        "variants tests:\n    - wait:\n    - run:\n",
    );
    cartc()
        .arg(&cfg)
        .arg("--fullname")
        .assert()
        .success()
        .stdout(predicate::str::contains("(tests=wait)"))
        .stdout(predicate::str::contains("(tests=run)"));
}

#[test]
fn test_contents_are_sorted() {
    let dir = TempDir::new().expect("tempdir");
    let cfg = write_cfg(&dir, "tests.cfg", "zz = 2\naa = 1\n");
    let assert = cartc().arg(&cfg).arg("--contents").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    let aa = stdout.find("aa = 1").expect("aa printed");
    let zz = stdout.find("zz = 2").expect("zz printed");
    assert!(aa < zz, "keys must print in sorted order:\n{stdout}");
}

#[test]
fn test_extra_lines_filter_the_output() {
    let dir = TempDir::new().expect("tempdir");
    let cfg = write_cfg(
        &dir,
        "tests.cfg",
        "variants:\n    - unknown_qemu:\n    - rhel64:\n",
    );
    cartc()
        .arg(&cfg)
        .arg("only unknown_qemu")
        .assert()
        .success()
        .stdout(predicate::str::contains("unknown_qemu"))
        .stdout(predicate::str::contains("rhel64").not());
}

#[test]
fn test_defaults_flag_prunes_axes() {
    let dir = TempDir::new().expect("tempdir");
    let cfg = write_cfg(
        &dir,
        "tests.cfg",
        "variants tests:\n    - @wait:\n        run = wait\n    - test2:\n        run = test1\n",
    );
    cartc()
        .arg(&cfg)
        .arg("--defaults")
        .arg("--fullname")
        .assert()
        .success()
        .stdout(predicate::str::contains("(tests=wait)"))
        .stdout(predicate::str::contains("(tests=test2)").not());
}

#[test]
fn test_repr_mode_prints_a_list() {
    let dir = TempDir::new().expect("tempdir");
    let cfg = write_cfg(&dir, "tests.cfg", "a = 1\n");
    cartc()
        .arg(&cfg)
        .arg("--repr")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("[\n"))
        .stdout(predicate::str::contains("'a': '1'"))
        .stdout(predicate::str::ends_with("]\n"));
}

#[test]
fn test_include_resolves_relative_to_file() {
    let dir = TempDir::new().expect("tempdir");
    write_cfg(&dir, "included.cfg", "from_include = yes\n");
    let cfg = write_cfg(&dir, "tests.cfg", "include included.cfg\n");
    cartc()
        .arg(&cfg)
        .arg("--contents")
        .assert()
        .success()
        .stdout(predicate::str::contains("from_include = yes"));
}

#[test]
fn test_missing_file_fails() {
    let dir = TempDir::new().expect("tempdir");
    cartc()
        .arg(dir.path().join("missing.cfg"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_missing_include_fails_with_position() {
    let dir = TempDir::new().expect("tempdir");
    let cfg = write_cfg(&dir, "tests.cfg", "include nowhere/none.cfg\n");
    cartc()
        .arg(&cfg)
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_syntax_error_fails_with_line() {
    let dir = TempDir::new().expect("tempdir");
    let cfg = write_cfg(&dir, "tests.cfg", "only xxx...yyy\n");
    cartc()
        .arg(&cfg)
        .assert()
        .failure()
        .stderr(predicate::str::contains("tests.cfg:1"));
}
