use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn tako() -> Command {
    let mut cmd = Command::cargo_bin("tako").expect("binary exists");
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn compiles_a_file_and_prints_its_module() {
    let dir = tempdir().expect("tempdir");
    let input_path = dir.path().join("nand.tk");
    fs::write(&input_path, "nand(a, b) = not(and(a, b))\n").expect("write input");

    tako()
        .arg(&input_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("nand(a, b) = not(#0=and(#0=a, #1=b))"))
        .stderr(predicate::str::contains("nand.tk"));
}

#[test]
fn reports_errors_with_location_and_fails() {
    let dir = tempdir().expect("tempdir");
    let input_path = dir.path().join("broken.tk");
    fs::write(&input_path, "a = f(1,\n").expect("write input");

    tako()
        .arg(&input_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.tk:1:6: error: Unclosed bracket"));
}

#[test]
fn warnings_are_shown_without_failing() {
    let dir = tempdir().expect("tempdir");
    let input_path = dir.path().join("warn.tk");
    fs::write(&input_path, "s = 'oops\n").expect("write input");

    tako()
        .arg(&input_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("warning: Unterminated string literal"));
}

#[test]
fn keeps_going_after_a_failing_file() {
    let dir = tempdir().expect("tempdir");
    let bad = dir.path().join("a_bad.tk");
    let good = dir.path().join("b_good.tk");
    fs::write(&bad, "x = )").expect("write bad");
    fs::write(&good, "y = 2").expect("write good");

    tako()
        .arg(&bad)
        .arg(&good)
        .assert()
        .failure()
        .stdout(predicate::str::contains("y = 2"))
        .stderr(predicate::str::contains("1 of 2 file(s) failed"));
}

#[test]
fn unreadable_files_do_not_stop_the_batch() {
    let dir = tempdir().expect("tempdir");
    let binary = dir.path().join("a_binary.tk");
    let good = dir.path().join("b_good.tk");
    fs::write(&binary, b"a = \xff\n").expect("write binary");
    fs::write(&good, "y = 2").expect("write good");

    tako()
        .arg(&binary)
        .arg(&good)
        .assert()
        .failure()
        .stdout(predicate::str::contains("y = 2"))
        .stderr(
            predicate::str::contains("failed to read input file")
                .and(predicate::str::contains("1 of 2 file(s) failed")),
        );
}

#[test]
fn deeply_nested_files_fail_alone() {
    let dir = tempdir().expect("tempdir");
    let deep = dir.path().join("a_deep.tk");
    let good = dir.path().join("b_good.tk");
    fs::write(&deep, format!("a = {}x{}", "(".repeat(2_000), ")".repeat(2_000)))
        .expect("write deep");
    fs::write(&good, "y = 2").expect("write good");

    tako()
        .arg(&deep)
        .arg(&good)
        .assert()
        .failure()
        .stdout(predicate::str::contains("y = 2"))
        .stderr(predicate::str::contains("error: Expression nested too deeply"));
}

#[test]
fn walks_directories_for_source_files() {
    let dir = tempdir().expect("tempdir");
    let nested = dir.path().join("lib");
    fs::create_dir_all(&nested).expect("create dir");
    fs::write(nested.join("one.tk"), "one = 1").expect("write one");
    fs::write(dir.path().join("two.tk"), "two = 2").expect("write two");
    fs::write(dir.path().join("notes.txt"), "not = (source").expect("write notes");

    tako()
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("one = 1").and(predicate::str::contains("two = 2")));
}

#[test]
fn stops_after_the_requested_step() {
    let dir = tempdir().expect("tempdir");
    let input_path = dir.path().join("lex.tk");
    fs::write(&input_path, "a = (").expect("write input");

    tako()
        .arg("--step")
        .arg("LEX")
        .arg(&input_path)
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Up to Lex"));
}

#[test]
fn rejects_unknown_steps() {
    tako()
        .arg("--step")
        .arg("codegen")
        .arg("whatever.tk")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no known pass step named codegen"));
}

#[test]
fn reports_missing_inputs() {
    let dir = tempdir().expect("tempdir");
    tako()
        .arg(dir.path().join("missing.tk"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("no such file or directory"));
}

#[test]
fn interactive_session_accumulates_definitions() {
    tako()
        .arg("--interactive")
        .write_stdin("double(x) = x * 2\nfour = double(2)\n:q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("four = double(#0=2)"))
        .stderr(predicate::str::contains("tako - version"));
}
