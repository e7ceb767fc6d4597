use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

#[allow(deprecated)]
fn get_launchtube_bin() -> PathBuf {
    assert_cmd::cargo::cargo_bin("launchtube")
}

#[test]
fn test_browsers_command_runs() {
    let mut cmd = Command::new(get_launchtube_bin());
    cmd.arg("browsers");

    // Succeeds whether or not a browser is installed; output differs.
    cmd.assert().success().stdout(
        predicate::str::contains("Detected browsers:")
            .or(predicate::str::contains("No supported browsers found")),
    );
}

#[test]
fn test_browsers_command_help() {
    let mut cmd = Command::new(get_launchtube_bin());
    cmd.arg("browsers").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("List browsers detected"));
}
