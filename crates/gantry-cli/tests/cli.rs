// SPDX-License-Identifier: MIT OR Apache-2.0
//! Black-box tests of the `gantry` binary.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_both_download_commands() {
    Command::cargo_bin("gantry")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("download-cli"))
        .stdout(predicate::str::contains("download-buildx"));
}

#[test]
fn download_buildx_is_reserved_and_exits_nonzero() {
    Command::cargo_bin("gantry")
        .unwrap()
        .arg("download-buildx")
        .assert()
        .failure()
        .stderr(predicate::str::contains("isn't supported yet"));
}

#[test]
fn unknown_subcommands_are_usage_errors() {
    Command::cargo_bin("gantry")
        .unwrap()
        .arg("download-everything")
        .assert()
        .failure();
}
