//! Integration tests for the CLI surface: help, version, kinds.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn rigger() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("rigger"));
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_cli_no_args_shows_help_and_exits_two() {
    rigger().assert().code(2).stderr(predicate::str::contains(
        "Provision machines over SSH from declarative resources",
    ));
}

#[test]
fn test_cli_help_lists_lifecycle_commands() {
    let assert = rigger().arg("--help").assert().success();
    let out = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    for cmd in ["create", "read", "update", "delete", "kinds", "host-key", "version"] {
        assert!(out.contains(cmd), "help is missing {cmd}: {out}");
    }
}

#[test]
fn test_cli_version_flag_shows_version() {
    rigger()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rigger"));
}

#[test]
fn test_version_command_shows_version() {
    rigger()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rigger 0.1.0"));
}

#[test]
fn test_version_command_json_outputs_valid_json() {
    let assert = rigger().args(["version", "--json"]).assert().success();
    let v: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("valid JSON");
    assert_eq!(v["version"], "0.1.0");
}

#[test]
fn test_kinds_lists_every_resource_kind() {
    let assert = rigger().arg("kinds").assert().success();
    let out = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    for kind in [
        "user",
        "group",
        "directory",
        "file",
        "line_in_file",
        "apt_packages",
        "apt_repository",
        "ssh_key",
        "ssh_authorized_key",
        "docker_image_load",
    ] {
        assert!(out.contains(kind), "kinds is missing {kind}: {out}");
    }
}

#[test]
fn test_kinds_json_is_an_array_of_ten() {
    let assert = rigger().args(["kinds", "--json"]).assert().success();
    let v: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("valid JSON");
    assert_eq!(v.as_array().map(Vec::len), Some(10));
    assert_eq!(v[0]["name"], "user");
}

#[test]
fn test_unknown_kind_is_rejected_with_valid_list() {
    rigger()
        .args(["create", "users", "--desired", "{}"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown resource kind"))
        .stderr(predicate::str::contains("ssh_authorized_key"));
}

#[test]
fn test_update_requires_prior_and_desired() {
    rigger()
        .args(["update", "group", "--desired", r#"{"name":"ops"}"#])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--prior"));
}
