//! Integration tests for connection settings: flags, config file, and the
//! checks that run before any connection is attempted.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const PINNED: &str = "SHA256:CQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQk";

/// A command isolated from the caller's environment and config file.
fn rigger(home: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("rigger"));
    cmd.env("NO_COLOR", "1")
        .env("RIGGER_CONFIG", home.path().join("config.yaml"))
        .env_remove("SSH_AUTH_SOCK");
    for var in [
        "RIGGER_LOCAL",
        "RIGGER_HOST",
        "RIGGER_PORT",
        "RIGGER_USER",
        "RIGGER_PRIVATE_KEY",
        "RIGGER_AGENT_SOCKET",
        "RIGGER_HOST_KEY_FINGERPRINT",
        "RIGGER_INSECURE_ACCEPT_ANY_HOST_KEY",
        "RIGGER_SUDO",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn create_group(home: &TempDir) -> Command {
    let mut cmd = rigger(home);
    cmd.args(["create", "group", "--desired", r#"{"name":"ops"}"#]);
    cmd
}

#[test]
fn test_missing_host_is_reported() {
    let home = TempDir::new().expect("tempdir");
    create_group(&home)
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required connection setting: host"));
}

#[test]
fn test_unpinned_host_key_is_rejected_before_dialing() {
    let home = TempDir::new().expect("tempdir");
    create_group(&home)
        .args(["--host", "192.0.2.1", "--port", "22", "--user", "ops"])
        .args(["--private-key", "/home/ops/.ssh/id_ed25519"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("host key is not pinned"));
}

#[test]
fn test_both_auth_methods_are_rejected() {
    let home = TempDir::new().expect("tempdir");
    create_group(&home)
        .args(["--host", "192.0.2.1", "--port", "22", "--user", "ops"])
        .args(["--private-key", "/home/ops/.ssh/id_ed25519"])
        .args(["--agent-socket", "/run/user/1000/agent.sock"])
        .args(["--host-key-fingerprint", PINNED])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configure exactly one"));
}

#[test]
fn test_agent_socket_must_match_environment() {
    let home = TempDir::new().expect("tempdir");
    create_group(&home)
        .env("SSH_AUTH_SOCK", "/run/user/1000/other.sock")
        .args(["--host", "192.0.2.1", "--port", "22", "--user", "ops"])
        .args(["--agent-socket", "/run/user/1000/agent.sock"])
        .args(["--host-key-fingerprint", PINNED])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SSH_AUTH_SOCK"));
}

#[test]
fn test_config_file_values_are_used_and_flags_override() {
    let home = TempDir::new().expect("tempdir");
    std::fs::write(
        home.path().join("config.yaml"),
        "connection:\n  host: 192.0.2.1\n  port: 22\n  user: ops\n  private_key: relative/key\n",
    )
    .expect("write config");

    // The relative key from the file is rejected...
    create_group(&home)
        .args(["--host-key-fingerprint", PINNED])
        .assert()
        .failure()
        .stderr(predicate::str::contains("private key path must be absolute"));

    // ...and the flag takes its place, leaving only the host key unpinned.
    create_group(&home)
        .args(["--private-key", "/home/ops/.ssh/id_ed25519"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("host key is not pinned"));
}

#[test]
fn test_malformed_config_file_is_reported() {
    let home = TempDir::new().expect("tempdir");
    std::fs::write(home.path().join("config.yaml"), "connection: [unclosed\n")
        .expect("write config");
    create_group(&home)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot parse"));
}

#[test]
fn test_invalid_json_input_is_reported() {
    let home = TempDir::new().expect("tempdir");
    rigger(&home)
        .args(["create", "group", "--local", "--desired", "name=ops"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--desired is not valid JSON"));
}

#[test]
fn test_json_mode_reports_setup_errors_as_json() {
    let home = TempDir::new().expect("tempdir");
    let assert = create_group(&home).arg("--json").assert().failure();
    let v: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("valid JSON");
    assert_eq!(v["error"], true);
    assert!(
        v["message"]
            .as_str()
            .unwrap_or_default()
            .contains("host")
    );
}

#[test]
fn test_host_key_requires_host_and_port() {
    let home = TempDir::new().expect("tempdir");
    rigger(&home)
        .args(["host-key", "--host", "192.0.2.1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("port"));
}
