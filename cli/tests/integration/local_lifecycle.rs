//! End-to-end lifecycle calls against the local backend, inside a temp dir.

#![allow(clippy::expect_used)]

use std::os::unix::fs::MetadataExt;
use std::path::Path;

use assert_cmd::Command;
use serde_json::{Value, json};
use tempfile::TempDir;

fn rigger(home: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("rigger"));
    cmd.env("NO_COLOR", "1")
        .env("RIGGER_CONFIG", home.path().join("config.yaml"))
        .env_remove("RIGGER_SUDO")
        .arg("--local")
        .arg("--json");
    cmd
}

/// Run one call and return its response, asserting the exit status.
fn call(home: &TempDir, args: &[&str], success: bool) -> Value {
    let assert = rigger(home).args(args).assert();
    let assert = if success {
        assert.success()
    } else {
        assert.failure()
    };
    serde_json::from_slice(&assert.get_output().stdout).expect("response is JSON")
}

fn owner_ids(path: &Path) -> (u32, u32) {
    let meta = std::fs::metadata(path).expect("metadata");
    (meta.uid(), meta.gid())
}

#[test]
fn test_file_lifecycle_with_drift() {
    let home = TempDir::new().expect("tempdir");
    let (uid, gid) = owner_ids(home.path());
    let path = home.path().join("app.conf");
    let desired = json!({
        "path": path.to_string_lossy(),
        "mode": "600",
        "owner": uid,
        "group": gid,
        "content": "port = 80\n",
    })
    .to_string();

    let created = call(&home, &["create", "file", "--desired", &desired], true);
    assert_eq!(created["state"]["mode"], "0600");
    assert_eq!(std::fs::read_to_string(&path).expect("file"), "port = 80\n");
    assert_eq!(
        std::fs::metadata(&path).expect("metadata").mode() & 0o7777,
        0o600
    );

    std::fs::write(&path, "port = 8080\n").expect("edit");
    let state = created["state"].to_string();
    let read = call(&home, &["read", "file", "--state", &state], true);
    assert_eq!(read["removed"], false);
    assert_eq!(read["state"]["content"], "port = 8080\n");

    let deleted = call(&home, &["delete", "file", "--state", &state], true);
    assert_eq!(deleted["removed"], true);
    assert!(!path.exists());

    let gone = call(&home, &["read", "file", "--state", &state], true);
    assert_eq!(gone["removed"], true);
    assert_eq!(gone["state"], Value::Null);
}

#[test]
fn test_directory_lifecycle() {
    let home = TempDir::new().expect("tempdir");
    let (uid, gid) = owner_ids(home.path());
    let path = home.path().join("data");
    let desired = json!({
        "path": path.to_string_lossy(),
        "mode": "0750",
        "owner": uid,
        "group": gid,
        "remove_on_delete": true,
    })
    .to_string();

    let created = call(&home, &["create", "directory", "--desired", &desired], true);
    assert!(path.is_dir());
    let state = created["state"].to_string();

    let read = call(&home, &["read", "directory", "--state", &state], true);
    assert_eq!(read["state"]["mode"], "0750");
    assert_eq!(read["state"]["owner"], uid);

    call(&home, &["delete", "directory", "--state", &state], true);
    assert!(!path.exists());
}

#[test]
fn test_line_in_file_lifecycle() {
    let home = TempDir::new().expect("tempdir");
    let path = home.path().join("hosts");
    std::fs::write(&path, "127.0.0.1 localhost\n10.0.0.4 db\n").expect("seed");
    let desired = json!({
        "path": path.to_string_lossy(),
        "line": "10.0.0.5 db",
        "regexp": "\\sdb$",
    })
    .to_string();

    let created = call(&home, &["create", "line_in_file", "--desired", &desired], true);
    assert_eq!(
        std::fs::read_to_string(&path).expect("hosts"),
        "127.0.0.1 localhost\n10.0.0.5 db\n"
    );

    std::fs::write(&path, "127.0.0.1 localhost\n").expect("edit");
    let state = created["state"].to_string();
    let read = call(&home, &["read", "line_in_file", "--state", &state], true);
    assert_eq!(read["removed"], true);
}

#[test]
fn test_invalid_input_fails_without_touching_the_machine() {
    let home = TempDir::new().expect("tempdir");
    let desired = json!({
        "path": "relative/app.conf",
        "mode": "0644",
        "owner": 0,
        "group": 0,
        "content": "",
    })
    .to_string();

    let response = call(&home, &["create", "file", "--desired", &desired], false);
    assert_eq!(response["state"], Value::Null);
    assert_eq!(response["diagnostics"][0]["severity"], "error");
    assert!(!Path::new("relative/app.conf").exists());
}

#[test]
fn test_input_can_be_read_from_file() {
    let home = TempDir::new().expect("tempdir");
    let (uid, gid) = owner_ids(home.path());
    let path = home.path().join("motd");
    let input = home.path().join("desired.json");
    std::fs::write(
        &input,
        json!({
            "path": path.to_string_lossy(),
            "mode": "0644",
            "owner": uid,
            "group": gid,
            "content": "hello\n",
        })
        .to_string(),
    )
    .expect("write input");

    let at_input = format!("@{}", input.display());
    call(&home, &["create", "file", "--desired", &at_input], true);
    assert_eq!(std::fs::read_to_string(&path).expect("motd"), "hello\n");
}
