//! Lifecycle dispatch: decoding, validation, and response shaping.

use rigger_cli::application::{Operation, ResourceKind, dispatch};
use rigger_common::Severity;
use serde_json::json;

use crate::fake::{FakeMachine, FixedHasher};

const HASH: &str = "sha256:0000";

#[tokio::test]
async fn test_undecodable_input_fails_before_any_io() {
    let fake = FakeMachine::new();
    let response = dispatch(
        ResourceKind::Directory,
        Operation::Create {
            desired: json!({"path": "/srv/app", "mode": "0755"}),
        },
        &fake,
        &FixedHasher(HASH),
    )
    .await;

    assert!(response.has_errors());
    assert!(response.state.is_none());
    assert!(fake.log().is_empty());
}

#[tokio::test]
async fn test_invalid_value_fails_before_any_io() {
    let fake = FakeMachine::new();
    let response = dispatch(
        ResourceKind::File,
        Operation::Create {
            desired: json!({
                "path": "relative/app.conf",
                "mode": "0644",
                "owner": 0,
                "group": 0,
                "content": ""
            }),
        },
        &fake,
        &FixedHasher(HASH),
    )
    .await;

    assert!(response.has_errors());
    let detail = response.diagnostics[0].detail.clone().unwrap_or_default();
    assert!(detail.contains("absolute"), "got: {detail}");
    assert!(fake.log().is_empty());
}

#[tokio::test]
async fn test_package_names_are_unquoted_on_input() {
    let fake = FakeMachine::new();
    fake.on("dpkg-query", "");
    let response = dispatch(
        ResourceKind::AptPackages,
        Operation::Create {
            desired: json!({"packages": [{"name": "\"jq\""}, {"name": " curl "}]}),
        },
        &fake,
        &FixedHasher(HASH),
    )
    .await;

    assert!(!response.has_errors(), "{:?}", response.diagnostics);
    assert!(fake.ran("env DEBIAN_FRONTEND=noninteractive apt-get install -y -q -- curl jq"));
    let state = response.state.unwrap();
    assert_eq!(state["packages"][0]["name"], "jq");
}

#[tokio::test]
async fn test_read_of_vanished_resource_reports_removed() {
    let fake = FakeMachine::new();
    fake.on("getent group", "root:x:0:\n");
    let response = dispatch(
        ResourceKind::Group,
        Operation::Read {
            state: json!({"name": "ops", "gid": 1001}),
        },
        &fake,
        &FixedHasher(HASH),
    )
    .await;

    assert!(response.removed);
    assert!(response.state.is_none());
    assert!(response.diagnostics.is_empty());
}

#[tokio::test]
async fn test_failed_update_keeps_prior_state() {
    let fake = FakeMachine::new();
    fake.fail("groupmod", 3, "groupmod: invalid group name 'ops!'");
    let prior = json!({"name": "ops", "gid": 1001});
    let response = dispatch(
        ResourceKind::Group,
        Operation::Update {
            prior: prior.clone(),
            desired: json!({"name": "admins"}),
        },
        &fake,
        &FixedHasher(HASH),
    )
    .await;

    assert!(response.has_errors());
    assert!(!response.removed);
    assert_eq!(response.state, Some(prior));
    let diag = &response.diagnostics[0];
    assert_eq!(diag.severity, Severity::Error);
    assert!(diag.detail.as_deref().unwrap_or_default().contains("invalid group name"));
}

#[tokio::test]
async fn test_delete_reports_removed() {
    let fake = FakeMachine::new();
    let response = dispatch(
        ResourceKind::File,
        Operation::Delete {
            state: json!({
                "path": "/etc/app.conf",
                "mode": "0644",
                "owner": 0,
                "group": 0,
                "content": "x"
            }),
        },
        &fake,
        &FixedHasher(HASH),
    )
    .await;

    assert!(response.removed);
    assert!(fake.ran("rm -f -- /etc/app.conf"));
}

#[tokio::test]
async fn test_warnings_do_not_fail_the_call() {
    let fake = FakeMachine::new();
    fake.fail(
        "env DEBIAN_FRONTEND=noninteractive apt-get update",
        100,
        "E: Could not get lock",
    );
    let response = dispatch(
        ResourceKind::AptRepository,
        Operation::Delete {
            state: json!({"name": "docker", "key": "k", "url": "https://example.invalid/apt"}),
        },
        &fake,
        &FixedHasher(HASH),
    )
    .await;

    assert!(response.removed);
    assert!(!response.has_errors());
    assert_eq!(response.diagnostics[0].severity, Severity::Warning);
}
