//! Apt package and repository reconcilers.

use rigger_cli::application::services::{AptPackagesReconciler, AptRepositoryReconciler};
use rigger_cli::application::{Diagnostics, Reconciler};
use rigger_common::{AptPackage, AptPackages, AptRepository};

use crate::fake::FakeMachine;

const INSTALL: &str = "env DEBIAN_FRONTEND=noninteractive apt-get install -y -q --";
const REMOVE: &str = "env DEBIAN_FRONTEND=noninteractive apt-get remove -y -q --";
const AUTOREMOVE: &str = "env DEBIAN_FRONTEND=noninteractive apt-get autoremove -y -q";
const UPDATE: &str = "env DEBIAN_FRONTEND=noninteractive apt-get update -y -q";

fn packages(spec: &[(&str, bool)]) -> AptPackages {
    AptPackages {
        packages: spec
            .iter()
            .map(|(name, absent)| AptPackage {
                name: (*name).to_string(),
                absent: *absent,
            })
            .collect(),
    }
}

// ── Packages ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_packages_create_installs_missing_in_one_batch() {
    let fake = FakeMachine::new();
    fake.on("dpkg-query", "curl\tii \nlibc6\tii \n");
    AptPackagesReconciler::new(&fake)
        .create(
            packages(&[("jq", false), ("curl", false), ("git", false)]),
            &mut Diagnostics::default(),
        )
        .await
        .unwrap();
    assert_eq!(fake.count(INSTALL), 1);
    assert!(fake.ran(&format!("{INSTALL} git jq")));
    assert!(!fake.ran(REMOVE));
}

#[tokio::test]
async fn test_packages_converged_set_runs_nothing() {
    let fake = FakeMachine::new();
    fake.on("dpkg-query", "curl\tii \n");
    AptPackagesReconciler::new(&fake)
        .create(packages(&[("curl", false), ("telnet", true)]), &mut Diagnostics::default())
        .await
        .unwrap();
    assert!(!fake.ran("env"));
}

#[tokio::test]
async fn test_packages_update_removes_dropped_and_autoremoves() {
    let fake = FakeMachine::new();
    fake.on("dpkg-query", "curl\tii \njq\tii \nhtop\tii \n");
    AptPackagesReconciler::new(&fake)
        .update(
            packages(&[("curl", false), ("jq", false)]),
            packages(&[("curl", false)]),
            &mut Diagnostics::default(),
        )
        .await
        .unwrap();
    assert!(fake.ran(&format!("{REMOVE} jq")));
    assert!(fake.ran(AUTOREMOVE));
    assert!(!fake.ran(&format!("{REMOVE} jq htop")));
}

#[tokio::test]
async fn test_packages_read_reflects_installed_set() {
    let fake = FakeMachine::new();
    fake.on("dpkg-query", "curl\tii \ntelnet\trc \n");
    let read = AptPackagesReconciler::new(&fake)
        .read(
            packages(&[("curl", false), ("jq", false), ("telnet", true)]),
            &mut Diagnostics::default(),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read, packages(&[("curl", false), ("jq", true), ("telnet", true)]));
}

#[tokio::test]
async fn test_packages_delete_removes_what_was_declared() {
    let fake = FakeMachine::new();
    fake.on("dpkg-query", "curl\tii \njq\tii \n");
    AptPackagesReconciler::new(&fake)
        .delete(packages(&[("jq", false), ("nano", true)]), &mut Diagnostics::default())
        .await
        .unwrap();
    assert!(fake.ran(&format!("{REMOVE} jq")));
}

#[test]
fn test_packages_validate_rejects_duplicates() {
    let fake = FakeMachine::new();
    let err = AptPackagesReconciler::new(&fake)
        .validate(&packages(&[("jq", false), ("jq", true)]))
        .unwrap_err();
    assert!(err.to_string().contains("more than once"));
}

// ── Repository ────────────────────────────────────────────────────────────────

fn repo() -> AptRepository {
    AptRepository {
        name: "docker".to_string(),
        key: "-----BEGIN PGP PUBLIC KEY BLOCK-----\n...\n".to_string(),
        url: "https://download.docker.com/linux/ubuntu".to_string(),
    }
}

fn target_with_release(fake: &FakeMachine) {
    fake.on("dpkg --print-architecture", "amd64\n");
    fake.put_file(
        "/etc/os-release",
        "NAME=\"Ubuntu\"\nVERSION_CODENAME=jammy\n",
        "0644",
        "0",
        "0",
    );
}

#[tokio::test]
async fn test_repository_create_writes_key_and_source_list() {
    let fake = FakeMachine::new();
    target_with_release(&fake);
    let mut diags = Diagnostics::default();
    AptRepositoryReconciler::new(&fake)
        .create(repo(), &mut diags)
        .await
        .unwrap();

    assert!(fake.ran("install -d -m 0755 /etc/apt/keyrings"));
    assert_eq!(fake.text("/etc/apt/keyrings/docker.asc"), repo().key);
    assert_eq!(
        fake.text("/etc/apt/sources.list.d/docker.list"),
        "deb [arch=amd64 signed-by=/etc/apt/keyrings/docker.asc] \
         https://download.docker.com/linux/ubuntu jammy main\n"
    );
    assert!(fake.ran(UPDATE));
    assert!(!diags.has_errors());
}

#[tokio::test]
async fn test_repository_create_flags_unverifiable_index() {
    let fake = FakeMachine::new();
    target_with_release(&fake);
    fake.on(
        UPDATE,
        "W: GPG error: https://download.docker.com jammy InRelease: \
         NO_PUBKEY 7EA0A9C3F273FCD8\n",
    );
    let mut diags = Diagnostics::default();
    AptRepositoryReconciler::new(&fake)
        .create(repo(), &mut diags)
        .await
        .unwrap();
    assert!(diags.has_errors());
    assert!(
        diags.as_slice()[0]
            .detail
            .as_deref()
            .unwrap_or_default()
            .contains("NO_PUBKEY")
    );
}

#[tokio::test]
async fn test_repository_read_none_when_list_removed() {
    let fake = FakeMachine::new();
    fake.put_file("/etc/apt/keyrings/docker.asc", "key", "0644", "0", "0");
    let read = AptRepositoryReconciler::new(&fake)
        .read(repo(), &mut Diagnostics::default())
        .await
        .unwrap();
    assert_eq!(read, None);
}

#[tokio::test]
async fn test_repository_read_reports_url_from_list() {
    let fake = FakeMachine::new();
    fake.put_file(
        "/etc/apt/sources.list.d/docker.list",
        "deb [arch=amd64 signed-by=/etc/apt/keyrings/docker.asc] https://mirror.example/ubuntu jammy main\n",
        "0644",
        "0",
        "0",
    );
    fake.put_file("/etc/apt/keyrings/docker.asc", "rotated", "0644", "0", "0");
    let read = AptRepositoryReconciler::new(&fake)
        .read(repo(), &mut Diagnostics::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read.url, "https://mirror.example/ubuntu");
    assert_eq!(read.key, "rotated");
}

#[tokio::test]
async fn test_repository_delete_warns_when_refresh_fails() {
    let fake = FakeMachine::new();
    fake.put_file("/etc/apt/sources.list.d/docker.list", "deb x y main\n", "0644", "0", "0");
    fake.put_file("/etc/apt/keyrings/docker.asc", "key", "0644", "0", "0");
    fake.fail(UPDATE, 100, "E: Could not get lock /var/lib/apt/lists/lock");
    let mut diags = Diagnostics::default();
    AptRepositoryReconciler::new(&fake)
        .delete(repo(), &mut diags)
        .await
        .unwrap();
    assert!(fake.file("/etc/apt/sources.list.d/docker.list").is_none());
    assert!(fake.file("/etc/apt/keyrings/docker.asc").is_none());
    assert!(!diags.has_errors());
    assert_eq!(diags.as_slice().len(), 1);
}

#[tokio::test]
async fn test_repository_update_unchanged_is_noop() {
    let fake = FakeMachine::new();
    AptRepositoryReconciler::new(&fake)
        .update(repo(), repo(), &mut Diagnostics::default())
        .await
        .unwrap();
    assert!(fake.log().is_empty());
}

#[tokio::test]
async fn test_repository_rename_removes_old_files_before_writing_new() {
    let fake = FakeMachine::new();
    target_with_release(&fake);
    fake.put_file("/etc/apt/sources.list.d/docker.list", "deb x y main\n", "0644", "0", "0");
    fake.put_file("/etc/apt/keyrings/docker.asc", "key", "0644", "0", "0");
    let desired = AptRepository {
        name: "docker-ce".to_string(),
        ..repo()
    };

    AptRepositoryReconciler::new(&fake)
        .update(repo(), desired, &mut Diagnostics::default())
        .await
        .unwrap();

    let log = fake.log();
    let rm = log
        .iter()
        .position(|l| {
            l == "rm -f -- /etc/apt/sources.list.d/docker.list /etc/apt/keyrings/docker.asc"
        })
        .unwrap();
    let first_write = log.iter().position(|l| l.starts_with("write ")).unwrap();
    assert!(rm < first_write);
    assert!(fake.file("/etc/apt/sources.list.d/docker.list").is_none());
    assert!(fake.file("/etc/apt/keyrings/docker.asc").is_none());
    assert_eq!(fake.text("/etc/apt/keyrings/docker-ce.asc"), repo().key);
    assert!(
        fake.text("/etc/apt/sources.list.d/docker-ce.list")
            .contains("signed-by=/etc/apt/keyrings/docker-ce.asc")
    );
}

#[tokio::test]
async fn test_repository_url_change_rewrites_in_place() {
    let fake = FakeMachine::new();
    target_with_release(&fake);
    let desired = AptRepository {
        url: "https://mirror.example/ubuntu".to_string(),
        ..repo()
    };

    AptRepositoryReconciler::new(&fake)
        .update(repo(), desired, &mut Diagnostics::default())
        .await
        .unwrap();

    assert!(!fake.ran("rm"));
    assert_eq!(fake.count("write /etc/apt/sources.list.d/docker.list"), 1);
    assert_eq!(
        fake.text("/etc/apt/sources.list.d/docker.list"),
        "deb [arch=amd64 signed-by=/etc/apt/keyrings/docker.asc] \
         https://mirror.example/ubuntu jammy main\n"
    );
    assert!(fake.ran(UPDATE));
}
