//! Directory, file and line-in-file reconcilers.

use rigger_cli::application::services::{
    DirectoryReconciler, FileReconciler, LineInFileReconciler,
};
use rigger_cli::application::{Diagnostics, Reconciler};
use rigger_common::{Directory, File, LineInFile};

use crate::fake::FakeMachine;

fn dir(mode: &str, owner: u32, group: u32) -> Directory {
    Directory {
        path: "/srv/app".to_string(),
        mode: mode.to_string(),
        owner,
        group,
        remove_on_delete: false,
    }
}

fn file(content: &str, mode: &str) -> File {
    File {
        path: "/etc/app.conf".to_string(),
        mode: mode.to_string(),
        owner: 0,
        group: 0,
        content: content.to_string(),
    }
}

fn line(line: &str, regexp: Option<&str>) -> LineInFile {
    LineInFile {
        path: "/etc/hosts".to_string(),
        line: line.to_string(),
        regexp: regexp.map(str::to_string),
    }
}

// ── Directory ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_directory_create_sets_attributes_atomically() {
    let fake = FakeMachine::new();
    let created = DirectoryReconciler::new(&fake)
        .create(dir("755", 1000, 1000), &mut Diagnostics::default())
        .await
        .unwrap();
    assert!(fake.ran("install -d -m 0755 -o 1000 -g 1000 -- /srv/app"));
    assert_eq!(created.mode, "0755");
}

#[tokio::test]
async fn test_directory_read_reports_observed_attributes() {
    let fake = FakeMachine::new();
    fake.on("stat", "750 1001 1002 directory\n");
    let read = DirectoryReconciler::new(&fake)
        .read(dir("0755", 0, 0), &mut Diagnostics::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!((read.mode.as_str(), read.owner, read.group), ("0750", 1001, 1002));
}

#[tokio::test]
async fn test_directory_read_none_when_missing() {
    let fake = FakeMachine::new();
    fake.fail(
        "stat",
        1,
        "stat: cannot statx '/srv/app': No such file or directory",
    );
    let read = DirectoryReconciler::new(&fake)
        .read(dir("0755", 0, 0), &mut Diagnostics::default())
        .await
        .unwrap();
    assert_eq!(read, None);
}

#[tokio::test]
async fn test_directory_read_none_when_path_is_a_file() {
    let fake = FakeMachine::new();
    fake.on("stat", "644 0 0 regular file\n");
    let read = DirectoryReconciler::new(&fake)
        .read(dir("0755", 0, 0), &mut Diagnostics::default())
        .await
        .unwrap();
    assert_eq!(read, None);
}

#[tokio::test]
async fn test_directory_update_touches_only_changed_fields() {
    let fake = FakeMachine::new();
    DirectoryReconciler::new(&fake)
        .update(dir("0755", 0, 0), dir("755", 1000, 0), &mut Diagnostics::default())
        .await
        .unwrap();
    assert!(fake.ran("chown 1000:0 -- /srv/app"));
    assert!(!fake.ran("chmod"));
}

#[tokio::test]
async fn test_directory_update_rejects_path_change() {
    let fake = FakeMachine::new();
    let mut moved = dir("0755", 0, 0);
    moved.path = "/srv/other".to_string();
    let err = DirectoryReconciler::new(&fake)
        .update(dir("0755", 0, 0), moved, &mut Diagnostics::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("replace the resource"));
    assert!(fake.log().is_empty());
}

#[tokio::test]
async fn test_directory_delete_leaves_tree_unless_asked() {
    let fake = FakeMachine::new();
    let reconciler = DirectoryReconciler::new(&fake);
    reconciler
        .delete(dir("0755", 0, 0), &mut Diagnostics::default())
        .await
        .unwrap();
    assert!(fake.log().is_empty());

    let mut removable = dir("0755", 0, 0);
    removable.remove_on_delete = true;
    reconciler
        .delete(removable, &mut Diagnostics::default())
        .await
        .unwrap();
    assert!(fake.ran("rm -rf -- /srv/app"));
}

// ── File ──────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_file_create_writes_content_and_attributes() {
    let fake = FakeMachine::new();
    let created = FileReconciler::new(&fake)
        .create(file("port = 80\n", "640"), &mut Diagnostics::default())
        .await
        .unwrap();
    let written = fake.file("/etc/app.conf").unwrap();
    assert_eq!(written.content, b"port = 80\n");
    assert_eq!(written.mode, "0640");
    assert_eq!(created.mode, "0640");
}

#[tokio::test]
async fn test_file_read_detects_content_drift() {
    let fake = FakeMachine::new();
    fake.put_file("/etc/app.conf", "port = 8080\n", "0600", "33", "33");
    let read = FileReconciler::new(&fake)
        .read(file("port = 80\n", "0640"), &mut Diagnostics::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read.content, "port = 8080\n");
    assert_eq!((read.mode.as_str(), read.owner, read.group), ("0600", 33, 33));
}

#[tokio::test]
async fn test_file_read_none_when_missing() {
    let fake = FakeMachine::new();
    let read = FileReconciler::new(&fake)
        .read(file("x", "0644"), &mut Diagnostics::default())
        .await
        .unwrap();
    assert_eq!(read, None);
}

#[tokio::test]
async fn test_file_update_mode_only_does_not_rewrite() {
    let fake = FakeMachine::new();
    FileReconciler::new(&fake)
        .update(file("x", "0644"), file("x", "0600"), &mut Diagnostics::default())
        .await
        .unwrap();
    assert!(fake.ran("chmod 0600 -- /etc/app.conf"));
    assert!(!fake.ran("write"));
    assert!(!fake.ran("chown"));
}

#[tokio::test]
async fn test_file_update_content_rewrites() {
    let fake = FakeMachine::new();
    FileReconciler::new(&fake)
        .update(file("a", "0644"), file("b", "0644"), &mut Diagnostics::default())
        .await
        .unwrap();
    assert_eq!(fake.text("/etc/app.conf"), "b");
}

#[tokio::test]
async fn test_file_delete_removes_path() {
    let fake = FakeMachine::new();
    fake.put_file("/etc/app.conf", "x", "0644", "0", "0");
    FileReconciler::new(&fake)
        .delete(file("x", "0644"), &mut Diagnostics::default())
        .await
        .unwrap();
    assert!(fake.file("/etc/app.conf").is_none());
}

// ── Line in file ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_line_in_file_appends_and_keeps_attributes() {
    let fake = FakeMachine::new();
    fake.put_file("/etc/hosts", "127.0.0.1 localhost\n", "0644", "0", "0");
    LineInFileReconciler::new(&fake)
        .create(line("10.0.0.5 db", None), &mut Diagnostics::default())
        .await
        .unwrap();
    let written = fake.file("/etc/hosts").unwrap();
    assert_eq!(
        String::from_utf8(written.content).unwrap(),
        "127.0.0.1 localhost\n10.0.0.5 db\n"
    );
    assert_eq!((written.mode.as_str(), written.owner.as_str()), ("0644", "0"));
}

#[tokio::test]
async fn test_line_in_file_regexp_replaces_matching_line() {
    let fake = FakeMachine::new();
    fake.put_file("/etc/hosts", "a\n10.0.0.4 db\nb\n", "0644", "0", "0");
    LineInFileReconciler::new(&fake)
        .create(line("10.0.0.5 db", Some(r"\sdb$")), &mut Diagnostics::default())
        .await
        .unwrap();
    assert_eq!(fake.text("/etc/hosts"), "a\n10.0.0.5 db\nb\n");
}

#[tokio::test]
async fn test_line_in_file_present_line_writes_nothing() {
    let fake = FakeMachine::new();
    fake.put_file("/etc/hosts", "10.0.0.5 db\n", "0644", "0", "0");
    LineInFileReconciler::new(&fake)
        .update(
            line("10.0.0.5 db", None),
            line("10.0.0.5 db", None),
            &mut Diagnostics::default(),
        )
        .await
        .unwrap();
    assert!(!fake.ran("write"));
}

#[tokio::test]
async fn test_line_in_file_requires_existing_file() {
    let fake = FakeMachine::new();
    let err = LineInFileReconciler::new(&fake)
        .create(line("x", None), &mut Diagnostics::default())
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("/etc/hosts"));
}

#[tokio::test]
async fn test_line_in_file_read_none_when_line_removed() {
    let fake = FakeMachine::new();
    fake.put_file("/etc/hosts", "127.0.0.1 localhost\n", "0644", "0", "0");
    let read = LineInFileReconciler::new(&fake)
        .read(line("10.0.0.5 db", None), &mut Diagnostics::default())
        .await
        .unwrap();
    assert_eq!(read, None);
}

#[tokio::test]
async fn test_line_in_file_delete_leaves_content() {
    let fake = FakeMachine::new();
    fake.put_file("/etc/hosts", "10.0.0.5 db\n", "0644", "0", "0");
    LineInFileReconciler::new(&fake)
        .delete(line("10.0.0.5 db", None), &mut Diagnostics::default())
        .await
        .unwrap();
    assert_eq!(fake.text("/etc/hosts"), "10.0.0.5 db\n");
}
