//! Shared helpers for reconcilers that manage filesystem paths.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::MachineAccess;
use crate::domain::Cmd;
use crate::domain::file_info::{STAT_FORMAT, StatLine, normalize_mode, parse_stat_line};

/// `stat` the path, returning `None` when it does not exist.
pub(crate) async fn stat_path(machine: &impl MachineAccess, path: &str) -> Result<Option<StatLine>> {
    let cmd = Cmd::privileged("stat")
        .arg("-c")
        .arg(STAT_FORMAT)
        .arg("--")
        .arg(path);
    match machine.run_command(&cmd).await {
        Ok(out) => parse_stat_line(&out)
            .map(Some)
            .with_context(|| format!("unexpected stat output for {path}: {}", out.trim())),
        Err(e) if e.mentions_missing_path() => Ok(None),
        Err(e) => Err(e).with_context(|| format!("inspecting {path}")),
    }
}

pub(crate) async fn chmod(machine: &impl MachineAccess, path: &str, mode: &str) -> Result<()> {
    machine
        .run_command(&Cmd::privileged("chmod").arg(mode).arg("--").arg(path))
        .await
        .with_context(|| format!("setting mode {mode} on {path}"))?;
    Ok(())
}

pub(crate) async fn chown(
    machine: &impl MachineAccess,
    path: &str,
    owner: u32,
    group: u32,
) -> Result<()> {
    machine
        .run_command(
            &Cmd::privileged("chown")
                .arg(format!("{owner}:{group}"))
                .arg("--")
                .arg(path),
        )
        .await
        .with_context(|| format!("setting owner {owner}:{group} on {path}"))?;
    Ok(())
}

/// `rm -f` the paths. Missing paths are not an error.
pub(crate) async fn remove_files(machine: &impl MachineAccess, paths: &[&str]) -> Result<()> {
    machine
        .run_command(&Cmd::privileged("rm").arg("-f").arg("--").args(paths.iter().copied()))
        .await
        .with_context(|| format!("removing {}", paths.join(", ")))?;
    Ok(())
}

/// Require an absolute path.
pub(crate) fn check_path(path: &str) -> Result<(), String> {
    if Path::new(path).is_absolute() {
        Ok(())
    } else {
        Err(format!("path must be absolute: {path:?}"))
    }
}

pub(crate) fn check_mode(mode: &str) -> Result<(), String> {
    normalize_mode(mode).map(drop).map_err(|e| e.to_string())
}

/// Parse a numeric uid/gid reported by `stat`, keeping `fallback` for anything
/// else.
pub(crate) fn numeric_id(value: &str, fallback: u32) -> u32 {
    value.trim().parse().unwrap_or(fallback)
}
