//! Shared helpers for the user and group reconcilers.

use anyhow::{Context, Result};

use crate::application::ports::MachineAccess;
use crate::domain::Cmd;

/// Full contents of a name service database (`passwd` or `group`).
pub(crate) async fn database(machine: &impl MachineAccess, db: &str) -> Result<String> {
    machine
        .run_command(&Cmd::new("getent").arg(db))
        .await
        .with_context(|| format!("reading {db} database"))
}

/// Reject names the account tools would misparse.
pub(crate) fn check_account_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name must not be empty".to_string());
    }
    if name.starts_with('-') || name.contains(':') || name.chars().any(char::is_whitespace) {
        return Err(format!("{name:?} is not a valid account name"));
    }
    Ok(())
}
