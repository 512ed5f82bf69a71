//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use rigger_common::ProviderConfig;

use crate::domain::{Cmd, FileInfo, MachineError};

// ── Machine Access Port ───────────────────────────────────────────────────────

/// Uniform access to a target machine, local or remote.
///
/// Every method fails with a [`MachineError`] so callers can tell a non-zero
/// exit ([`MachineError::Exit`]) or a missing file
/// ([`MachineError::FileNotFound`]) from a transport failure. Nothing here
/// retries.
#[allow(async_fn_in_trait)]
pub trait MachineAccess {
    /// Run a command to completion and return its combined stdout+stderr.
    async fn run_command(&self, cmd: &Cmd) -> Result<String, MachineError>;

    /// Write `content` to `path`, then apply owner, group, and mode in that
    /// order. A failure part way through leaves the earlier steps applied.
    async fn write_file(
        &self,
        path: &str,
        mode: &str,
        owner: &str,
        group: &str,
        content: &[u8],
    ) -> Result<(), MachineError>;

    /// Read content and metadata of `path`.
    async fn read_file(&self, path: &str) -> Result<FileInfo, MachineError>;

    /// Copy a local file to `remote` with a fixed `0644` mode.
    async fn copy_file(&self, local: &Path, remote: &str) -> Result<(), MachineError>;
}

// ── Content Hashing Port ──────────────────────────────────────────────────────

/// Abstracts image tarball hashing so reconcilers can be tested without
/// real archives.
pub trait ImageHasher {
    /// Content hash of the image tarball at `path`, as `sha256:<hex>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not an image archive.
    fn content_hash(&self, path: &Path) -> Result<String>;
}

// ── Configuration Port ────────────────────────────────────────────────────────

/// Abstracts loading the provider configuration file.
pub trait ConfigStore {
    /// Load the config, or the default when the file does not exist.
    fn load(&self) -> Result<ProviderConfig>;
    /// Location of the config file.
    fn path(&self) -> Result<PathBuf>;
}
