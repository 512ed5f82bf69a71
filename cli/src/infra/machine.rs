//! Backend selection and helpers shared by the machine backends.

use std::path::Path;

use anyhow::Result;
use rigger_common::ProviderConfig;
use tokio::sync::OnceCell;

use crate::application::ports::MachineAccess;
use crate::domain::config::sudo_enabled;
use crate::domain::file_info::{STAT_FORMAT, StatLine, parse_stat_line};
use crate::domain::{Cmd, FileInfo, MachineError};
use crate::infra::command_runner::DEFAULT_COMMAND_TIMEOUT;
use crate::infra::local::LocalMachine;
use crate::infra::ssh::SshMachine;
use crate::infra::ssh_builder::SshSessionBuilder;

/// The configured backend.
pub enum Machine {
    Local(LocalMachine),
    Ssh(SshMachine),
}

impl Machine {
    /// Build the backend `config` selects, connecting if it is SSH.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for invalid settings, or an error if the SSH
    /// connection, host key check, or authentication fails.
    pub async fn connect(config: &ProviderConfig) -> Result<Self> {
        let sudo = sudo_enabled(config);
        if config.connection.local {
            tracing::debug!(sudo, "using local backend");
            return Ok(Self::Local(LocalMachine::new(sudo, DEFAULT_COMMAND_TIMEOUT)));
        }
        let session = SshSessionBuilder::from_config(&config.connection)
            .build()
            .await?;
        Ok(Self::Ssh(SshMachine::new(session, sudo)))
    }
}

impl MachineAccess for Machine {
    async fn run_command(&self, cmd: &Cmd) -> Result<String, MachineError> {
        match self {
            Self::Local(m) => m.run_command(cmd).await,
            Self::Ssh(m) => m.run_command(cmd).await,
        }
    }

    async fn write_file(
        &self,
        path: &str,
        mode: &str,
        owner: &str,
        group: &str,
        content: &[u8],
    ) -> Result<(), MachineError> {
        match self {
            Self::Local(m) => m.write_file(path, mode, owner, group, content).await,
            Self::Ssh(m) => m.write_file(path, mode, owner, group, content).await,
        }
    }

    async fn read_file(&self, path: &str) -> Result<FileInfo, MachineError> {
        match self {
            Self::Local(m) => m.read_file(path).await,
            Self::Ssh(m) => m.read_file(path).await,
        }
    }

    async fn copy_file(&self, local: &Path, remote: &str) -> Result<(), MachineError> {
        match self {
            Self::Local(m) => m.copy_file(local, remote).await,
            Self::Ssh(m) => m.copy_file(local, remote).await,
        }
    }
}

/// A backend that connects on first use.
///
/// Inputs are decoded and validated before any machine call, so a call that
/// fails validation never opens a session.
pub struct LazyMachine {
    config: ProviderConfig,
    machine: OnceCell<Machine>,
}

impl LazyMachine {
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            machine: OnceCell::new(),
        }
    }

    /// Whether a backend has been built yet.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.machine.initialized()
    }

    async fn get(&self) -> Result<&Machine, MachineError> {
        self.machine
            .get_or_try_init(|| Machine::connect(&self.config))
            .await
            .map_err(|e| MachineError::Transport(format!("{e:#}")))
    }
}

impl MachineAccess for LazyMachine {
    async fn run_command(&self, cmd: &Cmd) -> Result<String, MachineError> {
        self.get().await?.run_command(cmd).await
    }

    async fn write_file(
        &self,
        path: &str,
        mode: &str,
        owner: &str,
        group: &str,
        content: &[u8],
    ) -> Result<(), MachineError> {
        self.get()
            .await?
            .write_file(path, mode, owner, group, content)
            .await
    }

    async fn read_file(&self, path: &str) -> Result<FileInfo, MachineError> {
        self.get().await?.read_file(path).await
    }

    async fn copy_file(&self, local: &Path, remote: &str) -> Result<(), MachineError> {
        self.get().await?.copy_file(local, remote).await
    }
}

/// Metadata of a regular file via privileged `stat`.
pub(crate) async fn stat_info(
    machine: &impl MachineAccess,
    path: &str,
) -> Result<StatLine, MachineError> {
    stat_result(path, machine.run_command(&stat_cmd(path)).await)
}

pub(crate) fn stat_cmd(path: &str) -> Cmd {
    Cmd::privileged("stat")
        .arg("-c")
        .arg(STAT_FORMAT)
        .arg("--")
        .arg(path)
}

/// Interpret the outcome of `stat_cmd(path)`.
pub(crate) fn stat_result(
    path: &str,
    result: Result<String, MachineError>,
) -> Result<StatLine, MachineError> {
    let out = match result {
        Ok(out) => out,
        Err(e) if e.mentions_missing_path() => {
            return Err(MachineError::FileNotFound {
                path: path.to_string(),
            });
        }
        Err(e) => return Err(e),
    };
    let stat = parse_stat_line(&out).ok_or_else(|| {
        MachineError::Transport(format!("unexpected stat output for {path}: {}", out.trim()))
    })?;
    if stat.is_dir {
        return Err(MachineError::io(
            path,
            std::io::Error::other("is a directory"),
        ));
    }
    Ok(stat)
}
