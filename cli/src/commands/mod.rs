//! Command implementations

pub mod host_key;
pub mod kinds;
pub mod lifecycle;
pub mod version;

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use rigger_common::ProviderConfig;

use crate::application::ports::ConfigStore;
use crate::domain::config::{ConnectionOverrides, apply_overrides};
use crate::infra::config::YamlConfigStore;

/// Connection settings accepted by every command that touches a machine.
/// Each flag wins over the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Provision the machine this command runs on instead of dialing SSH
    #[arg(long, global = true, env = "RIGGER_LOCAL")]
    pub local: bool,

    /// SSH host
    #[arg(long, global = true, env = "RIGGER_HOST")]
    pub host: Option<String>,

    /// SSH port
    #[arg(long, global = true, env = "RIGGER_PORT")]
    pub port: Option<u16>,

    /// SSH user
    #[arg(long, global = true, env = "RIGGER_USER")]
    pub user: Option<String>,

    /// Absolute path to a private key file
    #[arg(long, global = true, env = "RIGGER_PRIVATE_KEY")]
    pub private_key: Option<String>,

    /// Absolute path to the ssh-agent socket (must match SSH_AUTH_SOCK)
    #[arg(long, global = true, env = "RIGGER_AGENT_SOCKET")]
    pub agent_socket: Option<String>,

    /// Pinned server host key, as printed by `rigger host-key`
    #[arg(long, global = true, env = "RIGGER_HOST_KEY_FINGERPRINT")]
    pub host_key_fingerprint: Option<String>,

    /// Skip host key verification
    #[arg(long, global = true, env = "RIGGER_INSECURE_ACCEPT_ANY_HOST_KEY")]
    pub insecure_accept_any_host_key: bool,

    /// Prefix privileged commands with `sudo -n`
    #[arg(long, global = true, env = "RIGGER_SUDO")]
    pub sudo: Option<bool>,

    /// Provider config file (default: ~/.rigger/config.yaml)
    #[arg(long, global = true, env = "RIGGER_CONFIG")]
    pub config: Option<PathBuf>,
}

impl ConnectionArgs {
    fn overrides(&self) -> ConnectionOverrides {
        ConnectionOverrides {
            local: self.local,
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            private_key: self.private_key.clone(),
            agent_socket: self.agent_socket.clone(),
            host_key_fingerprint: self.host_key_fingerprint.clone(),
            insecure_accept_any_host_key: self.insecure_accept_any_host_key,
            sudo: self.sudo,
        }
    }

    /// Load the config file and apply these flags on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn resolve(&self) -> Result<ProviderConfig> {
        let store = YamlConfigStore::new(self.config.clone());
        let config = store.load()?;
        Ok(apply_overrides(config, self.overrides()))
    }
}
