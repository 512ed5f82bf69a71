use serde::{Deserialize, Serialize};

/// Provider configuration stored in `~/.rigger/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ProviderConfig {
    /// How to reach the target machine.
    pub connection: ConnectionConfig,
    /// Privilege escalation settings.
    pub privilege: PrivilegeConfig,
}

/// SSH connection parameters. All of `host`, `port` and `user` are required
/// for a remote target; exactly one of `private_key` / `agent_socket` must be set.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Run against the local machine instead of dialing SSH.
    pub local: bool,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    /// Absolute path to a private key file.
    pub private_key: Option<String>,
    /// Path to an ssh-agent socket.
    pub agent_socket: Option<String>,
    pub host_key: HostKeyConfig,
}

/// Host key verification settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct HostKeyConfig {
    /// Pinned `SHA256:<base64>` fingerprint of the server host key.
    pub fingerprint: Option<String>,
    /// Skip verification entirely. Must be opted into explicitly.
    pub insecure_accept_any: bool,
}

/// Whether privileged commands are wrapped in `sudo -n`.
/// Unset means the backend default: on for SSH, off for local.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct PrivilegeConfig {
    pub sudo: Option<bool>,
}
