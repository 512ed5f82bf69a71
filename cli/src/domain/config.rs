//! Provider connection settings: flag overrides and validation.
//!
//! Pure functions only. Everything here runs before any connection is made.

use std::path::{Path, PathBuf};

use rigger_common::{ConnectionConfig, ProviderConfig};

use crate::domain::error::ConfigError;
use crate::domain::ssh::normalize_fingerprint;

pub const DEFAULT_CONFIG_DIR: &str = ".rigger";
pub const CONFIG_FILE_NAME: &str = "config.yaml";

// ── Overrides ────────────────────────────────────────────────────────────────

/// Connection values given on the command line. Each one that is set wins
/// over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub local: bool,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub private_key: Option<String>,
    pub agent_socket: Option<String>,
    pub host_key_fingerprint: Option<String>,
    pub insecure_accept_any_host_key: bool,
    pub sudo: Option<bool>,
}

/// Merge command-line overrides into a loaded config.
#[must_use]
pub fn apply_overrides(mut config: ProviderConfig, o: ConnectionOverrides) -> ProviderConfig {
    let conn = &mut config.connection;
    conn.local |= o.local;
    replace(&mut conn.host, o.host);
    replace(&mut conn.port, o.port);
    replace(&mut conn.user, o.user);
    replace(&mut conn.private_key, o.private_key);
    replace(&mut conn.agent_socket, o.agent_socket);
    replace(&mut conn.host_key.fingerprint, o.host_key_fingerprint);
    conn.host_key.insecure_accept_any |= o.insecure_accept_any_host_key;
    replace(&mut config.privilege.sudo, o.sudo);
    config
}

fn replace<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Whether privileged commands get a `sudo -n` prefix. Defaults on for SSH
/// and off for the local backend.
#[must_use]
pub fn sudo_enabled(config: &ProviderConfig) -> bool {
    config.privilege.sudo.unwrap_or(!config.connection.local)
}

// ── SSH settings ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SshAuth {
    /// Use the keys held by the agent listening on this socket.
    Agent(PathBuf),
    /// Read the private key from this file.
    KeyFile(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKeyPolicy {
    /// Accept only a server whose key hashes to this `SHA256:` fingerprint.
    Pinned(String),
    AcceptAny,
}

/// Fully validated SSH connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub auth: SshAuth,
    pub host_key: HostKeyPolicy,
}

impl SshSettings {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Validate the SSH connection settings.
///
/// `active_agent` is the current `SSH_AUTH_SOCK`. libssh2 only talks to that
/// socket, so a configured agent socket must match it.
///
/// # Errors
///
/// Returns the first `ConfigError` found: a missing host/port/user, zero or
/// two auth methods, a relative key or socket path, an agent socket that is
/// not the active one, or a host key that is neither pinned nor explicitly
/// trusted.
pub fn validate_ssh(
    conn: &ConnectionConfig,
    active_agent: Option<&str>,
) -> Result<SshSettings, ConfigError> {
    let host = required(conn.host.as_deref(), "host")?;
    let user = required(conn.user.as_deref(), "user")?;
    let port = conn.port.ok_or(ConfigError::Missing("port"))?;

    let auth = match (non_empty(conn.agent_socket.as_deref()), non_empty(conn.private_key.as_deref())) {
        (Some(_), Some(_)) => return Err(ConfigError::ConflictingAuth),
        (None, None) => return Err(ConfigError::NoAuth),
        (None, Some(key)) => {
            if !Path::new(key).is_absolute() {
                return Err(ConfigError::RelativeKeyPath(key.to_string()));
            }
            SshAuth::KeyFile(PathBuf::from(key))
        }
        (Some(socket), None) => {
            if !Path::new(socket).is_absolute() {
                return Err(ConfigError::RelativeAgentSocket(socket.to_string()));
            }
            let active = active_agent.unwrap_or_default();
            if active != socket {
                return Err(ConfigError::AgentSocketMismatch {
                    configured: socket.to_string(),
                    active: active.to_string(),
                });
            }
            SshAuth::Agent(PathBuf::from(socket))
        }
    };

    let host_key = match non_empty(conn.host_key.fingerprint.as_deref()) {
        Some(fp) => HostKeyPolicy::Pinned(normalize_fingerprint(fp)?),
        None if conn.host_key.insecure_accept_any => HostKeyPolicy::AcceptAny,
        None => return Err(ConfigError::HostKeyNotPinned),
    };

    Ok(SshSettings {
        host: host.to_string(),
        port,
        user: user.to_string(),
        auth,
        host_key,
    })
}

fn required<'a>(value: Option<&'a str>, name: &'static str) -> Result<&'a str, ConfigError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
