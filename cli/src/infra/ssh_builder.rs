//! SSH session/auth builder.
//!
//! `validate` checks every setting without touching the network, so a bad
//! configuration fails before any connection is attempted. `build` then
//! opens one TCP+SSH connection, verifies the host key, and authenticates
//! with exactly one method: the agent or a private key file.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use rigger_common::ConnectionConfig;
use ssh2::{HashType, Session};

use crate::domain::ConfigError;
use crate::domain::config::{HostKeyPolicy, SshAuth, SshSettings, validate_ssh};
use crate::domain::ssh::fingerprint_from_hash;
use crate::infra::command_runner::DEFAULT_COMMAND_TIMEOUT;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const KEEPALIVE_SECS: u32 = 30;

/// Deadline for any single blocking libssh2 call, in milliseconds. Matches
/// the local backend's per-command limit.
fn session_timeout_ms() -> u32 {
    u32::try_from(DEFAULT_COMMAND_TIMEOUT.as_millis()).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Default)]
pub struct SshSessionBuilder {
    conn: ConnectionConfig,
}

impl SshSessionBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_config(conn: &ConnectionConfig) -> Self {
        Self { conn: conn.clone() }
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.conn.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.conn.port = Some(port);
        self
    }

    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.conn.user = Some(user.into());
        self
    }

    #[must_use]
    pub fn agent_socket(mut self, path: impl Into<String>) -> Self {
        self.conn.agent_socket = Some(path.into());
        self
    }

    #[must_use]
    pub fn private_key(mut self, path: impl Into<String>) -> Self {
        self.conn.private_key = Some(path.into());
        self
    }

    #[must_use]
    pub fn host_key_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.conn.host_key.fingerprint = Some(fingerprint.into());
        self
    }

    #[must_use]
    pub fn insecure_accept_any_host_key(mut self) -> Self {
        self.conn.host_key.insecure_accept_any = true;
        self
    }

    /// Check the settings. No I/O.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` found.
    pub fn validate(&self) -> Result<SshSettings, ConfigError> {
        let active = std::env::var("SSH_AUTH_SOCK").ok();
        validate_ssh(&self.conn, active.as_deref())
    }

    /// Validate, connect, verify the host key, and authenticate.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` before any I/O for invalid settings, or an
    /// error if dialing, the handshake, host key verification, or
    /// authentication fails.
    pub async fn build(self) -> Result<Session> {
        let settings = self.validate()?;
        tokio::task::spawn_blocking(move || connect(&settings))
            .await
            .context("SSH connect task failed")?
    }
}

fn dial(host: &str, port: u16) -> Result<Session> {
    let address = format!("{host}:{port}");
    let addr = address
        .to_socket_addrs()
        .with_context(|| format!("resolving {address}"))?
        .next()
        .with_context(|| format!("{address} resolved to no addresses"))?;
    let tcp = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
        .with_context(|| format!("connecting to {address}"))?;

    let mut session = Session::new().context("creating SSH session")?;
    session.set_tcp_stream(tcp);
    session
        .handshake()
        .with_context(|| format!("SSH handshake with {address}"))?;
    Ok(session)
}

/// The server's host key fingerprint.
fn fingerprint(session: &Session) -> Result<String> {
    session
        .host_key_hash(HashType::Sha256)
        .map(fingerprint_from_hash)
        .context("server presented no host key")
}

fn verify_host_key(session: &Session, policy: &HostKeyPolicy, address: &str) -> Result<()> {
    match policy {
        HostKeyPolicy::AcceptAny => {
            tracing::warn!(%address, "host key verification disabled");
            Ok(())
        }
        HostKeyPolicy::Pinned(expected) => {
            let observed = fingerprint(session)?;
            if &observed != expected {
                bail!(
                    "host key mismatch for {address}: expected {expected}, got {observed}; \
                     refusing to connect"
                );
            }
            Ok(())
        }
    }
}

fn authenticate(session: &Session, user: &str, auth: &SshAuth) -> Result<()> {
    match auth {
        SshAuth::KeyFile(path) => {
            if !path.is_file() {
                bail!("cannot read private key {}", path.display());
            }
            session
                .userauth_pubkey_file(user, None, path, None)
                .with_context(|| format!("authenticating as {user} with {}", path.display()))?;
        }
        SshAuth::Agent(socket) => {
            let mut agent = session.agent().context("initializing SSH agent")?;
            agent
                .connect()
                .with_context(|| format!("connecting to SSH agent at {}", socket.display()))?;
            agent.list_identities().context("listing agent identities")?;
            let identities = agent.identities().context("reading agent identities")?;
            if identities.is_empty() {
                bail!("SSH agent at {} holds no keys", socket.display());
            }
            let accepted = identities
                .iter()
                .any(|identity| agent.userauth(user, identity).is_ok());
            let _ = agent.disconnect();
            if !accepted {
                bail!("no agent key was accepted for {user}");
            }
        }
    }
    if !session.authenticated() {
        bail!("SSH authentication failed for {user}");
    }
    Ok(())
}

fn connect(settings: &SshSettings) -> Result<Session> {
    let address = settings.address();
    let session = dial(&settings.host, settings.port)?;
    verify_host_key(&session, &settings.host_key, &address)?;
    authenticate(&session, &settings.user, &settings.auth)?;
    session.set_keepalive(true, KEEPALIVE_SECS);
    session.set_timeout(session_timeout_ms());
    tracing::info!(%address, user = %settings.user, "connected");
    Ok(session)
}

/// Connect just far enough to read the server's host key fingerprint.
///
/// # Errors
///
/// Returns an error if the host cannot be reached or the handshake fails.
pub async fn probe_host_key(host: String, port: u16) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let session = dial(&host, port)?;
        fingerprint(&session)
    })
    .await
    .context("SSH probe task failed")?
}
