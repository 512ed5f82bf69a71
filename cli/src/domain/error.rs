//! Typed domain error enums.
//!
//! `MachineError` is what every machine access backend returns, so callers can
//! tell a non-zero exit or a missing file apart from a broken transport.
//! `ConfigError` covers validation that happens before any I/O.

use thiserror::Error;

// ── Machine access errors ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum MachineError {
    /// The command ran and exited non-zero. `output` is combined stdout+stderr.
    #[error("command exited with status {code}: {}", output.trim())]
    Exit { code: i32, output: String },

    /// The target path does not exist.
    #[error("{path}: no such file or directory")]
    FileNotFound { path: String },

    /// Session, channel, or connection failure.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl MachineError {
    pub fn transport(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Transport(format!("{context}: {err}"))
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Exit code, if the command ran to completion.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exit { code, .. } => Some(*code),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound { .. })
    }

    /// True when a command failed because its target path is missing.
    #[must_use]
    pub fn mentions_missing_path(&self) -> bool {
        match self {
            Self::FileNotFound { .. } => true,
            Self::Exit { output, .. } => is_missing_path_message(output),
            _ => false,
        }
    }
}

/// Whether tool output reports a missing file or directory.
#[must_use]
pub fn is_missing_path_message(output: &str) -> bool {
    output.contains("No such file")
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Validation errors raised before any connection or command is attempted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required connection setting: {0}")]
    Missing(&'static str),

    #[error("both agent_socket and private_key are set; configure exactly one")]
    ConflictingAuth,

    #[error("no authentication method configured; set agent_socket or private_key")]
    NoAuth,

    #[error("private key path must be absolute: {0}")]
    RelativeKeyPath(String),

    #[error("agent socket path must be absolute: {0}")]
    RelativeAgentSocket(String),

    #[error(
        "agent socket {configured} does not match SSH_AUTH_SOCK ({active}); \
         export SSH_AUTH_SOCK={configured} before running"
    )]
    AgentSocketMismatch { configured: String, active: String },

    #[error(
        "host key is not pinned; set connection.host_key.fingerprint \
         (see `rigger host-key`) or opt out with insecure_accept_any"
    )]
    HostKeyNotPinned,

    #[error("invalid host key fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("invalid file mode {0:?}: expected 3 or 4 octal digits")]
    InvalidMode(String),

    #[error("invalid {kind} input: {message}")]
    InvalidInput { kind: String, message: String },
}
