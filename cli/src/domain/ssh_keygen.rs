//! `ssh-keygen` invocation and regeneration rules for managed key pairs.

use rigger_common::{KeyType, SshKey};

use crate::domain::command::Cmd;

/// Path of the public half of the key pair at `path`.
#[must_use]
pub fn public_key_path(path: &str) -> String {
    format!("{path}.pub")
}

/// Build the key generation command. The size flag is only passed to
/// algorithms with a variable key length (RSA and DSA).
#[must_use]
pub fn keygen_cmd(key: &SshKey) -> Cmd {
    let mut cmd = Cmd::privileged("ssh-keygen")
        .args(["-q", "-t", key.key_type.as_str()]);
    if let Some(size) = key.key_size.filter(|_| takes_size(key.key_type)) {
        cmd = cmd.arg("-b").arg(size.to_string());
    }
    cmd.args(["-N", "", "-C", ""]).arg("-f").arg(key.path.as_str())
}

fn takes_size(key_type: KeyType) -> bool {
    matches!(key_type, KeyType::Rsa | KeyType::Dsa)
}

/// Whether `public_key` is of the algorithm `key_type` generates.
#[must_use]
pub fn public_key_matches(key_type: KeyType, public_key: &str) -> bool {
    let prefix = match key_type {
        KeyType::Rsa => "ssh-rsa ",
        KeyType::Ed25519 => "ssh-ed25519 ",
        KeyType::Ecdsa => "ecdsa-sha2-",
        KeyType::Dsa => "ssh-dss ",
    };
    public_key.trim_start().starts_with(prefix)
}

/// `chown` argument for optional owner and group ids.
#[must_use]
pub fn ownership_spec(owner: Option<u32>, group: Option<u32>) -> Option<String> {
    match (owner, group) {
        (Some(o), Some(g)) => Some(format!("{o}:{g}")),
        (Some(o), None) => Some(o.to_string()),
        (None, Some(g)) => Some(format!(":{g}")),
        (None, None) => None,
    }
}

/// Whether moving from `prior` to `desired` needs a fresh key pair.
#[must_use]
pub fn requires_regeneration(prior: &SshKey, desired: &SshKey) -> bool {
    prior.path != desired.path
        || prior.key_type != desired.key_type
        || prior.key_size != desired.key_size
}
