//! SSH host key fingerprints in OpenSSH `SHA256:<base64>` form.

use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;

use crate::domain::error::ConfigError;

const PREFIX: &str = "SHA256:";

/// Render a raw SHA-256 host key hash the way `ssh-keygen -l` prints it.
#[must_use]
pub fn fingerprint_from_hash(hash: &[u8]) -> String {
    format!("{PREFIX}{}", STANDARD_NO_PAD.encode(hash))
}

/// Validate a configured fingerprint and return its canonical form.
///
/// Accepts an optional trailing `=` padding and surrounding whitespace.
///
/// # Errors
///
/// Returns `ConfigError::InvalidFingerprint` if the value is not a `SHA256:`
/// fingerprint of a 32-byte digest.
pub fn normalize_fingerprint(value: &str) -> Result<String, ConfigError> {
    let invalid = || ConfigError::InvalidFingerprint(value.to_string());
    let body = value.trim().strip_prefix(PREFIX).ok_or_else(invalid)?;
    let bytes = STANDARD_NO_PAD
        .decode(body.trim_end_matches('='))
        .map_err(|_| invalid())?;
    if bytes.len() != 32 {
        return Err(invalid());
    }
    Ok(fingerprint_from_hash(&bytes))
}
