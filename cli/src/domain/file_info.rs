//! File content plus ownership and permission metadata.

use crate::domain::error::ConfigError;

/// What `read_file` returns: raw content and `stat`-style metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub content: Vec<u8>,
    /// Four-digit octal permission string, e.g. `"0644"`.
    pub mode: String,
    /// Numeric uid as a string.
    pub owner: String,
    /// Numeric gid as a string.
    pub group: String,
}

impl FileInfo {
    /// Content decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// Output format passed to `stat -c` to read metadata.
pub const STAT_FORMAT: &str = "%a %u %g %F";

/// Metadata parsed from one line of `stat -c` [`STAT_FORMAT`] output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatLine {
    pub mode: String,
    pub owner: String,
    pub group: String,
    pub is_dir: bool,
}

/// Parse `"<mode> <uid> <gid> <file type>"`.
#[must_use]
pub fn parse_stat_line(line: &str) -> Option<StatLine> {
    let mut parts = line.trim().splitn(4, ' ');
    let mode = normalize_mode(parts.next()?).ok()?;
    let owner = parts.next()?.to_string();
    let group = parts.next()?.to_string();
    let kind = parts.next().unwrap_or_default();
    Some(StatLine {
        mode,
        owner,
        group,
        is_dir: kind == "directory",
    })
}

/// Normalize an octal permission string to four digits (`"644"` → `"0644"`).
///
/// # Errors
///
/// Returns `ConfigError::InvalidMode` if the value is not 3 or 4 octal digits.
pub fn normalize_mode(mode: &str) -> Result<String, ConfigError> {
    let mode = mode.trim();
    let valid = (3..=4).contains(&mode.len()) && mode.chars().all(|c| ('0'..='7').contains(&c));
    if !valid {
        return Err(ConfigError::InvalidMode(mode.to_string()));
    }
    Ok(format!("{mode:0>4}"))
}

/// Format raw permission bits as a four-digit octal string.
#[must_use]
pub fn mode_string(bits: u32) -> String {
    format!("{:04o}", bits & 0o7777)
}
