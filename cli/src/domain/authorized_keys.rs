//! Parsing and editing of `authorized_keys` content.
//!
//! Entries are compared by algorithm and key material only; options and
//! comments never make two keys distinct. Edits keep every untouched line
//! byte for byte, line endings included.

use crate::domain::line_in_file::{line_ending, split_lines};

/// A parsed `authorized_keys` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    /// Leading options (e.g. `no-pty`), if any.
    pub options: Option<String>,
    pub algorithm: String,
    pub material: String,
    pub comment: Option<String>,
}

impl KeyEntry {
    #[must_use]
    pub fn same_key(&self, other: &KeyEntry) -> bool {
        self.algorithm == other.algorithm && self.material == other.material
    }
}

fn is_algorithm(token: &str) -> bool {
    token.starts_with("ssh-") || token.starts_with("ecdsa-") || token.starts_with("sk-")
}

/// Parse one line. Blank lines, comments, and lines without a recognizable
/// `<algorithm> <material>` pair return `None`.
#[must_use]
pub fn parse_entry(line: &str) -> Option<KeyEntry> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let idx = tokens.iter().position(|t| is_algorithm(t))?;
    let material = tokens.get(idx + 1)?;
    let comment = tokens[idx + 2..].join(" ");
    Some(KeyEntry {
        options: (idx > 0).then(|| tokens[..idx].join(" ")),
        algorithm: tokens[idx].to_string(),
        material: (*material).to_string(),
        comment: (!comment.is_empty()).then_some(comment),
    })
}

/// Format a new entry line (no trailing newline).
#[must_use]
pub fn format_entry(key: &str, comment: Option<&str>) -> String {
    match comment.filter(|c| !c.is_empty()) {
        Some(c) => format!("{} {c}", key.trim()),
        None => key.trim().to_string(),
    }
}

/// Find the entry for `key` in `content`.
#[must_use]
pub fn find_entry(content: &str, key: &str) -> Option<KeyEntry> {
    let wanted = parse_entry(key)?;
    content
        .lines()
        .filter_map(parse_entry)
        .find(|e| e.same_key(&wanted))
}

/// Outcome of trying to append an entry.
#[derive(Debug, PartialEq, Eq)]
pub enum Append {
    Added(String),
    AlreadyPresent,
    InvalidKey,
}

/// Append `key` to `content` unless the same key is already present.
#[must_use]
pub fn append_entry(content: &str, key: &str, comment: Option<&str>) -> Append {
    if parse_entry(key).is_none() {
        return Append::InvalidKey;
    }
    if find_entry(content, key).is_some() {
        return Append::AlreadyPresent;
    }
    let eol = line_ending(content);
    let mut out = content.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push_str(eol);
    }
    out.push_str(&format_entry(key, comment));
    out.push_str(eol);
    Append::Added(out)
}

/// Remove every line holding `key`. Returns `None` if nothing matched.
#[must_use]
pub fn remove_entry(content: &str, key: &str) -> Option<String> {
    let wanted = parse_entry(key)?;
    let mut removed = false;
    let mut out = String::with_capacity(content.len());
    for raw in content.split_inclusive('\n') {
        if parse_entry(raw).is_some_and(|e| e.same_key(&wanted)) {
            removed = true;
        } else {
            out.push_str(raw);
        }
    }
    removed.then_some(out)
}

/// Rewrite the comment on the line holding `key`, preserving all other lines
/// and that line's options. Returns `None` if the key is absent.
#[must_use]
pub fn set_comment(content: &str, key: &str, comment: Option<&str>) -> Option<String> {
    let wanted = parse_entry(key)?;
    let mut found = false;
    let mut out = String::with_capacity(content.len());
    for (line, eol) in split_lines(content) {
        match parse_entry(line) {
            Some(e) if !found && e.same_key(&wanted) => {
                found = true;
                let body = format_entry(&format!("{} {}", e.algorithm, e.material), comment);
                if let Some(opts) = e.options {
                    out.push_str(&opts);
                    out.push(' ');
                }
                out.push_str(&body);
            }
            _ => out.push_str(line),
        }
        out.push_str(eol);
    }
    found.then_some(out)
}
