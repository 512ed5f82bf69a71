//! "Ensure a line is present" over file content.

use regex::Regex;

/// Return the new content if `line` has to be added or substituted, `None`
/// when the content already satisfies it.
///
/// With `matcher`, the first matching line is replaced in place (or `line` is
/// appended if nothing matches). Without it, `line` is appended unless an
/// identical line already exists. All other lines are left untouched.
#[must_use]
pub fn ensure_line(content: &str, line: &str, matcher: Option<&Regex>) -> Option<String> {
    let mut lines = split_lines(content);

    if let Some(idx) = matcher.and_then(|re| lines.iter().position(|(body, _)| re.is_match(body))) {
        if lines[idx].0 == line {
            return None;
        }
        lines[idx].0 = line;
        return Some(join(&lines));
    }

    if lines.iter().any(|(body, _)| *body == line) {
        return None;
    }
    let eol = line_ending(content);
    if let Some(last) = lines.last_mut()
        && last.1.is_empty()
    {
        last.1 = eol;
    }
    lines.push((line, eol));
    Some(join(&lines))
}

/// Whether `line` appears verbatim in `content`.
#[must_use]
pub fn contains_line(content: &str, line: &str) -> bool {
    content.lines().any(|l| l == line)
}

/// Split `content` into `(line, terminator)` pairs. The terminator is the
/// line's own `\r\n` or `\n`, or empty for a final unterminated line.
#[must_use]
pub fn split_lines(content: &str) -> Vec<(&str, &str)> {
    content
        .split_inclusive('\n')
        .map(|raw| {
            if let Some(body) = raw.strip_suffix("\r\n") {
                (body, "\r\n")
            } else if let Some(body) = raw.strip_suffix('\n') {
                (body, "\n")
            } else {
                (raw, "")
            }
        })
        .collect()
}

/// Line ending for new lines: CRLF when the first line of `content` uses it.
#[must_use]
pub fn line_ending(content: &str) -> &'static str {
    match content.find('\n') {
        Some(i) if content[..i].ends_with('\r') => "\r\n",
        _ => "\n",
    }
}

fn join(lines: &[(&str, &str)]) -> String {
    lines.iter().flat_map(|(body, eol)| [*body, *eol]).collect()
}
