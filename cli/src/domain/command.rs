//! Structured command construction.
//!
//! Commands are built as argument vectors. The only place an argv becomes a
//! shell string is [`Cmd::render`], used by transports whose exec primitive
//! takes a single command line (SSH).

use std::fmt;

/// A program invocation with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
    privileged: bool,
}

impl Cmd {
    /// A command that runs as the connecting user.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            privileged: false,
        }
    }

    /// A command that needs root. Backends with sudo enabled prefix it with `sudo -n`.
    pub fn privileged(program: impl Into<String>) -> Self {
        Self {
            privileged: true,
            ..Self::new(program)
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    /// Full argument vector, including the `sudo -n` prefix when applicable.
    #[must_use]
    pub fn argv(&self, sudo: bool) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 3);
        if sudo && self.privileged {
            argv.push("sudo".to_string());
            argv.push("-n".to_string());
        }
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// POSIX shell rendering of [`Cmd::argv`], every word quoted as needed.
    #[must_use]
    pub fn render(&self, sudo: bool) -> String {
        self.argv(sudo)
            .iter()
            .map(|w| shell_quote(w))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

/// Quote a word for a POSIX shell. Words made only of safe characters are
/// returned unchanged; everything else is wrapped in single quotes.
#[must_use]
pub fn shell_quote(word: &str) -> String {
    if !word.is_empty() && word.chars().all(is_shell_safe) {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', "'\\''"))
}

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':' | '=' | '@' | '%' | '+' | ',')
}
