//! Terminal output for lifecycle responses.
//!
//! Human output goes to stdout and is silenced by `--quiet`, except errors,
//! which always reach stderr. Spinners draw on stderr and only on a TTY.

pub mod human;
pub mod json;
pub mod progress;
pub mod styles;

use console::Term;
use owo_colors::{OwoColorize as _, Style};
pub use human::HumanRenderer;
pub use styles::Styles;

pub struct OutputContext {
    pub styles: Styles,
    /// stderr is a terminal, so spinners can draw.
    pub is_tty: bool,
    pub quiet: bool,
}

/// Colors need a terminal on stdout and no opt-out from the flag or `NO_COLOR`.
fn colors_enabled(no_color: bool) -> bool {
    !no_color && std::env::var_os("NO_COLOR").is_none() && Term::stdout().is_term()
}

impl OutputContext {
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let mut styles = Styles::default();
        if colors_enabled(no_color) {
            styles.colorize();
        }
        Self {
            styles,
            is_tty: Term::stderr().is_term(),
            quiet,
        }
    }

    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    fn marked(&self, mark: &str, style: Style, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", mark.style(style));
        }
    }

    /// A completed lifecycle call.
    pub fn success(&self, msg: &str) {
        self.marked("✓", self.styles.success, msg);
    }

    /// A warning diagnostic or a skipped cleanup step.
    pub fn warn(&self, msg: &str) {
        self.marked("⚠", self.styles.warning, msg);
    }

    /// An error diagnostic. Printed even with `--quiet`.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    pub fn info(&self, msg: &str) {
        self.marked("ℹ", self.styles.info, msg);
    }

    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// One attribute of a resource state, name dimmed.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", key.style(self.styles.dim));
        }
    }
}
