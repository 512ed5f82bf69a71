//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;
use rigger_common::Severity;

use crate::application::registry::{REGISTRY, Response};
use crate::output::OutputContext;

/// Renders results as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the outcome of a lifecycle call: status line, diagnostics,
    /// then the resulting state.
    pub fn render_response(&self, kind: &str, op: &str, response: &Response) {
        if response.has_errors() {
            self.ctx.error(&format!("{kind} {op} failed"));
        } else if response.removed {
            self.ctx.warn(&format!("{kind} is absent on the target"));
        } else {
            self.ctx.success(&format!("{kind} {op} complete"));
        }

        for d in &response.diagnostics {
            let line = match &d.detail {
                Some(detail) => format!("{}: {detail}", d.summary),
                None => d.summary.clone(),
            };
            match d.severity {
                Severity::Error => self.ctx.error(&line),
                Severity::Warning => self.ctx.warn(&line),
            }
        }

        if self.ctx.quiet {
            return;
        }
        if let Some(serde_json::Value::Object(fields)) = &response.state {
            println!();
            self.ctx.header("State:");
            for (key, value) in fields {
                let value = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                self.ctx.kv(&format!("{key}:"), &value);
            }
        }
    }

    /// Render the registered resource kinds.
    pub fn render_kinds(&self) {
        self.ctx.header("Resource kinds:");
        let width = REGISTRY.iter().map(|k| k.name().len()).max().unwrap_or(0);
        for kind in REGISTRY {
            if !self.ctx.quiet {
                println!(
                    "  {:<width$}  {}",
                    kind.name(),
                    kind.description().style(self.ctx.styles.dim)
                );
            }
        }
    }

    pub fn render_host_key(&self, address: &str, fingerprint: &str) {
        self.ctx.kv("Host:", address);
        self.ctx.kv("Fingerprint:", fingerprint);
        self.ctx.info(&format!(
            "Pin it with --host-key-fingerprint {fingerprint} or connection.host_key.fingerprint"
        ));
    }

    pub fn render_version(&self, version: &str) {
        if !self.ctx.quiet {
            println!("rigger {version}");
        }
    }
}
