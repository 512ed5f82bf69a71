//! The lifecycle contract every resource kind implements.

use anyhow::Result;
use rigger_common::{Diagnostic, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::ConfigError;

/// Diagnostics collected while a single lifecycle call runs.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Record a non-fatal problem, e.g. a best-effort cleanup that failed.
    pub fn warn(&mut self, summary: impl Into<String>, detail: impl std::fmt::Display) {
        let summary = summary.into();
        let detail = detail.to_string();
        tracing::warn!(%summary, %detail);
        self.items.push(Diagnostic::warning(summary, detail));
    }

    pub fn error(&mut self, summary: impl Into<String>, detail: impl std::fmt::Display) {
        self.items.push(Diagnostic::error(summary, detail.to_string()));
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.items
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

/// Create/Read/Update/Delete for one resource kind against a target.
///
/// Calls for one instance arrive strictly in order. Read never repairs
/// drift: it reports what the target holds, or `None` when the defining
/// artifact is gone so the orchestrator plans a recreate.
#[allow(async_fn_in_trait)]
pub trait Reconciler {
    type Model: Resource + Serialize + DeserializeOwned;

    /// Check declared values before any I/O. Runs on every model handed in.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidInput` describing the offending field.
    fn validate(&self, _model: &Self::Model) -> Result<(), ConfigError> {
        Ok(())
    }

    async fn create(&self, desired: Self::Model, diags: &mut Diagnostics) -> Result<Self::Model>;

    async fn read(
        &self,
        tracked: Self::Model,
        diags: &mut Diagnostics,
    ) -> Result<Option<Self::Model>>;

    async fn update(
        &self,
        prior: Self::Model,
        desired: Self::Model,
        diags: &mut Diagnostics,
    ) -> Result<Self::Model>;

    async fn delete(&self, tracked: Self::Model, diags: &mut Diagnostics) -> Result<()>;
}

/// Build an input error for kind `R`.
pub fn invalid<R: Resource>(message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidInput {
        kind: R::KIND.to_string(),
        message: message.into(),
    }
}
