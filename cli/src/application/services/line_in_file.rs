//! Line-in-file reconciler.

use anyhow::{Context, Result};
use regex::Regex;
use rigger_common::LineInFile;

use crate::application::ports::MachineAccess;
use crate::application::reconciler::{Diagnostics, Reconciler, invalid};
use crate::application::services::files::check_path;
use crate::domain::ConfigError;
use crate::domain::line_in_file::{contains_line, ensure_line};

pub struct LineInFileReconciler<'a, M> {
    machine: &'a M,
}

impl<'a, M: MachineAccess> LineInFileReconciler<'a, M> {
    pub fn new(machine: &'a M) -> Self {
        Self { machine }
    }

    async fn apply(&self, desired: &LineInFile) -> Result<()> {
        let matcher = desired
            .regexp
            .as_deref()
            .map(Regex::new)
            .transpose()
            .context("compiling regexp")?;
        let info = self
            .machine
            .read_file(&desired.path)
            .await
            .with_context(|| format!("reading {}", desired.path))?;

        let Some(updated) = ensure_line(&info.text(), &desired.line, matcher.as_ref()) else {
            tracing::debug!(path = %desired.path, "line already present");
            return Ok(());
        };
        // Rewrite with the file's existing attributes.
        self.machine
            .write_file(
                &desired.path,
                &info.mode,
                &info.owner,
                &info.group,
                updated.as_bytes(),
            )
            .await
            .with_context(|| format!("writing {}", desired.path))
    }
}

impl<M: MachineAccess> Reconciler for LineInFileReconciler<'_, M> {
    type Model = LineInFile;

    fn validate(&self, model: &LineInFile) -> Result<(), ConfigError> {
        check_path(&model.path).map_err(invalid::<LineInFile>)?;
        if model.line.contains('\n') {
            return Err(invalid::<LineInFile>("line must not contain a newline"));
        }
        if let Some(re) = &model.regexp {
            Regex::new(re).map_err(|e| invalid::<LineInFile>(format!("bad regexp: {e}")))?;
        }
        Ok(())
    }

    async fn create(&self, desired: LineInFile, _diags: &mut Diagnostics) -> Result<LineInFile> {
        self.apply(&desired).await?;
        Ok(desired)
    }

    async fn read(
        &self,
        tracked: LineInFile,
        _diags: &mut Diagnostics,
    ) -> Result<Option<LineInFile>> {
        match self.machine.read_file(&tracked.path).await {
            Ok(info) if contains_line(&info.text(), &tracked.line) => Ok(Some(tracked)),
            Ok(_) => Ok(None),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", tracked.path)),
        }
    }

    async fn update(
        &self,
        _prior: LineInFile,
        desired: LineInFile,
        _diags: &mut Diagnostics,
    ) -> Result<LineInFile> {
        self.apply(&desired).await?;
        Ok(desired)
    }

    /// The line stays in the file.
    async fn delete(&self, _tracked: LineInFile, _diags: &mut Diagnostics) -> Result<()> {
        Ok(())
    }
}
