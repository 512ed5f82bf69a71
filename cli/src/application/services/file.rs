//! File reconciler.

use anyhow::{Context, Result, bail};
use rigger_common::File;

use crate::application::ports::MachineAccess;
use crate::application::reconciler::{Diagnostics, Reconciler, invalid};
use crate::application::services::files::{
    check_mode, check_path, chmod, chown, numeric_id, remove_files,
};
use crate::domain::ConfigError;
use crate::domain::file_info::normalize_mode;

pub struct FileReconciler<'a, M> {
    machine: &'a M,
}

impl<'a, M: MachineAccess> FileReconciler<'a, M> {
    pub fn new(machine: &'a M) -> Self {
        Self { machine }
    }

    async fn write(&self, file: &File, mode: &str) -> Result<()> {
        self.machine
            .write_file(
                &file.path,
                mode,
                &file.owner.to_string(),
                &file.group.to_string(),
                file.content.as_bytes(),
            )
            .await
            .with_context(|| format!("writing {}", file.path))
    }
}

impl<M: MachineAccess> Reconciler for FileReconciler<'_, M> {
    type Model = File;

    fn validate(&self, model: &File) -> Result<(), ConfigError> {
        check_path(&model.path)
            .and_then(|()| check_mode(&model.mode))
            .map_err(invalid::<File>)
    }

    async fn create(&self, desired: File, _diags: &mut Diagnostics) -> Result<File> {
        let mode = normalize_mode(&desired.mode)?;
        self.write(&desired, &mode).await?;
        Ok(File { mode, ..desired })
    }

    async fn read(&self, tracked: File, _diags: &mut Diagnostics) -> Result<Option<File>> {
        let info = match self.machine.read_file(&tracked.path).await {
            Ok(info) => info,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("reading {}", tracked.path)),
        };
        Ok(Some(File {
            content: info.text(),
            owner: numeric_id(&info.owner, tracked.owner),
            group: numeric_id(&info.group, tracked.group),
            mode: info.mode,
            ..tracked
        }))
    }

    async fn update(&self, prior: File, desired: File, _diags: &mut Diagnostics) -> Result<File> {
        if prior.path != desired.path {
            bail!(
                "file path cannot change in place ({} -> {}); replace the resource",
                prior.path,
                desired.path
            );
        }
        let mode = normalize_mode(&desired.mode)?;
        if prior.content != desired.content {
            self.write(&desired, &mode).await?;
        } else {
            if (prior.owner, prior.group) != (desired.owner, desired.group) {
                chown(self.machine, &desired.path, desired.owner, desired.group).await?;
            }
            if normalize_mode(&prior.mode).ok().as_deref() != Some(mode.as_str()) {
                chmod(self.machine, &desired.path, &mode).await?;
            }
        }
        Ok(File { mode, ..desired })
    }

    async fn delete(&self, tracked: File, _diags: &mut Diagnostics) -> Result<()> {
        remove_files(self.machine, &[tracked.path.as_str()]).await
    }
}
