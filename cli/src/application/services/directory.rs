//! Directory reconciler.

use anyhow::{Context, Result, bail};
use rigger_common::Directory;

use crate::application::ports::MachineAccess;
use crate::application::reconciler::{Diagnostics, Reconciler, invalid};
use crate::application::services::files::{
    check_mode, check_path, chmod, chown, numeric_id, stat_path,
};
use crate::domain::file_info::normalize_mode;
use crate::domain::{Cmd, ConfigError};

pub struct DirectoryReconciler<'a, M> {
    machine: &'a M,
}

impl<'a, M: MachineAccess> DirectoryReconciler<'a, M> {
    pub fn new(machine: &'a M) -> Self {
        Self { machine }
    }
}

impl<M: MachineAccess> Reconciler for DirectoryReconciler<'_, M> {
    type Model = Directory;

    fn validate(&self, model: &Directory) -> Result<(), ConfigError> {
        check_path(&model.path)
            .and_then(|()| check_mode(&model.mode))
            .map_err(invalid::<Directory>)
    }

    async fn create(&self, desired: Directory, _diags: &mut Diagnostics) -> Result<Directory> {
        let mode = normalize_mode(&desired.mode)?;
        self.machine
            .run_command(
                &Cmd::privileged("install")
                    .args(["-d", "-m", mode.as_str()])
                    .arg("-o")
                    .arg(desired.owner.to_string())
                    .arg("-g")
                    .arg(desired.group.to_string())
                    .arg("--")
                    .arg(&desired.path),
            )
            .await
            .with_context(|| format!("creating directory {}", desired.path))?;
        Ok(Directory { mode, ..desired })
    }

    async fn read(&self, tracked: Directory, _diags: &mut Diagnostics) -> Result<Option<Directory>> {
        let Some(stat) = stat_path(self.machine, &tracked.path).await? else {
            return Ok(None);
        };
        if !stat.is_dir {
            tracing::debug!(path = %tracked.path, "path exists but is not a directory");
            return Ok(None);
        }
        Ok(Some(Directory {
            mode: stat.mode,
            owner: numeric_id(&stat.owner, tracked.owner),
            group: numeric_id(&stat.group, tracked.group),
            ..tracked
        }))
    }

    async fn update(
        &self,
        prior: Directory,
        desired: Directory,
        _diags: &mut Diagnostics,
    ) -> Result<Directory> {
        if prior.path != desired.path {
            bail!(
                "directory path cannot change in place ({} -> {}); replace the resource",
                prior.path,
                desired.path
            );
        }
        let mode = normalize_mode(&desired.mode)?;
        if (prior.owner, prior.group) != (desired.owner, desired.group) {
            chown(self.machine, &desired.path, desired.owner, desired.group).await?;
        }
        if normalize_mode(&prior.mode).ok().as_deref() != Some(mode.as_str()) {
            chmod(self.machine, &desired.path, &mode).await?;
        }
        Ok(Directory { mode, ..desired })
    }

    async fn delete(&self, tracked: Directory, _diags: &mut Diagnostics) -> Result<()> {
        if !tracked.remove_on_delete {
            tracing::info!(path = %tracked.path, "leaving directory in place");
            return Ok(());
        }
        self.machine
            .run_command(&Cmd::privileged("rm").args(["-rf", "--"]).arg(&tracked.path))
            .await
            .with_context(|| format!("removing directory {}", tracked.path))?;
        Ok(())
    }
}
