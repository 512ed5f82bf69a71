//! `authorized_keys` entry reconciler.

use std::path::Path;

use anyhow::{Context, Result, bail};
use rigger_common::SshAuthorizedKey;

use crate::application::ports::MachineAccess;
use crate::application::reconciler::{Diagnostics, Reconciler, invalid};
use crate::application::services::files::{check_path, stat_path};
use crate::domain::authorized_keys::{
    Append, append_entry, find_entry, parse_entry, remove_entry, set_comment,
};
use crate::domain::{ConfigError, FileInfo};

/// Mode of an `authorized_keys` file this reconciler creates.
const NEW_FILE_MODE: &str = "0600";

pub struct SshAuthorizedKeyReconciler<'a, M> {
    machine: &'a M,
}

impl<'a, M: MachineAccess> SshAuthorizedKeyReconciler<'a, M> {
    pub fn new(machine: &'a M) -> Self {
        Self { machine }
    }

    async fn load(&self, path: &str) -> Result<Option<FileInfo>> {
        match self.machine.read_file(path).await {
            Ok(info) => Ok(Some(info)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {path}")),
        }
    }

    /// An empty file owned like its parent directory, for a file that does not
    /// exist yet.
    async fn fresh(&self, path: &str) -> Result<FileInfo> {
        let parent = Path::new(path)
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .with_context(|| format!("{path} has no parent directory"))?;
        let stat = stat_path(self.machine, &parent)
            .await?
            .with_context(|| format!("directory {parent} does not exist"))?;
        Ok(FileInfo {
            content: Vec::new(),
            mode: NEW_FILE_MODE.to_string(),
            owner: stat.owner,
            group: stat.group,
        })
    }

    async fn store(&self, path: &str, info: &FileInfo, content: &str) -> Result<()> {
        self.machine
            .write_file(path, &info.mode, &info.owner, &info.group, content.as_bytes())
            .await
            .with_context(|| format!("writing {path}"))
    }

    async fn add(&self, entry: &SshAuthorizedKey) -> Result<()> {
        let info = match self.load(&entry.path).await? {
            Some(info) => info,
            None => self.fresh(&entry.path).await?,
        };
        match append_entry(&info.text(), &entry.key, entry.comment.as_deref()) {
            Append::Added(content) => self.store(&entry.path, &info, &content).await,
            Append::AlreadyPresent => bail!("key is already present in {}", entry.path),
            Append::InvalidKey => bail!("not a public key: {}", entry.key),
        }
    }

    async fn remove(&self, entry: &SshAuthorizedKey) -> Result<()> {
        let Some(info) = self.load(&entry.path).await? else {
            return Ok(());
        };
        match remove_entry(&info.text(), &entry.key) {
            Some(content) => self.store(&entry.path, &info, &content).await,
            None => Ok(()),
        }
    }
}

impl<M: MachineAccess> Reconciler for SshAuthorizedKeyReconciler<'_, M> {
    type Model = SshAuthorizedKey;

    fn validate(&self, model: &SshAuthorizedKey) -> Result<(), ConfigError> {
        check_path(&model.path).map_err(invalid::<SshAuthorizedKey>)?;
        match parse_entry(&model.key) {
            Some(e) if e.options.is_none() && e.comment.is_none() => {}
            _ => {
                return Err(invalid::<SshAuthorizedKey>(
                    "key must be \"<algorithm> <base64>\" without options or comment",
                ));
            }
        }
        if model.comment.as_deref().is_some_and(|c| c.contains('\n')) {
            return Err(invalid::<SshAuthorizedKey>("comment must be a single line"));
        }
        Ok(())
    }

    async fn create(
        &self,
        desired: SshAuthorizedKey,
        _diags: &mut Diagnostics,
    ) -> Result<SshAuthorizedKey> {
        self.add(&desired).await?;
        Ok(desired)
    }

    async fn read(
        &self,
        tracked: SshAuthorizedKey,
        _diags: &mut Diagnostics,
    ) -> Result<Option<SshAuthorizedKey>> {
        let Some(info) = self.load(&tracked.path).await? else {
            return Ok(None);
        };
        Ok(find_entry(&info.text(), &tracked.key).map(|e| SshAuthorizedKey {
            comment: e.comment,
            ..tracked
        }))
    }

    async fn update(
        &self,
        prior: SshAuthorizedKey,
        desired: SshAuthorizedKey,
        _diags: &mut Diagnostics,
    ) -> Result<SshAuthorizedKey> {
        if prior.path != desired.path || prior.key != desired.key {
            self.remove(&prior).await?;
            self.add(&desired).await?;
        } else if prior.comment != desired.comment {
            let info = self
                .load(&desired.path)
                .await?
                .with_context(|| format!("{} no longer exists", desired.path))?;
            match set_comment(&info.text(), &desired.key, desired.comment.as_deref()) {
                Some(content) => self.store(&desired.path, &info, &content).await?,
                None => self.add(&desired).await?,
            }
        }
        Ok(desired)
    }

    async fn delete(&self, tracked: SshAuthorizedKey, _diags: &mut Diagnostics) -> Result<()> {
        self.remove(&tracked).await
    }
}
