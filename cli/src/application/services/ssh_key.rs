//! SSH key pair reconciler.

use anyhow::{Context, Result, bail};
use rigger_common::SshKey;

use crate::application::ports::MachineAccess;
use crate::application::reconciler::{Diagnostics, Reconciler, invalid};
use crate::application::services::files::{check_mode, check_path, chmod, remove_files};
use crate::domain::file_info::normalize_mode;
use crate::domain::ssh_keygen::{
    keygen_cmd, ownership_spec, public_key_matches, public_key_path, requires_regeneration,
};
use crate::domain::{Cmd, ConfigError};

pub struct SshKeyReconciler<'a, M> {
    machine: &'a M,
}

impl<'a, M: MachineAccess> SshKeyReconciler<'a, M> {
    pub fn new(machine: &'a M) -> Self {
        Self { machine }
    }

    async fn read_public_key(&self, path: &str) -> Result<Option<String>> {
        match self.machine.read_file(&public_key_path(path)).await {
            Ok(info) => Ok(Some(info.text().trim().to_string())),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading public key of {path}")),
        }
    }

    /// Generate the pair, or adopt an existing pair of the same type.
    async fn generate(&self, key: &SshKey) -> Result<String> {
        if let Some(existing) = self.read_public_key(&key.path).await? {
            if !public_key_matches(key.key_type, &existing) {
                bail!(
                    "{} already holds a key of a different type; remove it or pick another path",
                    key.path
                );
            }
            tracing::info!(path = %key.path, "adopting existing key pair");
            return Ok(existing);
        }
        // A private key without its public half cannot be adopted, and
        // ssh-keygen will not overwrite it.
        remove_files(self.machine, &[key.path.as_str()])
            .await
            .with_context(|| format!("clearing stale private key at {}", key.path))?;
        self.machine
            .run_command(&keygen_cmd(key))
            .await
            .with_context(|| format!("generating {} key at {}", key.key_type.as_str(), key.path))?;
        self.read_public_key(&key.path)
            .await?
            .with_context(|| format!("ssh-keygen left no public key at {}", public_key_path(&key.path)))
    }

    async fn apply_attributes(&self, key: &SshKey) -> Result<()> {
        if let Some(spec) = ownership_spec(key.owner, key.group) {
            let public = public_key_path(&key.path);
            self.machine
                .run_command(
                    &Cmd::privileged("chown")
                        .arg(&spec)
                        .arg("--")
                        .args([key.path.as_str(), public.as_str()]),
                )
                .await
                .with_context(|| format!("setting owner {spec} on {}", key.path))?;
        }
        if let Some(mode) = &key.mode {
            chmod(self.machine, &key.path, &normalize_mode(mode)?).await?;
        }
        Ok(())
    }

    async fn remove_pair(&self, path: &str) -> Result<()> {
        let public = public_key_path(path);
        remove_files(self.machine, &[path, public.as_str()]).await
    }
}

impl<M: MachineAccess> Reconciler for SshKeyReconciler<'_, M> {
    type Model = SshKey;

    fn validate(&self, model: &SshKey) -> Result<(), ConfigError> {
        check_path(&model.path).map_err(invalid::<SshKey>)?;
        if let Some(mode) = &model.mode {
            check_mode(mode).map_err(invalid::<SshKey>)?;
        }
        if model.key_size == Some(0) {
            return Err(invalid::<SshKey>("key_size must be positive"));
        }
        Ok(())
    }

    async fn create(&self, desired: SshKey, _diags: &mut Diagnostics) -> Result<SshKey> {
        let public_key = self.generate(&desired).await?;
        self.apply_attributes(&desired).await?;
        Ok(SshKey {
            public_key: Some(public_key),
            mode: desired.mode.as_deref().map(normalize_mode).transpose()?,
            ..desired
        })
    }

    async fn read(&self, tracked: SshKey, _diags: &mut Diagnostics) -> Result<Option<SshKey>> {
        Ok(self
            .read_public_key(&tracked.path)
            .await?
            .map(|public_key| SshKey {
                public_key: Some(public_key),
                ..tracked
            }))
    }

    async fn update(&self, prior: SshKey, desired: SshKey, diags: &mut Diagnostics) -> Result<SshKey> {
        let public_key = if requires_regeneration(&prior, &desired) {
            match self.remove_pair(&prior.path).await {
                // Left in place, the old pair would be adopted instead of replaced.
                Err(e) if prior.path == desired.path => return Err(e),
                Err(e) => diags.warn(
                    format!("could not remove old key files at {}", prior.path),
                    format!("{e:#}"),
                ),
                Ok(()) => {}
            }
            self.generate(&desired).await?
        } else {
            match prior.public_key {
                Some(k) => k,
                None => self.generate(&desired).await?,
            }
        };
        self.apply_attributes(&desired).await?;
        Ok(SshKey {
            public_key: Some(public_key),
            mode: desired.mode.as_deref().map(normalize_mode).transpose()?,
            ..desired
        })
    }

    async fn delete(&self, tracked: SshKey, _diags: &mut Diagnostics) -> Result<()> {
        self.remove_pair(&tracked.path).await
    }
}
