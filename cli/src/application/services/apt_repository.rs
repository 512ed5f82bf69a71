//! Apt repository reconciler.
//!
//! A repository is two files named after it: the signing key under
//! `/etc/apt/keyrings` and a one-line source list under
//! `/etc/apt/sources.list.d`. Creating one ends with an index refresh whose
//! output is scanned for failures apt does not report through its exit code.

use anyhow::{Context, Result};
use rigger_common::AptRepository;

use crate::application::ports::MachineAccess;
use crate::application::reconciler::{Diagnostics, Reconciler, invalid};
use crate::application::services::files::remove_files;
use crate::domain::apt::{
    KEYRING_DIR, apt_get, key_path, list_path, parse_codename, parse_sources_url, sources_line,
    update_failure,
};
use crate::domain::{Cmd, ConfigError, MachineError};

const OS_RELEASE: &str = "/etc/os-release";

pub struct AptRepositoryReconciler<'a, M> {
    machine: &'a M,
}

impl<'a, M: MachineAccess> AptRepositoryReconciler<'a, M> {
    pub fn new(machine: &'a M) -> Self {
        Self { machine }
    }

    async fn write_root_file(&self, path: &str, content: &str) -> Result<()> {
        self.machine
            .write_file(path, "0644", "0", "0", content.as_bytes())
            .await
            .with_context(|| format!("writing {path}"))
    }

    async fn architecture(&self) -> Result<String> {
        let out = self
            .machine
            .run_command(&Cmd::new("dpkg").arg("--print-architecture"))
            .await
            .context("detecting target architecture")?;
        Ok(out.trim().to_string())
    }

    async fn codename(&self) -> Result<String> {
        let info = self
            .machine
            .read_file(OS_RELEASE)
            .await
            .with_context(|| format!("reading {OS_RELEASE}"))?;
        parse_codename(&info.text())
            .with_context(|| format!("no release codename in {OS_RELEASE}"))
    }

    /// Refresh the package index. An index that apt could not fetch or verify
    /// becomes an error diagnostic.
    async fn refresh(&self, name: &str, diags: &mut Diagnostics) -> Result<()> {
        let output = match self.machine.run_command(&apt_get("update")).await {
            Ok(out) => out,
            Err(MachineError::Exit { output, .. }) if update_failure(&output).is_some() => output,
            Err(e) => return Err(e).context("refreshing package index"),
        };
        if let Some(line) = update_failure(&output) {
            diags.error(format!("apt repository {name} is unusable"), line);
        }
        Ok(())
    }

    async fn provision(&self, repo: &AptRepository, diags: &mut Diagnostics) -> Result<()> {
        self.machine
            .run_command(&Cmd::privileged("install").args(["-d", "-m", "0755", KEYRING_DIR]))
            .await
            .with_context(|| format!("creating {KEYRING_DIR}"))?;
        self.write_root_file(&key_path(&repo.name), &repo.key).await?;

        let arch = self.architecture().await?;
        let codename = self.codename().await?;
        let line = sources_line(&repo.name, &arch, &codename, &repo.url);
        self.write_root_file(&list_path(&repo.name), &line).await?;

        self.refresh(&repo.name, diags).await
    }

    async fn remove(&self, name: &str) -> Result<()> {
        let (list, key) = (list_path(name), key_path(name));
        remove_files(self.machine, &[list.as_str(), key.as_str()]).await
    }
}

impl<M: MachineAccess> Reconciler for AptRepositoryReconciler<'_, M> {
    type Model = AptRepository;

    fn validate(&self, model: &AptRepository) -> Result<(), ConfigError> {
        let name_ok = !model.name.is_empty()
            && !model.name.starts_with('.')
            && model
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !name_ok {
            return Err(invalid::<AptRepository>(format!(
                "{:?} is not a valid repository name",
                model.name
            )));
        }
        if model.url.trim().is_empty() || model.url.chars().any(char::is_whitespace) {
            return Err(invalid::<AptRepository>("url must be a single non-empty URL"));
        }
        if model.key.trim().is_empty() {
            return Err(invalid::<AptRepository>("key must not be empty"));
        }
        Ok(())
    }

    async fn create(
        &self,
        desired: AptRepository,
        diags: &mut Diagnostics,
    ) -> Result<AptRepository> {
        self.provision(&desired, diags).await?;
        Ok(desired)
    }

    async fn read(
        &self,
        tracked: AptRepository,
        _diags: &mut Diagnostics,
    ) -> Result<Option<AptRepository>> {
        let list = match self.machine.read_file(&list_path(&tracked.name)).await {
            Ok(info) => info.text(),
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e).context("reading source list"),
        };
        let key = match self.machine.read_file(&key_path(&tracked.name)).await {
            Ok(info) => info.text(),
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e).context("reading signing key"),
        };
        Ok(Some(AptRepository {
            url: parse_sources_url(&list).unwrap_or(tracked.url),
            key,
            name: tracked.name,
        }))
    }

    async fn update(
        &self,
        prior: AptRepository,
        desired: AptRepository,
        diags: &mut Diagnostics,
    ) -> Result<AptRepository> {
        if prior == desired {
            return Ok(desired);
        }
        if prior.name != desired.name {
            self.remove(&prior.name)
                .await
                .with_context(|| format!("removing files of renamed repository {}", prior.name))?;
        }
        self.provision(&desired, diags).await?;
        Ok(desired)
    }

    async fn delete(&self, tracked: AptRepository, diags: &mut Diagnostics) -> Result<()> {
        self.remove(&tracked.name).await?;
        if let Err(e) = self.machine.run_command(&apt_get("update")).await {
            diags.warn("package index refresh after repository removal failed", e);
        }
        Ok(())
    }
}
