//! Apt package batch reconciler.

use std::collections::HashSet;

use anyhow::{Context, Result};
use rigger_common::{AptPackage, AptPackages};

use crate::application::ports::MachineAccess;
use crate::application::reconciler::{Diagnostics, Reconciler, invalid};
use crate::domain::apt::{
    DPKG_QUERY_FORMAT, PackagePlan, apt_get, observe_packages, parse_installed, plan_packages,
};
use crate::domain::{Cmd, ConfigError};

pub struct AptPackagesReconciler<'a, M> {
    machine: &'a M,
}

impl<'a, M: MachineAccess> AptPackagesReconciler<'a, M> {
    pub fn new(machine: &'a M) -> Self {
        Self { machine }
    }

    async fn installed(&self) -> Result<HashSet<String>> {
        let out = self
            .machine
            .run_command(&Cmd::new("dpkg-query").args(["-W", "-f", DPKG_QUERY_FORMAT]))
            .await
            .context("listing installed packages")?;
        Ok(parse_installed(&out))
    }

    async fn converge(&self, prior: &[AptPackage], desired: &[AptPackage]) -> Result<()> {
        let installed = self.installed().await?;
        let plan = plan_packages(prior, desired, &installed);
        if plan.is_empty() {
            tracing::debug!("packages already converged");
            return Ok(());
        }
        self.apply(plan).await
    }

    async fn apply(&self, plan: PackagePlan) -> Result<()> {
        if !plan.install.is_empty() {
            tracing::info!(packages = ?plan.install, "installing");
            self.machine
                .run_command(&apt_get("install").arg("--").args(&plan.install))
                .await
                .with_context(|| format!("installing {}", plan.install.join(" ")))?;
        }
        if !plan.remove.is_empty() {
            tracing::info!(packages = ?plan.remove, "removing");
            self.machine
                .run_command(&apt_get("remove").arg("--").args(&plan.remove))
                .await
                .with_context(|| format!("removing {}", plan.remove.join(" ")))?;
            self.machine
                .run_command(&apt_get("autoremove"))
                .await
                .context("removing orphaned dependencies")?;
        }
        Ok(())
    }
}

impl<M: MachineAccess> Reconciler for AptPackagesReconciler<'_, M> {
    type Model = AptPackages;

    fn validate(&self, model: &AptPackages) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for p in &model.packages {
            if p.name.is_empty()
                || p.name.starts_with('-')
                || p.name.chars().any(char::is_whitespace)
            {
                return Err(invalid::<AptPackages>(format!(
                    "{:?} is not a valid package name",
                    p.name
                )));
            }
            if !seen.insert(p.name.as_str()) {
                return Err(invalid::<AptPackages>(format!(
                    "package {} is declared more than once",
                    p.name
                )));
            }
        }
        Ok(())
    }

    async fn create(&self, desired: AptPackages, _diags: &mut Diagnostics) -> Result<AptPackages> {
        self.converge(&[], &desired.packages).await?;
        Ok(desired)
    }

    async fn read(
        &self,
        tracked: AptPackages,
        _diags: &mut Diagnostics,
    ) -> Result<Option<AptPackages>> {
        let installed = self.installed().await?;
        Ok(Some(AptPackages {
            packages: observe_packages(&tracked.packages, &installed),
        }))
    }

    async fn update(
        &self,
        prior: AptPackages,
        desired: AptPackages,
        _diags: &mut Diagnostics,
    ) -> Result<AptPackages> {
        self.converge(&prior.packages, &desired.packages).await?;
        Ok(desired)
    }

    /// Removes the packages this declaration installed.
    async fn delete(&self, tracked: AptPackages, _diags: &mut Diagnostics) -> Result<()> {
        self.converge(&tracked.packages, &[]).await
    }
}
