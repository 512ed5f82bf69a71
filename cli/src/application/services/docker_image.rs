//! Docker image tarball load reconciler.
//!
//! The tarball path alone does not say whether its content changed, so the
//! tracked state carries a content hash of the image config the archive
//! references. Read compares it against the local file to force a reload.

use std::path::Path;

use anyhow::{Context, Result};
use rigger_common::DockerImageLoad;

use crate::application::ports::{ImageHasher, MachineAccess};
use crate::application::reconciler::{Diagnostics, Reconciler, invalid};
use crate::domain::docker::{inspect_id_cmd, is_missing_image, parse_loaded_image, staging_path};
use crate::domain::{Cmd, ConfigError, MachineError};

pub struct DockerImageLoadReconciler<'a, M, H> {
    machine: &'a M,
    hasher: &'a H,
}

impl<'a, M: MachineAccess, H: ImageHasher> DockerImageLoadReconciler<'a, M, H> {
    pub fn new(machine: &'a M, hasher: &'a H) -> Self {
        Self { machine, hasher }
    }

    async fn load(&self, desired: DockerImageLoad, diags: &mut Diagnostics) -> Result<DockerImageLoad> {
        let local = Path::new(&desired.path);
        let content_hash = self
            .hasher
            .content_hash(local)
            .with_context(|| format!("hashing {}", desired.path))?;

        let staged = staging_path(local);
        self.machine
            .copy_file(local, &staged)
            .await
            .with_context(|| format!("copying {} to {staged}", desired.path))?;

        let loaded = self
            .machine
            .run_command(&Cmd::privileged("docker").args(["load", "-i"]).arg(&staged))
            .await;
        if let Err(e) = self
            .machine
            .run_command(&Cmd::privileged("rm").args(["-f", "--"]).arg(&staged))
            .await
        {
            diags.warn(format!("could not remove staged tarball {staged}"), e);
        }
        let output = loaded.with_context(|| format!("loading {}", desired.path))?;

        let reference = parse_loaded_image(&output)
            .with_context(|| format!("docker load reported no image: {}", output.trim()))?;
        let image_sha = self
            .machine
            .run_command(&inspect_id_cmd(&reference))
            .await
            .with_context(|| format!("inspecting {reference}"))?
            .trim()
            .to_string();
        tracing::info!(%reference, %image_sha, "image loaded");

        Ok(DockerImageLoad {
            image_sha: Some(image_sha),
            content_hash: Some(content_hash),
            ..desired
        })
    }
}

impl<M: MachineAccess, H: ImageHasher> Reconciler for DockerImageLoadReconciler<'_, M, H> {
    type Model = DockerImageLoad;

    fn validate(&self, model: &DockerImageLoad) -> Result<(), ConfigError> {
        if model.path.trim().is_empty() {
            return Err(invalid::<DockerImageLoad>("path must not be empty"));
        }
        Ok(())
    }

    async fn create(
        &self,
        desired: DockerImageLoad,
        diags: &mut Diagnostics,
    ) -> Result<DockerImageLoad> {
        self.load(desired, diags).await
    }

    async fn read(
        &self,
        tracked: DockerImageLoad,
        diags: &mut Diagnostics,
    ) -> Result<Option<DockerImageLoad>> {
        let local = Path::new(&tracked.path);
        if !local.exists() {
            diags.warn(
                format!("image tarball {} no longer exists locally", tracked.path),
                "the image will be reloaded once the file is back",
            );
            return Ok(None);
        }
        let current = self
            .hasher
            .content_hash(local)
            .with_context(|| format!("hashing {}", tracked.path))?;
        if tracked.content_hash.as_deref() != Some(current.as_str()) {
            tracing::info!(path = %tracked.path, "tarball content changed");
            return Ok(None);
        }
        let Some(reference) = tracked.image_sha.clone() else {
            return Ok(None);
        };
        match self.machine.run_command(&inspect_id_cmd(&reference)).await {
            Ok(id) => Ok(Some(DockerImageLoad {
                image_sha: Some(id.trim().to_string()),
                ..tracked
            })),
            Err(MachineError::Exit { output, .. }) if is_missing_image(&output) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("inspecting {reference}")),
        }
    }

    async fn update(
        &self,
        prior: DockerImageLoad,
        desired: DockerImageLoad,
        diags: &mut Diagnostics,
    ) -> Result<DockerImageLoad> {
        let current = self
            .hasher
            .content_hash(Path::new(&desired.path))
            .with_context(|| format!("hashing {}", desired.path))?;
        if prior.path != desired.path || prior.content_hash.as_deref() != Some(current.as_str()) {
            return self.load(desired, diags).await;
        }
        Ok(DockerImageLoad {
            image_sha: prior.image_sha,
            content_hash: prior.content_hash,
            ..desired
        })
    }

    async fn delete(&self, tracked: DockerImageLoad, _diags: &mut Diagnostics) -> Result<()> {
        let Some(image) = tracked.image_sha.filter(|_| tracked.remove_on_delete) else {
            tracing::info!(path = %tracked.path, "leaving image on target");
            return Ok(());
        };
        match self
            .machine
            .run_command(&Cmd::privileged("docker").args(["image", "rm"]).arg(&image))
            .await
        {
            Err(MachineError::Exit { output, .. }) if is_missing_image(&output) => Ok(()),
            r => r.map(drop).with_context(|| format!("removing image {image}")),
        }
    }
}
