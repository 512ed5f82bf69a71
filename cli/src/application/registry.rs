//! Static registry of resource kinds and the lifecycle dispatch boundary.
//!
//! Requests arrive as JSON values. Each is decoded into the kind's model and
//! validated before the reconciler touches the machine.

use std::fmt;
use std::str::FromStr;

use rigger_common::{
    AptPackages, AptRepository, Diagnostic, Directory, DockerImageLoad, File, Group, LineInFile,
    Resource, SshAuthorizedKey, SshKey, User,
};
use serde::Serialize;
use serde_json::Value;

use crate::application::ports::{ImageHasher, MachineAccess};
use crate::application::reconciler::{Diagnostics, Reconciler};
use crate::application::services::{
    AptPackagesReconciler, AptRepositoryReconciler, DirectoryReconciler,
    DockerImageLoadReconciler, FileReconciler, GroupReconciler, LineInFileReconciler,
    SshAuthorizedKeyReconciler, SshKeyReconciler, UserReconciler,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    User,
    Group,
    Directory,
    File,
    LineInFile,
    AptPackages,
    AptRepository,
    SshKey,
    SshAuthorizedKey,
    DockerImageLoad,
}

/// Every kind, in registration order.
pub const REGISTRY: &[ResourceKind] = &[
    ResourceKind::User,
    ResourceKind::Group,
    ResourceKind::Directory,
    ResourceKind::File,
    ResourceKind::LineInFile,
    ResourceKind::AptPackages,
    ResourceKind::AptRepository,
    ResourceKind::SshKey,
    ResourceKind::SshAuthorizedKey,
    ResourceKind::DockerImageLoad,
];

impl ResourceKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::User => User::KIND,
            Self::Group => Group::KIND,
            Self::Directory => Directory::KIND,
            Self::File => File::KIND,
            Self::LineInFile => LineInFile::KIND,
            Self::AptPackages => AptPackages::KIND,
            Self::AptRepository => AptRepository::KIND,
            Self::SshKey => SshKey::KIND,
            Self::SshAuthorizedKey => SshAuthorizedKey::KIND,
            Self::DockerImageLoad => DockerImageLoad::KIND,
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::User => "local account with supplementary groups",
            Self::Group => "local group",
            Self::Directory => "directory with mode and ownership",
            Self::File => "file with content, mode and ownership",
            Self::LineInFile => "single line kept present in an existing file",
            Self::AptPackages => "batch of apt packages installed or absent",
            Self::AptRepository => "apt source list with its signing key",
            Self::SshKey => "generated SSH key pair",
            Self::SshAuthorizedKey => "entry in an authorized_keys file",
            Self::DockerImageLoad => "docker image loaded from a local tarball",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        REGISTRY
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = REGISTRY.iter().map(|k| k.name()).collect();
                anyhow::anyhow!("unknown resource kind {s:?} (expected one of: {})", valid.join(", "))
            })
    }
}

/// A lifecycle call with its raw JSON inputs.
#[derive(Debug, Clone)]
pub enum Operation {
    Create { desired: Value },
    Read { state: Value },
    Update { prior: Value, desired: Value },
    Delete { state: Value },
}

impl Operation {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Read { .. } => "read",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}

/// What a lifecycle call hands back to the orchestrator.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    /// Resulting state. On failure, the last known state if there was one.
    pub state: Option<Value>,
    /// The artifact is gone; the orchestrator should plan a recreate.
    pub removed: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl Response {
    fn failed(state: Option<Value>, diags: Diagnostics) -> Self {
        Self {
            state,
            removed: false,
            diagnostics: diags.into_vec(),
        }
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Route a lifecycle call to the reconciler for `kind`.
pub async fn dispatch<M: MachineAccess, H: ImageHasher>(
    kind: ResourceKind,
    op: Operation,
    machine: &M,
    hasher: &H,
) -> Response {
    match kind {
        ResourceKind::User => run(&UserReconciler::new(machine), op).await,
        ResourceKind::Group => run(&GroupReconciler::new(machine), op).await,
        ResourceKind::Directory => run(&DirectoryReconciler::new(machine), op).await,
        ResourceKind::File => run(&FileReconciler::new(machine), op).await,
        ResourceKind::LineInFile => run(&LineInFileReconciler::new(machine), op).await,
        ResourceKind::AptPackages => run(&AptPackagesReconciler::new(machine), op).await,
        ResourceKind::AptRepository => run(&AptRepositoryReconciler::new(machine), op).await,
        ResourceKind::SshKey => run(&SshKeyReconciler::new(machine), op).await,
        ResourceKind::SshAuthorizedKey => {
            run(&SshAuthorizedKeyReconciler::new(machine), op).await
        }
        ResourceKind::DockerImageLoad => {
            run(&DockerImageLoadReconciler::new(machine, hasher), op).await
        }
    }
}

enum Outcome<T> {
    Present(T),
    Removed,
}

/// Decode and validate one input, recording an error diagnostic on failure.
fn decode<R: Reconciler>(
    reconciler: &R,
    value: Value,
    role: &str,
    diags: &mut Diagnostics,
) -> Option<R::Model> {
    let kind = <R::Model as Resource>::KIND;
    let model: R::Model = match serde_json::from_value(value) {
        Ok(m) => m,
        Err(e) => {
            diags.error(format!("invalid {role} {kind} value"), e);
            return None;
        }
    };
    if let Err(e) = reconciler.validate(&model) {
        diags.error(format!("invalid {role} {kind} value"), e);
        return None;
    }
    Some(model)
}

async fn run<R: Reconciler>(reconciler: &R, op: Operation) -> Response {
    let kind = <R::Model as Resource>::KIND;
    let op_name = op.name();
    let mut diags = Diagnostics::default();

    let (fallback, result) = match op {
        Operation::Create { desired } => {
            let Some(desired) = decode(reconciler, desired, "desired", &mut diags) else {
                return Response::failed(None, diags);
            };
            tracing::info!(kind, id = %desired.id(), "create");
            let result = reconciler.create(desired, &mut diags).await;
            (None, result.map(Outcome::Present))
        }
        Operation::Read { state } => {
            let Some(tracked) = decode(reconciler, state.clone(), "state", &mut diags) else {
                return Response::failed(Some(state), diags);
            };
            tracing::info!(kind, id = %tracked.id(), "read");
            let result = reconciler.read(tracked, &mut diags).await;
            (
                Some(state),
                result.map(|m| m.map_or(Outcome::Removed, Outcome::Present)),
            )
        }
        Operation::Update { prior, desired } => {
            let Some(prior_model) = decode(reconciler, prior.clone(), "prior", &mut diags) else {
                return Response::failed(Some(prior), diags);
            };
            let Some(desired) = decode(reconciler, desired, "desired", &mut diags) else {
                return Response::failed(Some(prior), diags);
            };
            tracing::info!(kind, id = %desired.id(), "update");
            let result = reconciler.update(prior_model, desired, &mut diags).await;
            (Some(prior), result.map(Outcome::Present))
        }
        Operation::Delete { state } => {
            let Some(tracked) = decode(reconciler, state.clone(), "state", &mut diags) else {
                return Response::failed(Some(state), diags);
            };
            tracing::info!(kind, id = %tracked.id(), "delete");
            let result = reconciler.delete(tracked, &mut diags).await;
            (Some(state), result.map(|()| Outcome::Removed))
        }
    };

    match result {
        Ok(Outcome::Present(model)) => match serde_json::to_value(&model) {
            Ok(state) => Response {
                state: Some(state),
                removed: false,
                diagnostics: diags.into_vec(),
            },
            Err(e) => {
                diags.error(format!("cannot encode {kind} state"), e);
                Response::failed(fallback, diags)
            }
        },
        Ok(Outcome::Removed) => Response {
            state: None,
            removed: true,
            diagnostics: diags.into_vec(),
        },
        Err(e) => {
            tracing::debug!(kind, op = op_name, error = %format!("{e:#}"), "lifecycle call failed");
            diags.error(format!("{kind} {op_name} failed"), format!("{e:#}"));
            Response::failed(fallback, diags)
        }
    }
}
