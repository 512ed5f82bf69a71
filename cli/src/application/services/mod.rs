//! Application services: one reconciler per resource kind.
//!
//! Each service composes domain logic with `MachineAccess` calls. Services
//! import only from `crate::domain` and `crate::application`, never from
//! `crate::infra`, `crate::commands`, or `crate::output`.

mod accounts;
mod files;

pub mod apt_packages;
pub mod apt_repository;
pub mod directory;
pub mod docker_image;
pub mod file;
pub mod group;
pub mod line_in_file;
pub mod ssh_authorized_key;
pub mod ssh_key;
pub mod user;

pub use apt_packages::AptPackagesReconciler;
pub use apt_repository::AptRepositoryReconciler;
pub use directory::DirectoryReconciler;
pub use docker_image::DockerImageLoadReconciler;
pub use file::FileReconciler;
pub use group::GroupReconciler;
pub use line_in_file::LineInFileReconciler;
pub use ssh_authorized_key::SshAuthorizedKeyReconciler;
pub use ssh_key::SshKeyReconciler;
pub use user::UserReconciler;
