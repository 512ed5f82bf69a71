//! Application layer: port trait definitions and use-case orchestration.
//!
//! This module depends only on `crate::domain`, never on `crate::infra`,
//! `crate::commands`, or `crate::output`.

pub mod ports;
pub mod reconciler;
pub mod registry;
pub mod services;

pub use ports::{ConfigStore, ImageHasher, MachineAccess};
pub use reconciler::{Diagnostics, Reconciler};
pub use registry::{Operation, REGISTRY, ResourceKind, Response, dispatch};
