//! Shared types for the rigger provisioner: resource models exchanged with the
//! orchestrator, diagnostics, and provider connection settings.

pub mod config;
pub mod diagnostics;
pub mod resources;

pub use config::{ConnectionConfig, HostKeyConfig, PrivilegeConfig, ProviderConfig};
pub use diagnostics::{Diagnostic, Severity};
pub use resources::*;
