//! Domain layer: pure logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod accounts;
pub mod apt;
pub mod authorized_keys;
pub mod command;
pub mod config;
pub mod docker;
pub mod error;
pub mod file_info;
pub mod line_in_file;
pub mod ssh;
pub mod ssh_keygen;

pub use command::Cmd;
pub use error::{ConfigError, MachineError};
pub use file_info::FileInfo;
