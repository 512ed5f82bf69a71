//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, the
//! local and SSH machine backends, config loading, and archive hashing.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod command_runner;
pub mod config;
pub mod image;
pub mod local;
pub mod machine;
pub mod ssh;
pub mod ssh_builder;
