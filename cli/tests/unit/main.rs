//! Unit tests for rigger CLI
//!
//! Reconcilers run against a scripted in-memory machine, without external I/O.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod apt;
mod dispatch;
mod files;
