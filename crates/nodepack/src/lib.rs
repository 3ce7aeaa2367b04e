// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

//! nodepack - Node.js provisioning for ephemeral build environments
//!
//! A provisioning run resolves the declared node constraint, installs the
//! runtime, picks a dependency workflow (yarn when a yarn constraint is
//! declared, npm otherwise), installs dependencies against a persistent
//! cache and leaves behind the environment later stages need.
//!
//! The [`Orchestrator`] sequences the run; collaborators (version resolver,
//! archive downloader, package manager commands) are injected so the whole
//! run can be driven from tests.

pub mod cli;
pub mod commands;
pub mod orchestrator;
pub mod reporter;
pub mod tracing;

pub use orchestrator::{Orchestrator, ProvisionReport, Stage};
pub use reporter::Reporter;
