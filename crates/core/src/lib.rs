//! Core types for the nodepack provisioner.
//!
//! This crate holds the vocabulary shared by every other nodepack crate:
//!
//! - [`VersionConstraint`] - a user-declared semver range, possibly unspecified
//! - [`InstallPlan`] - which dependency workflow (yarn or npm) a build uses
//! - [`advisor`] - non-fatal warnings about risky constraints
//! - [`BuildConfig`] - layered configuration (defaults, TOML, env dir)
//! - [`ToolEnv`] - the explicit PATH and variables handed to spawned tools
//! - [`Platform`] - host OS and CPU used to pick a resolver backend
//! - [`Error`] - the error taxonomy for fatal provisioning failures

pub mod advisor;
pub mod config;
pub mod constraint;
pub mod environment;
mod error;
pub mod plan;
pub mod platform;

pub use config::{BuildConfig, Engines, Settings};
pub use constraint::VersionConstraint;
pub use environment::ToolEnv;
pub use error::{Error, ResolutionFailure, Result};
pub use plan::InstallPlan;
pub use platform::{Arch, Os, Platform};
