//! Post-install hook execution for nodepack
//!
//! A project may ship an executable script (by default `bin/post_compile`)
//! that runs once dependency installation has finished. This crate finds
//! that script, makes it executable and runs it inside the build directory
//! with the provisioned tool environment.
//!
//! Hooks only run after every provisioning step succeeded, so a failing
//! hook is reported to the caller as a failed build.

mod error;
mod executor;
mod types;

pub use error::{Error, Result};
pub use executor::{discover, execute_hook};
pub use types::{HookResult, PostInstallHook};
