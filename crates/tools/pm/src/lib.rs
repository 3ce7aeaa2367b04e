//! npm and yarn command execution.
//!
//! Every command is described as an [`Invocation`] and handed to a
//! [`CommandRunner`]. Production code uses [`SystemRunner`]; tests swap in
//! the recording runner from the `testing` module and assert on the exact
//! command lines.

mod manager;
mod runner;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use manager::{NpmSetup, PackageManager};
pub use runner::{CommandOutput, CommandRunner, Invocation, SystemRunner};
