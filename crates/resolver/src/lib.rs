//! Version resolution for nodepack.
//!
//! Turns a `(tool, constraint)` pair into a concrete version and download
//! location by asking an external resolver, classifying its one-line
//! answer, and retrying transient failures with a linear backoff.
//!
//! # Example
//!
//! ```ignore
//! use nodepack_resolver::{ResolveBinaryBackend, RetryPolicy, VersionResolver};
//!
//! let backend = ResolveBinaryBackend::for_platform(Platform::current()?, vendor_dir);
//! let resolver = VersionResolver::new(Arc::new(backend), RetryPolicy::default());
//! let node = resolver.resolve_or_fail("node", &"14.x".into()).await?;
//! ```

mod backend;
mod outcome;
mod resolver;
mod retry;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backend::{ResolveBinaryBackend, ResolverOutput, VersionResolverBackend};
pub use outcome::{ResolutionOutcome, ResolvedVersion, classify};
pub use resolver::{VersionResolver, display_name, failure_message};
pub use retry::RetryPolicy;
