//! Resolver backends.
//!
//! The resolver itself is an external program shipped per host OS. The
//! [`VersionResolverBackend`] trait hides which program runs so the
//! classification and retry logic never branch on the platform.

use async_trait::async_trait;
use nodepack_core::{Os, Platform};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::trace;

/// Raw answer from one resolver invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOutput {
    /// Whether the resolver reported success.
    pub success: bool,
    /// First line of stdout, trimmed, or of stderr when stdout is empty.
    pub line: String,
}

impl ResolverOutput {
    /// A successful answer.
    pub fn ok(line: impl Into<String>) -> Self {
        Self {
            success: true,
            line: line.into(),
        }
    }

    /// A failed answer.
    pub fn failed(line: impl Into<String>) -> Self {
        Self {
            success: false,
            line: line.into(),
        }
    }
}

/// Something that can answer "which version of `tool` satisfies `range`".
#[async_trait]
pub trait VersionResolverBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Query once. An `Err` means the query could not be made at all.
    async fn query(&self, tool: &str, range: &str) -> std::io::Result<ResolverOutput>;
}

/// Backend that runs the platform's `resolve-version-<os>` binary.
#[derive(Debug, Clone)]
pub struct ResolveBinaryBackend {
    program: PathBuf,
    name: &'static str,
}

impl ResolveBinaryBackend {
    /// Use the resolver binary for `platform` inside `vendor_dir`.
    #[must_use]
    pub fn for_platform(platform: Platform, vendor_dir: &Path) -> Self {
        let name = match platform.os {
            Os::Linux => "resolve-version-linux",
            Os::Darwin => "resolve-version-darwin",
        };
        Self {
            program: vendor_dir.join(name),
            name,
        }
    }

    /// Use an explicit resolver binary.
    #[must_use]
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            name: "resolve-version",
        }
    }

    /// Path of the program that will be run.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl VersionResolverBackend for ResolveBinaryBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn query(&self, tool: &str, range: &str) -> std::io::Result<ResolverOutput> {
        let output = Command::new(&self.program)
            .arg(tool)
            .arg(range)
            .stdin(Stdio::null())
            .output()
            .await?;

        let line = first_line(&output.stdout)
            .or_else(|| first_line(&output.stderr))
            .unwrap_or_default();
        trace!(program = %self.program.display(), %tool, %range, %line, "Resolver answered");

        Ok(ResolverOutput {
            success: output.status.success(),
            line,
        })
    }
}

fn first_line(bytes: &[u8]) -> Option<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodepack_core::Arch;

    #[test]
    fn test_backend_per_platform() {
        let vendor = Path::new("/bp/vendor");
        let linux = ResolveBinaryBackend::for_platform(Platform::new(Os::Linux, Arch::X64), vendor);
        assert_eq!(linux.program(), Path::new("/bp/vendor/resolve-version-linux"));

        let darwin =
            ResolveBinaryBackend::for_platform(Platform::new(Os::Darwin, Arch::Arm64), vendor);
        assert_eq!(darwin.name(), "resolve-version-darwin");
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let backend = ResolveBinaryBackend::with_program("/nonexistent/resolve-version");
        assert!(backend.query("node", "14.x").await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_program_with_tool_and_range() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("resolve-version");
        std::fs::write(
            &script,
            "#!/bin/sh\necho \"$1:$2 https://example/x.tar.gz\"\nexit 0\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let backend = ResolveBinaryBackend::with_program(&script);
        let out = backend.query("yarn", "1.x").await.unwrap();
        assert_eq!(out, ResolverOutput::ok("yarn:1.x https://example/x.tar.gz"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_exit_is_reported() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("resolve-version");
        std::fs::write(&script, "#!/bin/sh\necho 'No result'\nexit 1\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let backend = ResolveBinaryBackend::with_program(&script);
        let out = backend.query("node", "99.x").await.unwrap();
        assert_eq!(out, ResolverOutput::failed("No result"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stderr_answer_when_stdout_is_empty() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("resolve-version");
        std::fs::write(
            &script,
            "#!/bin/sh\necho 'Could not parse: not-a-range' >&2\nexit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let backend = ResolveBinaryBackend::with_program(&script);
        let out = backend.query("node", "not-a-range").await.unwrap();
        assert_eq!(out, ResolverOutput::failed("Could not parse: not-a-range"));
    }

    #[test]
    fn test_first_line_skips_blank_output() {
        assert_eq!(first_line(b"\n  \n 14.21.3 url\nmore"), Some("14.21.3 url".to_string()));
        assert_eq!(first_line(b""), None);
    }
}
