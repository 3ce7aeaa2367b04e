//! Type definitions for the post-install hook

use std::path::{Path, PathBuf};

/// A discovered hook script ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostInstallHook {
    /// Absolute path of the script
    pub path: PathBuf,
    /// Working directory for execution (the build directory)
    pub dir: PathBuf,
}

impl PostInstallHook {
    /// Create a hook for `path`, executed in `dir`
    pub fn new(path: impl Into<PathBuf>, dir: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            dir: dir.into(),
        }
    }

    /// Script path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Result of executing the hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookResult {
    /// Whether the script exited with status zero
    pub success: bool,
    /// Exit code, `None` when terminated by a signal
    pub exit_status: Option<i32>,
    /// Standard output captured from the script
    pub stdout: String,
    /// Standard error captured from the script
    pub stderr: String,
    /// Duration of execution in milliseconds
    pub duration_ms: u64,
}

impl HookResult {
    /// Human-readable description of a failed run
    #[must_use]
    pub fn failure_message(&self) -> String {
        let status = self
            .exit_status
            .map_or_else(|| "terminated by signal".to_string(), |c| format!("exit code {c}"));
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            status
        } else {
            format!("{status}: {stderr}")
        }
    }
}
