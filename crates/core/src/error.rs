//! Error types for nodepack operations

use miette::Diagnostic;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a version constraint could not be turned into an installable version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionFailure {
    /// No published version satisfies the constraint.
    NoMatch,
    /// The constraint is not a valid semver range.
    Invalid,
    /// The resolver kept failing for reasons unrelated to the constraint.
    Unknown,
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatch => write!(f, "no matching version"),
            Self::Invalid => write!(f, "invalid version"),
            Self::Unknown => write!(f, "unknown error"),
        }
    }
}

/// Main error type for nodepack operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {message}")]
    #[diagnostic(code(nodepack_core::config::invalid))]
    Configuration {
        /// The error message describing the configuration issue
        message: String,
    },

    /// I/O error with path context
    #[error("I/O error during {operation}: {source}")]
    #[diagnostic(code(nodepack_core::io::error))]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// The path where the I/O error occurred, if applicable
        path: Option<Box<Path>>,
        /// Description of the operation that failed
        operation: String,
    },

    /// A tool version could not be resolved
    #[error("{message}")]
    #[diagnostic(code(nodepack_core::resolution))]
    Resolution {
        /// Tool being resolved (node, yarn, npm)
        tool: String,
        /// The constraint as the user wrote it
        constraint: String,
        /// Failure classification
        kind: ResolutionFailure,
        /// User-facing diagnostic line
        message: String,
    },

    /// A runtime archive could not be downloaded or unpacked
    #[error("Unable to download {tool}: {message}")]
    #[diagnostic(code(nodepack_core::download))]
    Download {
        /// Tool whose archive failed
        tool: String,
        /// What went wrong
        message: String,
    },

    /// An install command (npm, yarn) exited unsuccessfully
    #[error("`{command}` failed ({status})")]
    #[diagnostic(code(nodepack_core::install))]
    InstallCommand {
        /// The command line that was run
        command: String,
        /// Exit status description
        status: String,
        /// Combined stdout and stderr of the command
        output: String,
    },

    /// The post-install hook failed
    #[error("Post-install hook {path} failed: {message}")]
    #[diagnostic(code(nodepack_core::hook))]
    Hook {
        /// Path of the hook script
        path: PathBuf,
        /// Failure detail
        message: String,
    },

    /// Host platform is not supported
    #[error("Unsupported platform: {message}")]
    #[diagnostic(code(nodepack_core::platform))]
    Platform {
        /// Description of the unsupported component
        message: String,
    },
}

impl Error {
    /// Create a configuration error with a message
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an I/O error with context
    pub fn io(source: std::io::Error, path: Option<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: path.map(PathBuf::into_boxed_path),
            operation: operation.into(),
        }
    }

    /// Create a resolution error
    pub fn resolution(
        tool: impl Into<String>,
        constraint: impl Into<String>,
        kind: ResolutionFailure,
        message: impl Into<String>,
    ) -> Self {
        Self::Resolution {
            tool: tool.into(),
            constraint: constraint.into(),
            kind,
            message: message.into(),
        }
    }

    /// Create a download error
    pub fn download(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Download {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create an install command error from the process exit code
    ///
    /// `code` is `None` when the process was terminated by a signal.
    pub fn install_command(
        command: impl Into<String>,
        code: Option<i32>,
        output: impl Into<String>,
    ) -> Self {
        let status =
            code.map_or_else(|| "terminated by signal".to_string(), |c| format!("exit code {c}"));
        Self::InstallCommand {
            command: command.into(),
            status,
            output: output.into(),
        }
    }

    /// Create an install command error for a command that could not be spawned
    pub fn spawn_failed(command: impl Into<String>, source: &std::io::Error) -> Self {
        Self::InstallCommand {
            command: command.into(),
            status: "not started".to_string(),
            output: source.to_string(),
        }
    }

    /// Create a hook error
    pub fn hook(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Hook {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a platform error
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform {
            message: message.into(),
        }
    }
}

/// Result type for nodepack operations
pub type Result<T> = std::result::Result<T, Error>;
