//! Error types for the nodepack-hooks crate

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for nodepack-hooks operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {message}")]
    #[diagnostic(code(nodepack_hooks::config::invalid))]
    Configuration {
        /// The error message describing the configuration issue
        message: String,
    },

    /// I/O error with path context
    #[error("I/O error during {operation}: {source}")]
    #[diagnostic(code(nodepack_hooks::io::error))]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// The path where the I/O error occurred, if applicable
        path: Option<Box<std::path::Path>>,
        /// Description of the operation that failed
        operation: String,
    },

    /// Process execution error
    #[error("Process execution failed: {message}")]
    #[diagnostic(code(nodepack_hooks::process))]
    Process {
        /// The error message describing the process failure
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

    /// Create a process execution error
    pub fn process(message: impl Into<String>) -> Self {
        Self::Process {
            message: message.into(),
        }
    }
}

/// Result type for nodepack-hooks operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::configuration("hook path must be relative").to_string(),
            "Configuration error: hook path must be relative"
        );
        assert_eq!(
            Error::process("permission denied").to_string(),
            "Process execution failed: permission denied"
        );

        let io = Error::io(
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            Some(PathBuf::from("/build/bin/post_compile")),
            "chmod",
        );
        assert_eq!(io.to_string(), "I/O error during chmod: gone");
    }
}
