//! Error types for archive operations.

use miette::Diagnostic;
use thiserror::Error;

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fetching or unpacking an archive.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The HTTP request failed.
    #[error("Failed to download {url}: {message}")]
    #[diagnostic(code(nodepack_tools_archive::download))]
    DownloadFailed {
        /// The archive URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("Unexpected HTTP status {status} for {url}")]
    #[diagnostic(code(nodepack_tools_archive::http_status))]
    HttpStatus {
        /// The archive URL.
        url: String,
        /// Status code.
        status: u16,
    },

    /// The archive could not be read.
    #[error("Failed to extract archive: {0}")]
    #[diagnostic(code(nodepack_tools_archive::extract))]
    ExtractionFailed(String),

    /// IO error.
    #[error("IO error: {0}")]
    #[diagnostic(code(nodepack_tools_archive::io))]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a download failed error.
    #[must_use]
    pub fn download_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            url: url.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = Error::download_failed("https://example.com/node.tar.gz", "timed out");
        assert_eq!(
            err.code().map(|c| c.to_string()).as_deref(),
            Some("nodepack_tools_archive::download")
        );

        let err = Error::HttpStatus {
            url: "https://example.com/node.tar.gz".to_string(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "Unexpected HTTP status 404 for https://example.com/node.tar.gz"
        );
        assert_eq!(
            err.code().map(|c| c.to_string()).as_deref(),
            Some("nodepack_tools_archive::http_status")
        );
    }
}
