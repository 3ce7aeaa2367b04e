//! Classification of resolver answers.

use std::fmt;
use url::Url;

use crate::ResolverOutput;

/// Answer meaning no published version satisfies the range.
const NO_RESULT: &str = "No result";

/// Prefixes meaning the range itself is malformed.
const INVALID_PREFIXES: [&str; 2] = ["Could not parse", "Could not get"];

/// A concrete version and where to download it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    /// Exact version, e.g. `14.2.0`.
    pub version: String,
    /// Archive location.
    pub location: Url,
}

impl fmt::Display for ResolvedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.version, self.location)
    }
}

/// Result of a single resolver query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// The range resolved to a version.
    Resolved(ResolvedVersion),
    /// No version satisfies the range.
    NoMatch,
    /// The range is malformed; carries the resolver's explanation.
    Invalid(String),
    /// The query failed for reasons unrelated to the range.
    TransientFailure(String),
}

impl ResolutionOutcome {
    /// Only transient failures are worth another attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientFailure(_))
    }

    /// Short label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Resolved(_) => "resolved",
            Self::NoMatch => "no-match",
            Self::Invalid(_) => "invalid",
            Self::TransientFailure(_) => "transient",
        }
    }
}

/// Classify one resolver answer.
///
/// Negative answers are recognized from the text whatever the exit status,
/// since they are definitive. Anything else that did not succeed, or that
/// succeeded without a well-formed `<version> <url>` line, is transient.
#[must_use]
pub fn classify(output: &ResolverOutput) -> ResolutionOutcome {
    let line = output.line.trim();

    if line.starts_with(NO_RESULT) {
        return ResolutionOutcome::NoMatch;
    }
    if INVALID_PREFIXES.iter().any(|p| line.starts_with(p)) {
        return ResolutionOutcome::Invalid(line.to_string());
    }
    if !output.success {
        return ResolutionOutcome::TransientFailure(if line.is_empty() {
            "resolver exited unsuccessfully".to_string()
        } else {
            line.to_string()
        });
    }

    parse_resolved(line).map_or_else(
        || ResolutionOutcome::TransientFailure(format!("unexpected resolver output: {line:?}")),
        ResolutionOutcome::Resolved,
    )
}

fn parse_resolved(line: &str) -> Option<ResolvedVersion> {
    let mut parts = line.split_whitespace();
    let version = parts.next()?;
    let location = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    semver::Version::parse(version).ok()?;
    let location = Url::parse(location).ok()?;
    Some(ResolvedVersion {
        version: version.to_string(),
        location,
    })
}
