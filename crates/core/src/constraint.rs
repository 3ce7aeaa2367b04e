//! Version constraints as declared by the user.
//!
//! A constraint is an opaque semver range string handed to the resolver.
//! The only interpretation done here is recognizing the forms that mean
//! "nothing was declared": an empty string or the literal `null` that
//! manifest readers emit for a missing field.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel emitted by manifest readers for a missing engines field.
pub const UNSPECIFIED_SENTINEL: &str = "null";

/// Range that matches every published version.
pub const WILDCARD: &str = "*";

/// A semver range for one tool, or the absence of one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub struct VersionConstraint(Option<String>);

impl VersionConstraint {
    /// Parse a raw constraint, mapping empty input and `null` to unspecified.
    #[must_use]
    pub fn parse(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() || trimmed == UNSPECIFIED_SENTINEL {
            Self(None)
        } else {
            Self(Some(trimmed.to_string()))
        }
    }

    /// A constraint that was not declared.
    #[must_use]
    pub const fn unspecified() -> Self {
        Self(None)
    }

    /// Whether the user declared a range.
    #[must_use]
    pub const fn is_specified(&self) -> bool {
        self.0.is_some()
    }

    /// The declared range, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// The range to send to the resolver; empty when unspecified.
    #[must_use]
    pub fn range(&self) -> &str {
        self.0.as_deref().unwrap_or_default()
    }

    /// Whether the range is the universal wildcard `*`.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.0.as_deref() == Some(WILDCARD)
    }

    /// Whether the range starts with a `>` comparator and has no upper bound.
    #[must_use]
    pub fn is_open_ended(&self) -> bool {
        self.0.as_deref().is_some_and(|r| r.starts_with('>'))
    }
}

impl From<Option<String>> for VersionConstraint {
    fn from(value: Option<String>) -> Self {
        value.map_or_else(Self::unspecified, Self::parse)
    }
}

impl From<VersionConstraint> for Option<String> {
    fn from(value: VersionConstraint) -> Self {
        value.0
    }
}

impl From<&str> for VersionConstraint {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(range) => write!(f, "{range}"),
            None => write!(f, "unspecified"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_and_empty_are_unspecified() {
        for raw in ["", "  ", "null", " null "] {
            let c = VersionConstraint::parse(raw);
            assert!(!c.is_specified(), "{raw:?} should be unspecified");
            assert_eq!(c.range(), "");
        }
    }

    #[test]
    fn test_range_is_trimmed() {
        let c = VersionConstraint::parse(" 14.x ");
        assert_eq!(c.as_str(), Some("14.x"));
        assert_eq!(c.to_string(), "14.x");
    }

    #[test]
    fn test_wildcard_and_open_ended() {
        assert!(VersionConstraint::parse("*").is_wildcard());
        assert!(!VersionConstraint::parse("1.x").is_wildcard());
        assert!(VersionConstraint::parse(">=10").is_open_ended());
        assert!(VersionConstraint::parse(">8").is_open_ended());
        assert!(!VersionConstraint::parse("<12").is_open_ended());
        assert!(!VersionConstraint::unspecified().is_open_ended());
    }

    #[test]
    fn test_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Doc {
            #[serde(default)]
            node: VersionConstraint,
            #[serde(default)]
            yarn: VersionConstraint,
        }

        let doc: Doc = toml::from_str("node = \"12.x\"").unwrap();
        assert_eq!(doc.node.as_str(), Some("12.x"));
        assert!(!doc.yarn.is_specified());

        let doc: Doc = toml::from_str("node = \"null\"").unwrap();
        assert!(!doc.node.is_specified());
    }
}
