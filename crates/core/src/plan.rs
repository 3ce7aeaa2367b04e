//! Selection of the dependency installation workflow.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::VersionConstraint;

/// The dependency installation workflow for one build.
///
/// Exactly one plan is active per run and every later step (cache restore,
/// install command, prune, cache persist) branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallPlan {
    /// Primary workflow: yarn installs dependencies and manages its own
    /// incremental cache folder.
    Yarn,
    /// Fallback workflow: npm installs dependencies and the whole
    /// `node_modules` tree is snapshotted into the cache.
    Npm,
}

impl InstallPlan {
    /// Pick the workflow from the yarn constraint.
    ///
    /// Yarn is used iff a yarn range was declared; an absent field, an
    /// empty string and the `null` sentinel all fall back to npm.
    #[must_use]
    pub const fn select(yarn: &VersionConstraint) -> Self {
        if yarn.is_specified() {
            Self::Yarn
        } else {
            Self::Npm
        }
    }

    /// Name of the package manager driving this workflow.
    #[must_use]
    pub const fn tool(self) -> &'static str {
        match self {
            Self::Yarn => "yarn",
            Self::Npm => "npm",
        }
    }

    /// Whether dev dependencies must be pruned in a separate step.
    ///
    /// Yarn prunes as part of `yarn install`.
    #[must_use]
    pub const fn needs_prune(self) -> bool {
        matches!(self, Self::Npm)
    }
}

impl fmt::Display for InstallPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_yarn_when_declared() {
        assert_eq!(InstallPlan::select(&"1.x".into()), InstallPlan::Yarn);
        assert_eq!(InstallPlan::select(&"*".into()), InstallPlan::Yarn);
    }

    #[test]
    fn test_select_npm_when_absent() {
        assert_eq!(
            InstallPlan::select(&VersionConstraint::unspecified()),
            InstallPlan::Npm
        );
        assert_eq!(InstallPlan::select(&"null".into()), InstallPlan::Npm);
        assert_eq!(InstallPlan::select(&"".into()), InstallPlan::Npm);
    }

    #[test]
    fn test_only_npm_prunes() {
        assert!(InstallPlan::Npm.needs_prune());
        assert!(!InstallPlan::Yarn.needs_prune());
    }
}
