//! Provisioning stages.

use std::fmt;

/// One step of a provisioning run, in execution order.
///
/// `Cleanup` runs whether or not the earlier stages succeeded; `Done` is
/// only reached by a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Resolve the runtime constraint to a version and archive.
    ResolveRuntime,
    /// Warn about risky constraints.
    AdviseConstraints,
    /// Install the runtime and reconcile the bundled npm.
    InstallRuntime,
    /// Pick the dependency workflow, installing yarn when needed.
    SelectPlan,
    /// Prepare the build dir from the cache.
    RestoreCache,
    /// Run the workflow's install command.
    InstallDependencies,
    /// Prune extraneous packages (npm only).
    PruneOrSkip,
    /// Save state for the next build.
    PersistCache,
    /// Remove transient build artifacts.
    Cleanup,
    /// Provisioning finished successfully.
    Done,
}

impl Stage {
    /// Every stage of a successful run.
    pub const ALL: [Self; 10] = [
        Self::ResolveRuntime,
        Self::AdviseConstraints,
        Self::InstallRuntime,
        Self::SelectPlan,
        Self::RestoreCache,
        Self::InstallDependencies,
        Self::PruneOrSkip,
        Self::PersistCache,
        Self::Cleanup,
        Self::Done,
    ];

    /// Stable name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ResolveRuntime => "resolve-runtime",
            Self::AdviseConstraints => "advise-constraints",
            Self::InstallRuntime => "install-runtime",
            Self::SelectPlan => "select-plan",
            Self::RestoreCache => "restore-cache",
            Self::InstallDependencies => "install-dependencies",
            Self::PruneOrSkip => "prune-or-skip",
            Self::PersistCache => "persist-cache",
            Self::Cleanup => "cleanup",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
