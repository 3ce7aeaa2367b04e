//! The two cache strategies and the manager that picks one per plan.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use nodepack_core::{InstallPlan, Result};

use crate::fs::{copy_tree, remove_if_exists};

/// Directory name of the dependency tree, in the build dir and in the cache.
const NODE_MODULES: &str = "node_modules";

/// Build and cache directories of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    /// Application being built.
    pub build_dir: PathBuf,
    /// Directory persisted across builds.
    pub cache_dir: PathBuf,
}

impl CacheLayout {
    /// Create a layout.
    pub fn new(build_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
            cache_dir: cache_dir.into(),
        }
    }

    /// The dependency tree in the build dir.
    #[must_use]
    pub fn build_modules(&self) -> PathBuf {
        self.build_dir.join(NODE_MODULES)
    }

    /// The dependency tree snapshot kept by the npm workflow.
    #[must_use]
    pub fn cached_modules(&self) -> PathBuf {
        self.cache_dir.join("node").join(NODE_MODULES)
    }

    /// Yarn's cache folder kept by the yarn workflow.
    #[must_use]
    pub fn yarn_cache(&self) -> PathBuf {
        self.cache_dir.join("yarn-cache")
    }
}

/// What restoring the cache did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The dependency tree snapshot was copied into the build dir.
    Restored {
        /// Number of files copied.
        files: u64,
    },
    /// The build dir already has `node_modules` (committed by the user);
    /// the cache was left alone and native modules must be rebuilt.
    RebuildRequired,
    /// No snapshot exists yet.
    Empty,
    /// Dependency caching is turned off.
    Disabled,
    /// Yarn manages its own cache in this folder.
    ToolManaged {
        /// Folder to pass to yarn.
        cache_folder: PathBuf,
    },
}

/// What persisting the cache did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    /// A fresh snapshot replaced the previous one.
    Saved {
        /// Number of files copied.
        files: u64,
    },
    /// The previous snapshot was removed and there was nothing to save.
    Cleared,
    /// Dependency caching is turned off; any previous snapshot was removed.
    Disabled,
    /// Yarn already updated its cache during install.
    ToolManaged,
}

/// npm workflow: snapshot the whole `node_modules` tree.
#[derive(Debug, Clone)]
pub struct DependencyTreeCache {
    layout: CacheLayout,
    enabled: bool,
}

impl DependencyTreeCache {
    /// Restore the snapshot into the build dir.
    ///
    /// A `node_modules` already in the build dir wins over the cache and
    /// asks for a native rebuild instead.
    pub fn restore(&self) -> Result<RestoreOutcome> {
        let stale = remove_if_exists(&self.layout.yarn_cache())?;
        if stale {
            debug!("Removed yarn cache left by a previous yarn build");
        }

        let build_modules = self.layout.build_modules();
        if build_modules.exists() {
            info!(path = %build_modules.display(), "node_modules already present, skipping cache");
            return Ok(RestoreOutcome::RebuildRequired);
        }
        if !self.enabled {
            return Ok(RestoreOutcome::Disabled);
        }

        let cached = self.layout.cached_modules();
        if !cached.is_dir() {
            return Ok(RestoreOutcome::Empty);
        }
        let files = copy_tree(&cached, &build_modules)?;
        info!(files, "Restored node_modules from cache");
        Ok(RestoreOutcome::Restored { files })
    }

    /// Replace the snapshot with the freshly installed tree.
    pub fn persist(&self) -> Result<PersistOutcome> {
        let cached = self.layout.cached_modules();
        remove_if_exists(&cached)?;

        if !self.enabled {
            return Ok(PersistOutcome::Disabled);
        }

        let build_modules = self.layout.build_modules();
        if !build_modules.is_dir() {
            return Ok(PersistOutcome::Cleared);
        }
        let files = self.snapshot(&build_modules, &cached)?;
        info!(files, "Saved node_modules to cache");
        Ok(PersistOutcome::Saved { files })
    }

    /// Copy `src` beside `cached` and move it into place once complete.
    ///
    /// A failed copy leaves no snapshot behind.
    fn snapshot(&self, src: &Path, cached: &Path) -> Result<u64> {
        let parent = self.layout.cache_dir.join("node");
        std::fs::create_dir_all(&parent).map_err(|e| {
            nodepack_core::Error::io(e, Some(parent.clone()), "create cache directory")
        })?;
        let staging = tempfile::Builder::new()
            .prefix(".nodepack-snapshot-")
            .tempdir_in(&parent)
            .map_err(|e| {
                nodepack_core::Error::io(e, Some(parent.clone()), "create staging directory")
            })?;

        let tree = staging.path().join(NODE_MODULES);
        let files = copy_tree(src, &tree)?;
        std::fs::rename(&tree, cached).map_err(|e| {
            nodepack_core::Error::io(e, Some(cached.to_path_buf()), "move snapshot into place")
        })?;
        Ok(files)
    }
}

/// Yarn workflow: yarn maintains its own cache folder.
#[derive(Debug, Clone)]
pub struct ToolManagedCache {
    layout: CacheLayout,
}

impl ToolManagedCache {
    /// Point yarn at its cache folder and drop any npm snapshot.
    pub fn restore(&self) -> Result<RestoreOutcome> {
        let stale = remove_if_exists(&self.layout.cache_dir.join("node"))?;
        if stale {
            debug!("Removed node_modules snapshot left by a previous npm build");
        }
        let cache_folder = self.layout.yarn_cache();
        std::fs::create_dir_all(&cache_folder).map_err(|e| {
            nodepack_core::Error::io(e, Some(cache_folder.clone()), "create yarn cache")
        })?;
        Ok(RestoreOutcome::ToolManaged { cache_folder })
    }

    /// Nothing to copy; yarn wrote to its folder during install.
    #[must_use]
    pub const fn persist(&self) -> PersistOutcome {
        PersistOutcome::ToolManaged
    }
}

/// One of the two cache strategies.
#[derive(Debug, Clone)]
pub enum CacheStrategy {
    /// Used by the npm workflow.
    DependencyTree(DependencyTreeCache),
    /// Used by the yarn workflow.
    ToolManaged(ToolManagedCache),
}

/// Runs the cache strategy that matches the active install plan.
#[derive(Debug, Clone)]
pub struct CacheManager {
    strategy: CacheStrategy,
}

impl CacheManager {
    /// Choose the strategy for `plan`.
    ///
    /// `modules_cache` only affects the npm workflow; yarn's cache folder is
    /// always used.
    #[must_use]
    pub fn new(layout: CacheLayout, plan: InstallPlan, modules_cache: bool) -> Self {
        let strategy = match plan {
            InstallPlan::Npm => CacheStrategy::DependencyTree(DependencyTreeCache {
                layout,
                enabled: modules_cache,
            }),
            InstallPlan::Yarn => CacheStrategy::ToolManaged(ToolManagedCache { layout }),
        };
        Self { strategy }
    }

    /// Prepare the build dir from the cache.
    pub fn restore(&self) -> Result<RestoreOutcome> {
        match &self.strategy {
            CacheStrategy::DependencyTree(cache) => cache.restore(),
            CacheStrategy::ToolManaged(cache) => cache.restore(),
        }
    }

    /// Save state for the next build. Call only after a successful install.
    pub fn persist(&self) -> Result<PersistOutcome> {
        match &self.strategy {
            CacheStrategy::DependencyTree(cache) => cache.persist(),
            CacheStrategy::ToolManaged(cache) => Ok(cache.persist()),
        }
    }
}
