//! Cache management across builds.
//!
//! Each dependency workflow owns a different part of the cache directory:
//!
//! ```text
//! <cache_dir>/
//! ├── node/
//! │   └── node_modules/   # npm workflow: full snapshot of the dependency tree
//! └── yarn-cache/         # yarn workflow: yarn's own incremental cache
//! ```
//!
//! Selecting a workflow deletes the other workflow's artifact, so the cache
//! never holds both. Switching workflows between builds therefore costs one
//! cold build; nothing is migrated.

mod fs;
mod strategy;

pub use fs::{copy_tree, remove_if_exists};
pub use strategy::{
    CacheLayout, CacheManager, CacheStrategy, DependencyTreeCache, PersistOutcome, RestoreOutcome,
    ToolManagedCache,
};
