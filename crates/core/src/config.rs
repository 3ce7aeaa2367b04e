//! Build configuration.
//!
//! Values are layered, later layers winning:
//!
//! 1. built-in defaults
//! 2. an optional TOML file (`[engines]` and `[settings]` tables)
//! 3. the build's env dir, one file per variable
//! 4. command line flags (applied by the CLI)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::{Error, Result, VersionConstraint};

/// Default number of resolver attempts before giving up.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 5;

/// Default backoff unit; attempt `n` waits `n + 1` units.
pub const DEFAULT_BACKOFF_UNIT_MS: u64 = 1000;

/// Default location of the user post-install hook, relative to the build dir.
pub const DEFAULT_HOOK_PATH: &str = "bin/post_compile";

/// Env dir variables that influence the build.
const ENV_MODULES_CACHE: &str = "NODE_MODULES_CACHE";
const ENV_NPM_PRODUCTION: &str = "NPM_CONFIG_PRODUCTION";
const ENV_NODE_ENV: &str = "NODE_ENV";

/// Complete configuration for one provisioning run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Declared tool versions.
    pub engines: Engines,
    /// Behavior switches.
    pub settings: Settings,
}

/// Version constraints for the three provisioned tools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Engines {
    /// Node.js runtime constraint.
    pub node: VersionConstraint,
    /// Yarn constraint; declaring it selects the yarn workflow.
    pub yarn: VersionConstraint,
    /// npm constraint; upgrades the npm bundled with node when set.
    pub npm: VersionConstraint,
}

/// Tunables that are not version constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Explicit resolver binary, overriding the per-platform default.
    pub resolver: Option<PathBuf>,
    /// Maximum resolver attempts.
    pub retry_attempts: u32,
    /// Backoff unit in milliseconds.
    pub backoff_unit_ms: u64,
    /// Whether `node_modules` is restored from and saved to the cache.
    pub modules_cache: bool,
    /// Whether dev dependencies are excluded.
    pub production: bool,
    /// `NODE_ENV` exported to install commands and later stages.
    pub node_env: String,
    /// Post-install hook path, relative to the build dir.
    pub hook: PathBuf,
    /// Where the export file for later build stages is written.
    pub export_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            resolver: None,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            backoff_unit_ms: DEFAULT_BACKOFF_UNIT_MS,
            modules_cache: true,
            production: true,
            node_env: "production".to_string(),
            hook: PathBuf::from(DEFAULT_HOOK_PATH),
            export_file: None,
        }
    }
}

impl Settings {
    /// Backoff unit as a duration.
    #[must_use]
    pub const fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }
}

impl BuildConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| Error::configuration(format!("invalid config file: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::io(e, Some(path.to_path_buf()), "read config"))?;
        debug!(path = %path.display(), "Loaded build configuration");
        Self::from_toml(&text)
    }

    /// Apply overrides from an env dir.
    ///
    /// Each regular file in the directory is a variable whose value is the
    /// file contents. A missing directory is not an error.
    pub fn apply_env_dir(&mut self, dir: &Path) -> Result<()> {
        let vars = read_env_dir(dir)?;

        if let Some(value) = vars.get(ENV_MODULES_CACHE) {
            self.settings.modules_cache = parse_flag(ENV_MODULES_CACHE, value)?;
        }
        if let Some(value) = vars.get(ENV_NPM_PRODUCTION) {
            self.settings.production = parse_flag(ENV_NPM_PRODUCTION, value)?;
        }
        if let Some(value) = vars.get(ENV_NODE_ENV) {
            self.settings.node_env.clone_from(value);
        }
        Ok(())
    }

    /// Reject values that would make the run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.settings.retry_attempts == 0 {
            return Err(Error::configuration("retry_attempts must be at least 1"));
        }
        if self.settings.hook.is_absolute() {
            return Err(Error::configuration(format!(
                "hook path must be relative to the build dir, got {}",
                self.settings.hook.display()
            )));
        }
        Ok(())
    }
}

/// Read every file in an env dir into a name/value map.
pub fn read_env_dir(dir: &Path) -> Result<BTreeMap<String, String>> {
    let mut vars = BTreeMap::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vars),
        Err(e) => return Err(Error::io(e, Some(dir.to_path_buf()), "read env dir")),
    };

    for entry in entries {
        let entry = entry.map_err(|e| Error::io(e, Some(dir.to_path_buf()), "read env dir"))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let value = std::fs::read_to_string(&path)
            .map_err(|e| Error::io(e, Some(path.clone()), "read env var"))?;
        vars.insert(name.to_string(), value.trim().to_string());
    }
    Ok(vars)
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(Error::configuration(format!(
            "{name} must be true or false, got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = BuildConfig::default();
        assert!(!config.engines.node.is_specified());
        assert_eq!(config.settings.retry_attempts, 5);
        assert_eq!(config.settings.backoff_unit(), Duration::from_secs(1));
        assert!(config.settings.modules_cache);
        assert_eq!(config.settings.hook, PathBuf::from("bin/post_compile"));
    }

    #[test]
    fn test_from_toml() {
        let config = BuildConfig::from_toml(
            r#"
            [engines]
            node = "14.x"
            yarn = "null"

            [settings]
            backoff_unit_ms = 10
            modules_cache = false
            "#,
        )
        .unwrap();

        assert_eq!(config.engines.node.as_str(), Some("14.x"));
        assert!(!config.engines.yarn.is_specified());
        assert_eq!(config.settings.backoff_unit(), Duration::from_millis(10));
        assert!(!config.settings.modules_cache);
        assert_eq!(config.settings.retry_attempts, 5);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = BuildConfig::from_toml("[engines]\niojs = \"3\"").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let err = BuildConfig::from_toml("[settings]\nretry_attempts = 0").unwrap_err();
        assert!(err.to_string().contains("retry_attempts"));
    }

    #[test]
    fn test_env_dir_overrides() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("NODE_MODULES_CACHE"), "false\n").unwrap();
        std::fs::write(dir.path().join("NODE_ENV"), "staging").unwrap();
        std::fs::write(dir.path().join("UNRELATED"), "x").unwrap();

        let mut config = BuildConfig::default();
        config.apply_env_dir(dir.path()).unwrap();

        assert!(!config.settings.modules_cache);
        assert!(config.settings.production);
        assert_eq!(config.settings.node_env, "staging");
    }

    #[test]
    fn test_missing_env_dir_is_ignored() {
        let dir = TempDir::new().unwrap();
        let mut config = BuildConfig::default();
        config.apply_env_dir(&dir.path().join("absent")).unwrap();
        assert_eq!(config, BuildConfig::default());
    }

    #[test]
    fn test_bad_flag_value() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("NPM_CONFIG_PRODUCTION"), "maybe").unwrap();
        let err = BuildConfig::default().apply_env_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("NPM_CONFIG_PRODUCTION"));
    }
}
