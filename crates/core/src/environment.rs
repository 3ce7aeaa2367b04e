//! Explicit environment for spawned tools.
//!
//! Installing node, yarn and npm means later commands must find them first
//! on `PATH`. Rather than mutating the process environment, the provisioner
//! accumulates a [`ToolEnv`] and hands it to every command it spawns. The
//! same value is serialized into the profile script used at runtime and the
//! export file consumed by later build stages.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{Error, Result};

/// Ordered `PATH` additions plus exported variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolEnv {
    /// Directories to search before the inherited `PATH`, highest priority first.
    path_prefix: Vec<PathBuf>,
    /// Variables exported to tools and later stages.
    vars: BTreeMap<String, String>,
    /// The inherited `PATH`, if any.
    base_path: Option<OsString>,
}

impl ToolEnv {
    /// Create an environment that extends the current process `PATH`.
    #[must_use]
    pub fn inherit() -> Self {
        Self {
            base_path: std::env::var_os("PATH"),
            ..Self::default()
        }
    }

    /// Create an environment on top of an explicit base `PATH`.
    #[must_use]
    pub fn with_base_path(base: impl Into<OsString>) -> Self {
        Self {
            base_path: Some(base.into()),
            ..Self::default()
        }
    }

    /// Put a directory in front of every directory added so far.
    pub fn prepend_path(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        self.path_prefix.retain(|existing| existing != &dir);
        debug!(dir = %dir.display(), "Prepending to tool PATH");
        self.path_prefix.insert(0, dir);
    }

    /// Set an exported variable.
    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Look up an exported variable.
    #[must_use]
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// The `PATH` additions, highest priority first.
    #[must_use]
    pub fn path_prefix(&self) -> &[PathBuf] {
        &self.path_prefix
    }

    /// The full `PATH` value for spawned commands.
    pub fn path_value(&self) -> Result<OsString> {
        let inherited = self
            .base_path
            .as_ref()
            .map(|base| std::env::split_paths(base).collect::<Vec<_>>())
            .unwrap_or_default();
        std::env::join_paths(self.path_prefix.iter().cloned().chain(inherited))
            .map_err(|e| Error::configuration(format!("invalid PATH entry: {e}")))
    }

    /// Variables to pass to `Command::envs`, `PATH` included.
    pub fn command_env(&self) -> Result<Vec<(OsString, OsString)>> {
        let mut env = Vec::with_capacity(self.vars.len() + 1);
        env.push((OsString::from("PATH"), self.path_value()?));
        env.extend(
            self.vars
                .iter()
                .map(|(k, v)| (OsString::from(k), OsString::from(v))),
        );
        Ok(env)
    }

    /// Render the export script for later build stages, using absolute paths.
    #[must_use]
    pub fn export_script(&self) -> String {
        let mut script = String::new();
        let prefix = join_display(self.path_prefix.iter().map(|p| p.display().to_string()));
        let _ = writeln!(script, "export PATH=\"{prefix}:$PATH\"");
        for (name, value) in &self.vars {
            let _ = writeln!(script, "export {name}=\"{}\"", escape(value));
        }
        script
    }

    /// Render the runtime profile script.
    ///
    /// At runtime the build dir becomes `$HOME`, so paths inside `build_dir`
    /// are rewritten relative to it. Paths outside the build dir (cache
    /// folders) do not exist at runtime and are left out of `PATH`.
    #[must_use]
    pub fn profile_script(&self, build_dir: &Path) -> String {
        let mut script = String::new();
        let prefix = join_display(self.path_prefix.iter().filter_map(|p| {
            p.strip_prefix(build_dir)
                .ok()
                .map(|rel| format!("$HOME/{}", rel.display()))
        }));
        let _ = writeln!(
            script,
            "export PATH=\"{prefix}:$PATH:$HOME/bin:$HOME/node_modules/.bin\""
        );
        for (name, value) in &self.vars {
            let value = Path::new(value).strip_prefix(build_dir).map_or_else(
                |_| escape(value),
                |rel| format!("$HOME/{}", rel.display()),
            );
            let _ = writeln!(script, "export {name}=${{{name}:-\"{value}\"}}");
        }
        script
    }

    /// Write the export script to `path`, creating parent directories.
    pub fn write_export(&self, path: &Path) -> Result<()> {
        write_script(path, &self.export_script())
    }

    /// Write the runtime profile script to `path`.
    pub fn write_profile(&self, path: &Path, build_dir: &Path) -> Result<()> {
        write_script(path, &self.profile_script(build_dir))
    }
}

fn join_display(parts: impl Iterator<Item = String>) -> String {
    parts.collect::<Vec<_>>().join(":")
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn write_script(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::io(e, Some(parent.to_path_buf()), "create script dir"))?;
    }
    std::fs::write(path, contents)
        .map_err(|e| Error::io(e, Some(path.to_path_buf()), "write script"))?;
    debug!(path = %path.display(), "Wrote environment script");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepend_orders_latest_first() {
        let mut env = ToolEnv::with_base_path("/usr/bin");
        env.prepend_path("/build/.heroku/node/bin");
        env.prepend_path("/build/.heroku/yarn/bin");

        let path = env.path_value().unwrap();
        let parts: Vec<_> = std::env::split_paths(&path).collect();
        assert_eq!(
            parts,
            vec![
                PathBuf::from("/build/.heroku/yarn/bin"),
                PathBuf::from("/build/.heroku/node/bin"),
                PathBuf::from("/usr/bin"),
            ]
        );
    }

    #[test]
    fn test_prepend_deduplicates() {
        let mut env = ToolEnv::default();
        env.prepend_path("/a");
        env.prepend_path("/b");
        env.prepend_path("/a");
        assert_eq!(env.path_prefix(), &[PathBuf::from("/a"), PathBuf::from("/b")]);
    }

    #[test]
    fn test_command_env_includes_path_and_vars() {
        let mut env = ToolEnv::with_base_path("/bin");
        env.prepend_path("/opt/node/bin");
        env.set_var("NODE_ENV", "production");

        let vars = env.command_env().unwrap();
        assert_eq!(vars[0].0, OsString::from("PATH"));
        assert!(vars.contains(&(OsString::from("NODE_ENV"), OsString::from("production"))));
    }

    #[test]
    fn test_profile_script_is_home_relative() {
        let build = Path::new("/tmp/build");
        let mut env = ToolEnv::default();
        env.prepend_path("/tmp/build/.heroku/node/bin");
        env.prepend_path("/tmp/cache/elsewhere");
        env.set_var("NODE_HOME", "/tmp/build/.heroku/node");

        let script = env.profile_script(build);
        assert!(script.contains("export PATH=\"$HOME/.heroku/node/bin:$PATH"));
        assert!(!script.contains("/tmp/cache"));
        assert!(script.contains("export NODE_HOME=${NODE_HOME:-\"$HOME/.heroku/node\"}"));
    }

    #[test]
    fn test_write_export() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut env = ToolEnv::default();
        env.prepend_path("/opt/node/bin");
        env.set_var("NODE_HOME", "/opt/node");

        let path = dir.path().join("nested").join("export");
        env.write_export(&path).unwrap();

        let written = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            written,
            "export PATH=\"/opt/node/bin:$PATH\"\nexport NODE_HOME=\"/opt/node\"\n"
        );
    }
}
