//! npm and yarn operations used during provisioning.

use nodepack_core::{Error, Result, ToolEnv, VersionConstraint};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{CommandOutput, CommandRunner, Invocation};

/// Outcome of reconciling the bundled npm with the requested one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NpmSetup {
    /// The npm shipped with node is kept.
    Bundled {
        /// Version reported by `npm --version`.
        version: String,
    },
    /// npm was reinstalled at the requested constraint.
    Upgraded {
        /// Version bundled with node.
        from: String,
        /// Constraint passed to `npm install -g`.
        to: String,
    },
}

impl NpmSetup {
    /// Keep the bundled npm unless a different version was requested.
    #[must_use]
    pub fn plan(bundled: String, requested: &VersionConstraint) -> Self {
        match requested.as_str() {
            Some(wanted) if wanted != bundled => Self::Upgraded {
                from: bundled,
                to: wanted.to_string(),
            },
            _ => Self::Bundled { version: bundled },
        }
    }
}

/// Runs npm and yarn inside the build directory.
#[derive(Clone)]
pub struct PackageManager {
    runner: Arc<dyn CommandRunner>,
    build_dir: PathBuf,
}

impl std::fmt::Debug for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageManager")
            .field("build_dir", &self.build_dir)
            .finish_non_exhaustive()
    }
}

impl PackageManager {
    /// Create a package manager runner rooted at `build_dir`.
    pub fn new(runner: Arc<dyn CommandRunner>, build_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            build_dir: build_dir.into(),
        }
    }

    /// Version reported by the npm currently on the tool `PATH`.
    pub async fn npm_version(&self, env: &ToolEnv) -> Result<String> {
        let output = self.run(self.npm(env)?.arg("--version")).await?;
        Ok(output.stdout.trim().to_string())
    }

    /// `npm install -g npm@<version>` to replace the bundled npm.
    pub async fn install_npm(&self, version: &str, env: &ToolEnv) -> Result<()> {
        info!(%version, "Installing npm");
        self.run(
            self.npm(env)?
                .args(["install", "--unsafe-perm", "--quiet", "-g"])
                .arg(format!("npm@{version}")),
        )
        .await?;
        Ok(())
    }

    /// `npm install` against the project's own `.npmrc`.
    pub async fn npm_install(&self, env: &ToolEnv) -> Result<String> {
        let userconfig = self.build_dir.join(".npmrc");
        let output = self
            .run(
                self.npm(env)?
                    .args(["install", "--unsafe-perm", "--userconfig"])
                    .arg(userconfig.display().to_string()),
            )
            .await?;
        Ok(output.combined())
    }

    /// `npm rebuild` for a committed `node_modules`.
    pub async fn npm_rebuild(&self, env: &ToolEnv) -> Result<String> {
        let output = self.run(self.npm(env)?.arg("rebuild")).await?;
        Ok(output.combined())
    }

    /// `npm prune` to drop extraneous packages.
    pub async fn npm_prune(&self, env: &ToolEnv) -> Result<String> {
        let output = self.run(self.npm(env)?.arg("prune")).await?;
        Ok(output.combined())
    }

    /// `yarn install` with its cache folder in persistent storage.
    pub async fn yarn_install(&self, cache_folder: &Path, env: &ToolEnv) -> Result<String> {
        let invocation = Invocation::new("yarn", &self.build_dir)
            .args(["install", "--pure-lockfile", "--ignore-engines", "--cache-folder"])
            .arg(cache_folder.display().to_string())
            .envs(env.command_env()?);
        let output = self.run(invocation).await?;
        Ok(output.combined())
    }

    fn npm(&self, env: &ToolEnv) -> Result<Invocation> {
        Ok(Invocation::new("npm", &self.build_dir).envs(env.command_env()?))
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandOutput> {
        let command = invocation.command_line();
        debug!(%command, "Running package manager command");

        let output = self
            .runner
            .run(&invocation)
            .await
            .map_err(|e| Error::spawn_failed(&command, &e))?;

        if output.succeeded() {
            Ok(output)
        } else {
            Err(Error::install_command(command, output.code, output.combined()))
        }
    }
}
