//! The provisioning run.
//!
//! Stages run strictly in order on one task. A failing stage stops the run,
//! but `Cleanup` still runs before the error is returned. The profile and
//! export files and the post-install hook only happen after a successful
//! run.

mod stage;

pub use stage::Stage;

use nodepack_cache::{
    CacheLayout, CacheManager, PersistOutcome, RestoreOutcome, remove_if_exists,
};
use nodepack_core::advisor::advise;
use nodepack_core::{BuildConfig, Error, InstallPlan, Result, ToolEnv, VersionConstraint};
use nodepack_hooks::HookResult;
use nodepack_resolver::{ResolvedVersion, VersionResolver};
use nodepack_tools_archive::{Downloader, install_archive};
use nodepack_tools_pm::{CommandRunner, NpmSetup, PackageManager};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::reporter::Reporter;

const NODE: &str = "node";
const YARN: &str = "yarn";

/// Everything a successful run produced.
///
/// Stage outputs are `None` when the stage did not produce one, e.g. `yarn`
/// under the npm workflow.
#[derive(Debug, Clone, Default)]
pub struct ProvisionReport {
    /// Stages entered, in order.
    pub stages: Vec<Stage>,
    /// The installed runtime.
    pub node: Option<ResolvedVersion>,
    /// The installed yarn, under the yarn workflow.
    pub yarn: Option<ResolvedVersion>,
    /// How npm was reconciled.
    pub npm: Option<NpmSetup>,
    /// The dependency workflow.
    pub plan: Option<InstallPlan>,
    /// What cache restore did.
    pub restore: Option<RestoreOutcome>,
    /// What cache persist did.
    pub persist: Option<PersistOutcome>,
    /// Constraint warnings shown to the user.
    pub warnings: Vec<String>,
    /// The tool environment handed to commands and written to disk.
    pub env: ToolEnv,
    /// The post-install hook run, if a hook exists.
    pub hook: Option<HookResult>,
}

impl ProvisionReport {
    fn enter(&mut self, stage: Stage) {
        debug!(%stage, "Entering stage");
        self.stages.push(stage);
    }
}

/// Drives one provisioning run.
pub struct Orchestrator {
    config: BuildConfig,
    layout: CacheLayout,
    resolver: VersionResolver,
    downloader: Arc<dyn Downloader>,
    packages: PackageManager,
    base_env: ToolEnv,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("layout", &self.layout)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator for `layout`.
    ///
    /// Commands start from the current process `PATH`.
    pub fn new(
        config: BuildConfig,
        layout: CacheLayout,
        resolver: VersionResolver,
        downloader: Arc<dyn Downloader>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let packages = PackageManager::new(runner, layout.build_dir.clone());
        Self {
            config,
            layout,
            resolver,
            downloader,
            packages,
            base_env: ToolEnv::inherit(),
        }
    }

    /// Start commands from `env` instead of the process environment.
    #[must_use]
    pub fn with_base_env(mut self, env: ToolEnv) -> Self {
        self.base_env = env;
        self
    }

    /// Where node is installed.
    #[must_use]
    pub fn node_dir(&self) -> PathBuf {
        self.layout.build_dir.join(".heroku").join(NODE)
    }

    /// Where yarn is installed.
    #[must_use]
    pub fn yarn_dir(&self) -> PathBuf {
        self.layout.build_dir.join(".heroku").join(YARN)
    }

    /// Downloaded archives, removed during cleanup.
    #[must_use]
    pub fn scratch_dir(&self) -> PathBuf {
        self.layout.build_dir.join(".nodepack").join("scratch")
    }

    /// Runtime profile script.
    #[must_use]
    pub fn profile_path(&self) -> PathBuf {
        self.layout.build_dir.join(".profile.d").join("nodejs.sh")
    }

    /// Export file for later build stages.
    #[must_use]
    pub fn export_path(&self) -> PathBuf {
        self.config.settings.export_file.clone().unwrap_or_else(|| {
            self.layout.build_dir.join(".nodepack").join("export")
        })
    }

    /// Run every stage.
    pub async fn run<W: Write>(&self, reporter: &mut Reporter<W>) -> Result<ProvisionReport> {
        let mut report = ProvisionReport {
            env: self.base_env.clone(),
            ..ProvisionReport::default()
        };

        let outcome = self.provision(&mut report, reporter).await;

        report.enter(Stage::Cleanup);
        self.cleanup();

        if let Err(err) = outcome {
            warn!(error = %err, stages = report.stages.len(), "Provisioning failed");
            return Err(err);
        }

        self.write_environment(&report.env)?;
        report.hook = self.run_hook(&report.env, reporter).await?;
        report.enter(Stage::Done);
        info!(stages = report.stages.len(), "Provisioning finished");
        Ok(report)
    }

    async fn provision<W: Write>(
        &self,
        report: &mut ProvisionReport,
        reporter: &mut Reporter<W>,
    ) -> Result<()> {
        report.enter(Stage::ResolveRuntime);
        let node = self.resolve_runtime(reporter).await?;

        report.enter(Stage::AdviseConstraints);
        for warning in advise(&self.config.engines.node, &self.config.engines.yarn) {
            reporter.warning(&warning);
            report.warnings.push(warning);
        }

        report.enter(Stage::InstallRuntime);
        report.npm = Some(self.install_runtime(&node, &mut report.env, reporter).await?);
        report.node = Some(node);

        report.enter(Stage::SelectPlan);
        let plan = InstallPlan::select(&self.config.engines.yarn);
        report.plan = Some(plan);
        info!(%plan, "Selected dependency workflow");
        if plan == InstallPlan::Yarn {
            report.yarn = Some(self.install_yarn(&mut report.env, reporter).await?);
        }

        report.enter(Stage::RestoreCache);
        let cache = CacheManager::new(
            self.layout.clone(),
            plan,
            self.config.settings.modules_cache,
        );
        let restored = self.restore_cache(&cache, reporter)?;
        let rebuild = restored == RestoreOutcome::RebuildRequired;
        report.restore = Some(restored);

        report.enter(Stage::InstallDependencies);
        self.install_dependencies(plan, rebuild, &report.env, reporter)
            .await?;

        report.enter(Stage::PruneOrSkip);
        if plan.needs_prune() {
            reporter.info("Pruning any extraneous modules");
            reporter.output(&self.packages.npm_prune(&report.env).await?);
        } else {
            debug!(%plan, "Skipping prune, the install already pruned");
        }

        report.enter(Stage::PersistCache);
        report.persist = Some(self.persist_cache(&cache, reporter)?);
        Ok(())
    }

    async fn resolve_runtime<W: Write>(&self, reporter: &mut Reporter<W>) -> Result<ResolvedVersion> {
        let engines = &self.config.engines;
        reporter.header("Installing binaries");
        reporter.info(&format!("engines.node: {}", engines.node));
        reporter.info(&format!("engines.npm: {}", engines.npm));
        if engines.yarn.is_specified() {
            reporter.info(&format!("engines.yarn: {}", engines.yarn));
        }

        if !engines.node.is_specified() {
            reporter.info("Defaulting to latest stable");
        }
        reporter.info(&format!(
            "Resolving node version {}...",
            shown_range(&engines.node)
        ));
        self.resolver.resolve_or_fail(NODE, &engines.node).await
    }

    async fn install_runtime<W: Write>(
        &self,
        node: &ResolvedVersion,
        env: &mut ToolEnv,
        reporter: &mut Reporter<W>,
    ) -> Result<NpmSetup> {
        reporter.info(&format!(
            "Downloading and installing node {}...",
            node.version
        ));
        let node_dir = self.node_dir();
        self.install_tool(NODE, node, &node_dir).await?;

        let settings = &self.config.settings;
        env.prepend_path(node_dir.join("bin"));
        env.set_var("NODE_HOME", node_dir.display().to_string());
        env.set_var("NPM_CONFIG_PRODUCTION", settings.production.to_string());
        env.set_var("NODE_ENV", settings.node_env.clone());

        let bundled = self.packages.npm_version(env).await?;
        let setup = NpmSetup::plan(bundled, &self.config.engines.npm);
        match &setup {
            NpmSetup::Bundled { version } => {
                reporter.info(&format!("Using default npm version: {version}"));
            }
            NpmSetup::Upgraded { from, to } => {
                reporter.info(&format!("Bootstrapping npm {to} (replacing {from})..."));
                self.packages.install_npm(to, env).await?;
            }
        }
        Ok(setup)
    }

    async fn install_yarn<W: Write>(
        &self,
        env: &mut ToolEnv,
        reporter: &mut Reporter<W>,
    ) -> Result<ResolvedVersion> {
        let constraint = &self.config.engines.yarn;
        reporter.info(&format!(
            "Resolving yarn version {}...",
            shown_range(constraint)
        ));
        let yarn = self.resolver.resolve_or_fail(YARN, constraint).await?;

        reporter.info(&format!(
            "Downloading and installing yarn ({})...",
            yarn.version
        ));
        let yarn_dir = self.yarn_dir();
        self.install_tool(YARN, &yarn, &yarn_dir).await?;

        env.prepend_path(yarn_dir.join("bin"));
        env.set_var(
            "YARN_CACHE_FOLDER",
            self.layout.yarn_cache().display().to_string(),
        );
        reporter.info(&format!("Installed yarn {}", yarn.version));
        Ok(yarn)
    }

    async fn install_tool(&self, tool: &str, version: &ResolvedVersion, dest: &Path) -> Result<()> {
        let archive = install_archive(
            self.downloader.as_ref(),
            &version.location,
            &self.scratch_dir(),
            dest,
        )
        .await
        .map_err(|e| Error::download(tool, e.to_string()))?;
        debug!(%tool, archive = %archive.display(), dest = %dest.display(), "Installed archive");
        Ok(())
    }

    fn restore_cache<W: Write>(
        &self,
        cache: &CacheManager,
        reporter: &mut Reporter<W>,
    ) -> Result<RestoreOutcome> {
        reporter.header("Restoring cache");
        let outcome = cache.restore()?;
        match &outcome {
            RestoreOutcome::Restored { files } => {
                reporter.info(&format!("Loading node_modules from cache ({files} files)"));
            }
            RestoreOutcome::RebuildRequired => {
                reporter.info("Prebuild detected (node_modules already exists)");
            }
            RestoreOutcome::Empty => reporter.info("No cache to restore"),
            RestoreOutcome::Disabled => reporter.info("Caching disabled"),
            RestoreOutcome::ToolManaged { cache_folder } => {
                reporter.info(&format!("Using yarn cache at {}", cache_folder.display()));
            }
        }
        Ok(outcome)
    }

    async fn install_dependencies<W: Write>(
        &self,
        plan: InstallPlan,
        rebuild: bool,
        env: &ToolEnv,
        reporter: &mut Reporter<W>,
    ) -> Result<()> {
        reporter.header("Installing dependencies");
        match plan {
            InstallPlan::Yarn => {
                reporter.info("Installing node modules (yarn.lock)");
                let output = self
                    .packages
                    .yarn_install(&self.layout.yarn_cache(), env)
                    .await?;
                reporter.output(&output);
            }
            InstallPlan::Npm => {
                if rebuild {
                    reporter.info("Rebuilding any native modules");
                    reporter.output(&self.packages.npm_rebuild(env).await?);
                }
                reporter.info("Installing node modules (package.json)");
                reporter.output(&self.packages.npm_install(env).await?);
            }
        }
        Ok(())
    }

    fn persist_cache<W: Write>(
        &self,
        cache: &CacheManager,
        reporter: &mut Reporter<W>,
    ) -> Result<PersistOutcome> {
        reporter.header("Caching build");
        let outcome = cache.persist()?;
        match &outcome {
            PersistOutcome::Saved { files } => {
                reporter.info(&format!("Saving node_modules ({files} files)"));
            }
            PersistOutcome::Cleared => reporter.info("Cleared node_modules cache"),
            PersistOutcome::Disabled => reporter.info("Caching disabled"),
            PersistOutcome::ToolManaged => reporter.info("Yarn cache updated during install"),
        }
        Ok(outcome)
    }

    fn cleanup(&self) {
        let build_dir = &self.layout.build_dir;
        for path in [
            build_dir.join(".node-gyp"),
            build_dir.join(".npm"),
            self.scratch_dir(),
        ] {
            match remove_if_exists(&path) {
                Ok(true) => debug!(path = %path.display(), "Removed transient artifact"),
                Ok(false) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Cleanup failed"),
            }
        }
    }

    fn write_environment(&self, env: &ToolEnv) -> Result<()> {
        env.write_profile(&self.profile_path(), &self.layout.build_dir)?;
        env.write_export(&self.export_path())
    }

    async fn run_hook<W: Write>(
        &self,
        env: &ToolEnv,
        reporter: &mut Reporter<W>,
    ) -> Result<Option<HookResult>> {
        let build_dir = &self.layout.build_dir;
        let hook_path = &self.config.settings.hook;
        let Some(hook) = nodepack_hooks::discover(build_dir, hook_path)
            .map_err(|e| Error::hook(build_dir.join(hook_path), e.to_string()))?
        else {
            return Ok(None);
        };

        reporter.header(&format!("Running {}", hook_path.display()));
        let result = nodepack_hooks::execute_hook(&hook, &env.command_env()?)
            .await
            .map_err(|e| Error::hook(hook.path(), e.to_string()))?;
        reporter.output(&result.stdout);

        if result.success {
            Ok(Some(result))
        } else {
            Err(Error::hook(hook.path(), result.failure_message()))
        }
    }
}

/// The constraint as shown in status lines.
fn shown_range(constraint: &VersionConstraint) -> &str {
    constraint.as_str().unwrap_or("latest stable")
}
