//! Subcommand implementations.

use nodepack_cache::CacheLayout;
use nodepack_core::{BuildConfig, Error, Platform, VersionConstraint};
use nodepack_resolver::{ResolveBinaryBackend, RetryPolicy, VersionResolver};
use nodepack_tools_archive::HttpDownloader;
use nodepack_tools_pm::{NpmSetup, SystemRunner};
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cli::{CliError, CompileArgs, EngineArgs, ResolveArgs};
use crate::orchestrator::{Orchestrator, ProvisionReport};
use crate::reporter::Reporter;

/// Assemble the configuration for `compile`.
///
/// Layers, later winning: defaults, `--config` file, env dir, flags.
pub fn build_config(args: &CompileArgs) -> nodepack_core::Result<BuildConfig> {
    let mut config = match &args.config {
        Some(path) => BuildConfig::load(path)?,
        None => BuildConfig::default(),
    };
    if let Some(env_dir) = &args.env_dir {
        config.apply_env_dir(env_dir)?;
    }
    apply_engine_overrides(&mut config, &args.engines);
    if let Some(resolver) = &args.resolver.resolver {
        config.settings.resolver = Some(resolver.clone());
    }
    config.validate()?;
    debug!(?config, "Build configuration assembled");
    Ok(config)
}

fn apply_engine_overrides(config: &mut BuildConfig, engines: &EngineArgs) {
    if let Some(node) = &engines.node_version {
        config.engines.node = VersionConstraint::parse(node);
    }
    if let Some(yarn) = &engines.yarn_version {
        config.engines.yarn = VersionConstraint::parse(yarn);
    }
    if let Some(npm) = &engines.npm_version {
        config.engines.npm = VersionConstraint::parse(npm);
    }
}

/// Pick the resolver program: an explicit path, or the host platform's
/// program in the vendor dir.
pub fn resolver_backend(
    explicit: Option<&Path>,
    vendor_dir: Option<&Path>,
) -> nodepack_core::Result<ResolveBinaryBackend> {
    if let Some(program) = explicit {
        return Ok(ResolveBinaryBackend::with_program(program));
    }
    let platform = Platform::current()?;
    let vendor_dir = match vendor_dir {
        Some(dir) => dir.to_path_buf(),
        None => default_vendor_dir()?,
    };
    let backend = ResolveBinaryBackend::for_platform(platform, &vendor_dir);
    debug!(%platform, program = %backend.program().display(), "Using platform resolver");
    Ok(backend)
}

/// `vendor/` next to the directory holding the executable.
fn default_vendor_dir() -> nodepack_core::Result<PathBuf> {
    let exe = std::env::current_exe().map_err(|e| Error::io(e, None, "locate executable"))?;
    exe.parent()
        .and_then(Path::parent)
        .map(|root| root.join("vendor"))
        .ok_or_else(|| {
            Error::configuration(format!(
                "cannot derive vendor dir from {}; pass --vendor-dir",
                exe.display()
            ))
        })
}

/// Run `nodepack compile`, writing build output to `out`.
pub async fn compile<W: Write>(args: &CompileArgs, out: W) -> Result<ProvisionReport, CliError> {
    if !args.build_dir.is_dir() {
        return Err(CliError::config(format!(
            "build dir {} does not exist",
            args.build_dir.display()
        )));
    }
    std::fs::create_dir_all(&args.cache_dir).map_err(|e| {
        Error::io(e, Some(args.cache_dir.clone()), "create cache dir")
    })?;

    let config = build_config(args)?;
    let backend = resolver_backend(
        config.settings.resolver.as_deref(),
        args.resolver.vendor_dir.as_deref(),
    )?;
    let resolver = VersionResolver::new(
        Arc::new(backend),
        RetryPolicy::from_settings(&config.settings),
    );
    let downloader = HttpDownloader::new().map_err(|e| CliError::other(e.to_string()))?;

    let orchestrator = Orchestrator::new(
        config,
        CacheLayout::new(&args.build_dir, &args.cache_dir),
        resolver,
        Arc::new(downloader),
        Arc::new(SystemRunner),
    );

    let mut reporter = Reporter::new(out);
    let report = orchestrator.run(&mut reporter).await?;
    info!(warnings = reporter.warning_count(), "Compile finished");

    if args.json {
        let mut out = reporter.into_inner();
        writeln!(out, "{}", summary_json(&report))
            .map_err(|e| CliError::other(format!("failed to write summary: {e}")))?;
    }
    Ok(report)
}

/// Run `nodepack resolve`, printing `<version> <url>` to `out`.
pub async fn resolve<W: Write>(args: &ResolveArgs, mut out: W) -> Result<(), CliError> {
    let backend = resolver_backend(
        args.resolver.resolver.as_deref(),
        args.resolver.vendor_dir.as_deref(),
    )?;
    let resolver = VersionResolver::new(Arc::new(backend), RetryPolicy::default());
    let constraint = VersionConstraint::parse(&args.constraint);

    let resolved = resolver.resolve_or_fail(&args.tool, &constraint).await?;
    writeln!(out, "{resolved}")
        .map_err(|e| CliError::other(format!("failed to write result: {e}")))?;
    Ok(())
}

/// Machine-readable summary of a successful run.
#[must_use]
pub fn summary_json(report: &ProvisionReport) -> serde_json::Value {
    let npm = report.npm.as_ref().map(|setup| match setup {
        NpmSetup::Bundled { version } => version.clone(),
        NpmSetup::Upgraded { to, .. } => to.clone(),
    });
    json!({
        "node": report.node.as_ref().map(|n| n.version.clone()),
        "yarn": report.yarn.as_ref().map(|y| y.version.clone()),
        "npm": npm,
        "plan": report.plan.map(|p| p.to_string()),
        "stages": report.stages.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
        "warnings": report.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ResolverArgs;
    use tempfile::TempDir;

    fn compile_args(build: &Path, cache: &Path) -> CompileArgs {
        CompileArgs {
            build_dir: build.to_path_buf(),
            cache_dir: cache.to_path_buf(),
            env_dir: None,
            engines: EngineArgs::default(),
            config: None,
            resolver: ResolverArgs::default(),
            json: false,
        }
    }

    #[test]
    fn test_build_config_layering() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("nodepack.toml");
        std::fs::write(
            &config_path,
            "[engines]\nnode = \"12.x\"\nyarn = \"1.x\"\n\n[settings]\nmodules_cache = true\nnode_env = \"staging\"\n",
        )
        .unwrap();
        let env_dir = temp.path().join("env");
        std::fs::create_dir_all(&env_dir).unwrap();
        std::fs::write(env_dir.join("NODE_MODULES_CACHE"), "false").unwrap();

        let mut args = compile_args(temp.path(), temp.path());
        args.config = Some(config_path);
        args.env_dir = Some(env_dir);
        args.engines.node_version = Some("14.x".to_string());

        let config = build_config(&args).unwrap();
        assert_eq!(config.engines.node, VersionConstraint::parse("14.x"));
        assert_eq!(config.engines.yarn, VersionConstraint::parse("1.x"));
        assert!(!config.settings.modules_cache);
        assert_eq!(config.settings.node_env, "staging");
    }

    #[test]
    fn test_null_flag_means_unspecified() {
        let temp = TempDir::new().unwrap();
        let mut args = compile_args(temp.path(), temp.path());
        args.engines.yarn_version = Some("null".to_string());

        let config = build_config(&args).unwrap();
        assert!(!config.engines.yarn.is_specified());
    }

    #[test]
    fn test_resolver_backend_prefers_explicit_program() {
        let backend =
            resolver_backend(Some(Path::new("/opt/resolve")), Some(Path::new("/vendor"))).unwrap();
        assert_eq!(backend.program(), Path::new("/opt/resolve"));
    }

    #[cfg(any(target_os = "linux", target_os = "macos"))]
    #[test]
    fn test_resolver_backend_uses_vendor_dir() {
        let backend = resolver_backend(None, Some(Path::new("/vendor"))).unwrap();
        let name = if cfg!(target_os = "linux") {
            "resolve-version-linux"
        } else {
            "resolve-version-darwin"
        };
        assert_eq!(backend.program(), Path::new("/vendor").join(name));
    }

    #[tokio::test]
    async fn test_compile_rejects_missing_build_dir() {
        let temp = TempDir::new().unwrap();
        let args = compile_args(&temp.path().join("missing"), temp.path());
        let err = compile(&args, Vec::new()).await.unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolve_prints_version_and_url() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let program = temp.path().join("resolve-version");
        std::fs::write(
            &program,
            "#!/bin/sh\necho \"14.2.0 https://example/node-v14.2.0-linux-x64.tar.gz\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

        let args = ResolveArgs {
            tool: "node".to_string(),
            constraint: "14.x".to_string(),
            resolver: ResolverArgs {
                resolver: Some(program),
                vendor_dir: None,
            },
        };
        let mut out = Vec::new();
        resolve(&args, &mut out).await.unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "14.2.0 https://example/node-v14.2.0-linux-x64.tar.gz\n"
        );
    }
}
