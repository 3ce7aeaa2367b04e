//! Command line interface definitions and error mapping.

use clap::{Args, Parser, Subcommand};
use miette::{Diagnostic, Report};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

use crate::tracing::{LogLevel, TracingFormat};

/// Successful exit code
pub const EXIT_OK: i32 = 0;
/// Unexpected error exit code
pub const EXIT_OTHER: i32 = 1;
/// CLI or configuration error exit code
pub const EXIT_CONFIG: i32 = 2;
/// Version resolution error exit code
pub const EXIT_RESOLUTION: i32 = 3;
/// Download, install command or hook error exit code
pub const EXIT_INSTALL: i32 = 4;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// CLI or configuration error (exit code 2)
    #[error("Configuration error: {message}")]
    #[diagnostic(code(nodepack::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// A version constraint could not be resolved (exit code 3)
    #[error("{message}")]
    #[diagnostic(code(nodepack::cli::resolution))]
    Resolution {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Installing a tool or dependencies failed (exit code 4)
    #[error("{message}")]
    #[diagnostic(code(nodepack::cli::install))]
    Install {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Other unexpected error (exit code 1)
    #[error("Unexpected error: {message}")]
    #[diagnostic(code(nodepack::cli::other))]
    Other {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new resolution error
    #[must_use]
    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new install error
    #[must_use]
    pub fn install(message: impl Into<String>) -> Self {
        Self::Install {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new other error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }

    /// Add help text to an existing error, returning a new error with the help text set.
    #[must_use]
    pub fn with_help(self, help_text: impl Into<String>) -> Self {
        let help = Some(help_text.into());
        match self {
            Self::Config { message, .. } => Self::Config { message, help },
            Self::Resolution { message, .. } => Self::Resolution { message, help },
            Self::Install { message, .. } => Self::Install { message, help },
            Self::Other { message, .. } => Self::Other { message, help },
        }
    }
}

/// Convert `nodepack_core::Error` to the matching `CliError` variant.
impl From<nodepack_core::Error> for CliError {
    fn from(err: nodepack_core::Error) -> Self {
        use nodepack_core::Error;

        match err {
            // Extract just the message to avoid "Configuration error: Configuration error:"
            Error::Configuration { message } => Self::config(message),
            Error::Platform { .. } => Self::config(err.to_string())
                .with_help("Set `resolver` in the config file to a resolver built for this host"),
            Error::Resolution {
                tool,
                constraint,
                kind,
                message,
            } => Self::resolution(message).with_help(format!(
                "{tool} constraint \"{constraint}\" failed: {kind}"
            )),
            Error::Download { .. } => Self::install(err.to_string())
                .with_help("Check network access to the download host"),
            // The command output goes first so the last line still names the command
            Error::InstallCommand { ref output, .. } => {
                let summary = err.to_string();
                let output = output.trim();
                if output.is_empty() {
                    Self::install(summary)
                } else {
                    let help = format!("{output}\n{summary}");
                    Self::install(summary).with_help(help)
                }
            }
            Error::Hook { .. } => Self::install(err.to_string()),
            Error::Io {
                source,
                path,
                operation,
            } => {
                let path_str = path
                    .as_ref()
                    .map_or(String::new(), |p| format!(" on {}", p.display()));
                Self::other(format!("I/O {operation} failed{path_str}: {source}"))
                    .with_help("Check file permissions and ensure the path exists")
            }
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CONFIG,
        CliError::Resolution { .. } => EXIT_RESOLUTION,
        CliError::Install { .. } => EXIT_INSTALL,
        CliError::Other { .. } => EXIT_OTHER,
    }
}

/// Render an error for humans on stderr
#[allow(clippy::print_stderr)]
pub fn render_error(err: &CliError) {
    let report = Report::new(err.clone());
    eprintln!("{report:?}");
    // Ensure output is flushed before potential process exit
    let _ = io::stderr().flush();
}

/// Provision a Node.js runtime and project dependencies for a build.
#[derive(Parser, Debug)]
#[command(name = "nodepack")]
#[command(about = "Provision a Node.js runtime and project dependencies for a build")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long = "log-level",
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    /// Log output format.
    #[arg(
        long = "log-format",
        global = true,
        help = "Set log output format",
        default_value = "compact",
        value_enum
    )]
    pub log_format: TracingFormat,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install node and the project's dependencies into a build directory.
    #[command(about = "Install node and the project's dependencies into a build directory")]
    Compile(CompileArgs),

    /// Resolve a version constraint without installing anything.
    #[command(about = "Resolve a version constraint and print `<version> <url>`")]
    Resolve(ResolveArgs),
}

/// Arguments of `nodepack compile`.
#[derive(Args, Debug, Clone)]
pub struct CompileArgs {
    /// Application directory to provision.
    #[arg(value_name = "BUILD_DIR")]
    pub build_dir: PathBuf,

    /// Directory persisted across builds.
    #[arg(value_name = "CACHE_DIR")]
    pub cache_dir: PathBuf,

    /// Directory of user configuration variables, one file per variable.
    #[arg(value_name = "ENV_DIR")]
    pub env_dir: Option<PathBuf>,

    /// Version constraints that override the config file.
    #[command(flatten)]
    pub engines: EngineArgs,

    /// TOML build configuration.
    #[arg(long, value_name = "FILE", help = "Path to a TOML build configuration")]
    pub config: Option<PathBuf>,

    /// Shared resolver options.
    #[command(flatten)]
    pub resolver: ResolverArgs,

    /// Print a JSON summary of the run to stdout after the build output.
    #[arg(long, help = "Print a JSON summary after the build output")]
    pub json: bool,
}

/// Version constraint overrides.
#[derive(Args, Debug, Clone, Default)]
pub struct EngineArgs {
    /// Node.js version constraint.
    #[arg(long, env = "NODEPACK_NODE_VERSION", value_name = "CONSTRAINT")]
    pub node_version: Option<String>,

    /// Yarn version constraint; selects the yarn workflow.
    #[arg(long, env = "NODEPACK_YARN_VERSION", value_name = "CONSTRAINT")]
    pub yarn_version: Option<String>,

    /// npm version constraint.
    #[arg(long, env = "NODEPACK_NPM_VERSION", value_name = "CONSTRAINT")]
    pub npm_version: Option<String>,
}

/// Where to find the version resolver.
#[derive(Args, Debug, Clone, Default)]
pub struct ResolverArgs {
    /// Explicit resolver program.
    #[arg(long, env = "NODEPACK_RESOLVER", value_name = "PATH")]
    pub resolver: Option<PathBuf>,

    /// Directory holding the per-platform `resolve-version-<os>` programs.
    #[arg(long, env = "NODEPACK_VENDOR_DIR", value_name = "DIR")]
    pub vendor_dir: Option<PathBuf>,
}

/// Arguments of `nodepack resolve`.
#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Tool to resolve (`node` or `yarn`).
    #[arg(value_name = "TOOL")]
    pub tool: String,

    /// Version constraint; empty or `null` means latest stable.
    #[arg(value_name = "CONSTRAINT", default_value = "")]
    pub constraint: String,

    /// Shared resolver options.
    #[command(flatten)]
    pub resolver: ResolverArgs,
}

/// Parse the process arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
