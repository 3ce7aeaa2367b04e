//! nodepack CLI Application
//!
//! Provisions a Node.js runtime and project dependencies into a build
//! directory, reusing a cache directory across builds.

// CLI binary needs to output to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

use nodepack::cli::{self, Cli, Commands, EXIT_OK, EXIT_OTHER, exit_code_for, render_error};
use nodepack::command_span;
use nodepack::commands;
use nodepack::tracing::{TracingConfig, init_tracing};
use tracing::Instrument;

fn main() {
    // NOTE: Using eprintln! in panic hook is intentional - tracing infrastructure
    // may be corrupted during a panic, so we use the most reliable output method.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();

    let tracing_config = TracingConfig {
        format: cli.log_format,
        level: cli.level.into(),
        ..TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("Failed to initialize tracing: {e}");
        std::process::exit(EXIT_OTHER);
    }

    let exit_code = run_with_tokio(cli);
    std::process::exit(exit_code);
}

/// Create the tokio runtime and run the command on it
///
/// Stages run one after another, so a single-threaded runtime is enough.
fn run_with_tokio(cli: Cli) -> i32 {
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Fatal error: Failed to create tokio runtime: {e}");
            return EXIT_OTHER;
        }
    };

    rt.block_on(run(cli))
}

async fn run(cli: Cli) -> i32 {
    let result = match &cli.command {
        Commands::Compile(args) => commands::compile(args, std::io::stdout())
            .instrument(command_span!("compile"))
            .await
            .map(|_| ()),
        Commands::Resolve(args) => commands::resolve(args, std::io::stdout())
            .instrument(command_span!("resolve"))
            .await,
    };

    match result {
        Ok(()) => EXIT_OK,
        Err(err) => {
            render_error(&err);
            exit_code_for(&err)
        }
    }
}
