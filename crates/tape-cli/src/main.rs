//! reshape-tape CLI
//!
//! Runs the fixture suite of a reshape plugin project from its working
//! directory.

use anyhow::Context;
use clap::{CommandFactory, Parser};
use clap_complete::{Shell, generate};
use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use tape_core::{
    ConfigLoader, Console, ConsoleReporter, FsModuleLoader, OptionLayer, Reporter, TapeError,
    init_tracing, run_suite, split_option_args,
};
use tracing::{debug, error};

#[derive(Parser)]
#[command(name = "reshape-tape")]
#[command(about = "Fixture-based conformance tests for reshape plugins")]
#[command(version = tape_core::VERSION)]
#[command(
    long_about = "Runs every case of the test table through the plugin under test and compares\n\
the rendered documents with the expectations stored next to the fixtures.\n\
\n\
Options are read from [package.metadata.reshape-tape] in Cargo.toml or\n\
reshapeConfig in package.json, and can be overridden with --key=value:\n  \
--plugin=<path>      Plugin executable, or a directory holding reshape-plugin\n  \
--config=<path>      Test table (default: .tape.toml)\n  \
--fixtures=<dir>     Fixtures directory (default: test)\n  \
--policy=<policy>    sequential (default) or parallel\n  \
--timeout=<ms>       Per-case transform timeout, 0 disables it\n\
\n\
Examples:\n  \
reshape-tape                               # Run with the project settings\n  \
reshape-tape --fixtures=\"./custom\"         # Use another fixtures directory\n  \
reshape-tape --policy=parallel -vv         # Run cases concurrently, with logs"
)]
struct Cli {
    /// Verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Generate shell completion script
    #[arg(
        long,
        value_enum,
        value_name = "SHELL",
        help = "Generate completion script for specified shell"
    )]
    generate_completion: Option<Shell>,
}

fn main() -> anyhow::Result<ExitCode> {
    // `--key=value` overrides are taken out before clap sees the arguments,
    // except for the CLI's own long flags.
    let command = Cli::command();
    let own_flags: Vec<&str> = command
        .get_arguments()
        .filter_map(|arg| arg.get_long())
        .chain(["help", "version"])
        .collect();
    let (overrides, args) = split_option_args(std::env::args_os(), &own_flags);
    let cli = Cli::parse_from(args);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    Ok(runtime.block_on(async_main(cli, overrides)))
}

async fn async_main(cli: Cli, overrides: OptionLayer) -> ExitCode {
    if let Some(shell) = cli.generate_completion {
        generate_completion_script(shell);
        return ExitCode::SUCCESS;
    }

    let level = match cli.verbose {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    };
    init_tracing(&format!("tape_core={level},reshape_tape={level}"));

    let console = if cli.no_color {
        Console::no_colors()
    } else {
        Console::new()
    };
    let reporter = Arc::new(
        ConsoleReporter::stdout()
            .with_console(console)
            .verbose(cli.verbose > 0),
    );

    match run(overrides, reporter.clone()).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            reporter.fatal(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(
    overrides: OptionLayer,
    reporter: Arc<ConsoleReporter>,
) -> Result<ExitCode, TapeError> {
    let cwd = std::env::current_dir().map_err(|e| TapeError::io_error(".", e))?;
    debug!("Running in {}", cwd.display());

    let config = ConfigLoader::resolve(&cwd, overrides)?;
    debug!(
        "Plugin {}, table {}, fixtures {}",
        config.plugin.display(),
        config.config.display(),
        config.fixtures.display()
    );

    let outcome = run_suite(&config, &FsModuleLoader, reporter).await?;
    Ok(outcome.exit_code())
}

fn generate_completion_script(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}
