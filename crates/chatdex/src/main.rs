//! Entry point for the `chatdex` binary.

use std::{io, process::ExitCode};

use chatdex::cli::{
    args::{Cli, Commands},
    commands,
    context::CommandContext,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter; `RUST_LOG` is read when it is unset.
const LOG_ENV: &str = "CHATDEX_LOG";

/// Parses arguments and runs the selected command.
fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let ctx = match &cli.command {
        Commands::Init(_) => CommandContext::load_cwd_only(),
        _ => CommandContext::load(),
    };
    let ctx = match ctx {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };

    commands::run(cli.command, &ctx)
}

/// Installs a stderr subscriber so stdout only carries command output.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
