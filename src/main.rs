mod analyze;
mod classify;
mod cli;
mod commands;
mod dedup;
mod error;
mod extract;
mod keywords;
mod manifest;
mod materialize;
mod model;
mod normalize;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Organize(args) => commands::organize::run(args),
        Commands::Dedup(args) => commands::dedup::run(args),
        Commands::Flatten(args) => commands::flatten::run(args),
        Commands::Alphabetical(args) => commands::alphabetical::run(args),
        Commands::Recategorize(args) => commands::recategorize::run(args),
        Commands::Inspect(args) => commands::inspect::run(args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
