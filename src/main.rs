// src/main.rs

use anyhow::Result;
use clap::Parser;
use covenant::cli::{Cli, Commands};
use covenant::commands;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Resolve {
            dependencies,
            repositories,
            rules,
            max_iterations,
            include_optional,
            json,
            quiet,
        } => commands::cmd_resolve(
            &dependencies,
            &repositories,
            rules.as_deref(),
            max_iterations,
            include_optional,
            json,
            quiet,
        ),
        Commands::Rules { config } => commands::cmd_rules(&config),
        Commands::Completions { shell } => commands::cmd_completions(shell),
    }
}
