// src/cli.rs
//! CLI definitions for the covenant resolver
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use crate::resolve::DEFAULT_MAX_ITERATIONS;
use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "covenant")]
#[command(version)]
#[command(about = "Dependency resolver with rule-governed version policies", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve dependency coordinates against metadata repositories
    Resolve {
        /// Dependencies to resolve, as organization:name:version
        #[arg(required = true)]
        dependencies: Vec<String>,

        /// Repository base URL, repeatable; tried in declaration order
        #[arg(short, long = "repo", required = true)]
        repositories: Vec<String>,

        /// Rule configuration, e.g. "fail:SameVersion(g:a, g:b), DontBumpRootDependencies"
        #[arg(long)]
        rules: Option<String>,

        /// Maximum engine iterations before giving up
        #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
        max_iterations: usize,

        /// Include optional dependencies in the graph
        #[arg(long)]
        include_optional: bool,

        /// Print the resolved graph as JSON
        #[arg(long)]
        json: bool,

        /// Suppress the progress spinner
        #[arg(short, long)]
        quiet: bool,
    },

    /// Parse a rule configuration and print the recognized rules
    Rules {
        /// Rule configuration in the compact text format
        config: String,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}
