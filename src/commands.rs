// src/commands.rs
//! Command implementations for the covenant CLI

use crate::cli::Cli;
use crate::logger::{ResolutionLogger, SilentLogger, SpinnerLogger};
use crate::module::Dependency;
use crate::repository::Repository;
use crate::resolution::PROP_INCLUDE_OPTIONAL;
use crate::resolve::{Resolve, ResolveParams};
use crate::rules::parse_rules;
use anyhow::Result;
use clap::CommandFactory;
use clap_complete::Shell;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Run `covenant resolve`
pub fn cmd_resolve(
    dependencies: &[String],
    repositories: &[String],
    rules: Option<&str>,
    max_iterations: usize,
    include_optional: bool,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let dependencies = dependencies
        .iter()
        .map(|s| Dependency::parse(s))
        .collect::<crate::error::Result<Vec<_>>>()?;
    let repositories = repositories
        .iter()
        .map(|s| Repository::parse(s))
        .collect::<crate::error::Result<Vec<_>>>()?;

    let logger: Arc<dyn ResolutionLogger> = if quiet || json {
        Arc::new(SilentLogger)
    } else {
        Arc::new(SpinnerLogger::new())
    };

    let mut params = ResolveParams::new()
        .with_dependencies(dependencies)
        .with_repositories(repositories)
        .with_max_iterations(max_iterations)
        .with_logger(logger);
    if let Some(rules) = rules {
        params = params.with_rules_text(rules)?;
    }
    if include_optional {
        let mut properties = BTreeMap::new();
        properties.insert(PROP_INCLUDE_OPTIONAL.to_string(), "true".to_string());
        params = params.with_extra_properties(properties);
    }

    let outcome = Resolve::new(params)?.run_blocking()?;

    if json {
        let modules: serde_json::Map<String, serde_json::Value> = outcome
            .state
            .resolved_pairs()
            .map(|(module, version)| {
                (module.to_string(), serde_json::Value::String(version.to_string()))
            })
            .collect();
        let conflicts: Vec<serde_json::Value> = outcome
            .conflicts
            .iter()
            .map(|c| serde_json::Value::String(c.to_string()))
            .collect();
        let doc = serde_json::json!({
            "modules": modules,
            "conflicts": conflicts,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        for (module, version) in outcome.state.resolved_pairs() {
            println!("{module}:{version}");
        }
        for conflict in &outcome.conflicts {
            eprintln!("warning: {conflict}");
        }
    }

    Ok(())
}

/// Run `covenant rules`: parse and echo a rule configuration
pub fn cmd_rules(config: &str) -> Result<()> {
    let rules = parse_rules(config)?;
    for (rule, resolution) in rules {
        println!("{resolution}:{rule}");
    }
    Ok(())
}

/// Run `covenant completions`
pub fn cmd_completions(shell: Shell) -> Result<()> {
    let mut command = Cli::command();
    clap_complete::generate(shell, &mut command, "covenant", &mut std::io::stdout());
    Ok(())
}
