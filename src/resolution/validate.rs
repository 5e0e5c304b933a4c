// src/resolution/validate.rs

//! Terminal-state validation with error accumulation
//!
//! The three checks are independent and initial resolution failures usually
//! are too, so all failing checks are surfaced together instead of stopping
//! at the first.

use crate::error::Error;
use crate::module::Dependency;
use crate::resolution::ResolutionState;
use crate::version::VersionRequest;

/// Check a terminal resolution state
///
/// Returns every failing check in order: done flag, per-module fetch
/// errors, engine-reported conflicts.
pub fn validate(state: &ResolutionState) -> Result<(), Vec<Error>> {
    let mut failures = Vec::new();

    if !state.done {
        failures.push(Error::MaximumIterationsReached {
            state: Box::new(state.clone()),
        });
    }

    for ((module, version), errors) in &state.errors {
        failures.push(Error::CantDownloadModule {
            module: module.clone(),
            version: version.clone(),
            errors: errors.clone(),
        });
    }

    if !state.conflicts.is_empty() {
        let conflicts: Vec<Dependency> = state
            .conflicts
            .iter()
            .map(|dep| rewrite_to_resolved(state, dep))
            .collect();
        failures.push(Error::ConflictingDependencies {
            state: Box::new(state.clone()),
            conflicts,
        });
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures)
    }
}

/// Report a conflicting entry at the version the graph actually resolved
/// to, keeping the declared request when the module was never resolved
fn rewrite_to_resolved(state: &ResolutionState, dep: &Dependency) -> Dependency {
    match state.resolved_version(&dep.module) {
        Some(resolved) => dep
            .clone()
            .with_request(VersionRequest::Exact(resolved.clone())),
        None => dep.clone(),
    }
}
