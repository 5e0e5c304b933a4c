// src/error.rs

//! Crate-wide error type for resolution failures
//!
//! Validator failures (`MaximumIterationsReached`, `CantDownloadModule`,
//! `ConflictingDependencies`) are accumulated: a validation pass with several
//! independent failures surfaces all of them together as a single
//! `Validation` value. Rule failures (`UnsatisfiedRule`) are fail-fast: the
//! first one terminates the enforcement loop.

use crate::module::{Dependency, Module};
use crate::resolution::ResolutionState;
use crate::rules::parser::RuleParseError;
use crate::rules::Rule;
use crate::version::Version;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during dependency resolution
#[derive(Debug, Error)]
pub enum Error {
    /// Engine did not reach a fixed point within the configured bound
    #[error("maximum number of resolution iterations reached")]
    MaximumIterationsReached { state: Box<ResolutionState> },

    /// A requested (module, version) pair could not be fetched
    #[error("cannot download {module} {version}: {}", errors.join("; "))]
    CantDownloadModule {
        module: Module,
        version: Version,
        errors: Vec<String>,
    },

    /// The engine reported version conflicts after reaching its fixed point
    #[error("conflicting dependencies:{}", format_conflicts(conflicts))]
    ConflictingDependencies {
        state: Box<ResolutionState>,
        conflicts: Vec<Dependency>,
    },

    /// A rule's hard-failure condition was met
    #[error("rule {rule} not satisfied: {cause}")]
    UnsatisfiedRule {
        rule: Rule,
        cause: String,
        state: Box<ResolutionState>,
    },

    /// Several independent validator failures from one validation pass
    #[error("resolution failed with {} errors:{}", errors.len(), format_errors(errors))]
    Validation { errors: Vec<Error> },

    /// The rule configuration could not be parsed
    #[error(transparent)]
    RuleParse(#[from] RuleParseError),

    /// Metadata download failed
    #[error("download error: {0}")]
    Download(String),

    /// Malformed user input (coordinates, repository URLs, ...)
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

fn format_conflicts(conflicts: &[Dependency]) -> String {
    conflicts
        .iter()
        .map(|dep| format!("\n  {} {}", dep.module, dep.request))
        .collect()
}

fn format_errors(errors: &[Error]) -> String {
    errors.iter().map(|e| format!("\n  - {e}")).collect()
}

impl Error {
    /// Wrap a non-empty list of validator failures, unwrapping the
    /// single-failure case.
    pub(crate) fn from_validation(mut errors: Vec<Error>) -> Error {
        if errors.len() == 1 {
            errors.remove(0)
        } else {
            Error::Validation { errors }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_validation_single_unwraps() {
        let err = Error::from_validation(vec![Error::Download("boom".to_string())]);
        assert!(matches!(err, Error::Download(_)));
    }

    #[test]
    fn test_from_validation_several_wraps() {
        let err = Error::from_validation(vec![
            Error::Download("a".to_string()),
            Error::Download("b".to_string()),
        ]);
        match err {
            Error::Validation { errors } => assert_eq!(errors.len(), 2),
            other => panic!("expected Validation, got {other:?}"),
        }
    }
}
