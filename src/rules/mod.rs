// src/rules/mod.rs

//! Resolution rules and their enforcement semantics
//!
//! A rule is a policy over a terminal `ResolutionState`. Each variant
//! implements two operations: violation detection (`check`, used both
//! during enforcement and for the final pass) and enforcement
//! (`enforce`, which folds the configured severity in and may propose a
//! corrected state for another resolution pass).

pub mod parser;

use crate::module::Module;
use crate::resolution::ResolutionState;
use crate::version::{Version, VersionRequest};
use std::collections::BTreeSet;
use std::fmt;

pub use parser::{parse_rule, parse_rules};

/// A policy over a resolution state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Unconditionally in violation; never offers a fix
    AlwaysFail,
    /// All listed modules must resolve to one identical version
    SameVersion(BTreeSet<Module>),
    /// Directly requested dependencies must resolve to the requested version
    DontBumpRootDependencies,
}

/// How a violation found during enforcement is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleResolution {
    /// Apply the rule's fix when it offers one, else record a soft conflict
    #[default]
    TryResolve,
    /// Any violation is a hard failure
    Fail,
    /// Any violation is a soft conflict; a fix is never applied
    Warn,
}

/// A recorded rule violation: the rule, the state it was detected
/// against, and a human-readable cause
#[derive(Debug, Clone)]
pub struct RuleConflict {
    pub rule: Rule,
    pub state: Box<ResolutionState>,
    pub cause: String,
}

impl RuleConflict {
    fn new(rule: Rule, state: &ResolutionState, cause: String) -> Self {
        Self {
            rule,
            state: Box::new(state.clone()),
            cause,
        }
    }
}

impl fmt::Display for RuleConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule {} not satisfied: {}", self.rule, self.cause)
    }
}

/// Outcome of enforcing one rule against one state
#[derive(Debug)]
pub enum RuleOutcome {
    /// No violation
    Satisfied,
    /// Violated, but the severity tolerates continuing
    SoftConflict(RuleConflict),
    /// Violated and fatal
    HardFailure(RuleConflict),
    /// Violated; the rule proposes this corrected state for another
    /// resolution pass
    TryResolveAgain(Box<ResolutionState>),
}

impl Rule {
    /// A `SameVersion` rule over the given modules
    ///
    /// At least one module is required.
    pub fn same_version<I>(modules: I) -> crate::error::Result<Self>
    where
        I: IntoIterator<Item = Module>,
    {
        let set: BTreeSet<Module> = modules.into_iter().collect();
        if set.is_empty() {
            return Err(crate::error::Error::InvalidInput(
                "SameVersion requires at least one organization:name module".to_string(),
            ));
        }
        Ok(Rule::SameVersion(set))
    }

    /// Violation detection
    ///
    /// Returns the cause when the state violates this rule. The final
    /// check after the enforcement loop uses only this operation.
    pub fn check(&self, state: &ResolutionState) -> Option<String> {
        match self {
            Rule::AlwaysFail => Some("always fails".to_string()),

            Rule::SameVersion(modules) => {
                let resolved: Vec<(&Module, &Version)> = modules
                    .iter()
                    .filter_map(|m| state.selected_version(m).map(|v| (m, v)))
                    .collect();
                let distinct: BTreeSet<&Version> = resolved.iter().map(|(_, v)| *v).collect();
                if distinct.len() > 1 {
                    let listing = resolved
                        .iter()
                        .map(|(m, v)| format!("{m}:{v}"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    Some(format!("modules resolve to different versions: {listing}"))
                } else {
                    None
                }
            }

            Rule::DontBumpRootDependencies => {
                let bumped: Vec<String> = state
                    .root_dependencies
                    .iter()
                    .filter_map(|dep| {
                        let requested = match &dep.request {
                            VersionRequest::Exact(v) => v,
                            // a non-exact request cannot be "bumped"
                            _ => return None,
                        };
                        let resolved = state.selected_version(&dep.module)?;
                        (resolved != requested).then(|| {
                            format!("{} was bumped from {} to {}", dep.module, requested, resolved)
                        })
                    })
                    .collect();
                if bumped.is_empty() {
                    None
                } else {
                    Some(bumped.join("; "))
                }
            }
        }
    }

    /// A corrected state, when this variant can self-correct the
    /// detected violation
    fn try_fix(&self, state: &ResolutionState) -> Option<ResolutionState> {
        match self {
            Rule::AlwaysFail | Rule::DontBumpRootDependencies => None,

            Rule::SameVersion(modules) => {
                let unified = modules
                    .iter()
                    .filter_map(|m| state.selected_version(m))
                    .max()?
                    .clone();
                let forced = modules.iter().map(|m| (m.clone(), unified.clone()));
                Some(state.clone().with_forced_versions(forced))
            }
        }
    }

    /// Enforcement: detection folded with the configured severity
    pub fn enforce(&self, state: &ResolutionState, resolution: RuleResolution) -> RuleOutcome {
        let Some(cause) = self.check(state) else {
            return RuleOutcome::Satisfied;
        };

        match resolution {
            RuleResolution::Fail => {
                RuleOutcome::HardFailure(RuleConflict::new(self.clone(), state, cause))
            }
            RuleResolution::Warn => {
                RuleOutcome::SoftConflict(RuleConflict::new(self.clone(), state, cause))
            }
            RuleResolution::TryResolve => match self.try_fix(state) {
                Some(fixed) => RuleOutcome::TryResolveAgain(Box::new(fixed)),
                None => RuleOutcome::SoftConflict(RuleConflict::new(self.clone(), state, cause)),
            },
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::AlwaysFail => write!(f, "AlwaysFail"),
            Rule::SameVersion(modules) => {
                let listing = modules
                    .iter()
                    .map(Module::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "SameVersion({listing})")
            }
            Rule::DontBumpRootDependencies => write!(f, "DontBumpRootDependencies"),
        }
    }
}

impl fmt::Display for RuleResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleResolution::TryResolve => write!(f, "resolve"),
            RuleResolution::Fail => write!(f, "fail"),
            RuleResolution::Warn => write!(f, "warn"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Dependency;
    use crate::version::VersionRequest;

    fn module(org: &str, name: &str) -> Module {
        Module::new(org, name)
    }

    fn state_with(selected: &[(&str, &str, &str)]) -> ResolutionState {
        let mut state = ResolutionState::new(Vec::new());
        state.done = true;
        for (org, name, version) in selected {
            state
                .selected
                .insert(module(org, name), Version::new(*version));
        }
        state
    }

    #[test]
    fn test_always_fail_always_violates() {
        let state = state_with(&[]);
        assert!(Rule::AlwaysFail.check(&state).is_some());
        assert!(matches!(
            Rule::AlwaysFail.enforce(&state, RuleResolution::Fail),
            RuleOutcome::HardFailure(_)
        ));
        // no fix: TryResolve degrades to a soft conflict
        assert!(matches!(
            Rule::AlwaysFail.enforce(&state, RuleResolution::TryResolve),
            RuleOutcome::SoftConflict(_)
        ));
    }

    #[test]
    fn test_same_version_requires_modules() {
        assert!(Rule::same_version(Vec::new()).is_err());
        assert!(Rule::same_version(vec![module("g", "a")]).is_ok());
    }

    #[test]
    fn test_same_version_satisfied_when_versions_agree() {
        let rule = Rule::same_version(vec![module("g", "a"), module("g", "b")]).unwrap();
        let state = state_with(&[("g", "a", "1.0"), ("g", "b", "1.0")]);
        assert_eq!(rule.check(&state), None);
    }

    #[test]
    fn test_same_version_ignores_absent_modules() {
        let rule = Rule::same_version(vec![module("g", "a"), module("g", "absent")]).unwrap();
        let state = state_with(&[("g", "a", "1.0")]);
        assert_eq!(rule.check(&state), None);
    }

    #[test]
    fn test_same_version_violation_offers_fix_forcing_maximum() {
        let rule = Rule::same_version(vec![module("g", "a"), module("g", "b")]).unwrap();
        let state = state_with(&[("g", "a", "1.0"), ("g", "b", "2.0")]);

        assert!(rule.check(&state).is_some());
        match rule.enforce(&state, RuleResolution::TryResolve) {
            RuleOutcome::TryResolveAgain(fixed) => {
                assert_eq!(
                    fixed.forced_versions.get(&module("g", "a")),
                    Some(&Version::new("2.0"))
                );
                assert_eq!(
                    fixed.forced_versions.get(&module("g", "b")),
                    Some(&Version::new("2.0"))
                );
            }
            other => panic!("expected TryResolveAgain, got {other:?}"),
        }
    }

    #[test]
    fn test_same_version_warn_never_applies_fix() {
        let rule = Rule::same_version(vec![module("g", "a"), module("g", "b")]).unwrap();
        let state = state_with(&[("g", "a", "1.0"), ("g", "b", "2.0")]);
        assert!(matches!(
            rule.enforce(&state, RuleResolution::Warn),
            RuleOutcome::SoftConflict(_)
        ));
    }

    #[test]
    fn test_dont_bump_detects_bumped_root() {
        let mut state = state_with(&[("g", "a", "2.0")]);
        state.root_dependencies =
            vec![Dependency::exact(module("g", "a"), Version::new("1.0"))];

        let cause = Rule::DontBumpRootDependencies.check(&state).unwrap();
        assert!(cause.contains("bumped from 1.0 to 2.0"));

        // no fix is ever offered
        assert!(matches!(
            Rule::DontBumpRootDependencies.enforce(&state, RuleResolution::TryResolve),
            RuleOutcome::SoftConflict(_)
        ));
        assert!(matches!(
            Rule::DontBumpRootDependencies.enforce(&state, RuleResolution::Fail),
            RuleOutcome::HardFailure(_)
        ));
    }

    #[test]
    fn test_dont_bump_ignores_non_exact_requests() {
        let mut state = state_with(&[("g", "a", "2.0")]);
        state.root_dependencies = vec![Dependency::new(
            module("g", "a"),
            VersionRequest::AtLeast(Version::new("1.0")),
        )];
        assert_eq!(Rule::DontBumpRootDependencies.check(&state), None);
    }

    #[test]
    fn test_dont_bump_satisfied_when_versions_match() {
        let mut state = state_with(&[("g", "a", "1.0")]);
        state.root_dependencies =
            vec![Dependency::exact(module("g", "a"), Version::new("1.0"))];
        assert_eq!(Rule::DontBumpRootDependencies.check(&state), None);
    }

    #[test]
    fn test_rule_display_round_trips_through_parser() {
        let rules = [
            Rule::AlwaysFail,
            Rule::DontBumpRootDependencies,
            Rule::same_version(vec![module("g", "a"), module("g", "b")]).unwrap(),
        ];
        for rule in rules {
            let (parsed, resolution) = parse_rule(&rule.to_string()).unwrap();
            assert_eq!(parsed, rule);
            assert_eq!(resolution, RuleResolution::TryResolve);
        }
    }
}
