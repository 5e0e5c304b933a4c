// src/rules/parser.rs

//! Compact textual rule configuration parser
//!
//! Grammar:
//!
//! ```text
//! rules       := rule ("," ws* rule)*
//! rule        := (severity ":")? ruleExpr
//! severity    := "resolve" | "fail" | "warn"        // default: resolve
//! ruleExpr    := "AlwaysFail"
//!              | "DontBumpRootDependencies"
//!              | "SameVersion" "(" coordList ")"
//! coordList   := coord ("," ws* coord)*             // at least one coord
//! coord       := organization ":" name
//! ```
//!
//! The parser is strict: the entire input must be consumed, and a
//! recognized token immediately followed by anything other than a ","
//! separator or end of input is rejected.

use crate::module::Module;
use crate::rules::{Rule, RuleResolution};
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors from parsing a rule configuration string
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleParseError {
    #[error("empty rule configuration")]
    Empty,

    #[error("unknown rule at '{0}'")]
    UnknownRule(String),

    #[error("unexpected trailing input at '{0}'")]
    TrailingInput(String),

    #[error("expected a rule after ','")]
    DanglingComma,

    #[error("expected '(' after SameVersion at '{0}'")]
    ExpectedModuleList(String),

    #[error("missing ')' at '{0}'")]
    MissingClosingParen(String),

    #[error("SameVersion requires at least one organization:name module")]
    EmptySameVersion,

    #[error("malformed module '{0}' (expected organization:name)")]
    MalformedModule(String),
}

/// Parse an ordered rule configuration, e.g.
/// `"fail:DontBumpRootDependencies, SameVersion(g:a, g:b)"`
pub fn parse_rules(input: &str) -> Result<Vec<(Rule, RuleResolution)>, RuleParseError> {
    if input.is_empty() {
        return Err(RuleParseError::Empty);
    }

    let mut rules = Vec::new();
    let mut rest = input;
    loop {
        let (rule, resolution, remaining) = parse_one(rest)?;
        rules.push((rule, resolution));

        if remaining.is_empty() {
            break;
        }
        // parse_one only stops at a "," boundary or end of input
        let after_comma = &remaining[1..];
        rest = after_comma.trim_start_matches(' ');
        if rest.is_empty() {
            return Err(RuleParseError::DanglingComma);
        }
    }
    Ok(rules)
}

/// Parse a single rule, rejecting any trailing input
pub fn parse_rule(input: &str) -> Result<(Rule, RuleResolution), RuleParseError> {
    if input.is_empty() {
        return Err(RuleParseError::Empty);
    }
    let (rule, resolution, remaining) = parse_one(input)?;
    if !remaining.is_empty() {
        return Err(RuleParseError::TrailingInput(remaining.to_string()));
    }
    Ok((rule, resolution))
}

/// Parse one rule off the front of the input; the returned remainder is
/// either empty or starts with the "," separator
fn parse_one(input: &str) -> Result<(Rule, RuleResolution, &str), RuleParseError> {
    let (resolution, body) = if let Some(rest) = input.strip_prefix("resolve:") {
        (RuleResolution::TryResolve, rest)
    } else if let Some(rest) = input.strip_prefix("fail:") {
        (RuleResolution::Fail, rest)
    } else if let Some(rest) = input.strip_prefix("warn:") {
        (RuleResolution::Warn, rest)
    } else {
        (RuleResolution::TryResolve, input)
    };

    if let Some(rest) = body.strip_prefix("SameVersion") {
        let Some(list) = rest.strip_prefix('(') else {
            return Err(RuleParseError::ExpectedModuleList(rest.to_string()));
        };
        let Some(close) = list.find(')') else {
            return Err(RuleParseError::MissingClosingParen(body.to_string()));
        };
        let modules = parse_module_list(&list[..close])?;
        let remaining = boundary(&list[close + 1..])?;
        Ok((Rule::SameVersion(modules), resolution, remaining))
    } else if let Some(rest) = body.strip_prefix("DontBumpRootDependencies") {
        Ok((Rule::DontBumpRootDependencies, resolution, boundary(rest)?))
    } else if let Some(rest) = body.strip_prefix("AlwaysFail") {
        Ok((Rule::AlwaysFail, resolution, boundary(rest)?))
    } else {
        let fragment = body.split(',').next().unwrap_or(body);
        Err(RuleParseError::UnknownRule(fragment.to_string()))
    }
}

/// After a recognized rule, only a "," separator or end of input may follow
fn boundary(rest: &str) -> Result<&str, RuleParseError> {
    if rest.is_empty() || rest.starts_with(',') {
        Ok(rest)
    } else {
        Err(RuleParseError::TrailingInput(rest.to_string()))
    }
}

/// Parse the non-empty module list inside `SameVersion(...)`
fn parse_module_list(inner: &str) -> Result<BTreeSet<Module>, RuleParseError> {
    if inner.is_empty() {
        return Err(RuleParseError::EmptySameVersion);
    }

    let mut modules = BTreeSet::new();
    for (index, piece) in inner.split(',').enumerate() {
        // spaces are only allowed right after a separating comma
        let piece = if index == 0 {
            piece
        } else {
            piece.trim_start_matches(' ')
        };
        modules.insert(parse_module(piece)?);
    }
    Ok(modules)
}

fn parse_module(s: &str) -> Result<Module, RuleParseError> {
    let mut parts = s.split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(org), Some(name), None)
            if !org.is_empty()
                && !name.is_empty()
                && !org.contains(' ')
                && !name.contains(' ') =>
        {
            Ok(Module::new(org, name))
        }
        _ => Err(RuleParseError::MalformedModule(s.to_string())),
    }
}
