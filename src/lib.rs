// src/lib.rs

//! Covenant dependency resolver
//!
//! Resolves requested library coordinates (organization:name + version)
//! into a consistent dependency graph, then enforces user-configurable
//! rules over the result, re-running portions of resolution when a rule
//! can self-correct.
//!
//! # Architecture
//!
//! - Immutable state: resolution progress is a value, advanced by
//!   replacement, never mutated in place
//! - Fixed-point engine: iterative metadata expansion with highest-wins
//!   version selection and forced-version overrides
//! - Rules: ordered policies enforced sequentially, each able to tolerate,
//!   abort, or trigger another resolution pass
//! - Accumulated validation: independent resolution failures surface
//!   together, not one at a time

pub mod cli;
pub mod commands;
mod error;
pub mod logger;
pub mod module;
pub mod repository;
pub mod resolution;
pub mod resolve;
pub mod rules;
pub mod version;

pub use error::{Error, Result};
pub use logger::{ResolutionLogger, SilentLogger, SpinnerLogger, TraceLogger};
pub use module::{Dependency, Module, Project};
pub use repository::{ChainFetcher, HttpMetadataFetcher, InMemoryFetcher, MetadataFetcher, Repository};
pub use resolution::{FixedPointEngine, ResolutionEngine, ResolutionState};
pub use resolve::{Resolve, ResolveOutcome, ResolveParams, DEFAULT_MAX_ITERATIONS};
pub use rules::{parse_rule, parse_rules, Rule, RuleConflict, RuleOutcome, RuleResolution};
pub use version::{Version, VersionRequest};
