// src/resolution/mod.rs

//! Resolution state snapshots
//!
//! A `ResolutionState` is the value the engine advances toward a fixed
//! point. States produced by the engine are never mutated in place: every
//! mutator consumes the state and returns a new value, so prior states
//! remain valid snapshots for error messages and rule re-evaluation.

pub mod engine;
pub mod validate;

use crate::module::{Dependency, Module, Project};
use crate::version::Version;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

pub use engine::{FixedPointEngine, ResolutionEngine};
pub use validate::validate;

/// Rewrites dependency declarations before the engine gathers them,
/// used to re-seed reruns
pub type DependencyTransform = Arc<dyn Fn(&Dependency) -> Dependency + Send + Sync>;

/// Activation property enabling optional dependencies during gathering
pub const PROP_INCLUDE_OPTIONAL: &str = "include.optional";

/// Snapshot of graph-resolution progress
#[derive(Clone, Default)]
pub struct ResolutionState {
    /// The directly requested dependency set
    pub root_dependencies: Vec<Dependency>,
    /// Every dependency gathered so far, the shape of the graph
    pub dependencies: BTreeSet<Dependency>,
    /// Chosen version per module
    pub selected: BTreeMap<Module, Version>,
    /// Fetched metadata per resolved (module, version)
    pub projects: BTreeMap<(Module, Version), Project>,
    /// Fetch errors per (module, version)
    pub errors: BTreeMap<(Module, Version), Vec<String>>,
    /// Dependencies whose requests the selection cannot satisfy
    pub conflicts: BTreeSet<Dependency>,
    /// Version overrides that bypass reconciliation
    pub forced_versions: BTreeMap<Module, Version>,
    /// True iff the engine reached a fixed point within its bound
    pub done: bool,
    /// Dependency rewrite applied while gathering
    pub map_dependencies: Option<DependencyTransform>,
    /// Activation and property overrides consulted while gathering
    pub extra_properties: BTreeMap<String, String>,
}

impl ResolutionState {
    /// Initial state for a set of requested dependencies
    pub fn new(root_dependencies: Vec<Dependency>) -> Self {
        Self {
            root_dependencies,
            ..Default::default()
        }
    }

    /// Clear the requested-dependency set
    ///
    /// A rule-triggered rerun must re-derive everything from forced
    /// versions and the gathered graph shape, not from the original
    /// requests: a requested-version preference could otherwise override
    /// the fix.
    pub fn without_root_dependencies(mut self) -> Self {
        self.root_dependencies.clear();
        self
    }

    /// Add forced-version overrides, replacing existing entries per module
    pub fn with_forced_versions<I>(mut self, forced: I) -> Self
    where
        I: IntoIterator<Item = (Module, Version)>,
    {
        self.forced_versions.extend(forced);
        self
    }

    pub fn with_map_dependencies(mut self, transform: Option<DependencyTransform>) -> Self {
        self.map_dependencies = transform;
        self
    }

    pub fn with_extra_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.extra_properties = properties;
        self
    }

    /// The version the graph resolved a module to, if any
    pub fn selected_version(&self, module: &Module) -> Option<&Version> {
        self.selected.get(module)
    }

    /// Resolved version for a module, falling back to a project-cache scan
    /// when the selection map has no entry
    pub fn resolved_version(&self, module: &Module) -> Option<&Version> {
        self.selected.get(module).or_else(|| {
            self.projects
                .keys()
                .filter(|(m, _)| m == module)
                .map(|(_, v)| v)
                .max()
        })
    }

    /// Fetched metadata for a resolved (module, version) pair
    pub fn project(&self, module: &Module, version: &Version) -> Option<&Project> {
        self.projects.get(&(module.clone(), version.clone()))
    }

    /// All (module, version) pairs the graph resolved to
    pub fn resolved_pairs(&self) -> impl Iterator<Item = (&Module, &Version)> {
        self.selected.iter()
    }

    /// Whether optional dependencies take part in gathering
    pub(crate) fn include_optional(&self) -> bool {
        self.extra_properties
            .get(PROP_INCLUDE_OPTIONAL)
            .is_some_and(|v| v == "true")
    }
}

impl fmt::Debug for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionState")
            .field("root_dependencies", &self.root_dependencies)
            .field("dependencies", &self.dependencies)
            .field("selected", &self.selected)
            .field("projects", &self.projects.keys().collect::<Vec<_>>())
            .field("errors", &self.errors)
            .field("conflicts", &self.conflicts)
            .field("forced_versions", &self.forced_versions)
            .field("done", &self.done)
            .field("map_dependencies", &self.map_dependencies.as_ref().map(|_| "<transform>"))
            .field("extra_properties", &self.extra_properties)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(org: &str, name: &str, version: &str) -> Dependency {
        Dependency::exact(Module::new(org, name), Version::new(version))
    }

    #[test]
    fn test_without_root_dependencies_preserves_graph_shape() {
        let mut state = ResolutionState::new(vec![dep("g", "a", "1.0")]);
        state.dependencies.insert(dep("g", "b", "2.0"));
        state.selected.insert(Module::new("g", "b"), Version::new("2.0"));

        let cleared = state.without_root_dependencies();
        assert!(cleared.root_dependencies.is_empty());
        assert_eq!(cleared.dependencies.len(), 1);
        assert_eq!(
            cleared.selected_version(&Module::new("g", "b")),
            Some(&Version::new("2.0"))
        );
    }

    #[test]
    fn test_with_forced_versions_replaces_per_module() {
        let state = ResolutionState::new(Vec::new())
            .with_forced_versions([(Module::new("g", "a"), Version::new("1.0"))])
            .with_forced_versions([(Module::new("g", "a"), Version::new("2.0"))]);
        assert_eq!(
            state.forced_versions.get(&Module::new("g", "a")),
            Some(&Version::new("2.0"))
        );
    }

    #[test]
    fn test_mutators_return_new_values() {
        let original = ResolutionState::new(vec![dep("g", "a", "1.0")]);
        let modified = original
            .clone()
            .with_forced_versions([(Module::new("g", "a"), Version::new("2.0"))]);
        // the prior snapshot is untouched
        assert!(original.forced_versions.is_empty());
        assert_eq!(modified.forced_versions.len(), 1);
    }

    #[test]
    fn test_resolved_version_falls_back_to_project_cache() {
        let module = Module::new("g", "a");
        let mut state = ResolutionState::new(Vec::new());
        state.projects.insert(
            (module.clone(), Version::new("1.5")),
            Project::new(module.clone(), Version::new("1.5")),
        );
        assert_eq!(state.resolved_version(&module), Some(&Version::new("1.5")));
        assert_eq!(state.selected_version(&module), None);
    }

    #[test]
    fn test_include_optional_property() {
        let mut props = BTreeMap::new();
        props.insert(PROP_INCLUDE_OPTIONAL.to_string(), "true".to_string());
        let state = ResolutionState::new(Vec::new()).with_extra_properties(props);
        assert!(state.include_optional());

        let state = ResolutionState::new(Vec::new());
        assert!(!state.include_optional());
    }
}
