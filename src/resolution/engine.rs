// src/resolution/engine.rs

//! Iterative fixed-point resolution engine
//!
//! The engine advances a `ResolutionState` by repeatedly gathering the
//! dependency set (requested plus transitive), selecting one version per
//! module, and fetching metadata for pairs it has not seen. It stops when an
//! iteration changes nothing (fixed point, `done = true`) or when the
//! iteration bound runs out (`done = false`; non-termination is reported
//! through the state, never by erroring).
//!
//! Selection is highest-wins over the candidate versions the gathered
//! declarations propose. Forced versions bypass reconciliation entirely and
//! are never recorded as conflicts; that is what rule fixes rely on.

use crate::module::{Dependency, Module};
use crate::repository::MetadataFetcher;
use crate::resolution::ResolutionState;
use crate::version::Version;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Advances a resolution state toward a fixed point
///
/// Implementations must be idempotent to re-invocation with a fresh state
/// and must report non-termination via the state's `done` flag.
#[async_trait]
pub trait ResolutionEngine: Send + Sync {
    async fn resolve(
        &self,
        state: ResolutionState,
        fetcher: &dyn MetadataFetcher,
        max_iterations: usize,
    ) -> ResolutionState;
}

/// The default breadth-first engine
#[derive(Debug, Clone)]
pub struct FixedPointEngine {
    max_concurrent_fetches: usize,
}

impl FixedPointEngine {
    pub fn new() -> Self {
        Self {
            max_concurrent_fetches: 8,
        }
    }

    pub fn with_max_concurrent_fetches(mut self, max: usize) -> Self {
        self.max_concurrent_fetches = max.max(1);
        self
    }

    /// One gather/select/fetch pass; returns the next state and whether
    /// anything changed
    async fn step(
        &self,
        state: ResolutionState,
        fetcher: &dyn MetadataFetcher,
    ) -> (ResolutionState, bool) {
        let gathered = gather(&state);
        let (selected, conflicts) = select(&state, &gathered);

        let missing: Vec<(Module, Version)> = selected
            .iter()
            .map(|(m, v)| (m.clone(), v.clone()))
            .filter(|key| !state.projects.contains_key(key) && !state.errors.contains_key(key))
            .collect();

        let progressed = !missing.is_empty()
            || gathered != state.dependencies
            || selected != state.selected
            || conflicts != state.conflicts;

        let mut next = state;
        next.dependencies = gathered;
        next.selected = selected;
        next.conflicts = conflicts;

        if !missing.is_empty() {
            debug!("fetching metadata for {} modules", missing.len());
            let results = stream::iter(missing.into_iter().map(|(module, version)| async move {
                let fetched = fetcher.fetch(&module, &version).await;
                (module, version, fetched)
            }))
            .buffer_unordered(self.max_concurrent_fetches)
            .collect::<Vec<_>>()
            .await;

            for (module, version, fetched) in results {
                match fetched {
                    Ok(project) => {
                        next.projects.insert((module, version), project);
                    }
                    Err(e) => {
                        warn!("cannot fetch {} {}: {}", module, version, e);
                        next.errors.entry((module, version)).or_default().push(e.to_string());
                    }
                }
            }
        }

        (next, progressed)
    }
}

impl Default for FixedPointEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResolutionEngine for FixedPointEngine {
    async fn resolve(
        &self,
        state: ResolutionState,
        fetcher: &dyn MetadataFetcher,
        max_iterations: usize,
    ) -> ResolutionState {
        let mut state = state;
        state.done = false;

        for iteration in 0..max_iterations {
            let (next, progressed) = self.step(state, fetcher).await;
            state = next;
            if !progressed {
                debug!("fixed point after {} iterations", iteration);
                state.done = true;
                break;
            }
        }

        if !state.done {
            warn!("no fixed point within {} iterations", max_iterations);
        }
        state
    }
}

/// The dependency set to reconcile: requests, prior graph shape, and the
/// declarations of every selected project
fn gather(state: &ResolutionState) -> BTreeSet<Dependency> {
    let include_optional = state.include_optional();
    let transform = |dep: &Dependency| -> Dependency {
        match &state.map_dependencies {
            Some(f) => f(dep),
            None => dep.clone(),
        }
    };

    let mut gathered: BTreeSet<Dependency> = BTreeSet::new();
    for dep in &state.root_dependencies {
        if dep.optional && !include_optional {
            continue;
        }
        gathered.insert(transform(dep));
    }
    gathered.extend(state.dependencies.iter().cloned());

    // exclusions declared against a module prune that module's subtree
    let mut excluded: BTreeMap<&Module, BTreeSet<&Module>> = BTreeMap::new();
    for dep in &gathered {
        excluded.entry(&dep.module).or_default().extend(dep.exclusions.iter());
    }

    let mut expanded = Vec::new();
    for (module, version) in &state.selected {
        let Some(project) = state.projects.get(&(module.clone(), version.clone())) else {
            continue;
        };
        for dep in &project.dependencies {
            if dep.optional && !include_optional {
                continue;
            }
            if excluded.get(module).is_some_and(|ex| ex.contains(&dep.module)) {
                continue;
            }
            expanded.push(transform(dep));
        }
    }
    gathered.extend(expanded);

    gathered
}

/// Pick one version per module and record bound violations
fn select(
    state: &ResolutionState,
    gathered: &BTreeSet<Dependency>,
) -> (BTreeMap<Module, Version>, BTreeSet<Dependency>) {
    let mut by_module: BTreeMap<&Module, Vec<&Dependency>> = BTreeMap::new();
    for dep in gathered {
        by_module.entry(&dep.module).or_default().push(dep);
    }

    let mut selected = BTreeMap::new();
    let mut conflicts = BTreeSet::new();

    for (module, deps) in by_module {
        if let Some(forced) = state.forced_versions.get(module) {
            selected.insert(module.clone(), forced.clone());
            continue;
        }

        let Some(chosen) = deps.iter().filter_map(|d| d.request.candidate()).max().cloned()
        else {
            // only unconstrained or upper-bound requests: nothing proposes
            // a concrete version to fetch
            debug!("no candidate version for {}", module);
            continue;
        };

        for dep in &deps {
            if !dep.request.is_preference() && !dep.request.satisfies(&chosen) {
                conflicts.insert((*dep).clone());
            }
        }
        selected.insert(module.clone(), chosen);
    }

    (selected, conflicts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Project;
    use crate::repository::InMemoryFetcher;
    use crate::version::VersionRequest;

    fn module(org: &str, name: &str) -> Module {
        Module::new(org, name)
    }

    fn dep(org: &str, name: &str, version: &str) -> Dependency {
        Dependency::exact(module(org, name), Version::new(version))
    }

    fn project(org: &str, name: &str, version: &str, deps: Vec<Dependency>) -> Project {
        Project::new(module(org, name), Version::new(version)).with_dependencies(deps)
    }

    #[tokio::test]
    async fn test_resolves_transitive_chain() {
        let fetcher = InMemoryFetcher::new()
            .with_project(project("g", "a", "1.0", vec![dep("g", "b", "1.0")]))
            .with_project(project("g", "b", "1.0", vec![dep("g", "c", "1.0")]))
            .with_project(project("g", "c", "1.0", Vec::new()));

        let engine = FixedPointEngine::new();
        let state = engine
            .resolve(ResolutionState::new(vec![dep("g", "a", "1.0")]), &fetcher, 50)
            .await;

        assert!(state.done);
        assert!(state.conflicts.is_empty());
        assert!(state.errors.is_empty());
        assert_eq!(state.selected_version(&module("g", "a")), Some(&Version::new("1.0")));
        assert_eq!(state.selected_version(&module("g", "c")), Some(&Version::new("1.0")));
    }

    #[tokio::test]
    async fn test_highest_declared_version_wins() {
        let fetcher = InMemoryFetcher::new()
            .with_project(project("g", "a", "1.0", vec![dep("g", "c", "1.0")]))
            .with_project(project("g", "b", "1.0", vec![dep("g", "c", "2.0")]))
            .with_project(project("g", "c", "1.0", Vec::new()))
            .with_project(project("g", "c", "2.0", Vec::new()));

        let engine = FixedPointEngine::new();
        let state = engine
            .resolve(
                ResolutionState::new(vec![dep("g", "a", "1.0"), dep("g", "b", "1.0")]),
                &fetcher,
                50,
            )
            .await;

        assert!(state.done);
        // exact declarations are preferences: no conflict, highest wins
        assert!(state.conflicts.is_empty());
        assert_eq!(state.selected_version(&module("g", "c")), Some(&Version::new("2.0")));
    }

    #[tokio::test]
    async fn test_violated_upper_bound_is_a_conflict() {
        let capped = Dependency::new(module("g", "c"), VersionRequest::AtMost(Version::new("1.0")));
        let fetcher = InMemoryFetcher::new()
            .with_project(
                project("g", "a", "1.0", vec![capped.clone()]),
            )
            .with_project(project("g", "b", "1.0", vec![dep("g", "c", "2.0")]))
            .with_project(project("g", "c", "2.0", Vec::new()));

        let engine = FixedPointEngine::new();
        let state = engine
            .resolve(
                ResolutionState::new(vec![dep("g", "a", "1.0"), dep("g", "b", "1.0")]),
                &fetcher,
                50,
            )
            .await;

        assert!(state.done);
        assert_eq!(state.selected_version(&module("g", "c")), Some(&Version::new("2.0")));
        assert!(state.conflicts.contains(&capped));
    }

    #[tokio::test]
    async fn test_forced_version_bypasses_reconciliation_and_conflicts() {
        let fetcher = InMemoryFetcher::new()
            .with_project(project("g", "a", "1.0", vec![dep("g", "c", "2.0")]))
            .with_project(project("g", "c", "1.0", Vec::new()))
            .with_project(project("g", "c", "2.0", Vec::new()));

        let initial = ResolutionState::new(vec![dep("g", "a", "1.0")])
            .with_forced_versions([(module("g", "c"), Version::new("1.0"))]);

        let engine = FixedPointEngine::new();
        let state = engine.resolve(initial, &fetcher, 50).await;

        assert!(state.done);
        assert!(state.conflicts.is_empty());
        assert_eq!(state.selected_version(&module("g", "c")), Some(&Version::new("1.0")));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_recorded_not_fatal() {
        let fetcher = InMemoryFetcher::new()
            .with_project(project("g", "a", "1.0", vec![dep("g", "missing", "1.0")]));

        let engine = FixedPointEngine::new();
        let state = engine
            .resolve(ResolutionState::new(vec![dep("g", "a", "1.0")]), &fetcher, 50)
            .await;

        assert!(state.done);
        assert_eq!(state.errors.len(), 1);
        assert!(state
            .errors
            .contains_key(&(module("g", "missing"), Version::new("1.0"))));
    }

    #[tokio::test]
    async fn test_iteration_bound_reports_not_done() {
        let fetcher = InMemoryFetcher::new()
            .with_project(project("g", "a", "1.0", vec![dep("g", "b", "1.0")]))
            .with_project(project("g", "b", "1.0", Vec::new()));

        let engine = FixedPointEngine::new();
        // one iteration cannot reach the fixed point of a two-level graph
        let state = engine
            .resolve(ResolutionState::new(vec![dep("g", "a", "1.0")]), &fetcher, 1)
            .await;

        assert!(!state.done);
    }

    #[tokio::test]
    async fn test_exclusions_prune_subtree() {
        let mut excluding = dep("g", "a", "1.0");
        excluding.exclusions.insert(module("g", "c"));

        let fetcher = InMemoryFetcher::new()
            .with_project(project("g", "a", "1.0", vec![dep("g", "b", "1.0"), dep("g", "c", "1.0")]))
            .with_project(project("g", "b", "1.0", Vec::new()))
            .with_project(project("g", "c", "1.0", Vec::new()));

        let engine = FixedPointEngine::new();
        let state = engine
            .resolve(ResolutionState::new(vec![excluding]), &fetcher, 50)
            .await;

        assert!(state.done);
        assert_eq!(state.selected_version(&module("g", "b")), Some(&Version::new("1.0")));
        assert_eq!(state.selected_version(&module("g", "c")), None);
    }

    #[tokio::test]
    async fn test_optional_dependencies_skipped_by_default() {
        let optional = dep("g", "opt", "1.0").with_optional(true);
        let fetcher = InMemoryFetcher::new()
            .with_project(project("g", "a", "1.0", vec![optional]))
            .with_project(project("g", "opt", "1.0", Vec::new()));

        let engine = FixedPointEngine::new();
        let state = engine
            .resolve(ResolutionState::new(vec![dep("g", "a", "1.0")]), &fetcher, 50)
            .await;

        assert!(state.done);
        assert_eq!(state.selected_version(&module("g", "opt")), None);
    }

    #[tokio::test]
    async fn test_rerun_without_roots_keeps_graph_and_honors_forced() {
        let fetcher = InMemoryFetcher::new()
            .with_project(project("g", "a", "1.0", Vec::new()))
            .with_project(project("g", "a", "2.0", Vec::new()));

        let engine = FixedPointEngine::new();
        let first = engine
            .resolve(ResolutionState::new(vec![dep("g", "a", "1.0")]), &fetcher, 50)
            .await;
        assert_eq!(first.selected_version(&module("g", "a")), Some(&Version::new("1.0")));

        let reseed = first
            .with_forced_versions([(module("g", "a"), Version::new("2.0"))])
            .without_root_dependencies();
        let second = engine.resolve(reseed, &fetcher, 50).await;

        assert!(second.done);
        assert!(second.conflicts.is_empty());
        assert_eq!(second.selected_version(&module("g", "a")), Some(&Version::new("2.0")));
    }
}
