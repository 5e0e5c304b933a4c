// src/resolve/mod.rs

//! Resolve orchestrator
//!
//! Wires the engine, validator, and rule loop into one entry point:
//! build the initial state from the parameters, run the engine to a fixed
//! point, validate (accumulating every independent failure), enforce the
//! configured rules in order (re-running the engine when a rule proposes a
//! fix), then re-check every rule against the final state.
//!
//! Rules are enforced strictly sequentially: a later rule observes the
//! post-fix state of every earlier rule, so there is no parallel rule
//! evaluation anywhere in the loop.

use crate::error::{Error, Result};
use crate::logger::ResolutionLogger;
use crate::module::{Dependency, Module, Project};
use crate::repository::{ChainFetcher, MetadataFetcher, Repository};
use crate::resolution::{
    validate, DependencyTransform, FixedPointEngine, ResolutionEngine, ResolutionState,
};
use crate::rules::{parse_rules, Rule, RuleConflict, RuleOutcome, RuleResolution};
use crate::version::Version;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default engine iteration bound
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Rewrites the fetch capability before resolution runs
pub type FetcherTransform =
    Arc<dyn Fn(Arc<dyn MetadataFetcher>) -> Arc<dyn MetadataFetcher> + Send + Sync>;

/// Rewrites the final resolution value
pub type StateTransform = Arc<dyn Fn(ResolutionState) -> ResolutionState + Send + Sync>;

/// Aggregate configuration for one resolution request
///
/// Immutable: every mutator returns a new aggregate.
#[derive(Clone)]
pub struct ResolveParams {
    pub dependencies: Vec<Dependency>,
    pub repositories: Vec<Repository>,
    pub rules: Vec<(Rule, RuleResolution)>,
    pub max_iterations: usize,
    pub extra_properties: BTreeMap<String, String>,
    map_dependencies: Option<DependencyTransform>,
    transform_fetcher: Option<FetcherTransform>,
    transform_state: Option<StateTransform>,
    logger: Option<Arc<dyn ResolutionLogger>>,
}

impl Default for ResolveParams {
    fn default() -> Self {
        Self {
            dependencies: Vec::new(),
            repositories: Vec::new(),
            rules: Vec::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            extra_properties: BTreeMap::new(),
            map_dependencies: None,
            transform_fetcher: None,
            transform_state: None,
            logger: None,
        }
    }
}

impl ResolveParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dependencies(mut self, dependencies: Vec<Dependency>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn add_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_repositories(mut self, repositories: Vec<Repository>) -> Self {
        self.repositories = repositories;
        self
    }

    pub fn with_rules(mut self, rules: Vec<(Rule, RuleResolution)>) -> Self {
        self.rules = rules;
        self
    }

    /// Parse and attach a rule configuration in the compact text format
    pub fn with_rules_text(self, text: &str) -> Result<Self> {
        let rules = parse_rules(text)?;
        Ok(self.with_rules(rules))
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_extra_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.extra_properties = properties;
        self
    }

    pub fn with_map_dependencies(mut self, transform: DependencyTransform) -> Self {
        self.map_dependencies = Some(transform);
        self
    }

    pub fn with_transform_fetcher(mut self, transform: FetcherTransform) -> Self {
        self.transform_fetcher = Some(transform);
        self
    }

    pub fn with_transform_state(mut self, transform: StateTransform) -> Self {
        self.transform_state = Some(transform);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn ResolutionLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    fn initial_state(&self) -> ResolutionState {
        ResolutionState::new(self.dependencies.clone())
            .with_map_dependencies(self.map_dependencies.clone())
            .with_extra_properties(self.extra_properties.clone())
    }
}

impl fmt::Debug for ResolveParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveParams")
            .field("dependencies", &self.dependencies)
            .field("repositories", &self.repositories)
            .field("rules", &self.rules)
            .field("max_iterations", &self.max_iterations)
            .field("extra_properties", &self.extra_properties)
            .field("map_dependencies", &self.map_dependencies.as_ref().map(|_| "<transform>"))
            .field("transform_fetcher", &self.transform_fetcher.as_ref().map(|_| "<transform>"))
            .field("transform_state", &self.transform_state.as_ref().map(|_| "<transform>"))
            .field("logger", &self.logger.as_ref().map(|_| "<logger>"))
            .finish()
    }
}

/// Successful resolution: the final state and the soft conflicts
/// accumulated along the way
#[derive(Debug)]
pub struct ResolveOutcome {
    pub state: ResolutionState,
    pub conflicts: Vec<RuleConflict>,
}

impl ResolveOutcome {
    /// The state alone, dropping the soft-conflict list
    pub fn into_state(self) -> ResolutionState {
        self.state
    }
}

/// Calls logger fetch hooks around the delegate fetcher
struct LoggedFetcher {
    inner: Arc<dyn MetadataFetcher>,
    logger: Arc<dyn ResolutionLogger>,
}

#[async_trait]
impl MetadataFetcher for LoggedFetcher {
    async fn fetch(&self, module: &Module, version: &Version) -> Result<Project> {
        self.logger.fetching(module, version);
        let result = self.inner.fetch(module, version).await;
        if result.is_ok() {
            self.logger.fetched(module, version);
        }
        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// The external entry point for rule-governed resolution
pub struct Resolve {
    params: ResolveParams,
    engine: Arc<dyn ResolutionEngine>,
    fetcher: Arc<dyn MetadataFetcher>,
}

impl Resolve {
    /// Resolve against the configured repositories over HTTP
    pub fn new(params: ResolveParams) -> Result<Self> {
        if params.repositories.is_empty() {
            return Err(Error::InvalidInput(
                "at least one repository is required".to_string(),
            ));
        }
        let fetcher = Arc::new(ChainFetcher::from_repositories(&params.repositories)?);
        Ok(Self::with_fetcher(params, fetcher))
    }

    /// Resolve against a caller-supplied fetch capability
    pub fn with_fetcher(params: ResolveParams, fetcher: Arc<dyn MetadataFetcher>) -> Self {
        Self {
            params,
            engine: Arc::new(FixedPointEngine::new()),
            fetcher,
        }
    }

    /// Replace the resolution engine
    pub fn with_engine(mut self, engine: Arc<dyn ResolutionEngine>) -> Self {
        self.engine = engine;
        self
    }

    fn effective_fetcher(&self) -> Arc<dyn MetadataFetcher> {
        let mut fetcher = self.fetcher.clone();
        if let Some(transform) = &self.params.transform_fetcher {
            fetcher = transform(fetcher);
        }
        if let Some(logger) = &self.params.logger {
            fetcher = Arc::new(LoggedFetcher {
                inner: fetcher,
                logger: logger.clone(),
            });
        }
        fetcher
    }

    /// Run resolution: engine, validation, rule enforcement, final check
    pub async fn run(&self) -> Result<ResolveOutcome> {
        if let Some(logger) = &self.params.logger {
            logger.init();
        }
        let result = self.run_inner().await;
        if let Some(logger) = &self.params.logger {
            logger.stop();
        }
        result
    }

    async fn run_inner(&self) -> Result<ResolveOutcome> {
        let fetcher = self.effective_fetcher();

        debug!(
            "resolving {} requested dependencies",
            self.params.dependencies.len()
        );
        let state = self
            .engine
            .resolve(self.params.initial_state(), fetcher.as_ref(), self.params.max_iterations)
            .await;
        validate(&state).map_err(Error::from_validation)?;

        let (state, conflicts) = self.enforce_rules(state).await?;
        self.final_check(&state)?;

        let state = match &self.params.transform_state {
            Some(transform) => transform(state),
            None => state,
        };
        info!("resolved {} modules", state.selected.len());
        Ok(ResolveOutcome { state, conflicts })
    }

    /// The rule enforcement pass
    ///
    /// Rules run in configuration order. A hard failure stops the loop
    /// immediately. A proposed fix triggers another engine run seeded from
    /// the fix's forced versions and the gathered graph shape, never from
    /// the original requests; the rerun is validated before any further
    /// rule is evaluated, and the fixing rule is not re-checked here (the
    /// final check covers it).
    pub async fn enforce_rules(
        &self,
        state: ResolutionState,
    ) -> Result<(ResolutionState, Vec<RuleConflict>)> {
        let fetcher = self.effective_fetcher();
        let mut state = state;
        let mut conflicts = Vec::new();

        for (rule, resolution) in &self.params.rules {
            debug!("enforcing rule {} ({})", rule, resolution);
            match rule.enforce(&state, *resolution) {
                RuleOutcome::Satisfied => {}
                RuleOutcome::SoftConflict(conflict) => {
                    warn!("{}", conflict);
                    conflicts.push(conflict);
                }
                RuleOutcome::HardFailure(conflict) => {
                    return Err(Error::UnsatisfiedRule {
                        rule: conflict.rule,
                        cause: conflict.cause,
                        state: conflict.state,
                    });
                }
                RuleOutcome::TryResolveAgain(proposed) => {
                    info!("rule {} requested another resolution pass", rule);
                    let reseed = proposed.without_root_dependencies();
                    let next = self
                        .engine
                        .resolve(reseed, fetcher.as_ref(), self.params.max_iterations)
                        .await;
                    // a bad fix is itself an error
                    validate(&next).map_err(Error::from_validation)?;
                    state = next;
                }
            }
        }

        Ok((state, conflicts))
    }

    /// Re-check every configured rule against the final state
    ///
    /// Any residual violation is fatal regardless of the configured
    /// severity: every rule already had its chance to self-correct or be
    /// tolerated, and a rule still failing here means the enforcement loop
    /// left the graph violating an invariant the configuration asked to
    /// hold.
    pub fn final_check(&self, state: &ResolutionState) -> Result<()> {
        for (rule, _) in &self.params.rules {
            if let Some(cause) = rule.check(state) {
                return Err(Error::UnsatisfiedRule {
                    rule: rule.clone(),
                    cause,
                    state: Box::new(state.clone()),
                });
            }
        }
        Ok(())
    }

    /// Synchronous bridge: block the calling thread until resolution
    /// completes
    pub fn run_blocking(&self) -> Result<ResolveOutcome> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Download(format!("failed to start runtime: {e}")))?;
        runtime.block_on(self.run())
    }
}
