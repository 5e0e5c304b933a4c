// src/repository/mod.rs

//! Module metadata fetching
//!
//! Provides the fetch capability the resolution engine consumes: map a
//! (module, version) query to fetched project metadata, asynchronously.
//! Fetchers are composed into chains with fallback behavior, one fetcher
//! per configured repository, tried in order until one succeeds.

use crate::error::{Error, Result};
use crate::module::{Dependency, Module, Project};
use crate::version::{Version, VersionRequest};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use url::Url;
use tracing::{debug, warn};

/// A metadata repository endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub name: String,
    pub base_url: Url,
}

impl Repository {
    pub fn new(name: impl Into<String>, base_url: Url) -> Self {
        Self {
            name: name.into(),
            base_url,
        }
    }

    /// Parse a repository from a URL string, naming it after its host
    pub fn parse(s: &str) -> Result<Self> {
        let base_url = Url::parse(s)
            .map_err(|e| Error::InvalidInput(format!("invalid repository URL '{s}': {e}")))?;
        let name = base_url.host_str().unwrap_or("repository").to_string();
        Ok(Self { name, base_url })
    }
}

/// Maps a (module, version) query to fetched project metadata
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Fetch the metadata of one module version
    async fn fetch(&self, module: &Module, version: &Version) -> Result<Project>;

    /// Human-readable name for logging
    fn name(&self) -> &str;
}

/// JSON module descriptor served by metadata repositories
#[derive(Debug, Deserialize)]
struct ModuleDescriptor {
    organization: String,
    name: String,
    version: String,
    #[serde(default)]
    dependencies: Vec<DescriptorDependency>,
}

#[derive(Debug, Deserialize)]
struct DescriptorDependency {
    module: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    exclusions: Vec<String>,
}

impl ModuleDescriptor {
    fn into_project(self) -> Result<Project> {
        let module = Module::new(self.organization, self.name);
        let version = Version::new(self.version);

        let mut dependencies = Vec::with_capacity(self.dependencies.len());
        for dep in self.dependencies {
            let dep_module = Module::parse(&dep.module)?;
            let request = VersionRequest::parse(&dep.version)?;
            let exclusions = dep
                .exclusions
                .iter()
                .map(|s| Module::parse(s))
                .collect::<Result<BTreeSet<Module>>>()?;
            dependencies.push(
                Dependency::new(dep_module, request)
                    .with_optional(dep.optional)
                    .with_exclusions(exclusions),
            );
        }

        Ok(Project::new(module, version).with_dependencies(dependencies))
    }
}

/// HTTP metadata fetcher for one repository
///
/// Descriptors live at `{base}/{organization}/{name}/{version}.json`.
pub struct HttpMetadataFetcher {
    client: reqwest::Client,
    repository: Repository,
}

impl HttpMetadataFetcher {
    pub fn new(repository: Repository) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Download(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client, repository })
    }

    fn descriptor_url(&self, module: &Module, version: &Version) -> String {
        format!(
            "{}/{}/{}/{}.json",
            self.repository.base_url.as_str().trim_end_matches('/'),
            module.organization,
            module.name,
            version
        )
    }
}

#[async_trait]
impl MetadataFetcher for HttpMetadataFetcher {
    async fn fetch(&self, module: &Module, version: &Version) -> Result<Project> {
        let url = self.descriptor_url(module, version);
        debug!("fetching descriptor: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Download(format!("{}: request failed: {e}", self.name())))?;

        if !response.status().is_success() {
            return Err(Error::Download(format!(
                "{}: {} {} returned HTTP {}",
                self.name(),
                module,
                version,
                response.status()
            )));
        }

        let descriptor: ModuleDescriptor = response
            .json()
            .await
            .map_err(|e| Error::Download(format!("{}: invalid descriptor for {} {}: {e}", self.name(), module, version)))?;

        let project = descriptor.into_project()?;
        if &project.module != module || &project.version != version {
            warn!(
                "{}: descriptor identity mismatch, expected {} {} got {} {}",
                self.name(),
                module,
                version,
                project.module,
                project.version
            );
        }
        Ok(project)
    }

    fn name(&self) -> &str {
        &self.repository.name
    }
}

/// Tries fetchers in order until one succeeds
pub struct ChainFetcher {
    fetchers: Vec<Box<dyn MetadataFetcher>>,
}

impl ChainFetcher {
    pub fn new(fetchers: Vec<Box<dyn MetadataFetcher>>) -> Self {
        Self { fetchers }
    }

    /// Build one fetcher per repository, preserving order
    pub fn from_repositories(repositories: &[Repository]) -> Result<Self> {
        let fetchers = repositories
            .iter()
            .map(|repo| {
                HttpMetadataFetcher::new(repo.clone())
                    .map(|f| Box::new(f) as Box<dyn MetadataFetcher>)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(fetchers))
    }
}

#[async_trait]
impl MetadataFetcher for ChainFetcher {
    async fn fetch(&self, module: &Module, version: &Version) -> Result<Project> {
        let mut attempts = Vec::new();

        for fetcher in &self.fetchers {
            match fetcher.fetch(module, version).await {
                Ok(project) => {
                    debug!("{} served {} {}", fetcher.name(), module, version);
                    return Ok(project);
                }
                Err(e) => {
                    debug!("{} failed for {} {}: {}", fetcher.name(), module, version, e);
                    attempts.push(format!("{}: {e}", fetcher.name()));
                }
            }
        }

        Err(Error::Download(if attempts.is_empty() {
            format!("no repositories configured for {module} {version}")
        } else {
            format!(
                "all {} repositories failed for {} {}: {}",
                self.fetchers.len(),
                module,
                version,
                attempts.join("; ")
            )
        }))
    }

    fn name(&self) -> &str {
        "chain"
    }
}

/// Map-backed fetcher for tests and embedders
#[derive(Debug, Default)]
pub struct InMemoryFetcher {
    projects: BTreeMap<(Module, Version), Project>,
}

impl InMemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(mut self, project: Project) -> Self {
        self.projects
            .insert((project.module.clone(), project.version.clone()), project);
        self
    }
}

#[async_trait]
impl MetadataFetcher for InMemoryFetcher {
    async fn fetch(&self, module: &Module, version: &Version) -> Result<Project> {
        self.projects
            .get(&(module.clone(), version.clone()))
            .cloned()
            .ok_or_else(|| {
                Error::Download(format!("{module} {version} not found in in-memory repository"))
            })
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
