// src/module.rs

//! Module coordinates and dependency declarations
//!
//! A `Module` identifies a library by organization and name, independent of
//! version. A `Dependency` is a module plus a version request and the
//! auxiliary attributes (optionality, exclusions) that metadata declares;
//! the rule core treats those attributes as opaque.

use crate::error::{Error, Result};
use crate::version::{Version, VersionRequest};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A two-part library identifier, independent of version
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Module {
    pub organization: String,
    pub name: String,
}

impl Module {
    pub fn new(organization: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            name: name.into(),
        }
    }

    /// Parse a module from string format `organization:name`
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(org), Some(name), None) if !org.is_empty() && !name.is_empty() => {
                Ok(Self::new(org, name))
            }
            _ => Err(Error::InvalidInput(format!(
                "malformed module '{s}' (expected organization:name)"
            ))),
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.organization, self.name)
    }
}

impl FromStr for Module {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A declared dependency: module, version request, opaque attributes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dependency {
    pub module: Module,
    pub request: VersionRequest,
    pub optional: bool,
    pub exclusions: BTreeSet<Module>,
}

impl Dependency {
    pub fn new(module: Module, request: VersionRequest) -> Self {
        Self {
            module,
            request,
            optional: false,
            exclusions: BTreeSet::new(),
        }
    }

    /// A dependency on an exact declared version
    pub fn exact(module: Module, version: Version) -> Self {
        Self::new(module, VersionRequest::Exact(version))
    }

    /// Parse a dependency spec `organization:name:version-request`
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(org), Some(name), Some(req)) if !org.is_empty() && !name.is_empty() => {
                Ok(Self::new(Module::new(org, name), VersionRequest::parse(req)?))
            }
            _ => Err(Error::InvalidInput(format!(
                "malformed dependency '{s}' (expected organization:name:version)"
            ))),
        }
    }

    pub fn with_request(mut self, request: VersionRequest) -> Self {
        self.request = request;
        self
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_exclusions(mut self, exclusions: BTreeSet<Module>) -> Self {
        self.exclusions = exclusions;
        self
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.request)
    }
}

/// Fetched module metadata: the project's identity and what it declares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub module: Module,
    pub version: Version,
    pub dependencies: Vec<Dependency>,
}

impl Project {
    pub fn new(module: Module, version: Version) -> Self {
        Self {
            module,
            version,
            dependencies: Vec::new(),
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<Dependency>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_parse() {
        let m = Module::parse("org.example:core").unwrap();
        assert_eq!(m.organization, "org.example");
        assert_eq!(m.name, "core");
        assert_eq!(m.to_string(), "org.example:core");
    }

    #[test]
    fn test_module_parse_rejects_malformed() {
        assert!(Module::parse("no-colon").is_err());
        assert!(Module::parse(":name").is_err());
        assert!(Module::parse("org:").is_err());
        assert!(Module::parse("a:b:c").is_err());
    }

    #[test]
    fn test_module_ordering_is_structural() {
        let a = Module::new("org.a", "z");
        let b = Module::new("org.b", "a");
        assert!(a < b);
    }

    #[test]
    fn test_dependency_parse_spec() {
        let d = Dependency::parse("org.example:core:1.2.3").unwrap();
        assert_eq!(d.module, Module::new("org.example", "core"));
        assert_eq!(d.request, VersionRequest::Exact(Version::new("1.2.3")));
        assert!(!d.optional);
    }

    #[test]
    fn test_dependency_parse_spec_with_bound() {
        let d = Dependency::parse("org.example:core:>= 1.2").unwrap();
        assert_eq!(d.request, VersionRequest::AtLeast(Version::new("1.2")));
    }

    #[test]
    fn test_dependency_parse_rejects_missing_version() {
        assert!(Dependency::parse("org.example:core").is_err());
        assert!(Dependency::parse("org.example").is_err());
    }
}
