//! Resolved API model: config validated and flattened for runtime use.

use crate::config::{LimitsConfig, PaginationConfig, ValidationRule};
use crate::router::Intent;
use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParentLink {
    pub resource: String,
    /// Property on the child holding the parent's id.
    pub key: String,
}

#[derive(Clone, Debug)]
pub struct ResolvedResource {
    pub name: String,
    /// Empty when the resource accepts any property.
    pub properties: HashSet<String>,
    pub labels: HashSet<String>,
    pub operations: HashSet<Intent>,
    pub parent: Option<ParentLink>,
    pub validation: HashMap<String, ValidationRule>,
    /// Compiled `pattern` rules, keyed by property.
    pub patterns: HashMap<String, Regex>,
}

impl ResolvedResource {
    pub fn allows(&self, intent: Intent) -> bool {
        self.operations.contains(&intent)
    }

    /// Whether `name` may be used as a property (filter key or body field).
    pub fn accepts_property(&self, name: &str) -> bool {
        if name == "id" {
            return true;
        }
        if self.parent.as_ref().map(|p| p.key == name).unwrap_or(false) {
            return true;
        }
        self.properties.is_empty() || self.properties.contains(name)
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedModel {
    pub base_path: String,
    pub versions: BTreeSet<u32>,
    pub current_version: u32,
    pub docs_url: String,
    pub pagination: PaginationConfig,
    pub limits: LimitsConfig,
    pub resources: HashMap<String, ResolvedResource>,
}

impl ResolvedModel {
    pub fn resource(&self, name: &str) -> Option<&ResolvedResource> {
        self.resources.get(name)
    }

    pub fn serves_version(&self, version: u32) -> bool {
        self.versions.contains(&version)
    }
}
