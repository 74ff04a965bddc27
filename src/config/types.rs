//! Raw config types matching the JSON configuration file.

use crate::router::Intent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_base_path() -> String {
    "/api".into()
}

fn default_versions() -> Vec<u32> {
    vec![1]
}

fn default_current_version() -> u32 {
    1
}

fn default_docs_url() -> String {
    crate::error::DEFAULT_DOCS_URL.into()
}

fn all_operations() -> Vec<Intent> {
    Intent::ALL.to_vec()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "PaginationConfig::default_limit")]
    pub default_limit: u32,
    #[serde(default = "PaginationConfig::max_limit")]
    pub max_limit: u32,
}

impl PaginationConfig {
    fn default_limit() -> u32 {
        10
    }

    fn max_limit() -> u32 {
        100
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        PaginationConfig {
            default_limit: Self::default_limit(),
            max_limit: Self::max_limit(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum number of objects in one create or replace-all body.
    #[serde(default = "LimitsConfig::max_batch")]
    pub max_batch: usize,
    #[serde(default = "LimitsConfig::max_body_bytes")]
    pub max_body_bytes: usize,
}

impl LimitsConfig {
    fn max_batch() -> usize {
        100
    }

    fn max_body_bytes() -> usize {
        1024 * 1024
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            max_batch: Self::max_batch(),
            max_body_bytes: Self::max_body_bytes(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

/// Parent link for a sub-resource: instances carry the parent's id in `key`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParentConfig {
    pub resource: String,
    pub key: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Plural noun used as the URL segment, e.g. "magazines".
    pub name: String,
    /// Declared property names. Empty means any property is accepted.
    #[serde(default)]
    pub properties: Vec<String>,
    /// Properties holding label-like sub-entities, always rendered as `[{id, name}]`.
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default = "all_operations")]
    pub operations: Vec<Intent>,
    #[serde(default)]
    pub parent: Option<ParentConfig>,
    #[serde(default)]
    pub validation: HashMap<String, ValidationRule>,
}

/// Whole API configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Versions served under `{base_path}/v{N}`.
    #[serde(default = "default_versions")]
    pub versions: Vec<u32>,
    #[serde(default = "default_current_version")]
    pub current_version: u32,
    #[serde(default = "default_docs_url")]
    pub docs_url: String,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    pub resources: Vec<ResourceConfig>,
}
