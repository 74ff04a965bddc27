//! Load config from a JSON file or string and resolve it into the runtime model.

use crate::config::resolved::{ParentLink, ResolvedModel, ResolvedResource};
use crate::config::{compile_patterns, validate, ApiConfig};
use crate::error::ConfigError;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Env var naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "REST_CONFIG_PATH";

pub fn load_from_str(json: &str) -> Result<ApiConfig, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Load(format!("parse: {}", e)))
}

pub async fn load_from_path(path: impl AsRef<Path>) -> Result<ApiConfig, ConfigError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    let config = load_from_str(&raw)?;
    tracing::info!(path = %path.display(), resources = config.resources.len(), "config loaded");
    Ok(config)
}

/// Load from the file named by `REST_CONFIG_PATH`.
pub async fn load_from_env() -> Result<ApiConfig, ConfigError> {
    let path = std::env::var(CONFIG_PATH_ENV)
        .map_err(|_| ConfigError::Load(format!("{} is not set", CONFIG_PATH_ENV)))?;
    load_from_path(path).await
}

/// Build resolved model from config (validates first).
pub fn resolve(config: &ApiConfig) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;

    let resources = config
        .resources
        .iter()
        .map(|r| {
            let resolved = ResolvedResource {
                name: r.name.clone(),
                properties: r.properties.iter().cloned().collect(),
                labels: r.labels.iter().cloned().collect(),
                operations: r.operations.iter().copied().collect(),
                parent: r.parent.as_ref().map(|p| ParentLink {
                    resource: p.resource.clone(),
                    key: p.key.clone(),
                }),
                validation: r.validation.clone(),
                patterns: compile_patterns(&r.name, &r.validation)?,
            };
            Ok((r.name.clone(), resolved))
        })
        .collect::<Result<HashMap<_, _>, ConfigError>>()?;

    Ok(ResolvedModel {
        base_path: config.base_path.trim_end_matches('/').to_string(),
        versions: config.versions.iter().copied().collect::<BTreeSet<_>>(),
        current_version: config.current_version,
        docs_url: config.docs_url.clone(),
        pagination: config.pagination.clone(),
        limits: config.limits.clone(),
        resources,
    })
}
