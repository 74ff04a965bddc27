//! Config validation: versions, pagination bounds, resource naming and references.

use crate::config::{ApiConfig, ValidationRule};
use crate::error::ConfigError;
use regex::Regex;
use std::collections::{HashMap, HashSet};

const RESOURCE_NAME_PATTERN: &str = "^[a-z][a-z0-9_-]*$";

/// Compile every `pattern` rule of a resource, keyed by property.
pub fn compile_patterns(
    resource: &str,
    rules: &HashMap<String, ValidationRule>,
) -> Result<HashMap<String, Regex>, ConfigError> {
    rules
        .iter()
        .filter_map(|(prop, rule)| rule.pattern.as_ref().map(|p| (prop, p)))
        .map(|(prop, pattern)| {
            Regex::new(pattern)
                .map(|re| (prop.clone(), re))
                .map_err(|e| ConfigError::Validation(format!("{}.{}: invalid pattern: {}", resource, prop, e)))
        })
        .collect()
}

pub fn validate(config: &ApiConfig) -> Result<(), ConfigError> {
    if !config.base_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "base_path must start with '/': {}",
            config.base_path
        )));
    }

    if config.versions.is_empty() {
        return Err(ConfigError::Validation("at least one API version required".into()));
    }
    if config.versions.contains(&0) {
        return Err(ConfigError::Validation("API versions start at 1".into()));
    }
    if !config.versions.contains(&config.current_version) {
        return Err(ConfigError::MissingReference {
            kind: "version",
            id: format!("v{}", config.current_version),
        });
    }
    if config.current_version > 1 && !config.versions.contains(&(config.current_version - 1)) {
        return Err(ConfigError::Validation(format!(
            "previous version v{} must remain served alongside v{}",
            config.current_version - 1,
            config.current_version
        )));
    }

    let p = &config.pagination;
    if p.default_limit == 0 || p.default_limit > p.max_limit {
        return Err(ConfigError::Validation(format!(
            "pagination requires 1 <= default_limit <= max_limit (got {} / {})",
            p.default_limit, p.max_limit
        )));
    }
    if config.limits.max_batch == 0 {
        return Err(ConfigError::Validation("limits.max_batch must be at least 1".into()));
    }

    let name_re = Regex::new(RESOURCE_NAME_PATTERN)
        .map_err(|e| ConfigError::Validation(format!("resource name pattern: {}", e)))?;
    let mut by_name = HashMap::new();
    for r in &config.resources {
        if !name_re.is_match(&r.name) {
            return Err(ConfigError::Validation(format!(
                "resource name '{}' must be a lowercase noun",
                r.name
            )));
        }
        if !r.name.ends_with('s') {
            tracing::warn!(resource = %r.name, "resource name does not look plural");
        }
        if by_name.insert(r.name.as_str(), r).is_some() {
            return Err(ConfigError::DuplicateResource(r.name.clone()));
        }
    }

    for r in &config.resources {
        let declared: HashSet<&str> = r.properties.iter().map(String::as_str).collect();
        let is_declared = |name: &str| declared.is_empty() || declared.contains(name);

        for label in &r.labels {
            if !is_declared(label) {
                return Err(ConfigError::MissingReference {
                    kind: "label property",
                    id: format!("{}.{}", r.name, label),
                });
            }
        }
        for prop in r.validation.keys() {
            if !is_declared(prop) {
                return Err(ConfigError::MissingReference {
                    kind: "validated property",
                    id: format!("{}.{}", r.name, prop),
                });
            }
        }
        compile_patterns(&r.name, &r.validation)?;
        if declared.contains("id") {
            return Err(ConfigError::Validation(format!(
                "{}: 'id' is assigned by the store and cannot be declared",
                r.name
            )));
        }

        if let Some(parent) = &r.parent {
            let parent_cfg = by_name.get(parent.resource.as_str()).ok_or_else(|| ConfigError::MissingReference {
                kind: "parent resource",
                id: parent.resource.clone(),
            })?;
            if parent_cfg.parent.is_some() {
                return Err(ConfigError::Validation(format!(
                    "{}: parent '{}' is itself a sub-resource; nesting is limited to one level",
                    r.name, parent.resource
                )));
            }
            if parent.resource == r.name {
                return Err(ConfigError::Validation(format!("{}: resource cannot be its own parent", r.name)));
            }
            if parent.key.is_empty() || parent.key == "id" {
                return Err(ConfigError::Validation(format!(
                    "{}: parent key must name a property other than 'id'",
                    r.name
                )));
            }
        }
    }

    Ok(())
}
