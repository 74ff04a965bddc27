//! Request validation from config rules.

use crate::config::ValidationRule;
use crate::error::AppError;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate body against per-property rules. All required fields must be present.
    /// `patterns` holds the compiled form of each rule's `pattern`.
    pub fn validate(
        body: &Map<String, Value>,
        rules: &HashMap<String, ValidationRule>,
        patterns: &HashMap<String, Regex>,
    ) -> Result<(), AppError> {
        for (prop, rule) in rules {
            let val = body.get(prop);
            if rule.required == Some(true) && (val.is_none() || val == Some(&Value::Null)) {
                return Err(AppError::Validation(format!("{} is required", prop)));
            }
            if let Some(v) = val {
                validate_field(prop, v, rule, patterns.get(prop))?;
            }
        }
        Ok(())
    }
}

fn validate_field(prop: &str, v: &Value, rule: &ValidationRule, pattern: Option<&Regex>) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    if let Some(format) = &rule.format {
        validate_format(prop, v, format)?;
    }
    if let Some(max) = rule.max_length {
        if let Some(s) = v.as_str() {
            if s.chars().count() > max as usize {
                return Err(AppError::Validation(format!("{} must be at most {} characters", prop, max)));
            }
        }
    }
    if let Some(min) = rule.min_length {
        if let Some(s) = v.as_str() {
            if s.chars().count() < min as usize {
                return Err(AppError::Validation(format!("{} must be at least {} characters", prop, min)));
            }
        }
    }
    if let Some(re) = pattern {
        if let Some(s) = v.as_str() {
            if !re.is_match(s) {
                return Err(AppError::Validation(format!("{} does not match required pattern", prop)));
            }
        }
    }
    if let Some(ref allowed) = rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            return Err(AppError::Validation(format!(
                "{} must be one of: {:?}",
                prop,
                allowed.iter().take(5).collect::<Vec<_>>()
            )));
        }
    }
    if let Some(min) = rule.minimum {
        if let Some(n) = v.as_f64() {
            if n < min {
                return Err(AppError::Validation(format!("{} must be at least {}", prop, min)));
            }
        }
    }
    if let Some(max) = rule.maximum {
        if let Some(n) = v.as_f64() {
            if n > max {
                return Err(AppError::Validation(format!("{} must be at most {}", prop, max)));
            }
        }
    }
    Ok(())
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s), Value::String(t)) => s == t,
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn validate_format(prop: &str, v: &Value, format: &str) -> Result<(), AppError> {
    match format.to_lowercase().as_str() {
        "email" => {
            if let Some(s) = v.as_str() {
                if !s.contains('@') || s.len() < 3 {
                    return Err(AppError::Validation(format!("{} must be a valid email", prop)));
                }
            }
        }
        "uuid" => {
            if let Some(s) = v.as_str() {
                if uuid::Uuid::parse_str(s).is_err() {
                    return Err(AppError::Validation(format!("{} must be a valid UUID", prop)));
                }
            }
        }
        _ => {}
    }
    Ok(())
}
