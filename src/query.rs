//! Query-string handling: `limit`, `offset`, `fields` and exact-match filters.

use crate::config::{PaginationConfig, ResolvedResource};
use crate::error::AppError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListQuery {
    pub pagination: Pagination,
    /// Projection from `fields=a,b`; `None` returns every property.
    pub fields: Option<Vec<String>>,
    /// Exact-match property filters, applied conjunctively.
    pub filters: Vec<(String, String)>,
}

impl ListQuery {
    pub fn defaults(pagination: &PaginationConfig) -> Self {
        ListQuery {
            pagination: Pagination {
                limit: pagination.default_limit,
                offset: 0,
            },
            fields: None,
            filters: Vec::new(),
        }
    }
}

/// Parse decoded query pairs for `resource`. Limits above `max_limit` are clamped.
pub fn parse_query(
    pairs: Vec<(String, String)>,
    resource: &ResolvedResource,
    pagination: &PaginationConfig,
) -> Result<ListQuery, AppError> {
    let mut query = ListQuery::defaults(pagination);

    for (k, v) in pairs {
        match k.as_str() {
            "limit" => {
                let limit: u32 = v
                    .trim()
                    .parse()
                    .map_err(|_| AppError::InvalidQuery(format!("limit must be a positive integer, got '{}'", v)))?;
                if limit == 0 {
                    return Err(AppError::InvalidQuery("limit must be at least 1".into()));
                }
                query.pagination.limit = limit.min(pagination.max_limit);
            }
            "offset" => {
                query.pagination.offset = v
                    .trim()
                    .parse()
                    .map_err(|_| AppError::InvalidQuery(format!("offset must be a non-negative integer, got '{}'", v)))?;
            }
            "fields" => {
                let fields: Vec<String> = v
                    .split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(String::from)
                    .collect();
                for f in &fields {
                    if !resource.accepts_property(f) {
                        return Err(AppError::InvalidQuery(format!(
                            "unknown field '{}' for {}",
                            f, resource.name
                        )));
                    }
                }
                query.fields = if fields.is_empty() { None } else { Some(fields) };
            }
            _ => {
                if !resource.accepts_property(&k) {
                    return Err(AppError::InvalidQuery(format!(
                        "unknown filter '{}' for {}",
                        k, resource.name
                    )));
                }
                query.filters.push((k, v));
            }
        }
    }

    Ok(query)
}
