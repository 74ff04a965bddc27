//! Resource router: classifies method + URL into a resource, optional instance id and CRUD intent.
//!
//! Accepted shapes below `{base_path}/v{N}`:
//! `/{resource}`, `/{resource}/{id}` and `/{parent}/{id}/{resource}`.
//! The last segment may carry a `.json`, `.html` or `.csv` suffix.

use crate::config::ResolvedModel;
use crate::error::AppError;
use crate::query::{parse_query, ListQuery};
use axum::extract::Query;
use axum::http::{Method, Uri};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    List,
    Create,
    ReplaceAll,
    DeleteAll,
    Read,
    Update,
    Delete,
}

impl Intent {
    pub const ALL: [Intent; 7] = [
        Intent::List,
        Intent::Create,
        Intent::ReplaceAll,
        Intent::DeleteAll,
        Intent::Read,
        Intent::Update,
        Intent::Delete,
    ];

    pub fn for_collection(method: &Method) -> Option<Intent> {
        match *method {
            Method::GET => Some(Intent::List),
            Method::POST => Some(Intent::Create),
            Method::PUT => Some(Intent::ReplaceAll),
            Method::DELETE => Some(Intent::DeleteAll),
            _ => None,
        }
    }

    /// POST has no meaning on an instance.
    pub fn for_instance(method: &Method) -> Option<Intent> {
        match *method {
            Method::GET => Some(Intent::Read),
            Method::PUT => Some(Intent::Update),
            Method::DELETE => Some(Intent::Delete),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Json,
    Html,
    Csv,
}

impl Format {
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(Format::Json),
            "html" | "htm" => Some(Format::Html),
            "csv" => Some(Format::Csv),
            _ => None,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Format::Json => "application/json",
            Format::Html => "text/html; charset=utf-8",
            Format::Csv => "text/csv; charset=utf-8",
        }
    }
}

/// Parent instance scoping a sub-collection request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParentScope {
    pub resource: String,
    pub id: String,
    /// Property on the child resource holding `id`.
    pub key: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestTarget {
    pub version: u32,
    pub resource: String,
    pub parent: Option<ParentScope>,
    pub instance_id: Option<String>,
    pub intent: Intent,
    pub format: Format,
    pub query: ListQuery,
}

fn split_suffix(segment: &str) -> (&str, Option<&str>) {
    match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (segment, None),
    }
}

fn decode_segment(segment: &str) -> Result<String, AppError> {
    percent_decode_str(segment)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| AppError::BadRequest(format!("path segment is not valid UTF-8: {}", segment)))
}

/// `v{N}` with N written as plain decimal digits, no sign and no leading zero.
fn parse_version(segment: &str, model: &ResolvedModel) -> Result<u32, AppError> {
    let n: u32 = segment
        .strip_prefix('v')
        .filter(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) && !n.starts_with('0'))
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| AppError::UnsupportedVersion(segment.to_string()))?;
    if !model.serves_version(n) {
        return Err(AppError::UnsupportedVersion(segment.to_string()));
    }
    Ok(n)
}

/// An instance id must be addressable as a single path segment: not blank, no `/`,
/// and no trailing format suffix that the router would strip.
pub fn check_identifier(id: &str) -> Result<(), AppError> {
    if id.trim().is_empty() {
        return Err(AppError::InvalidIdentifier("identifier is empty".into()));
    }
    if id.contains('/') {
        return Err(AppError::InvalidIdentifier(format!("identifier '{}' contains '/'", id)));
    }
    if let (_, Some(ext)) = split_suffix(id) {
        if Format::from_extension(ext).is_some() {
            return Err(AppError::InvalidIdentifier(format!(
                "identifier '{}' ends in a format suffix",
                id
            )));
        }
    }
    Ok(())
}

fn identifier(segment: &str) -> Result<String, AppError> {
    check_identifier(segment)?;
    Ok(segment.to_string())
}

/// Classify a request. Stateless: the same input always yields the same target.
pub fn classify(method: &Method, uri: &Uri, model: &ResolvedModel) -> Result<RequestTarget, AppError> {
    let path = uri.path();
    let rest = path
        .strip_prefix(model.base_path.as_str())
        .filter(|r| r.starts_with('/'))
        .ok_or_else(|| AppError::BadRequest(format!("path outside API base {}: {}", model.base_path, path)))?;
    let rest = rest.trim_start_matches('/');
    let rest = rest.strip_suffix('/').unwrap_or(rest);

    let mut segments = rest
        .split('/')
        .map(decode_segment)
        .collect::<Result<Vec<String>, AppError>>()?;
    let version_segment = segments.remove(0);
    if version_segment.is_empty() {
        return Err(AppError::UnsupportedVersion("missing version segment".into()));
    }
    let version = parse_version(&version_segment, model)?;

    if segments.is_empty() {
        return Err(AppError::BadRequest("no resource in path".into()));
    }
    if segments.len() > 3 {
        return Err(AppError::PathTooDeep(segments.len()));
    }

    // A suffix on a resource name always selects a format; on an identifier only known
    // formats are stripped so ids containing '.' stay intact.
    let mut format = Format::Json;
    let last = segments.len() - 1;
    let is_collection_segment = last != 1;
    let (stem, ext) = {
        let (stem, ext) = split_suffix(&segments[last]);
        (stem.to_string(), ext.map(str::to_string))
    };
    match (ext.as_deref(), is_collection_segment) {
        (Some(ext), true) => {
            format = Format::from_extension(ext).ok_or_else(|| AppError::UnsupportedFormat(ext.to_string()))?;
            segments[last] = stem;
        }
        (Some(ext), false) => {
            if let Some(f) = Format::from_extension(ext) {
                format = f;
                segments[last] = stem;
            }
        }
        (None, _) => {}
    }

    let (resource_name, parent, instance_id) = match segments.as_slice() {
        [resource] => (resource.as_str(), None, None),
        [resource, id] => (resource.as_str(), None, Some(identifier(id)?)),
        [parent, parent_id, child] => {
            let parent_id = identifier(parent_id)?;
            model
                .resource(parent)
                .ok_or_else(|| AppError::UnknownResource(parent.to_string()))?;
            let child_res = model
                .resource(child)
                .ok_or_else(|| AppError::UnknownResource(child.to_string()))?;
            let link = child_res
                .parent
                .as_ref()
                .filter(|p| p.resource == *parent)
                .ok_or_else(|| AppError::UnknownResource(format!("{}/{{id}}/{}", parent, child)))?;
            let scope = ParentScope {
                resource: parent.to_string(),
                id: parent_id,
                key: link.key.clone(),
            };
            (child.as_str(), Some(scope), None)
        }
        _ => return Err(AppError::PathTooDeep(segments.len())),
    };

    let resource = model
        .resource(resource_name)
        .ok_or_else(|| AppError::UnknownResource(resource_name.to_string()))?;

    let intent = match instance_id {
        Some(_) => Intent::for_instance(method),
        None => Intent::for_collection(method),
    }
    .ok_or_else(|| AppError::MethodNotSupported {
        method: method.to_string(),
        target: path.to_string(),
    })?;
    if !resource.allows(intent) {
        return Err(AppError::MethodNotSupported {
            method: method.to_string(),
            target: path.to_string(),
        });
    }

    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri)
        .map_err(|e| AppError::InvalidQuery(e.body_text()))?;
    let query = parse_query(pairs, resource, &model.pagination)?;

    tracing::debug!(
        version,
        resource = resource_name,
        parent = ?parent.as_ref().map(|p| (&p.resource, &p.id)),
        id = ?instance_id,
        ?intent,
        ?format,
        "classified request"
    );

    Ok(RequestTarget {
        version,
        resource: resource_name.to_string(),
        parent,
        instance_id,
        intent,
        format,
        query,
    })
}
