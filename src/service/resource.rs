//! Intent execution: validates writes, calls the data store and shapes the result.

use crate::config::{ResolvedModel, ResolvedResource};
use crate::error::{AppError, StoreError};
use crate::response::{canonicalize_labels, instance_body, list_envelope};
use crate::router::{check_identifier, Intent, ParentScope, RequestTarget};
use crate::service::RequestValidator;
use crate::store::{DataStore, Record, Scope};
use serde_json::{json, Value};
use std::collections::HashSet;

pub struct ResourceService;

fn scope_of(parent: Option<&ParentScope>) -> Option<Scope<'_>> {
    parent.map(|p| Scope {
        key: &p.key,
        value: &p.id,
    })
}

fn to_value<T: serde::Serialize>(v: T) -> Result<Value, AppError> {
    serde_json::to_value(v).map_err(|e| AppError::Internal(format!("serialize: {}", e)))
}

fn expect_object(v: Value) -> Result<Record, AppError> {
    match v {
        Value::Object(m) => Ok(m),
        other => Err(AppError::BadRequest(format!(
            "each item must be a JSON object, got {}",
            type_name(&other)
        ))),
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reject undeclared properties, canonicalize labels, pin the parent key, then apply rules.
fn prepare_write(
    resource: &ResolvedResource,
    mut body: Record,
    parent: Option<&ParentScope>,
) -> Result<Record, AppError> {
    if let Some(unknown) = body.keys().find(|k| !resource.accepts_property(k)) {
        return Err(AppError::Validation(format!(
            "unknown property '{}' for {}",
            unknown, resource.name
        )));
    }
    canonicalize_labels(&mut body, &resource.labels).map_err(AppError::Validation)?;
    if let Some(p) = parent {
        match body.get(&p.key) {
            Some(Value::String(s)) if *s == p.id => {}
            None | Some(Value::Null) => {
                body.insert(p.key.clone(), Value::String(p.id.clone()));
            }
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "{} is {} but the path addresses {} '{}'",
                    p.key, other, p.resource, p.id
                )))
            }
        }
    }
    RequestValidator::validate(&body, &resource.validation, &resource.patterns)?;
    Ok(body)
}

/// Writes that do not come through the parent's sub-collection must name an existing
/// parent in the link key.
async fn check_parent_link(
    store: &dyn DataStore,
    resource: &ResolvedResource,
    record: &Record,
) -> Result<(), AppError> {
    let Some(link) = &resource.parent else {
        return Ok(());
    };
    let parent_id = match record.get(&link.key) {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        _ => {
            return Err(AppError::Validation(format!(
                "{} must name an existing {} id",
                link.key, link.resource
            )))
        }
    };
    match store.read(&link.resource, parent_id).await {
        Ok(_) => Ok(()),
        Err(StoreError::NotFound { .. }) => Err(AppError::Validation(format!(
            "{} references unknown {} '{}'",
            link.key, link.resource, parent_id
        ))),
        Err(e) => Err(e.into()),
    }
}

fn check_batch(model: &ResolvedModel, len: usize) -> Result<(), AppError> {
    if len > model.limits.max_batch {
        return Err(AppError::BadRequest(format!(
            "at most {} items per request",
            model.limits.max_batch
        )));
    }
    Ok(())
}

impl ResourceService {
    /// Execute the classified request. `body` is the parsed JSON body for write intents.
    pub async fn execute(
        store: &dyn DataStore,
        model: &ResolvedModel,
        target: &RequestTarget,
        body: Option<Value>,
    ) -> Result<Value, AppError> {
        let resource = model
            .resource(&target.resource)
            .ok_or_else(|| AppError::UnknownResource(target.resource.clone()))?;
        tracing::debug!(resource = %resource.name, intent = ?target.intent, "execute");

        if let Some(p) = &target.parent {
            store.read(&p.resource, &p.id).await?;
        }

        let id = target.instance_id.as_deref();
        match (target.intent, id) {
            (Intent::List, None) => Self::list(store, resource, target).await,
            (Intent::Create, None) => Self::create(store, model, resource, target, require_body(body)?).await,
            (Intent::ReplaceAll, None) => {
                Self::replace_all(store, model, resource, target, require_body(body)?).await
            }
            (Intent::DeleteAll, None) => {
                let deleted = store
                    .delete_all(&resource.name, scope_of(target.parent.as_ref()))
                    .await?;
                tracing::info!(resource = %resource.name, deleted, "collection cleared");
                Ok(json!({ "deleted": deleted }))
            }
            (Intent::Read, Some(id)) => {
                let record = store.read(&resource.name, id).await?;
                Ok(instance_body(record, &resource.labels, target.query.fields.as_deref()))
            }
            (Intent::Update, Some(id)) => Self::update(store, resource, id, require_body(body)?).await,
            (Intent::Delete, Some(id)) => {
                store.delete(&resource.name, id).await?;
                Ok(json!({ "id": id, "deleted": true }))
            }
            (intent, _) => Err(AppError::Internal(format!(
                "intent {:?} does not match target shape",
                intent
            ))),
        }
    }

    async fn list(
        store: &dyn DataStore,
        resource: &ResolvedResource,
        target: &RequestTarget,
    ) -> Result<Value, AppError> {
        let mut filters = target.query.filters.clone();
        if let Some(p) = &target.parent {
            filters.push((p.key.clone(), p.id.clone()));
        }
        let page = target.query.pagination;
        let (items, total) = store.list(&resource.name, &filters, page.limit, page.offset).await?;
        let fields = target.query.fields.as_deref();
        let results: Vec<Value> = items
            .into_iter()
            .map(|r| instance_body(r, &resource.labels, fields))
            .collect();
        to_value(list_envelope(results, total, page.offset, page.limit))
    }

    /// One object creates one instance; an array creates each in order.
    async fn create(
        store: &dyn DataStore,
        model: &ResolvedModel,
        resource: &ResolvedResource,
        target: &RequestTarget,
        body: Value,
    ) -> Result<Value, AppError> {
        let (items, single) = match body {
            Value::Array(items) => (items, false),
            obj @ Value::Object(_) => (vec![obj], true),
            other => {
                return Err(AppError::BadRequest(format!(
                    "body must be a JSON object or array, got {}",
                    type_name(&other)
                )))
            }
        };
        if items.is_empty() {
            return Err(AppError::BadRequest("body array must contain at least one item".into()));
        }
        check_batch(model, items.len())?;

        let mut prepared = Vec::with_capacity(items.len());
        for item in items {
            let record = expect_object(item)?;
            if record.contains_key("id") {
                return Err(AppError::Validation("id is assigned by the server".into()));
            }
            prepared.push(prepare_write(resource, record, target.parent.as_ref())?);
        }
        if target.parent.is_none() {
            for record in &prepared {
                check_parent_link(store, resource, record).await?;
            }
        }

        let mut created = Vec::with_capacity(prepared.len());
        for record in prepared {
            let id = store.create(&resource.name, record.clone()).await?;
            let mut record = record;
            record.insert("id".into(), Value::String(id));
            created.push(instance_body(record, &resource.labels, None));
        }
        tracing::info!(resource = %resource.name, count = created.len(), "created");

        if single {
            Ok(created.remove(0))
        } else {
            let n = created.len() as u32;
            to_value(list_envelope(created, u64::from(n), 0, n))
        }
    }

    async fn replace_all(
        store: &dyn DataStore,
        model: &ResolvedModel,
        resource: &ResolvedResource,
        target: &RequestTarget,
        body: Value,
    ) -> Result<Value, AppError> {
        let items = match body {
            Value::Array(items) => items,
            other => {
                return Err(AppError::BadRequest(format!(
                    "replacing a collection requires a JSON array, got {}",
                    type_name(&other)
                )))
            }
        };
        check_batch(model, items.len())?;

        let mut seen = HashSet::new();
        let mut prepared = Vec::with_capacity(items.len());
        for item in items {
            let mut record = expect_object(item)?;
            let id = record.remove("id");
            let mut record = prepare_write(resource, record, target.parent.as_ref())?;
            if target.parent.is_none() {
                check_parent_link(store, resource, &record).await?;
            }
            if let Some(id) = id {
                let id = match id {
                    Value::String(s) => s,
                    other => {
                        return Err(AppError::InvalidIdentifier(format!(
                            "id must be a string, got {}",
                            other
                        )))
                    }
                };
                check_identifier(&id)?;
                if !seen.insert(id.clone()) {
                    return Err(AppError::Conflict(format!("duplicate id '{}' in body", id)));
                }
                record.insert("id".into(), Value::String(id));
            }
            prepared.push(record);
        }

        let ids = store
            .replace_all(&resource.name, scope_of(target.parent.as_ref()), prepared)
            .await?;
        tracing::info!(resource = %resource.name, count = ids.len(), "collection replaced");
        Self::list(store, resource, target).await
    }

    /// Full replacement; creates the instance under `id` when it does not exist yet.
    async fn update(
        store: &dyn DataStore,
        resource: &ResolvedResource,
        id: &str,
        body: Value,
    ) -> Result<Value, AppError> {
        let mut record = match body {
            Value::Object(m) => m,
            other => {
                return Err(AppError::BadRequest(format!(
                    "body must be a JSON object, got {}",
                    type_name(&other)
                )))
            }
        };
        match record.remove("id") {
            None => {}
            Some(Value::String(s)) if s == id => {}
            Some(other) => {
                return Err(AppError::Conflict(format!(
                    "body id {} does not match path id '{}'",
                    other, id
                )))
            }
        }
        let record = prepare_write(resource, record, None)?;
        check_parent_link(store, resource, &record).await?;

        match store.update(&resource.name, id, record.clone()).await {
            Ok(()) => {}
            Err(StoreError::NotFound { .. }) => match store.insert(&resource.name, id, record.clone()).await {
                Ok(()) => tracing::info!(resource = %resource.name, id, "created by put"),
                // A concurrent PUT created it first; apply ours on top.
                Err(StoreError::Conflict(_)) => store.update(&resource.name, id, record.clone()).await?,
                Err(e) => return Err(e.into()),
            },
            Err(e) => return Err(e.into()),
        }

        let mut out = record;
        out.insert("id".into(), Value::String(id.to_string()));
        Ok(instance_body(out, &resource.labels, None))
    }
}

fn require_body(body: Option<Value>) -> Result<Value, AppError> {
    body.ok_or_else(|| AppError::BadRequest("request body required".into()))
}
