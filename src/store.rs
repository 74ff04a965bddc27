//! Data-access collaborator: the trait the façade consumes plus an in-memory implementation.

use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// One stored instance: flat properties including its string `id`.
pub type Record = Map<String, Value>;

/// Restricts collection-wide operations to instances whose `key` property equals `value`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scope<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

#[async_trait]
pub trait DataStore: Send + Sync {
    /// Window of matching instances in insertion order, plus the total match count.
    async fn list(
        &self,
        resource: &str,
        filters: &[(String, String)],
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<Record>, u64), StoreError>;

    async fn read(&self, resource: &str, id: &str) -> Result<Record, StoreError>;

    /// Store a new instance; the store assigns and returns its id.
    async fn create(&self, resource: &str, body: Record) -> Result<String, StoreError>;

    /// Store a new instance under a caller-chosen id.
    async fn insert(&self, resource: &str, id: &str, body: Record) -> Result<(), StoreError>;

    /// Replace all properties of an existing instance.
    async fn update(&self, resource: &str, id: &str, body: Record) -> Result<(), StoreError>;

    async fn delete(&self, resource: &str, id: &str) -> Result<(), StoreError>;

    /// Swap the (scoped) collection for `items`. Items may carry an `id`; returns ids in order.
    async fn replace_all(
        &self,
        resource: &str,
        scope: Option<Scope<'_>>,
        items: Vec<Record>,
    ) -> Result<Vec<String>, StoreError>;

    /// Remove every (scoped) instance; returns how many were removed.
    async fn delete_all(&self, resource: &str, scope: Option<Scope<'_>>) -> Result<u64, StoreError>;
}

/// Query-string filter values are text; compare against the stored scalar's text form.
fn value_matches(v: &Value, expected: &str) -> bool {
    match v {
        Value::String(s) => s == expected,
        Value::Number(n) => n.to_string() == expected,
        Value::Bool(b) => b.to_string() == expected,
        _ => false,
    }
}

fn record_id(r: &Record) -> Option<&str> {
    r.get("id").and_then(Value::as_str)
}

fn in_scope(r: &Record, scope: Option<Scope<'_>>) -> bool {
    match scope {
        Some(s) => r.get(s.key).map(|v| value_matches(v, s.value)).unwrap_or(false),
        None => true,
    }
}

#[derive(Default)]
struct Collection {
    next_id: u64,
    rows: Vec<Record>,
}

impl Collection {
    fn position(&self, id: &str) -> Option<usize> {
        self.rows.iter().position(|r| record_id(r) == Some(id))
    }

    fn assign_id(&mut self, taken: &HashSet<String>) -> String {
        loop {
            self.next_id += 1;
            let id = self.next_id.to_string();
            if !taken.contains(&id) && self.position(&id).is_none() {
                return id;
            }
        }
    }

    fn push(&mut self, id: &str, mut body: Record) {
        body.insert("id".into(), Value::String(id.to_string()));
        self.rows.push(body);
    }
}

/// Insertion-ordered in-memory collections with sequential string ids.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".into())
}

fn not_found(resource: &str, id: &str) -> StoreError {
    StoreError::NotFound {
        resource: resource.to_string(),
        id: id.to_string(),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load records synchronously (demo data, tests). Returns assigned ids.
    pub fn seed(&self, resource: &str, items: impl IntoIterator<Item = Record>) -> Result<Vec<String>, StoreError> {
        let mut guard = self.collections.write().map_err(poisoned)?;
        let coll = guard.entry(resource.to_string()).or_default();
        let mut ids = Vec::new();
        for mut item in items {
            item.remove("id");
            let id = coll.assign_id(&HashSet::new());
            coll.push(&id, item);
            ids.push(id);
        }
        Ok(ids)
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn list(
        &self,
        resource: &str,
        filters: &[(String, String)],
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<Record>, u64), StoreError> {
        let guard = self.collections.read().map_err(poisoned)?;
        let Some(coll) = guard.get(resource) else {
            return Ok((Vec::new(), 0));
        };
        let matching: Vec<&Record> = coll
            .rows
            .iter()
            .filter(|r| filters.iter().all(|(k, v)| r.get(k).map(|x| value_matches(x, v)).unwrap_or(false)))
            .collect();
        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn read(&self, resource: &str, id: &str) -> Result<Record, StoreError> {
        let guard = self.collections.read().map_err(poisoned)?;
        guard
            .get(resource)
            .and_then(|c| c.position(id).map(|i| c.rows[i].clone()))
            .ok_or_else(|| not_found(resource, id))
    }

    async fn create(&self, resource: &str, body: Record) -> Result<String, StoreError> {
        if body.contains_key("id") {
            return Err(StoreError::Validation("id is assigned by the store".into()));
        }
        let mut guard = self.collections.write().map_err(poisoned)?;
        let coll = guard.entry(resource.to_string()).or_default();
        let id = coll.assign_id(&HashSet::new());
        coll.push(&id, body);
        Ok(id)
    }

    async fn insert(&self, resource: &str, id: &str, body: Record) -> Result<(), StoreError> {
        let mut guard = self.collections.write().map_err(poisoned)?;
        let coll = guard.entry(resource.to_string()).or_default();
        if coll.position(id).is_some() {
            return Err(StoreError::Conflict(format!("{} '{}' already exists", resource, id)));
        }
        coll.push(id, body);
        Ok(())
    }

    async fn update(&self, resource: &str, id: &str, mut body: Record) -> Result<(), StoreError> {
        let mut guard = self.collections.write().map_err(poisoned)?;
        let coll = guard.get_mut(resource).ok_or_else(|| not_found(resource, id))?;
        let i = coll.position(id).ok_or_else(|| not_found(resource, id))?;
        body.insert("id".into(), Value::String(id.to_string()));
        coll.rows[i] = body;
        Ok(())
    }

    async fn delete(&self, resource: &str, id: &str) -> Result<(), StoreError> {
        let mut guard = self.collections.write().map_err(poisoned)?;
        let coll = guard.get_mut(resource).ok_or_else(|| not_found(resource, id))?;
        let i = coll.position(id).ok_or_else(|| not_found(resource, id))?;
        coll.rows.remove(i);
        Ok(())
    }

    async fn replace_all(
        &self,
        resource: &str,
        scope: Option<Scope<'_>>,
        items: Vec<Record>,
    ) -> Result<Vec<String>, StoreError> {
        let mut guard = self.collections.write().map_err(poisoned)?;
        let coll = guard.entry(resource.to_string()).or_default();

        // Ids outside the scope survive the swap and cannot be reused.
        let mut taken: HashSet<String> = coll
            .rows
            .iter()
            .filter(|r| !in_scope(r, scope))
            .filter_map(|r| record_id(r).map(String::from))
            .collect();
        for item in &items {
            if let Some(id) = item.get("id") {
                let id = id
                    .as_str()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| StoreError::Validation(format!("id must be a non-empty string, got {}", id)))?;
                if !taken.insert(id.to_string()) {
                    return Err(StoreError::Conflict(format!("duplicate {} id '{}'", resource, id)));
                }
            }
        }

        coll.rows.retain(|r| !in_scope(r, scope));
        let mut ids = Vec::with_capacity(items.len());
        for mut item in items {
            let id = match item.remove("id").and_then(|v| v.as_str().map(String::from)) {
                Some(id) => id,
                None => {
                    let id = coll.assign_id(&taken);
                    taken.insert(id.clone());
                    id
                }
            };
            coll.push(&id, item);
            ids.push(id);
        }
        Ok(ids)
    }

    async fn delete_all(&self, resource: &str, scope: Option<Scope<'_>>) -> Result<u64, StoreError> {
        let mut guard = self.collections.write().map_err(poisoned)?;
        let Some(coll) = guard.get_mut(resource) else {
            return Ok(0);
        };
        let before = coll.rows.len();
        coll.rows.retain(|r| !in_scope(r, scope));
        Ok((before - coll.rows.len()) as u64)
    }
}
