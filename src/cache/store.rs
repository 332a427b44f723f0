//! Normalized entity store
//!
//! One record per identity, plus the root record carrying top-level remote
//! fields and client-only local fields. Resolved query results are cached
//! alongside the records together with the `(entity, field)` pairs they read,
//! so a write only invalidates the results that actually depended on it.

use crate::cache::normalize::Resolution;
use crate::cache::value::{EntityKey, FieldValue, Record};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

/// A field read while resolving a query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub entity: EntityKey,
    pub field: String,
}

impl Dependency {
    pub fn new(entity: EntityKey, field: impl Into<String>) -> Self {
        Self {
            entity,
            field: field.into(),
        }
    }
}

/// Session-scoped store of entities and local state
#[derive(Debug)]
pub struct EntityStore {
    records: HashMap<EntityKey, Record>,
    local_fields: HashSet<String>,
    results: HashMap<String, Resolution>,
    version: u64,
}

impl EntityStore {
    /// Create an empty store holding only the root record
    pub fn new() -> Self {
        let mut records = HashMap::new();
        records.insert(EntityKey::root(), Record::new());
        Self {
            records,
            local_fields: HashSet::new(),
            results: HashMap::new(),
            version: 0,
        }
    }

    /// Shallow-merge `fields` into the record for `key`, creating it if absent.
    ///
    /// Root fields declared local are skipped: only [`write_local`] may set them.
    ///
    /// [`write_local`]: EntityStore::write_local
    pub fn write(&mut self, key: &EntityKey, fields: Record) {
        let record = self.records.entry(key.clone()).or_default();
        let mut changed = Vec::new();

        for (name, value) in fields {
            if key.is_root() && self.local_fields.contains(&name) {
                warn!("Ignoring remote write to local field {}", name);
                continue;
            }
            if record.get(&name) != Some(&value) {
                record.insert(name.clone(), value);
                changed.push(name);
            }
        }

        self.invalidate(key, &changed);
    }

    /// Look up a record. `None` means not loaded yet, which is not an error.
    pub fn read(&self, key: &EntityKey) -> Option<&Record> {
        self.records.get(key)
    }

    /// Look up a single field of a record
    pub fn read_field(&self, key: &EntityKey, field: &str) -> Option<&FieldValue> {
        self.records.get(key)?.get(field)
    }

    /// Set a client-only field on the root record
    pub fn write_local(&mut self, path: &str, value: FieldValue) {
        self.local_fields.insert(path.to_string());
        let root = EntityKey::root();
        let record = self.records.entry(root.clone()).or_default();
        if record.get(path) == Some(&value) {
            return;
        }
        record.insert(path.to_string(), value);
        debug!("Local field {} updated", path);
        self.invalidate(&root, &[path.to_string()]);
    }

    /// Read a client-only field from the root record
    pub fn read_local(&self, path: &str) -> Option<&FieldValue> {
        self.read_field(&EntityKey::root(), path)
    }

    /// Whether `path` has been declared a local field
    pub fn is_local(&self, path: &str) -> bool {
        self.local_fields.contains(path)
    }

    /// Cached resolution for a result key, if still valid
    pub fn cached_result(&self, key: &str) -> Option<&Resolution> {
        self.results.get(key)
    }

    /// Remember a resolution until one of its dependencies changes
    pub fn store_result(&mut self, key: String, resolution: Resolution) {
        self.results.insert(key, resolution);
    }

    /// Monotonic counter bumped on every effective change
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of normalized records, root included
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.len() <= 1 && self.records.values().all(|r| r.is_empty())
    }

    /// Tear the store down to an empty root record
    pub fn clear(&mut self) {
        self.records.clear();
        self.records.insert(EntityKey::root(), Record::new());
        self.local_fields.clear();
        self.results.clear();
        self.version += 1;
        debug!("Store cleared");
    }

    fn invalidate(&mut self, key: &EntityKey, changed: &[String]) {
        if changed.is_empty() {
            return;
        }
        self.version += 1;

        let touched: HashSet<Dependency> = changed
            .iter()
            .map(|field| Dependency::new(key.clone(), field.clone()))
            .collect();

        let before = self.results.len();
        self.results
            .retain(|_, resolution| resolution.deps.is_disjoint(&touched));
        let dropped = before - self.results.len();
        if dropped > 0 {
            debug!("Invalidated {} cached result(s) via {}", dropped, key);
        }
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle to the session's store.
///
/// Guards must not be held across an `.await`; every fetch completion applies
/// its writes inside a single [`SharedStore::update`] call.
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    inner: Arc<RwLock<EntityStore>>,
}

impl SharedStore {
    pub fn new(store: EntityStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, EntityStore> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, EntityStore> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access; readers never see a partial update
    pub fn update<T>(&self, f: impl FnOnce(&mut EntityStore) -> T) -> T {
        let mut guard = self.write();
        f(&mut guard)
    }
}
