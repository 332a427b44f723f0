//! Writing response trees into the store and reading selections back out

use crate::cache::store::{Dependency, EntityStore};
use crate::cache::value::{EntityKey, FieldValue, Record};
use crate::query::shape::{Field, Variables};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;

/// Result of reading a selection set from the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Resolved data; missing remote fields appear as `null`
    pub data: Map<String, Value>,
    /// Dotted paths of remote fields not present in the store
    pub missing: Vec<String>,
    pub(crate) deps: HashSet<Dependency>,
}

impl Resolution {
    /// True when every selected remote field was found
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Write the remote fields of `data` selected by `selections` onto `parent`.
///
/// Nested objects with an identity become their own records and are replaced
/// by references.
pub fn write_selection(
    store: &mut EntityStore,
    parent: &EntityKey,
    selections: &[Field],
    data: &Map<String, Value>,
    variables: &Variables,
) {
    let fields = collect_fields(store, selections, data, variables);
    store.write(parent, fields);
}

/// Normalize one field's response value, writing any entities it contains.
///
/// The returned value is not attached to a parent; callers decide where (or
/// whether) it is stored.
pub fn normalize_field(
    store: &mut EntityStore,
    field: &Field,
    value: &Value,
    variables: &Variables,
) -> FieldValue {
    match value {
        Value::Array(items) => FieldValue::List(
            items
                .iter()
                .map(|item| normalize_field(store, field, item, variables))
                .collect(),
        ),
        Value::Object(object) => match EntityKey::from_object(object) {
            Some(key) => {
                write_selection(store, &key, &field.selections, object, variables);
                FieldValue::Ref(key)
            }
            None => FieldValue::Object(collect_fields(store, &field.selections, object, variables)),
        },
        scalar => FieldValue::Scalar(scalar.clone()),
    }
}

fn collect_fields(
    store: &mut EntityStore,
    selections: &[Field],
    data: &Map<String, Value>,
    variables: &Variables,
) -> Record {
    let mut fields = Record::new();

    if let Some(typename) = data.get("__typename") {
        fields.insert("__typename".into(), FieldValue::Scalar(typename.clone()));
    }

    for field in selections.iter().filter(|f| !f.is_local()) {
        let Some(value) = data.get(&field.name) else {
            debug!("Response omitted selected field {}", field.name);
            continue;
        };
        let normalized = normalize_field(store, field, value, variables);
        fields.insert(field.storage_key(variables), normalized);
    }

    fields
}

/// Read `selections` starting from the root record
pub fn resolve(store: &EntityStore, selections: &[Field], variables: &Variables) -> Resolution {
    let mut resolver = Resolver {
        store,
        variables,
        missing: vec![],
        deps: HashSet::new(),
    };
    let root = EntityKey::root();
    let data = resolver.record(Some(&root), store.read(&root), selections, "");
    Resolution {
        data,
        missing: resolver.missing,
        deps: resolver.deps,
    }
}

struct Resolver<'a> {
    store: &'a EntityStore,
    variables: &'a Variables,
    missing: Vec<String>,
    deps: HashSet<Dependency>,
}

impl<'a> Resolver<'a> {
    /// Resolve a selection set against a record. `owner` is `None` for
    /// embedded objects, whose changes are tracked through their parent field.
    fn record(
        &mut self,
        owner: Option<&EntityKey>,
        record: Option<&'a Record>,
        selections: &[Field],
        path: &str,
    ) -> Map<String, Value> {
        let mut out = Map::new();

        for field in selections {
            let storage_key = field.storage_key(self.variables);
            let field_path = join(path, &field.name);
            if let Some(owner) = owner {
                self.deps.insert(Dependency::new(owner.clone(), storage_key.clone()));
            }

            let value = match record.and_then(|r| r.get(&storage_key)) {
                Some(stored) => self.value(field, stored, &field_path),
                None if field.is_local() => Value::Null,
                None => {
                    self.missing.push(field_path);
                    Value::Null
                }
            };
            out.insert(field.name.clone(), value);
        }

        out
    }

    fn value(&mut self, field: &Field, stored: &'a FieldValue, path: &str) -> Value {
        match stored {
            FieldValue::Scalar(v) => v.clone(),
            FieldValue::List(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.value(field, item, &format!("{}.{}", path, i)))
                    .collect(),
            ),
            FieldValue::Ref(key) if field.selections.is_empty() => {
                Value::String(key.to_string())
            }
            FieldValue::Ref(key) => {
                let store = self.store;
                let record = store.read(key);
                Value::Object(self.record(Some(key), record, &field.selections, path))
            }
            FieldValue::Object(record) if field.selections.is_empty() => raw_object(record),
            FieldValue::Object(record) => {
                Value::Object(self.record(None, Some(record), &field.selections, path))
            }
        }
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn raw_object(record: &Record) -> Value {
    Value::Object(
        record
            .iter()
            .map(|(k, v)| (k.clone(), raw_value(v)))
            .collect(),
    )
}

fn raw_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Scalar(v) => v.clone(),
        FieldValue::Ref(key) => Value::String(key.to_string()),
        FieldValue::List(items) => Value::Array(items.iter().map(raw_value).collect()),
        FieldValue::Object(record) => raw_object(record),
    }
}
