//! Stored field values and entity identities

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Identity of the root object that carries top-level and local fields.
pub const ROOT_QUERY: &str = "ROOT_QUERY";

/// Fields of one record, keyed by storage key.
pub type Record = BTreeMap<String, FieldValue>;

/// Stable identity of a normalized record (`Typename:id`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(String);

impl EntityKey {
    /// Identity for a server entity
    pub fn new(typename: &str, id: &str) -> Self {
        Self(format!("{}:{}", typename, id))
    }

    /// Identity of the root object
    pub fn root() -> Self {
        Self(ROOT_QUERY.to_string())
    }

    /// Derive an identity from a response object carrying `__typename` and `id`.
    ///
    /// Objects without both are embedded values, not entities.
    pub fn from_object(object: &serde_json::Map<String, Value>) -> Option<Self> {
        let typename = object.get("__typename")?.as_str()?;
        let id = match object.get("id")? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        Some(Self::new(typename, &id))
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_QUERY
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A value held in a record field.
///
/// Remote and local fields share this representation, so both are resolved
/// through one read path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    /// Plain JSON scalar (string, number, bool, null)
    Scalar(Value),
    /// Reference to another normalized record
    Ref(EntityKey),
    /// Ordered list of values
    List(Vec<FieldValue>),
    /// Embedded object without identity
    Object(Record),
}

impl FieldValue {
    pub fn null() -> Self {
        Self::Scalar(Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(Value::Null))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Scalar(v) => v.as_bool(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(v) => v.as_str(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Record> {
        match self {
            Self::Object(record) => Some(record),
            _ => None,
        }
    }

    /// Build a list of string scalars (used for id sets such as the cart)
    pub fn string_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(
            items
                .into_iter()
                .map(|s| Self::Scalar(Value::String(s.into())))
                .collect(),
        )
    }

    /// Read back a list of string scalars, skipping anything else
    pub fn to_string_list(&self) -> Vec<String> {
        self.as_list()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Scalar(Value::Bool(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Scalar(Value::String(value.to_string()))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Scalar(Value::String(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entity_key_from_object() {
        let obj = json!({"__typename": "Launch", "id": "109", "site": "KSC"});
        let key = EntityKey::from_object(obj.as_object().unwrap()).unwrap();
        assert_eq!(key.as_str(), "Launch:109");

        let numeric = json!({"__typename": "Rocket", "id": 7});
        let key = EntityKey::from_object(numeric.as_object().unwrap()).unwrap();
        assert_eq!(key, EntityKey::new("Rocket", "7"));
    }

    #[test]
    fn objects_without_identity_are_embedded() {
        let mission = json!({"__typename": "Mission", "name": "Starlink"});
        assert!(EntityKey::from_object(mission.as_object().unwrap()).is_none());

        let null_id = json!({"__typename": "User", "id": null});
        assert!(EntityKey::from_object(null_id.as_object().unwrap()).is_none());
    }

    #[test]
    fn string_list_skips_non_strings() {
        let list = FieldValue::List(vec!["L1".into(), FieldValue::null(), "L2".into()]);
        assert_eq!(list.to_string_list(), vec!["L1", "L2"]);
        assert!(FieldValue::from(true).to_string_list().is_empty());
    }
}
