//! Query shapes: trees of field selections
//!
//! Shapes are built in code rather than parsed from a query language. Each
//! field is tagged [`FieldKind::Local`] or [`FieldKind::Remote`]; local fields
//! are resolved from the store and never sent to the remote API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Variables supplied with an operation
pub type Variables = serde_json::Map<String, Value>;

/// Where a field's value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Fetched from the remote API
    Remote,
    /// Client-only state, resolved from the store alone
    Local,
}

/// A field argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Argument {
    /// Bound to an operation variable by name
    Variable(String),
    /// Inline constant
    Literal(Value),
}

/// A selected field and its sub-selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<(String, Argument)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selections: Vec<Field>,
}

impl Field {
    /// A field fetched from the remote API
    pub fn remote(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Remote,
            arguments: vec![],
            selections: vec![],
        }
    }

    /// A client-only field
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Local,
            ..Self::remote(name)
        }
    }

    /// Bind argument `name` to the operation variable `variable`
    pub fn var(mut self, name: impl Into<String>, variable: impl Into<String>) -> Self {
        self.arguments
            .push((name.into(), Argument::Variable(variable.into())));
        self
    }

    /// Pass a constant argument
    pub fn arg(mut self, name: impl Into<String>, value: Value) -> Self {
        self.arguments.push((name.into(), Argument::Literal(value)));
        self
    }

    /// Add sub-selections. Children of a local field are local too.
    pub fn select(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        let kind = self.kind;
        self.selections.extend(fields.into_iter().map(|f| {
            if kind == FieldKind::Local {
                f.into_local()
            } else {
                f
            }
        }));
        self
    }

    fn into_local(mut self) -> Self {
        self.kind = FieldKind::Local;
        self.selections = self.selections.into_iter().map(Self::into_local).collect();
        self
    }

    pub fn is_local(&self) -> bool {
        self.kind == FieldKind::Local
    }

    /// Arguments with variables substituted. Unbound variables are omitted.
    pub fn resolve_arguments(&self, variables: &Variables) -> BTreeMap<String, Value> {
        self.arguments
            .iter()
            .filter_map(|(name, arg)| {
                let value = match arg {
                    Argument::Literal(v) => v.clone(),
                    Argument::Variable(var) => variables.get(var)?.clone(),
                };
                Some((name.clone(), value))
            })
            .collect()
    }

    /// Key under which this field's value is stored on its parent record.
    ///
    /// Distinct argument values get distinct keys: `launch({"id":"1"})`.
    pub fn storage_key(&self, variables: &Variables) -> String {
        let args = self.resolve_arguments(variables);
        if args.is_empty() {
            return self.name.clone();
        }
        let rendered = serde_json::to_string(&args).unwrap_or_default();
        format!("{}({})", self.name, rendered)
    }

    /// True when this field or any descendant needs the remote API
    pub fn has_remote(&self) -> bool {
        !self.is_local()
    }

    /// Copy of this field with every local descendant removed
    fn remote_only(&self) -> Option<Field> {
        if self.is_local() {
            return None;
        }
        Some(Field {
            name: self.name.clone(),
            kind: self.kind,
            arguments: self.arguments.clone(),
            selections: self.selections.iter().filter_map(Field::remote_only).collect(),
        })
    }
}

/// Operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
}

/// A named query or mutation shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    pub kind: OperationKind,
    pub selections: Vec<Field>,
}

impl Operation {
    pub fn query(name: impl Into<String>, selections: impl IntoIterator<Item = Field>) -> Self {
        Self {
            name: name.into(),
            kind: OperationKind::Query,
            selections: selections.into_iter().collect(),
        }
    }

    pub fn mutation(name: impl Into<String>, selections: impl IntoIterator<Item = Field>) -> Self {
        Self {
            name: name.into(),
            kind: OperationKind::Mutation,
            selections: selections.into_iter().collect(),
        }
    }

    /// Whether resolving this operation can require a network round trip
    pub fn has_remote(&self) -> bool {
        self.selections.iter().any(Field::has_remote)
    }

    /// The same operation with all local fields stripped, as sent to the API
    pub fn remote_only(&self) -> Operation {
        Operation {
            name: self.name.clone(),
            kind: self.kind,
            selections: self.selections.iter().filter_map(Field::remote_only).collect(),
        }
    }

    /// First remote top-level field; for mutations this carries the payload
    pub fn root_field(&self) -> Option<&Field> {
        self.selections.iter().find(|f| !f.is_local())
    }

    /// Key identifying one (operation, variables) pair in the result cache
    pub fn result_key(&self, variables: &Variables) -> String {
        format!("{}({})", self.name, Value::Object(variables.clone()))
    }
}

/// Build a variables map from `(name, value)` pairs
pub fn variables<I, K>(pairs: I) -> Variables
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
