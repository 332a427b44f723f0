//! Mutation commit: write the result, apply the caller's recipe, refetch
//!
//! A payload carrying `success: false` is a rejection. Nothing from it is
//! written and the recipe does not run; the caller gets the message instead.

use crate::api::ApiLink;
use crate::cache::normalize;
use crate::cache::store::{EntityStore, SharedStore};
use crate::query::executor::{FetchPolicy, QueryExecutor};
use crate::query::shape::{Operation, Variables};
use futures_util::future::join_all;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Message used when a rejection carries none
pub const DEFAULT_REJECTION_MESSAGE: &str = "Request failed";

/// Local-state transformation run in the same store write as the result
pub trait UpdateRecipe: Send + Sync {
    fn apply(&self, store: &mut EntityStore, payload: &Value);
}

impl<F> UpdateRecipe for F
where
    F: Fn(&mut EntityStore, &Value) + Send + Sync,
{
    fn apply(&self, store: &mut EntityStore, payload: &Value) {
        self(store, payload)
    }
}

/// A query to re-run once a mutation has been written
#[derive(Debug, Clone)]
pub struct DependentQuery {
    pub operation: Arc<Operation>,
    pub variables: Variables,
}

impl DependentQuery {
    pub fn new(operation: Arc<Operation>, variables: Variables) -> Self {
        Self {
            operation,
            variables,
        }
    }
}

/// Data returned by the remote API for a mutation
#[derive(Debug, Clone)]
pub struct MutationResult {
    pub operation: Arc<Operation>,
    pub variables: Variables,
    pub data: Map<String, Value>,
}

impl MutationResult {
    /// Value of the mutation's top-level field
    pub fn payload(&self) -> Value {
        self.operation
            .root_field()
            .and_then(|field| self.data.get(&field.name))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

/// Final outcome of a mutation
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// Written to the store; dependents refetched
    Committed { payload: Value },
    /// The API answered `success: false`; store untouched
    Rejected { message: String },
    /// The request itself failed; store untouched
    Failed { message: String },
}

impl MutationOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }

    /// User-facing message for rejected or failed mutations
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Committed { .. } => None,
            Self::Rejected { message } | Self::Failed { message } => Some(message),
        }
    }
}

/// Per-mutation options
#[derive(Default)]
pub struct MutationOptions {
    pub update: Option<Box<dyn UpdateRecipe>>,
    pub refetch: Vec<DependentQuery>,
}

impl MutationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(mut self, recipe: impl UpdateRecipe + 'static) -> Self {
        self.update = Some(Box::new(recipe));
        self
    }

    pub fn refetch(mut self, queries: impl IntoIterator<Item = DependentQuery>) -> Self {
        self.refetch.extend(queries);
        self
    }
}

/// Sends mutations and commits their results
pub struct MutationCommitter {
    store: SharedStore,
    link: Arc<ApiLink>,
    executor: Arc<QueryExecutor>,
}

impl MutationCommitter {
    pub fn new(store: SharedStore, link: Arc<ApiLink>, executor: Arc<QueryExecutor>) -> Self {
        Self {
            store,
            link,
            executor,
        }
    }

    /// Send a mutation and commit its result
    pub async fn mutate(
        &self,
        operation: Arc<Operation>,
        variables: Variables,
        options: MutationOptions,
    ) -> MutationOutcome {
        let data = match self.link.send(&operation, &variables).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Mutation {} failed: {}", operation.name, e);
                return MutationOutcome::Failed {
                    message: e.user_message(),
                };
            }
        };

        let result = MutationResult {
            operation,
            variables,
            data,
        };
        self.commit(result, options.update.as_deref(), &options.refetch)
            .await
    }

    /// Apply a mutation result.
    ///
    /// Entities and the recipe land in one store write, so no reader sees one
    /// without the other. Dependents are refetched before this returns.
    pub async fn commit(
        &self,
        result: MutationResult,
        update: Option<&dyn UpdateRecipe>,
        dependents: &[DependentQuery],
    ) -> MutationOutcome {
        let payload = result.payload();

        if let Some(message) = rejection(&payload) {
            info!("Mutation {} rejected: {}", result.operation.name, message);
            return MutationOutcome::Rejected { message };
        }

        // Only the entities a payload references are kept; the payload itself
        // (tokens included) is handed back to the caller, never cached.
        let remote = result.operation.remote_only();
        self.store.update(|store| {
            for field in &remote.selections {
                if let Some(value) = result.data.get(&field.name) {
                    normalize::normalize_field(store, field, value, &result.variables);
                }
            }
            if let Some(recipe) = update {
                recipe.apply(store, &payload);
            }
        });

        let refetches = dependents.iter().map(|dep| {
            self.executor
                .execute(&dep.operation, &dep.variables, FetchPolicy::NetworkOnly)
        });
        let states = join_all(refetches).await;
        for (dep, state) in dependents.iter().zip(&states) {
            if let Some(message) = state.error_message() {
                warn!(
                    "Refetch of {} after {} failed: {}",
                    dep.operation.name, result.operation.name, message
                );
            }
        }

        self.executor.broadcast();
        info!(
            "Committed {} ({} dependent quer{} refetched)",
            result.operation.name,
            dependents.len(),
            if dependents.len() == 1 { "y" } else { "ies" }
        );

        MutationOutcome::Committed { payload }
    }
}

/// `Some(message)` when the payload reports `success: false`
fn rejection(payload: &Value) -> Option<String> {
    if payload.get("success").and_then(Value::as_bool) != Some(false) {
        return None;
    }
    let message = payload
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_REJECTION_MESSAGE);
    Some(message.to_string())
}
