//! Remote data API abstraction
//!
//! The cache never talks to a transport directly. It hands requests to a
//! [`RemoteApi`] through an [`ApiLink`], which attaches the session token and
//! turns API-level errors into [`LaunchpadError`]s.

pub mod fixture;

pub use fixture::{FixtureApi, LaunchFixture};

use crate::error::{LaunchpadError, LaunchpadResult};
use crate::query::shape::{Operation, Variables};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// A request for the remote API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Operation with local fields already stripped
    pub operation: Operation,

    /// Operation variables
    pub variables: Variables,

    /// Session credential, if logged in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// A response from the remote API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {
    /// Entity tree keyed by top-level field name
    pub data: Option<Map<String, Value>>,

    /// API-level errors
    #[serde(default)]
    pub errors: Vec<ResponseError>,
}

/// One API-level error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseError {
    pub message: String,
}

/// Abstract remote data API
///
/// Implementations resolve an operation's remote fields and return entities
/// tagged with `__typename` and `id` so the cache can normalize them.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Execute a query or mutation
    async fn execute(&self, request: &Request) -> LaunchpadResult<Response>;

    /// Human-readable name for display
    fn api_name(&self) -> &'static str;
}

/// Request pipeline shared by the query executor and mutation committer
pub struct ApiLink {
    api: Arc<dyn RemoteApi>,
    token: RwLock<Option<String>>,
}

impl ApiLink {
    pub fn new(api: Arc<dyn RemoteApi>, token: Option<String>) -> Self {
        Self {
            api,
            token: RwLock::new(token),
        }
    }

    /// Replace the credential sent with subsequent requests
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn api_name(&self) -> &'static str {
        self.api.api_name()
    }

    /// Send the remote part of `operation` and return its data.
    ///
    /// A response carrying errors is a failure even if it also carries data.
    pub async fn send(
        &self,
        operation: &Operation,
        variables: &Variables,
    ) -> LaunchpadResult<Map<String, Value>> {
        let request = Request {
            operation: operation.remote_only(),
            variables: variables.clone(),
            token: self.token(),
        };

        debug!(
            "Sending {:?} {} to {}",
            operation.kind,
            operation.name,
            self.api.api_name()
        );
        let response = self.api.execute(&request).await?;

        if !response.errors.is_empty() {
            return Err(LaunchpadError::Remote(
                response.errors.into_iter().map(|e| e.message).collect(),
            ));
        }

        response.data.ok_or_else(|| {
            LaunchpadError::MalformedResponse(format!("{} returned no data", operation.name))
        })
    }
}
