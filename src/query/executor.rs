//! Query execution against the store and the remote API
//!
//! A query is first resolved from the store. Local fields always come from
//! there; remote fields trigger a fetch when absent (or always, under
//! [`FetchPolicy::NetworkOnly`]). While a fetch is in flight the last-known
//! data stays visible with a `loading` status. A failed fetch reports `error`
//! but still returns whatever the store can resolve, local fields included.

use crate::api::ApiLink;
use crate::cache::normalize::{self, Resolution};
use crate::cache::store::SharedStore;
use crate::cache::value::EntityKey;
use crate::error::LaunchpadResult;
use crate::query::pagination::{self, ConnectionSpec, FetchMoreOutcome};
use crate::query::shape::{Operation, Variables};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Status of a query as seen by the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum QueryStatus {
    Loading,
    Ready,
    Error(String),
}

/// Resolved data plus status
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryState {
    pub data: Map<String, Value>,
    pub status: QueryStatus,
}

impl QueryState {
    pub fn ready(data: Map<String, Value>) -> Self {
        Self {
            data,
            status: QueryStatus::Ready,
        }
    }

    pub fn loading(data: Map<String, Value>) -> Self {
        Self {
            data,
            status: QueryStatus::Loading,
        }
    }

    pub fn error(data: Map<String, Value>, message: impl Into<String>) -> Self {
        Self {
            data,
            status: QueryStatus::Error(message.into()),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_ready(&self) -> bool {
        self.status == QueryStatus::Ready
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            QueryStatus::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Top-level field of the resolved data
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field).filter(|v| !v.is_null())
    }
}

/// When to go to the network
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchPolicy {
    /// Fetch only when remote fields are missing from the store
    #[default]
    CacheFirst,
    /// Always fetch the remote fields
    NetworkOnly,
    /// Never fetch
    CacheOnly,
}

/// Subscription to a watched query
#[derive(Debug)]
pub struct QueryHandle {
    id: u64,
    operation: Arc<Operation>,
    variables: Variables,
    rx: watch::Receiver<QueryState>,
}

impl QueryHandle {
    /// Current state
    pub fn state(&self) -> QueryState {
        self.rx.borrow().clone()
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }
}

struct Watched {
    operation: Arc<Operation>,
    variables: Variables,
    tx: Arc<watch::Sender<QueryState>>,
}

/// Resolves queries from the store, fetching remote fields as needed
pub struct QueryExecutor {
    store: SharedStore,
    link: Arc<ApiLink>,
    watched: Mutex<HashMap<u64, Watched>>,
    next_id: AtomicU64,
}

impl QueryExecutor {
    pub fn new(store: SharedStore, link: Arc<ApiLink>) -> Self {
        Self {
            store,
            link,
            watched: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Resolve from the store alone, reusing a cached resolution when valid
    pub fn resolve(&self, operation: &Operation, variables: &Variables) -> Resolution {
        let key = operation.result_key(variables);
        self.store.update(|store| {
            if let Some(cached) = store.cached_result(&key) {
                return cached.clone();
            }
            debug!("Resolving {} from store", key);
            let resolution = normalize::resolve(store, &operation.selections, variables);
            store.store_result(key, resolution.clone());
            resolution
        })
    }

    /// Execute once and return the final state
    pub async fn execute(
        &self,
        operation: &Operation,
        variables: &Variables,
        policy: FetchPolicy,
    ) -> QueryState {
        self.run(operation, variables, policy, None).await
    }

    /// Execute and keep publishing state changes to the returned handle
    pub async fn watch(&self, operation: Arc<Operation>, variables: Variables) -> QueryHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = watch::channel(QueryState::loading(Map::new()));
        let tx = Arc::new(tx);

        self.watched_map().insert(
            id,
            Watched {
                operation: operation.clone(),
                variables: variables.clone(),
                tx: tx.clone(),
            },
        );

        self.run(&operation, &variables, FetchPolicy::CacheFirst, Some(&*tx))
            .await;

        QueryHandle {
            id,
            operation,
            variables,
            rx,
        }
    }

    /// Re-resolve every live watched query and publish data that changed
    pub fn broadcast(&self) {
        let live: Vec<(Arc<Operation>, Variables, Arc<watch::Sender<QueryState>>)> = {
            let mut watched = self.watched_map();
            watched.retain(|_, w| w.tx.receiver_count() > 0);
            watched
                .values()
                .map(|w| (w.operation.clone(), w.variables.clone(), w.tx.clone()))
                .collect()
        };

        for (operation, variables, tx) in live {
            let resolution = self.resolve(&operation, &variables);
            let complete = resolution.is_complete();
            let data = resolution.data;
            let updated = tx.send_if_modified(|state| {
                if state.data == data {
                    return false;
                }
                state.data = data;
                // Fresh complete data supersedes an earlier failure
                if complete && state.error_message().is_some() {
                    state.status = QueryStatus::Ready;
                }
                true
            });
            if updated {
                debug!("Published cache update to {}", operation.name);
            }
        }
    }

    /// Load the next page of a watched listing and merge it into the store.
    ///
    /// Only explicit calls paginate; the executor never does so on its own.
    pub async fn fetch_more(
        &self,
        handle: &QueryHandle,
        spec: &ConnectionSpec,
    ) -> FetchMoreOutcome {
        let Some(field) = handle
            .operation
            .selections
            .iter()
            .find(|f| f.name == spec.field)
        else {
            return FetchMoreOutcome::NotLoaded;
        };
        let storage_key = field.storage_key(&handle.variables);

        let current = {
            let store = self.store.read();
            pagination::current_listing(&store, &storage_key, spec)
        };
        let Some(current) = current else {
            return FetchMoreOutcome::NotLoaded;
        };
        if !current.has_more {
            debug!("Listing {} is exhausted", storage_key);
            return FetchMoreOutcome::Exhausted;
        }

        let mut variables = handle.variables.clone();
        match &current.cursor {
            Some(cursor) => {
                variables.insert(spec.after_variable.clone(), Value::String(cursor.clone()));
            }
            None => {
                variables.remove(&spec.after_variable);
            }
        }

        let tx = self.sender(handle.id);
        set_status(tx.as_deref(), QueryStatus::Loading);

        let data = match self.link.send(&handle.operation, &variables).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Load more for {} failed: {}", handle.operation.name, e);
                let message = e.user_message();
                set_status(tx.as_deref(), QueryStatus::Error(message.clone()));
                return FetchMoreOutcome::Failed(message);
            }
        };

        let page = data.get(&field.name).cloned().unwrap_or(Value::Null);
        let outcome = self.store.update(|store| {
            pagination::apply_page(
                store,
                spec,
                &storage_key,
                current.cursor.as_deref(),
                field,
                &page,
                &variables,
            )
        });

        self.broadcast();
        set_status(tx.as_deref(), QueryStatus::Ready);
        outcome
    }

    async fn run(
        &self,
        operation: &Operation,
        variables: &Variables,
        policy: FetchPolicy,
        tx: Option<&watch::Sender<QueryState>>,
    ) -> QueryState {
        let cached = self.resolve(operation, variables);

        let needs_fetch = operation.has_remote()
            && match policy {
                FetchPolicy::CacheFirst => !cached.is_complete(),
                FetchPolicy::NetworkOnly => true,
                FetchPolicy::CacheOnly => false,
            };

        if !needs_fetch {
            let state = QueryState::ready(cached.data);
            publish(tx, &state);
            return state;
        }

        if !cached.missing.is_empty() {
            debug!("{} missing {:?}", operation.name, cached.missing);
        }
        publish(tx, &QueryState::loading(cached.data));

        let state = match self.fetch(operation, variables).await {
            Ok(()) => QueryState::ready(self.resolve(operation, variables).data),
            Err(e) => {
                warn!("Query {} failed: {}", operation.name, e);
                QueryState::error(self.resolve(operation, variables).data, e.user_message())
            }
        };
        publish(tx, &state);
        state
    }

    async fn fetch(&self, operation: &Operation, variables: &Variables) -> LaunchpadResult<()> {
        let data = self.link.send(operation, variables).await?;
        let remote = operation.remote_only();
        self.store.update(|store| {
            normalize::write_selection(
                store,
                &EntityKey::root(),
                &remote.selections,
                &data,
                variables,
            )
        });
        Ok(())
    }

    fn sender(&self, id: u64) -> Option<Arc<watch::Sender<QueryState>>> {
        self.watched_map().get(&id).map(|w| w.tx.clone())
    }

    fn watched_map(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Watched>> {
        self.watched.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn publish(tx: Option<&watch::Sender<QueryState>>, state: &QueryState) {
    if let Some(tx) = tx {
        tx.send_replace(state.clone());
    }
}

fn set_status(tx: Option<&watch::Sender<QueryState>>, status: QueryStatus) {
    if let Some(tx) = tx {
        tx.send_modify(|state| state.status = status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FixtureApi, RemoteApi};
    use crate::query::shape::{variables, Field};
    use serde_json::json;

    fn executor(api: Arc<FixtureApi>) -> QueryExecutor {
        let link = Arc::new(ApiLink::new(api as Arc<dyn RemoteApi>, None));
        QueryExecutor::new(SharedStore::default(), link)
    }

    fn launch_query() -> Operation {
        Operation::query(
            "GetLaunch",
            [Field::remote("launch")
                .var("id", "id")
                .select([Field::remote("id"), Field::remote("site")])],
        )
    }

    #[tokio::test]
    async fn cache_first_fetches_once() {
        let api = Arc::new(FixtureApi::with_catalogue(3));
        let exec = executor(api.clone());
        let vars = variables([("id", json!("2"))]);

        let first = exec.execute(&launch_query(), &vars, FetchPolicy::CacheFirst).await;
        assert!(first.is_ready());
        assert_eq!(first.data["launch"]["id"], "2");

        let second = exec.execute(&launch_query(), &vars, FetchPolicy::CacheFirst).await;
        assert_eq!(second, first);
        assert_eq!(api.request_log().len(), 1);
    }

    #[tokio::test]
    async fn network_only_always_fetches() {
        let api = Arc::new(FixtureApi::with_catalogue(3));
        let exec = executor(api.clone());
        let vars = variables([("id", json!("1"))]);

        exec.execute(&launch_query(), &vars, FetchPolicy::CacheFirst).await;
        exec.execute(&launch_query(), &vars, FetchPolicy::NetworkOnly).await;
        assert_eq!(api.request_log().len(), 2);
    }

    #[tokio::test]
    async fn cache_only_never_fetches() {
        let api = Arc::new(FixtureApi::with_catalogue(3));
        let exec = executor(api.clone());
        let state = exec
            .execute(&launch_query(), &variables([("id", json!("1"))]), FetchPolicy::CacheOnly)
            .await;
        assert!(state.is_ready());
        assert!(state.get("launch").is_none());
        assert!(api.request_log().is_empty());
    }

    #[tokio::test]
    async fn failure_keeps_local_fields_and_store() {
        let api = Arc::new(FixtureApi::with_catalogue(3));
        let exec = executor(api.clone());
        exec.store
            .update(|s| s.write_local("isLoggedIn", true.into()));
        api.set_offline(true);

        let op = Operation::query(
            "Home",
            [Field::local("isLoggedIn"), Field::remote("me").select([Field::remote("id")])],
        );
        let state = exec.execute(&op, &Variables::new(), FetchPolicy::CacheFirst).await;

        assert_eq!(state.error_message(), Some(crate::error::GENERIC_ERROR_MESSAGE));
        assert_eq!(state.data["isLoggedIn"], true);
        assert_eq!(exec.store.read().len(), 1);
    }

    #[tokio::test]
    async fn watch_publishes_ready_state() {
        let api = Arc::new(FixtureApi::with_catalogue(3));
        let exec = executor(api);
        let handle = exec
            .watch(Arc::new(launch_query()), variables([("id", json!("3"))]))
            .await;

        let state = handle.state();
        assert!(state.is_ready());
        assert_eq!(state.data["launch"]["id"], "3");
    }

    #[tokio::test]
    async fn broadcast_pushes_store_changes_to_watchers() {
        let api = Arc::new(FixtureApi::with_catalogue(3));
        let exec = executor(api);
        let op = Arc::new(Operation::query("Cart", [Field::local("cartItems")]));
        let handle = exec.watch(op, Variables::new()).await;
        assert!(handle.state().data["cartItems"].is_null());

        exec.store.update(|s| {
            s.write_local("cartItems", crate::cache::FieldValue::string_list(["1"]))
        });
        exec.broadcast();

        assert_eq!(handle.state().data["cartItems"], json!(["1"]));
    }

    #[tokio::test]
    async fn error_clears_only_once_data_is_complete() {
        use crate::cache::{FieldValue, Record};

        let api = Arc::new(FixtureApi::with_catalogue(1));
        api.set_offline(true);
        let exec = executor(api);
        let op = Operation::query(
            "Home",
            [Field::local("isLoggedIn"), Field::remote("me").select([Field::remote("id")])],
        );
        let handle = exec.watch(Arc::new(op), Variables::new()).await;
        assert!(handle.state().error_message().is_some());

        exec.store.update(|s| s.write_local("isLoggedIn", true.into()));
        exec.broadcast();
        let partial = handle.state();
        assert_eq!(partial.data["isLoggedIn"], true);
        assert!(partial.error_message().is_some(), "me is still missing");

        exec.store.update(|s| {
            let user = EntityKey::new("User", "1");
            s.write(&user, Record::from([("id".to_string(), FieldValue::from("1"))]));
            s.write(&EntityKey::root(), Record::from([("me".to_string(), FieldValue::Ref(user))]));
        });
        exec.broadcast();
        let complete = handle.state();
        assert!(complete.is_ready(), "{:?}", complete.status);
        assert_eq!(complete.data["me"]["id"], "1");
    }

    #[tokio::test]
    async fn dropped_handles_are_pruned() {
        let api = Arc::new(FixtureApi::with_catalogue(1));
        let exec = executor(api);
        let handle = exec
            .watch(Arc::new(Operation::query("L", [Field::local("isLoggedIn")])), Variables::new())
            .await;
        drop(handle);
        exec.broadcast();
        assert!(exec.watched_map().is_empty());
    }
}
