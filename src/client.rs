//! Launch client: one session's cache, queries, cart and login
//!
//! A [`Client`] is built explicitly per session and owns everything the
//! session needs. There is no process-wide instance.

use crate::api::{ApiLink, RemoteApi};
use crate::cache::store::{EntityStore, SharedStore};
use crate::cache::value::FieldValue;
use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::{LaunchpadResult, GENERIC_ERROR_MESSAGE};
use crate::mutation::{DependentQuery, MutationCommitter, MutationOptions, MutationOutcome};
use crate::operations::{self, fields};
use crate::query::executor::{FetchPolicy, QueryExecutor, QueryHandle, QueryState, QueryStatus};
use crate::query::pagination::{ConnectionSpec, FetchMoreOutcome};
use crate::query::shape::{variables, Variables};
use crate::session::{cart, AuthEvent, AuthState};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Message for booking an empty cart
pub const EMPTY_CART_MESSAGE: &str = "No trips in cart";

/// Result of a login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    /// State after the attempt
    pub state: AuthState,
    /// Reason when the attempt did not log in
    pub message: Option<String>,
}

impl LoginOutcome {
    pub fn is_logged_in(&self) -> bool {
        self.state.is_logged_in()
    }
}

/// Client for the launch API
pub struct Client {
    store: SharedStore,
    link: Arc<ApiLink>,
    executor: Arc<QueryExecutor>,
    committer: MutationCommitter,
    credentials: Arc<dyn CredentialStore>,
    auth: Mutex<AuthState>,
    settings: ClientConfig,
}

impl Client {
    /// Open a session. Local state is seeded before any query runs:
    /// `isLoggedIn` from the stored credential and an empty cart.
    pub async fn connect(
        api: Arc<dyn RemoteApi>,
        credentials: Arc<dyn CredentialStore>,
        settings: ClientConfig,
    ) -> LaunchpadResult<Self> {
        let token = credentials.get().await?;
        let logged_in = token.is_some();

        let store = SharedStore::default();
        store.update(|s| {
            s.write_local(fields::IS_LOGGED_IN, logged_in.into());
            cart::clear(s);
        });

        let link = Arc::new(ApiLink::new(api, token));
        let executor = Arc::new(QueryExecutor::new(store.clone(), link.clone()));
        let committer = MutationCommitter::new(store.clone(), link.clone(), executor.clone());

        debug!(
            "Connected to {} ({})",
            link.api_name(),
            AuthState::initial(logged_in)
        );

        Ok(Self {
            store,
            link,
            executor,
            committer,
            credentials,
            auth: Mutex::new(AuthState::initial(logged_in)),
            settings,
        })
    }

    /// Watch the launch listing. Extend it with [`Client::load_more`].
    pub async fn launches(&self) -> QueryHandle {
        self.executor
            .watch(operations::get_launches(), self.listing_variables())
            .await
    }

    /// Append the next page to a listing obtained from [`Client::launches`]
    pub async fn load_more(&self, handle: &QueryHandle) -> FetchMoreOutcome {
        match self
            .executor
            .fetch_more(handle, &ConnectionSpec::launches())
            .await
        {
            FetchMoreOutcome::Failed(message) => {
                FetchMoreOutcome::Failed(self.settings.user_text(&message))
            }
            outcome => outcome,
        }
    }

    /// Launch details. `launch` resolves to null for an unknown id.
    pub async fn launch(&self, id: &str) -> QueryState {
        let vars = variables([("launchId", json!(id))]);
        self.localize(
            self.executor
                .execute(&operations::get_launch(), &vars, FetchPolicy::CacheFirst)
                .await,
        )
    }

    /// The current user's booked trips, always fetched fresh
    pub async fn my_trips(&self) -> QueryState {
        self.localize(
            self.executor
                .execute(
                    &operations::get_my_trips(),
                    &Variables::new(),
                    FetchPolicy::NetworkOnly,
                )
                .await,
        )
    }

    /// Watch the cart contents
    pub async fn watch_cart(&self) -> QueryHandle {
        self.executor
            .watch(operations::get_cart_items(), Variables::new())
            .await
    }

    /// Watch the login flag
    pub async fn watch_login(&self) -> QueryHandle {
        self.executor
            .watch(operations::is_logged_in(), Variables::new())
            .await
    }

    /// Add a launch to the cart. Returns `false` if it was already there.
    pub fn add_to_cart(&self, id: &str) -> bool {
        let added = self.store.update(|s| cart::add(s, id));
        if added {
            self.executor.broadcast();
        }
        added
    }

    /// Remove a launch from the cart. Returns `false` if it was not there.
    pub fn remove_from_cart(&self, id: &str) -> bool {
        let removed = self.store.update(|s| cart::remove(s, id));
        if removed {
            self.executor.broadcast();
        }
        removed
    }

    pub fn cart_items(&self) -> Vec<String> {
        cart::items(&self.store.read())
    }

    /// Book every launch in the cart.
    ///
    /// On success the booked launches and the emptied cart become visible
    /// together, and each booked launch is refetched before this returns.
    pub async fn book_trips(&self) -> MutationOutcome {
        let ids = self.cart_items();
        if ids.is_empty() {
            return MutationOutcome::Rejected {
                message: EMPTY_CART_MESSAGE.to_string(),
            };
        }

        let refetch = ids.iter().map(|id| {
            DependentQuery::new(
                operations::get_launch(),
                variables([("launchId", json!(id))]),
            )
        });
        let options = MutationOptions::new()
            .update(|store: &mut EntityStore, _: &Value| cart::clear(store))
            .refetch(refetch);

        let outcome = self
            .committer
            .mutate(
                operations::book_trips(),
                variables([("launchIds", json!(ids))]),
                options,
            )
            .await;
        self.localize_outcome(outcome)
    }

    /// Cancel a booked trip and refresh the launch and the trip list
    pub async fn cancel_trip(&self, id: &str) -> MutationOutcome {
        let options = MutationOptions::new().refetch([
            DependentQuery::new(
                operations::get_launch(),
                variables([("launchId", json!(id))]),
            ),
            DependentQuery::new(operations::get_my_trips(), Variables::new()),
        ]);

        let outcome = self
            .committer
            .mutate(
                operations::cancel_trip(),
                variables([("launchId", json!(id))]),
                options,
            )
            .await;
        self.localize_outcome(outcome)
    }

    /// Log in with `email`.
    ///
    /// The token is persisted before `isLoggedIn` flips, so a reader that sees
    /// the flag can rely on the credential being stored. Dispatching while a
    /// login is already in flight, or while logged in, is an error.
    pub async fn login(&self, email: &str) -> LaunchpadResult<LoginOutcome> {
        self.advance(AuthEvent::Dispatch)?;

        let outcome = self
            .committer
            .mutate(
                operations::login(),
                variables([("email", json!(email))]),
                MutationOptions::new(),
            )
            .await;

        let payload = match outcome {
            MutationOutcome::Committed { payload } => payload,
            MutationOutcome::Rejected { message } => {
                info!("Login rejected: {}", message);
                let state = self.advance(AuthEvent::Rejected)?;
                return Ok(LoginOutcome {
                    state,
                    message: Some(message),
                });
            }
            MutationOutcome::Failed { message } => {
                let state = self.advance(AuthEvent::Failed)?;
                return Ok(LoginOutcome {
                    state,
                    message: Some(self.settings.user_text(&message)),
                });
            }
        };

        let Some(token) = payload
            .get("token")
            .and_then(Value::as_str)
            .map(str::to_string)
        else {
            warn!("Login response carried no token");
            let state = self.advance(AuthEvent::Failed)?;
            return Ok(LoginOutcome {
                state,
                message: Some(self.settings.user_text(GENERIC_ERROR_MESSAGE)),
            });
        };

        if let Err(e) = self.credentials.set(&token).await {
            warn!("Could not persist credential: {}", e);
            self.advance(AuthEvent::Failed)?;
            return Err(e);
        }

        self.link.set_token(Some(token));
        self.store
            .update(|s| s.write_local(fields::IS_LOGGED_IN, true.into()));
        self.executor.broadcast();
        let state = self.advance(AuthEvent::Succeeded)?;

        info!("Logged in as {}", email);
        Ok(LoginOutcome {
            state,
            message: None,
        })
    }

    /// Forget the credential and mark the session logged out
    pub async fn logout(&self) -> LaunchpadResult<AuthState> {
        let state = self.auth_state();
        if state == AuthState::LoggingIn {
            // Surface the illegal transition before touching anything
            return self.advance(AuthEvent::Logout);
        }

        self.credentials.remove().await?;
        self.link.set_token(None);
        self.store
            .update(|s| s.write_local(fields::IS_LOGGED_IN, false.into()));
        self.executor.broadcast();

        info!("Logged out");
        self.advance(AuthEvent::Logout)
    }

    pub fn auth_state(&self) -> AuthState {
        *self.auth_slot()
    }

    /// The local `isLoggedIn` flag
    pub fn is_logged_in(&self) -> bool {
        self.store
            .read()
            .read_local(fields::IS_LOGGED_IN)
            .and_then(FieldValue::as_bool)
            .unwrap_or(false)
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn executor(&self) -> &Arc<QueryExecutor> {
        &self.executor
    }

    pub fn settings(&self) -> &ClientConfig {
        &self.settings
    }

    /// End the session and drop everything cached
    pub fn shutdown(&self) {
        self.store.update(|s| s.clear());
        debug!("Client store cleared");
    }

    fn listing_variables(&self) -> Variables {
        let mut vars = Variables::new();
        if let Some(page_size) = self.settings.page_size {
            vars.insert("pageSize".into(), json!(page_size));
        }
        vars
    }

    fn advance(&self, event: AuthEvent) -> LaunchpadResult<AuthState> {
        let mut auth = self.auth_slot();
        let next = auth.transition(event)?;
        debug!("Auth {} -> {} on {:?}", *auth, next, event);
        *auth = next;
        Ok(next)
    }

    fn auth_slot(&self) -> std::sync::MutexGuard<'_, AuthState> {
        self.auth.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn localize(&self, mut state: QueryState) -> QueryState {
        if let Some(message) = state.error_message() {
            let text = self.settings.user_text(message);
            state.status = QueryStatus::Error(text);
        }
        state
    }

    fn localize_outcome(&self, outcome: MutationOutcome) -> MutationOutcome {
        match outcome {
            MutationOutcome::Failed { message } => MutationOutcome::Failed {
                message: self.settings.user_text(&message),
            },
            other => other,
        }
    }
}
