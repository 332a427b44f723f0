//! Integration tests for Launchpad

mod scenarios {
    use async_trait::async_trait;
    use launchpad::api::{FixtureApi, RemoteApi, Request, Response};
    use launchpad::cache::{EntityKey, FieldValue};
    use launchpad::client::{Client, EMPTY_CART_MESSAGE};
    use launchpad::config::ClientConfig;
    use launchpad::credentials::{CredentialStore, MemoryCredentialStore};
    use launchpad::error::{LaunchpadError, LaunchpadResult, GENERIC_ERROR_MESSAGE};
    use launchpad::mutation::MutationOutcome;
    use launchpad::operations;
    use launchpad::query::{FetchMoreOutcome, FetchPolicy, QueryState, Variables};
    use launchpad::session::AuthState;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tokio::sync::Semaphore;

    async fn connect(
        api: Arc<FixtureApi>,
        token: Option<String>,
    ) -> (Client, Arc<MemoryCredentialStore>) {
        let creds = Arc::new(MemoryCredentialStore::new(token));
        let client = Client::connect(api, creds.clone(), ClientConfig::default())
            .await
            .unwrap();
        (client, creds)
    }

    fn listing_ids(state: &QueryState) -> Vec<String> {
        state.data["launches"]["launches"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["id"].as_str().unwrap().to_string())
            .collect()
    }

    fn booked(client: &Client, id: &str) -> Option<bool> {
        client
            .store()
            .read()
            .read_field(&EntityKey::new("Launch", id), "isBooked")
            .and_then(FieldValue::as_bool)
    }

    #[tokio::test]
    async fn listing_pages_twenty_then_five() {
        let api = Arc::new(FixtureApi::with_catalogue(25));
        let (client, _) = connect(api, None).await;

        let handle = client.launches().await;
        let first = handle.state();
        assert!(first.is_ready());
        assert_eq!(listing_ids(&first).len(), 20);
        assert_eq!(first.data["launches"]["hasMore"], true);

        let outcome = client.load_more(&handle).await;
        assert_eq!(outcome, FetchMoreOutcome::Merged { added: 5, has_more: false });

        let merged = handle.state();
        let expected: Vec<String> = (1..=25).map(|n| n.to_string()).collect();
        assert_eq!(listing_ids(&merged), expected);
        assert_eq!(merged.data["launches"]["hasMore"], false);

        assert_eq!(client.load_more(&handle).await, FetchMoreOutcome::Exhausted);
    }

    #[tokio::test]
    async fn booking_updates_launches_and_cart_together() {
        let api = Arc::new(FixtureApi::with_catalogue(5));
        let token = FixtureApi::issue_token("sally@example.com");
        let (client, _) = connect(api.clone(), Some(token)).await;
        let listing = client.launches().await;
        let cart = client.watch_cart().await;

        client.add_to_cart("1");
        client.add_to_cart("2");
        assert_eq!(cart.state().data["cartItems"], json!(["1", "2"]));

        let outcome = client.book_trips().await;
        assert!(outcome.is_committed(), "{outcome:?}");

        assert!(client
            .store()
            .read()
            .read_local("cartItems")
            .unwrap()
            .to_string_list()
            .is_empty());
        assert_eq!(booked(&client, "1"), Some(true));
        assert_eq!(booked(&client, "2"), Some(true));

        assert_eq!(cart.state().data["cartItems"], json!([]));
        let tiles = listing.state();
        let tiles = tiles.data["launches"]["launches"].as_array().unwrap();
        assert_eq!(tiles[0]["isBooked"], true);
        assert_eq!(tiles[1]["isBooked"], true);
        assert_eq!(tiles[2]["isBooked"], false);
        assert_eq!(api.booked_trips("sally@example.com"), vec!["1", "2"]);
    }

    #[tokio::test]
    async fn booking_refetches_each_launch() {
        let api = Arc::new(FixtureApi::with_catalogue(5));
        let (client, _) = connect(api.clone(), Some(FixtureApi::issue_token("a@b.io"))).await;
        client.add_to_cart("3");
        client.add_to_cart("4");

        client.book_trips().await;

        let log = api.request_log();
        assert_eq!(log[0], "BookTrips");
        assert_eq!(log[1..], ["GetLaunchDetails", "GetLaunchDetails"]);

        let before = api.request_log().len();
        let details = client.launch("3").await;
        assert_eq!(details.data["launch"]["isBooked"], true);
        assert!(details.data["launch"]["site"].is_string());
        assert_eq!(api.request_log().len(), before, "details were refetched with the booking");
    }

    #[tokio::test]
    async fn rejected_booking_keeps_cart() {
        let api = Arc::new(FixtureApi::with_catalogue(5));
        let (client, _) = connect(api.clone(), None).await;
        client.add_to_cart("1");

        let outcome = client.book_trips().await;

        assert_eq!(
            outcome,
            MutationOutcome::Rejected {
                message: "You must be logged in to book trips".into()
            }
        );
        assert_eq!(client.cart_items(), vec!["1"]);
        assert_eq!(booked(&client, "1"), None);
    }

    #[tokio::test]
    async fn partially_unknown_booking_is_rejected_whole() {
        let api = Arc::new(FixtureApi::with_catalogue(5));
        let (client, _) = connect(api, Some(FixtureApi::issue_token("a@b.io"))).await;
        client.add_to_cart("1");
        client.add_to_cart("999");

        let outcome = client.book_trips().await;

        assert!(
            matches!(outcome, MutationOutcome::Rejected { ref message } if message.contains("999"))
        );
        assert_eq!(client.cart_items(), vec!["1", "999"]);
        assert_eq!(booked(&client, "1"), None);
    }

    #[tokio::test]
    async fn empty_cart_never_reaches_the_api() {
        let api = Arc::new(FixtureApi::with_catalogue(5));
        let (client, _) = connect(api.clone(), Some(FixtureApi::issue_token("a@b.io"))).await;

        let outcome = client.book_trips().await;

        assert_eq!(outcome.message(), Some(EMPTY_CART_MESSAGE));
        assert!(api.request_log().is_empty());
    }

    #[tokio::test]
    async fn bad_email_leaves_session_logged_out() {
        let api = Arc::new(FixtureApi::with_catalogue(5));
        let (client, creds) = connect(api, None).await;
        let flag = client.watch_login().await;

        let outcome = client.login("bad email").await.unwrap();

        assert_eq!(outcome.state, AuthState::LoggedOut);
        assert_eq!(outcome.message.as_deref(), Some("bad email"));
        assert_eq!(client.auth_state(), AuthState::LoggedOut);
        assert_eq!(flag.state().data["isLoggedIn"], false);
        assert!(creds.get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn login_then_trips_then_logout() {
        let api = Arc::new(FixtureApi::with_catalogue(5));
        let (client, creds) = connect(api, None).await;
        let flag = client.watch_login().await;

        let outcome = client.login("sally@example.com").await.unwrap();
        assert!(outcome.is_logged_in());
        assert_eq!(flag.state().data["isLoggedIn"], true);
        assert!(creds.get().await.unwrap().is_some());

        client.add_to_cart("2");
        assert!(client.book_trips().await.is_committed());
        let trips = client.my_trips().await;
        assert_eq!(trips.data["me"]["email"], "sally@example.com");
        assert_eq!(trips.data["me"]["trips"][0]["id"], "2");

        client.logout().await.unwrap();
        assert_eq!(flag.state().data["isLoggedIn"], false);
        assert!(creds.get().await.unwrap().is_none());
        assert_eq!(client.auth_state(), AuthState::LoggedOut);
    }

    #[tokio::test]
    async fn local_fields_resolve_without_requests() {
        let api = Arc::new(FixtureApi::with_catalogue(5));
        let (client, _) = connect(api.clone(), None).await;
        let _listing = client.launches().await;
        let requests = api.request_log().len();

        client.add_to_cart("4");
        client.remove_from_cart("4");
        client.add_to_cart("5");
        let cart = client
            .executor()
            .execute(&operations::get_cart_items(), &Variables::new(), FetchPolicy::CacheFirst)
            .await;
        let login = client
            .executor()
            .execute(&operations::is_logged_in(), &Variables::new(), FetchPolicy::NetworkOnly)
            .await;

        assert_eq!(cart.data["cartItems"], json!(["5"]));
        assert_eq!(login.data["isLoggedIn"], false);
        assert_eq!(api.request_log().len(), requests);
    }

    #[tokio::test]
    async fn offline_keeps_cached_and_local_data() {
        let api = Arc::new(FixtureApi::with_catalogue(25));
        let (client, _) = connect(api.clone(), None).await;
        let handle = client.launches().await;
        client.add_to_cart("1");

        api.set_offline(true);

        let outcome = client.load_more(&handle).await;
        assert_eq!(outcome, FetchMoreOutcome::Failed(GENERIC_ERROR_MESSAGE.into()));
        let state = handle.state();
        assert_eq!(state.error_message(), Some(GENERIC_ERROR_MESSAGE));
        assert_eq!(listing_ids(&state).len(), 20);

        let details = client.launch("1").await;
        assert_eq!(details.error_message(), Some(GENERIC_ERROR_MESSAGE));
        assert_eq!(
            booked(&client, "1"),
            Some(false),
            "entity from the listing survives the failed fetch"
        );

        assert_eq!(client.cart_items(), vec!["1"]);
    }

    #[tokio::test]
    async fn fresh_data_clears_an_earlier_listing_error() {
        let api = Arc::new(FixtureApi::with_catalogue(25));
        let token = FixtureApi::issue_token("sally@example.com");
        let (client, _) = connect(api.clone(), Some(token)).await;
        let handle = client.launches().await;

        api.set_offline(true);
        assert!(matches!(client.load_more(&handle).await, FetchMoreOutcome::Failed(_)));
        assert_eq!(handle.state().error_message(), Some(GENERIC_ERROR_MESSAGE));

        api.set_offline(false);
        client.add_to_cart("1");
        assert!(client.book_trips().await.is_committed());

        let state = handle.state();
        assert!(state.is_ready(), "{:?}", state.status);
        assert_eq!(state.data["launches"]["launches"][0]["isBooked"], true);
        assert_eq!(listing_ids(&state).len(), 20);
    }

    #[tokio::test]
    async fn unknown_launch_resolves_to_null() {
        let api = Arc::new(FixtureApi::with_catalogue(3));
        let (client, _) = connect(api, None).await;

        let state = client.launch("404").await;

        assert!(state.is_ready());
        assert!(state.get("launch").is_none());
    }

    /// Holds every "load more" request until permits are added
    struct GatedApi {
        inner: FixtureApi,
        gate: Semaphore,
    }

    #[async_trait]
    impl RemoteApi for GatedApi {
        async fn execute(&self, request: &Request) -> LaunchpadResult<Response> {
            if request.variables.contains_key("after") {
                let _permit = self
                    .gate
                    .acquire()
                    .await
                    .map_err(|e| LaunchpadError::fetch(e.to_string()))?;
            }
            self.inner.execute(request).await
        }

        fn api_name(&self) -> &'static str {
            "gated"
        }
    }

    async fn gated_client(launches: usize) -> (Arc<GatedApi>, Client) {
        let api = Arc::new(GatedApi {
            inner: FixtureApi::with_catalogue(launches),
            gate: Semaphore::new(0),
        });
        let client = Client::connect(
            api.clone(),
            Arc::new(MemoryCredentialStore::default()),
            ClientConfig::default(),
        )
        .await
        .unwrap();
        (api, client)
    }

    #[tokio::test]
    async fn listing_stays_visible_while_next_page_loads() {
        let (api, client) = gated_client(45).await;
        let handle = client.launches().await;
        assert!(handle.state().is_ready());

        let (outcome, ()) = tokio::join!(client.load_more(&handle), async {
            tokio::task::yield_now().await;
            let in_flight = handle.state();
            assert!(in_flight.is_loading(), "{:?}", in_flight.status);
            assert_eq!(listing_ids(&in_flight).len(), 20);
            api.gate.add_permits(1);
        });

        assert_eq!(outcome, FetchMoreOutcome::Merged { added: 20, has_more: true });
        let done = handle.state();
        assert!(done.is_ready());
        assert_eq!(listing_ids(&done).len(), 40);
    }

    #[tokio::test]
    async fn overlapping_load_more_discards_stale_page() {
        let (api, client) = gated_client(60).await;
        let handle = client.launches().await;

        let (first, second, ()) = tokio::join!(
            client.load_more(&handle),
            client.load_more(&handle),
            async {
                tokio::task::yield_now().await;
                api.gate.add_permits(2);
            }
        );

        let outcomes = [first, second];
        let merged = outcomes
            .iter()
            .filter(|o| matches!(o, FetchMoreOutcome::Merged { added: 20, .. }))
            .count();
        let stale = outcomes
            .iter()
            .filter(|o| **o == FetchMoreOutcome::Stale)
            .count();
        assert_eq!((merged, stale), (1, 1), "{outcomes:?}");

        let ids = listing_ids(&handle.state());
        let expected: Vec<String> = (1..=40).map(|n| n.to_string()).collect();
        assert_eq!(ids, expected);
        assert_eq!(handle.state().data["launches"]["cursor"], Value::from("40"));
    }

    #[tokio::test]
    async fn shutdown_drops_cached_entities() {
        let api = Arc::new(FixtureApi::with_catalogue(3));
        let (client, _) = connect(api, None).await;
        client.launch("2").await;
        assert!(client
            .store()
            .read()
            .read(&EntityKey::new("Launch", "2"))
            .is_some());

        client.shutdown();

        assert!(client
            .store()
            .read()
            .read(&EntityKey::new("Launch", "2"))
            .is_none());
    }
}

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Isolated config, state and credential locations
    struct Sandbox {
        dir: TempDir,
    }

    impl Sandbox {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let token = dir.path().join("state").join("token.json");
            let config = format!(
                "[credentials]\ntoken_file = {:?}\n\n[fixture]\nlaunches = 25\n",
                token.display().to_string()
            );
            std::fs::write(dir.path().join("config.toml"), config).unwrap();
            Self { dir }
        }

        fn config_path(&self) -> PathBuf {
            self.dir.path().join("config.toml")
        }

        fn cmd(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("launchpad");
            cmd.env("HOME", self.dir.path())
                .env("XDG_CONFIG_HOME", self.dir.path().join("xdg-config"))
                .env("XDG_STATE_HOME", self.dir.path().join("xdg-state"))
                .env_remove("CI")
                .arg("--config")
                .arg(self.config_path());
            cmd
        }
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("launchpad")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("browse and book"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("launchpad")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("launchpad"));
    }

    #[test]
    fn launches_table_shows_first_page() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .arg("launches")
            .assert()
            .success()
            .stdout(predicate::str::contains("MISSION"))
            .stdout(predicate::str::contains("20 launch(es), more available"));
    }

    #[test]
    fn launches_json_pages_to_the_end() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["launches", "--pages", "3", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"has_more\": false"))
            .stdout(predicate::str::contains("\"cursor\": \"25\""));
    }

    #[test]
    fn launches_plain_lists_ids() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["launches", "-f", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("1\t"));
    }

    #[test]
    fn login_with_bad_email_fails() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["login", "not-an-email"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("bad email"));

        sandbox
            .cmd()
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("logged out"));
    }

    #[test]
    fn book_requires_login() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["book", "1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Not logged in"))
            .stderr(predicate::str::contains("launchpad login"));
    }

    #[test]
    fn login_book_logout_flow() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["login", "sally@example.com"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Logged in as sally@example.com"));

        sandbox
            .cmd()
            .args(["book", "1", "2"])
            .assert()
            .success()
            .stdout(predicate::str::contains("trips booked successfully"));

        sandbox
            .cmd()
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("logged in"));

        sandbox
            .cmd()
            .arg("logout")
            .assert()
            .success()
            .stdout(predicate::str::contains("Logged out"));

        sandbox
            .cmd()
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("logged out"));
    }

    #[test]
    fn shell_keeps_cart_between_commands() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .arg("shell")
            .write_stdin("launches\nadd 3 4\nremove 3\ncart\nbogus\nquit\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("Cart: 4"))
            .stdout(predicate::str::contains("unknown command 'bogus'"));
    }

    #[test]
    fn shell_books_after_login() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .arg("shell")
            .write_stdin("login sally@example.com\nadd 5\nbook\ntrips\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("trips booked successfully"))
            .stdout(predicate::str::contains("1 launch(es)"));
    }

    #[test]
    fn config_path_follows_flag() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[client]"))
            .stdout(predicate::str::contains("launches = 25"));
    }

    #[test]
    fn invalid_config_reports_hint() {
        let sandbox = Sandbox::new();
        std::fs::write(sandbox.config_path(), "[fixture]\npage_size = 0\n").unwrap();
        sandbox
            .cmd()
            .arg("launches")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"))
            .stderr(predicate::str::contains("config init --force"));
    }
}
