//! In-process launch backend
//!
//! Serves the launch catalogue, cursor pagination, login and trip booking
//! from memory. Used by the CLI and the test suite in place of a network
//! transport. Bookings live only as long as the process.

use crate::api::{RemoteApi, Request, Response, ResponseError};
use crate::error::{LaunchpadError, LaunchpadResult};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Default number of launches per listing page
pub const DEFAULT_PAGE_SIZE: usize = 20;

const TOKEN_SECRET: &[u8] = b"launchpad-fixture";
const SIGNATURE_LEN: usize = 16;

const SITES: &[&str] = &["KSC LC 39A", "CCAFS SLC 40", "VAFB SLC 4E", "Kwajalein Atoll"];
const ROCKETS: &[(&str, &str, &str)] = &[
    ("falcon9", "Falcon 9", "FT"),
    ("falconheavy", "Falcon Heavy", "FT"),
    ("falcon1", "Falcon 1", "Merlin A"),
];
const MISSIONS: &[&str] = &[
    "Starlink",
    "CRS",
    "Iridium NEXT",
    "SES",
    "Telstar",
    "Crew Dragon Demo",
];

/// One launch in the catalogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchFixture {
    pub id: String,
    pub site: String,
    pub mission: String,
    pub rocket_id: String,
    pub rocket_name: String,
    pub rocket_type: String,
}

impl LaunchFixture {
    fn to_json(&self, booked: bool) -> Value {
        json!({
            "__typename": "Launch",
            "id": self.id,
            "site": self.site,
            "isBooked": booked,
            "rocket": {
                "__typename": "Rocket",
                "id": self.rocket_id,
                "name": self.rocket_name,
                "type": self.rocket_type,
            },
            "mission": {
                "__typename": "Mission",
                "name": self.mission,
                "missionPatch": format!("https://images.launchpad.test/patches/{}.png", self.id),
            },
        })
    }
}

#[derive(Debug, Default)]
struct FixtureState {
    /// Booked launch ids by user email
    trips: BTreeMap<String, BTreeSet<String>>,
    offline: bool,
    fail_next: u32,
    requests: Vec<String>,
}

/// In-memory implementation of [`RemoteApi`]
pub struct FixtureApi {
    launches: Vec<LaunchFixture>,
    page_size: usize,
    state: Mutex<FixtureState>,
}

impl FixtureApi {
    pub fn new(launches: Vec<LaunchFixture>) -> Self {
        Self {
            launches,
            page_size: DEFAULT_PAGE_SIZE,
            state: Mutex::new(FixtureState::default()),
        }
    }

    /// Generate a deterministic catalogue of `count` launches with ids `1..=count`
    pub fn with_catalogue(count: usize) -> Self {
        let launches = (1..=count)
            .map(|n| {
                let (rocket_id, rocket_name, rocket_type) = ROCKETS[n % ROCKETS.len()];
                LaunchFixture {
                    id: n.to_string(),
                    site: SITES[n % SITES.len()].to_string(),
                    mission: format!("{} {}", MISSIONS[n % MISSIONS.len()], n),
                    rocket_id: rocket_id.to_string(),
                    rocket_name: rocket_name.to_string(),
                    rocket_type: rocket_type.to_string(),
                }
            })
            .collect();
        Self::new(launches)
    }

    /// Override the page size used when a request omits `pageSize`
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Make every request fail as unreachable
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Fail the next `count` requests with a fetch error
    pub fn fail_next(&self, count: u32) {
        self.lock().fail_next = count;
    }

    /// Names of the operations received so far, in order
    pub fn request_log(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    /// Launch ids booked by `email`
    pub fn booked_trips(&self, email: &str) -> Vec<String> {
        self.lock()
            .trips
            .get(email)
            .map(|t| t.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Token the backend issues for `email`: hex email plus a short signature
    pub fn issue_token(email: &str) -> String {
        format!("{}.{}", hex::encode(email), signature(email))
    }

    /// Recover the email from a token issued by [`FixtureApi::issue_token`]
    pub fn verify_token(token: &str) -> Option<String> {
        let (encoded, sig) = token.split_once('.')?;
        let email = String::from_utf8(hex::decode(encoded).ok()?).ok()?;
        (signature(&email) == sig).then_some(email)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FixtureState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn respond(&self, request: &Request) -> LaunchpadResult<Response> {
        let mut state = self.lock();
        state.requests.push(request.operation.name.clone());

        if state.offline {
            return Err(LaunchpadError::Offline);
        }
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(LaunchpadError::fetch("injected failure"));
        }

        let user = request.token.as_deref().and_then(Self::verify_token);
        let mut data = Map::new();
        let mut errors = vec![];

        for field in &request.operation.selections {
            let args = field.resolve_arguments(&request.variables);
            let value = match field.name.as_str() {
                "launches" => self.launches_page(&state, user.as_deref(), &args),
                "launch" => self.launch(&state, user.as_deref(), &args),
                "me" => self.me(&state, user.as_deref()),
                "login" => login(&args),
                "bookTrips" => self.book_trips(&mut state, user.as_deref(), &args),
                "cancelTrip" => self.cancel_trip(&mut state, user.as_deref(), &args),
                other => {
                    errors.push(ResponseError {
                        message: format!("Cannot query field \"{}\"", other),
                    });
                    continue;
                }
            };
            data.insert(field.name.clone(), value);
        }

        debug!("Fixture answered {}", request.operation.name);
        Ok(Response {
            data: Some(data),
            errors,
        })
    }

    fn is_booked(state: &FixtureState, user: Option<&str>, id: &str) -> bool {
        user.and_then(|u| state.trips.get(u))
            .is_some_and(|trips| trips.contains(id))
    }

    fn launches_page(
        &self,
        state: &FixtureState,
        user: Option<&str>,
        args: &BTreeMap<String, Value>,
    ) -> Value {
        let page_size = args
            .get("pageSize")
            .and_then(Value::as_u64)
            .map(|n| n.max(1) as usize)
            .unwrap_or(self.page_size);

        let start = match args.get("after").and_then(Value::as_str) {
            Some(after) => self
                .launches
                .iter()
                .position(|l| l.id == after)
                .map(|i| i + 1)
                .unwrap_or(self.launches.len()),
            None => 0,
        };
        let end = (start + page_size).min(self.launches.len());
        let page = &self.launches[start..end];

        json!({
            "__typename": "LaunchConnection",
            "cursor": page.last().map(|l| l.id.clone()),
            "hasMore": end < self.launches.len(),
            "launches": page
                .iter()
                .map(|l| l.to_json(Self::is_booked(state, user, &l.id)))
                .collect::<Vec<_>>(),
        })
    }

    fn launch(
        &self,
        state: &FixtureState,
        user: Option<&str>,
        args: &BTreeMap<String, Value>,
    ) -> Value {
        let id = args.get("id").map(id_string).unwrap_or_default();
        self.find(&id)
            .map(|l| l.to_json(Self::is_booked(state, user, &l.id)))
            .unwrap_or(Value::Null)
    }

    fn me(&self, state: &FixtureState, user: Option<&str>) -> Value {
        let Some(email) = user else {
            return Value::Null;
        };
        let trips: Vec<Value> = state
            .trips
            .get(email)
            .into_iter()
            .flatten()
            .filter_map(|id| self.find(id))
            .map(|l| l.to_json(true))
            .collect();
        json!({
            "__typename": "User",
            "id": signature(email),
            "email": email,
            "trips": trips,
        })
    }

    fn book_trips(
        &self,
        state: &mut FixtureState,
        user: Option<&str>,
        args: &BTreeMap<String, Value>,
    ) -> Value {
        let Some(email) = user else {
            return trip_update(false, "You must be logged in to book trips", vec![]);
        };
        let ids: Vec<String> = args
            .get("launchIds")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().map(id_string).collect())
            .unwrap_or_default();

        let (known, unknown): (Vec<_>, Vec<_>) =
            ids.into_iter().partition(|id| self.find(id).is_some());

        let trips = state.trips.entry(email.to_string()).or_default();
        let booked: Vec<Value> = known
            .iter()
            .filter_map(|id| {
                trips.insert(id.clone());
                self.find(id).map(|l| l.to_json(true))
            })
            .collect();

        if unknown.is_empty() {
            trip_update(true, "trips booked successfully", booked)
        } else {
            let message = format!(
                "the following launches couldn't be booked: {}",
                unknown.join(", ")
            );
            trip_update(false, &message, booked)
        }
    }

    fn cancel_trip(
        &self,
        state: &mut FixtureState,
        user: Option<&str>,
        args: &BTreeMap<String, Value>,
    ) -> Value {
        let Some(email) = user else {
            return trip_update(false, "You must be logged in to cancel trips", vec![]);
        };
        let id = args.get("launchId").map(id_string).unwrap_or_default();
        let removed = state
            .trips
            .get_mut(email)
            .is_some_and(|trips| trips.remove(&id));

        match self.find(&id) {
            Some(launch) if removed => {
                trip_update(true, "trip cancelled", vec![launch.to_json(false)])
            }
            _ => trip_update(false, "failed to cancel trip", vec![]),
        }
    }

    fn find(&self, id: &str) -> Option<&LaunchFixture> {
        self.launches.iter().find(|l| l.id == id)
    }
}

#[async_trait]
impl RemoteApi for FixtureApi {
    async fn execute(&self, request: &Request) -> LaunchpadResult<Response> {
        self.respond(request)
    }

    fn api_name(&self) -> &'static str {
        "fixture"
    }
}

fn login(args: &BTreeMap<String, Value>) -> Value {
    let email = args
        .get("email")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();

    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return json!({
            "__typename": "LoginResponse",
            "success": false,
            "message": "bad email",
            "token": null,
        });
    }

    json!({
        "__typename": "LoginResponse",
        "success": true,
        "message": "logged in",
        "token": FixtureApi::issue_token(email),
    })
}

fn trip_update(success: bool, message: &str, launches: Vec<Value>) -> Value {
    json!({
        "__typename": "TripUpdateResponse",
        "success": success,
        "message": message,
        "launches": launches,
    })
}

fn signature(email: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(TOKEN_SECRET);
    hasher.update(email.as_bytes());
    let mut sig = hex::encode(hasher.finalize());
    sig.truncate(SIGNATURE_LEN);
    sig
}

fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
