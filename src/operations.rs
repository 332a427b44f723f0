//! Queries and mutations used by the launch client
//!
//! Shapes are built once and shared. Variable names follow the remote
//! schema: listings take `after`/`pageSize`, single launches `launchId`.

use crate::query::shape::{Field, Operation};
use std::sync::{Arc, LazyLock};

/// Client-only fields on the root record
pub mod fields {
    pub const IS_LOGGED_IN: &str = "isLoggedIn";
    pub const CART_ITEMS: &str = "cartItems";
}

/// Fields shown on a launch tile
pub fn launch_tile() -> Vec<Field> {
    vec![
        Field::remote("__typename"),
        Field::remote("id"),
        Field::remote("isBooked"),
        Field::remote("rocket").select([Field::remote("id"), Field::remote("name")]),
        Field::remote("mission")
            .select([Field::remote("name"), Field::remote("missionPatch")]),
    ]
}

/// Launch tile plus the details page fields
fn launch_details() -> Vec<Field> {
    let mut fields = launch_tile();
    fields.push(Field::remote("site"));
    if let Some(rocket) = fields.iter_mut().find(|f| f.name == "rocket") {
        rocket.selections.push(Field::remote("type"));
    }
    fields
}

static GET_LAUNCHES: LazyLock<Arc<Operation>> = LazyLock::new(|| {
    Arc::new(Operation::query(
        "GetLaunchList",
        [Field::remote("launches")
            .var("after", "after")
            .var("pageSize", "pageSize")
            .select([
                Field::remote("__typename"),
                Field::remote("cursor"),
                Field::remote("hasMore"),
                Field::remote("launches").select(launch_tile()),
            ])],
    ))
});

static GET_LAUNCH: LazyLock<Arc<Operation>> = LazyLock::new(|| {
    Arc::new(Operation::query(
        "GetLaunchDetails",
        [Field::remote("launch")
            .var("id", "launchId")
            .select(launch_details())],
    ))
});

static GET_MY_TRIPS: LazyLock<Arc<Operation>> = LazyLock::new(|| {
    Arc::new(Operation::query(
        "GetMyTrips",
        [Field::remote("me").select([
            Field::remote("__typename"),
            Field::remote("id"),
            Field::remote("email"),
            Field::remote("trips").select(launch_tile()),
        ])],
    ))
});

static IS_LOGGED_IN: LazyLock<Arc<Operation>> = LazyLock::new(|| {
    Arc::new(Operation::query(
        "IsUserLoggedIn",
        [Field::local(fields::IS_LOGGED_IN)],
    ))
});

static GET_CART_ITEMS: LazyLock<Arc<Operation>> = LazyLock::new(|| {
    Arc::new(Operation::query(
        "GetCartItems",
        [Field::local(fields::CART_ITEMS)],
    ))
});

fn trip_update(field: Field) -> Field {
    field.select([
        Field::remote("__typename"),
        Field::remote("success"),
        Field::remote("message"),
        Field::remote("launches")
            .select([Field::remote("__typename"), Field::remote("id"), Field::remote("isBooked")]),
    ])
}

static BOOK_TRIPS: LazyLock<Arc<Operation>> = LazyLock::new(|| {
    Arc::new(Operation::mutation(
        "BookTrips",
        [trip_update(Field::remote("bookTrips").var("launchIds", "launchIds"))],
    ))
});

static CANCEL_TRIP: LazyLock<Arc<Operation>> = LazyLock::new(|| {
    Arc::new(Operation::mutation(
        "CancelTrip",
        [trip_update(Field::remote("cancelTrip").var("launchId", "launchId"))],
    ))
});

static LOGIN: LazyLock<Arc<Operation>> = LazyLock::new(|| {
    Arc::new(Operation::mutation(
        "Login",
        [Field::remote("login").var("email", "email").select([
            Field::remote("success"),
            Field::remote("message"),
            Field::remote("token"),
        ])],
    ))
});

/// Paged launch listing: `launches(after, pageSize) { cursor hasMore launches }`
pub fn get_launches() -> Arc<Operation> {
    GET_LAUNCHES.clone()
}

/// One launch with site and rocket type
pub fn get_launch() -> Arc<Operation> {
    GET_LAUNCH.clone()
}

/// The logged-in user and their booked trips
pub fn get_my_trips() -> Arc<Operation> {
    GET_MY_TRIPS.clone()
}

pub fn is_logged_in() -> Arc<Operation> {
    IS_LOGGED_IN.clone()
}

pub fn get_cart_items() -> Arc<Operation> {
    GET_CART_ITEMS.clone()
}

pub fn book_trips() -> Arc<Operation> {
    BOOK_TRIPS.clone()
}

pub fn cancel_trip() -> Arc<Operation> {
    CANCEL_TRIP.clone()
}

pub fn login() -> Arc<Operation> {
    LOGIN.clone()
}
