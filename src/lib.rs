//! Launchpad - normalized client cache for a launch storefront
//!
//! Keeps server entities, paged listings and client-only state (login flag,
//! cart) in one normalized store, runs queries and mutations against a remote
//! API, and pushes store changes to watched queries.

pub mod api;
pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod mutation;
pub mod operations;
pub mod query;
pub mod session;
pub mod ui;

pub use client::{Client, LoginOutcome};
pub use error::{LaunchpadError, LaunchpadResult};
