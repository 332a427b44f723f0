//! Client session: login state and cart

pub mod auth;
pub mod cart;

pub use auth::{AuthEvent, AuthState};
