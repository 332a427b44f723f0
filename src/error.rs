//! Error types for Launchpad
//!
//! All modules use `LaunchpadResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Generic message shown to users when the real cause should stay internal.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

/// Result type alias for Launchpad operations
pub type LaunchpadResult<T> = Result<T, LaunchpadError>;

/// All errors that can occur in Launchpad
#[derive(Error, Debug)]
pub enum LaunchpadError {
    // Remote API errors
    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Remote API returned errors: {}", .0.join("; "))]
    Remote(Vec<String>),

    #[error("Remote API is unreachable")]
    Offline,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    // Session errors
    #[error("Invalid auth transition: {from} on {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Unknown launch: {0}")]
    UnknownLaunch(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Credential errors
    #[error("Failed to persist credential: {0}")]
    CredentialPersist(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl LaunchpadError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a fetch error
    pub fn fetch(reason: impl Into<String>) -> Self {
        Self::Fetch(reason.into())
    }

    /// Message safe to show to the end user.
    ///
    /// Transport and API failures collapse to [`GENERIC_ERROR_MESSAGE`].
    pub fn user_message(&self) -> String {
        match self {
            Self::NotLoggedIn => "You must be logged in".to_string(),
            Self::UnknownLaunch(id) => format!("Unknown launch {}", id),
            Self::User(message) => message.clone(),
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NotLoggedIn => Some("Run: launchpad login <email>"),
            Self::Offline => Some("Check the remote API and retry"),
            Self::ConfigInvalid { .. } => Some("Run: launchpad config init --force"),
            _ => None,
        }
    }
}
