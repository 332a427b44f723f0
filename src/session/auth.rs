//! Login state machine
//!
//! ```text
//! LoggedOut --dispatch--> LoggingIn --succeeded--> LoggedIn
//!     ^                       |                       |
//!     +---rejected / failed---+                       |
//!     +-------------------logout----------------------+
//! ```

use crate::error::{LaunchpadError, LaunchpadResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the session is in the login flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    LoggedOut,
    LoggingIn,
    LoggedIn,
}

/// Something that moves the session between states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// Login mutation sent
    Dispatch,
    /// Token returned and persisted
    Succeeded,
    /// API answered `success: false`
    Rejected,
    /// Transport failure or the token could not be persisted
    Failed,
    Logout,
}

impl AuthState {
    /// State at startup, from whether a credential is already stored
    pub fn initial(has_credential: bool) -> Self {
        if has_credential {
            Self::LoggedIn
        } else {
            Self::LoggedOut
        }
    }

    pub fn transition(self, event: AuthEvent) -> LaunchpadResult<Self> {
        use AuthEvent::*;
        use AuthState::*;

        match (self, event) {
            (LoggedOut, Dispatch) => Ok(LoggingIn),
            (LoggingIn, Succeeded) => Ok(LoggedIn),
            (LoggingIn, Rejected | Failed) => Ok(LoggedOut),
            (LoggedIn | LoggedOut, Logout) => Ok(LoggedOut),
            (from, event) => Err(LaunchpadError::InvalidTransition {
                from: from.to_string(),
                event: format!("{:?}", event).to_lowercase(),
            }),
        }
    }

    pub fn is_logged_in(self) -> bool {
        self == Self::LoggedIn
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::LoggedOut => "logged out",
            Self::LoggingIn => "logging in",
            Self::LoggedIn => "logged in",
        };
        f.write_str(label)
    }
}
