//! Configuration schema for Launchpad
//!
//! Configuration is stored at `~/.config/launchpad/config.toml`

use crate::api::fixture::DEFAULT_PAGE_SIZE;
use crate::error::GENERIC_ERROR_MESSAGE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Client behaviour
    pub client: ClientConfig,

    /// Session credential settings
    pub credentials: CredentialsConfig,

    /// Bundled in-process backend
    pub fixture: FixtureConfig,
}

impl Config {
    /// Check values serde cannot express. Returns the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.client.page_size == Some(0) {
            return Err("client.page_size must be at least 1".to_string());
        }
        if self.fixture.page_size == 0 {
            return Err("fixture.page_size must be at least 1".to_string());
        }
        if self.client.error_message.trim().is_empty() {
            return Err("client.error_message must not be empty".to_string());
        }
        Ok(())
    }
}

/// Client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Listing page size sent as `pageSize` (server default when unset)
    pub page_size: Option<u32>,

    /// Text shown in place of internal failures
    pub error_message: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            page_size: None,
            error_message: GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

impl ClientConfig {
    /// Replace the built-in generic failure text with the configured one
    pub fn user_text(&self, message: &str) -> String {
        if message == GENERIC_ERROR_MESSAGE {
            self.error_message.clone()
        } else {
            message.to_string()
        }
    }
}

/// Session credential settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Token file (defaults to the state directory)
    pub token_file: Option<PathBuf>,
}

/// Bundled backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    /// Number of launches in the catalogue
    pub launches: usize,

    /// Page size when a request does not send `pageSize`
    pub page_size: usize,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            launches: 45,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}
