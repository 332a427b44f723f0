//! CLI command implementations

pub mod book;
pub mod config;
pub mod launches;
pub mod login;
pub mod logout;
pub mod shell;
pub mod status;

pub use book::execute as book;
pub use config::execute as config;
pub use launches::execute as launches;
pub use login::execute as login;
pub use logout::execute as logout;
pub use shell::execute as shell;
pub use status::execute as status;

use crate::api::FixtureApi;
use crate::client::Client;
use crate::config::Config;
use crate::credentials::FileCredentialStore;
use crate::error::LaunchpadResult;
use std::sync::Arc;

/// Credential file for this configuration
pub fn credential_store(config: &Config) -> FileCredentialStore {
    match &config.credentials.token_file {
        Some(path) => FileCredentialStore::with_path(path.clone()),
        None => FileCredentialStore::new(),
    }
}

/// Open a client against the bundled backend with the on-disk credential
pub async fn connect(config: &Config) -> LaunchpadResult<Client> {
    let api =
        FixtureApi::with_catalogue(config.fixture.launches).page_size(config.fixture.page_size);
    Client::connect(
        Arc::new(api),
        Arc::new(credential_store(config)),
        config.client.clone(),
    )
    .await
}
