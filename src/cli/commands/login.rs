//! Login command - log in and persist the session token

use crate::cli::args::LoginArgs;
use crate::cli::commands::connect;
use crate::config::Config;
use crate::error::{LaunchpadError, LaunchpadResult, GENERIC_ERROR_MESSAGE};
use crate::ui::{self, UiContext};

/// Execute the login command
pub async fn execute(args: LoginArgs, config: &Config) -> LaunchpadResult<()> {
    let ctx = UiContext::detect();
    let client = connect(config).await?;

    if client.auth_state().is_logged_in() {
        ui::step_warn_hint(&ctx, "Already logged in", "Run: launchpad logout");
        return Ok(());
    }

    let outcome = client.login(args.email.trim()).await?;
    if !outcome.is_logged_in() {
        let message = outcome
            .message
            .unwrap_or_else(|| config.client.user_text(GENERIC_ERROR_MESSAGE));
        return Err(LaunchpadError::User(message));
    }

    ui::step_ok(&ctx, &format!("Logged in as {}", args.email.trim()));
    Ok(())
}
