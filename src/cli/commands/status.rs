//! Status command - session, credential and configuration overview

use crate::cli::commands::{connect, credential_store};
use crate::cli::commands::launches::rows;
use crate::client::Client;
use crate::config::{Config, ConfigManager};
use crate::error::LaunchpadResult;
use crate::ui::{self, UiContext};

/// Execute the status command
pub async fn execute(manager: &ConfigManager, config: &Config) -> LaunchpadResult<()> {
    let ctx = UiContext::detect();
    let client = connect(config).await?;

    ui::intro(&ctx, "Launchpad status");
    print_status(&ctx, &client).await;

    let config_state = if manager.path().exists() {
        manager.path().display().to_string()
    } else {
        format!("{} (defaults)", manager.path().display())
    };
    ui::key_value(&ctx, "Config", &config_state, None);
    ui::key_value(
        &ctx,
        "Credential",
        &credential_store(config).path().display().to_string(),
        None,
    );
    ui::key_value(
        &ctx,
        "Catalogue",
        &format!("{} launches", config.fixture.launches),
        None,
    );

    Ok(())
}

/// Session lines shared with the interactive shell
pub async fn print_status(ctx: &UiContext, client: &Client) {
    let logged_in = client.is_logged_in();
    ui::key_value(ctx, "Session", &client.auth_state().to_string(), Some(logged_in));

    let cart = client.cart_items();
    let cart_text = if cart.is_empty() {
        "empty".to_string()
    } else {
        cart.join(", ")
    };
    ui::key_value(ctx, "Cart", &cart_text, None);

    if !logged_in {
        return;
    }

    let trips = client.my_trips().await;
    if let Some(message) = trips.error_message() {
        ui::key_value(ctx, "Trips", message, Some(false));
        return;
    }
    let booked = rows(trips.get("me").and_then(|me| me.get("trips")));
    let text = if booked.is_empty() {
        "none".to_string()
    } else {
        booked
            .iter()
            .map(|t| t.id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    ui::key_value(ctx, "Trips", &text, None);
}
