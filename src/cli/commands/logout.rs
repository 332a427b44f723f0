//! Logout command - forget the stored session

use crate::cli::commands::connect;
use crate::config::Config;
use crate::error::LaunchpadResult;
use crate::ui::{self, UiContext};

/// Execute the logout command
pub async fn execute(config: &Config) -> LaunchpadResult<()> {
    let ctx = UiContext::detect();
    let client = connect(config).await?;

    let was_logged_in = client.is_logged_in();
    client.logout().await?;

    if was_logged_in {
        ui::step_ok(&ctx, "Logged out");
    } else {
        ui::step_info(&ctx, "Not logged in");
    }
    Ok(())
}
