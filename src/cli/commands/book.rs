//! Book command - put launches in the cart and book them

use crate::cli::args::BookArgs;
use crate::cli::commands::connect;
use crate::cli::commands::launches::LaunchRow;
use crate::client::Client;
use crate::config::Config;
use crate::error::{LaunchpadError, LaunchpadResult};
use crate::mutation::MutationOutcome;
use crate::ui::{self, UiContext};

/// Execute the book command
pub async fn execute(args: BookArgs, config: &Config) -> LaunchpadResult<()> {
    let ctx = UiContext::detect();
    let client = connect(config).await?;

    if !client.is_logged_in() {
        return Err(LaunchpadError::NotLoggedIn);
    }

    for id in &args.ids {
        client.add_to_cart(id);
    }

    let booked = client.cart_items();
    book_cart(&ctx, &client).await?;

    for id in &booked {
        let state = client.launch(id).await;
        if let Some(row) = state.get("launch").and_then(LaunchRow::from_value) {
            ui::step_ok(&ctx, &format!("{} {} ({})", row.id, row.mission, row.rocket));
        }
    }
    Ok(())
}

/// Book the cart, turning rejections and failures into errors
pub async fn book_cart(ctx: &UiContext, client: &Client) -> LaunchpadResult<()> {
    match client.book_trips().await {
        MutationOutcome::Committed { payload } => {
            let message = payload
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Trips booked");
            ui::step_ok(ctx, message);
            Ok(())
        }
        MutationOutcome::Rejected { message } | MutationOutcome::Failed { message } => {
            Err(LaunchpadError::User(message))
        }
    }
}
