//! Launches command - page through upcoming launches

use crate::cli::args::{LaunchesArgs, OutputFormat};
use crate::cli::commands::connect;
use crate::config::Config;
use crate::error::{LaunchpadError, LaunchpadResult};
use crate::query::executor::QueryState;
use crate::query::pagination::FetchMoreOutcome;
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// One launch as shown in listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchRow {
    pub id: String,
    pub mission: String,
    pub rocket: String,
    pub booked: bool,
}

impl LaunchRow {
    /// Read a resolved launch object. Entries without an id are skipped.
    pub fn from_value(launch: &Value) -> Option<Self> {
        let id = match launch.get("id")? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let text = |value: Option<&Value>| value.and_then(Value::as_str).unwrap_or("-").to_string();
        Some(Self {
            id,
            mission: text(launch.pointer("/mission/name")),
            rocket: text(launch.pointer("/rocket/name")),
            booked: launch.get("isBooked").and_then(Value::as_bool).unwrap_or(false),
        })
    }
}

/// Launch listing extracted from a query state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub launches: Vec<LaunchRow>,
    pub cursor: Option<String>,
    pub has_more: bool,
}

impl Listing {
    pub fn from_state(state: &QueryState) -> Self {
        let Some(connection) = state.get("launches") else {
            return Self::default();
        };
        Self {
            launches: rows(connection.get("launches")),
            cursor: connection
                .get("cursor")
                .and_then(Value::as_str)
                .map(str::to_string),
            has_more: connection
                .get("hasMore")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }
}

/// Rows for a JSON array of launches
pub fn rows(launches: Option<&Value>) -> Vec<LaunchRow> {
    launches
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(LaunchRow::from_value).collect())
        .unwrap_or_default()
}

/// Execute the launches command
pub async fn execute(args: LaunchesArgs, config: &Config) -> LaunchpadResult<()> {
    let client = connect(config).await?;
    let handle = client.launches().await;

    if let Some(message) = handle.state().error_message() {
        return Err(LaunchpadError::User(message.to_string()));
    }

    for _ in 1..args.pages {
        match client.load_more(&handle).await {
            FetchMoreOutcome::Merged { .. } => {}
            FetchMoreOutcome::Failed(message) => return Err(LaunchpadError::User(message)),
            outcome => {
                debug!("Stopped paging: {:?}", outcome);
                break;
            }
        }
    }

    let listing = Listing::from_state(&handle.state());
    match args.format {
        OutputFormat::Table => {
            print_table(&UiContext::detect(), &listing.launches, listing.has_more)
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listing)?),
        OutputFormat::Plain => print_plain(&listing.launches),
    }

    Ok(())
}

/// Print launches as an aligned table
pub fn print_table(ctx: &UiContext, launches: &[LaunchRow], has_more: bool) {
    if launches.is_empty() {
        ui::step_info(ctx, "No launches");
        return;
    }

    println!(
        "{:<6} {:<28} {:<14} {:<8}",
        style("ID").bold(),
        style("MISSION").bold(),
        style("ROCKET").bold(),
        style("BOOKED").bold()
    );
    println!("{}", "-".repeat(58));

    for launch in launches {
        let booked = if launch.booked {
            style("yes").green()
        } else {
            style("no").dim()
        };
        println!(
            "{:<6} {:<28} {:<14} {:<8}",
            launch.id, launch.mission, launch.rocket, booked
        );
    }

    println!();
    if has_more {
        println!("{} launch(es), more available", launches.len());
    } else {
        println!("{} launch(es)", launches.len());
    }
}

fn print_plain(launches: &[LaunchRow]) {
    for launch in launches {
        println!("{}\t{}", launch.id, launch.mission);
    }
}
