//! Shell command - line-oriented session over stdin
//!
//! One client lives for the whole session, so the cart, the loaded listing and
//! everything cached carry over from one command to the next.

use crate::cli::commands::book::book_cart;
use crate::cli::commands::connect;
use crate::cli::commands::launches::{print_table, rows, Listing};
use crate::cli::commands::status::print_status;
use crate::client::Client;
use crate::config::Config;
use crate::error::{LaunchpadError, LaunchpadResult, GENERIC_ERROR_MESSAGE};
use crate::mutation::MutationOutcome;
use crate::query::executor::QueryHandle;
use crate::query::pagination::FetchMoreOutcome;
use crate::ui::{self, UiContext};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &[(&str, &str)] = &[
    ("launches", "show the launch listing"),
    ("more", "load the next page of launches"),
    ("add <id>...", "add launches to the cart"),
    ("remove <id>", "remove a launch from the cart"),
    ("cart", "show the cart"),
    ("book", "book everything in the cart"),
    ("cancel <id>", "cancel a booked trip"),
    ("trips", "show your booked trips"),
    ("login <email>", "log in"),
    ("logout", "log out"),
    ("status", "show session state"),
    ("quit", "leave the shell"),
];

/// A parsed shell line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Launches,
    More,
    Add(Vec<String>),
    Remove(String),
    Cart,
    Book,
    Cancel(String),
    Trips,
    Login(String),
    Logout,
    Status,
    Help,
    Quit,
    Empty,
}

impl ShellCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(Self::Empty);
        };
        let rest: Vec<String> = words.map(str::to_string).collect();

        let one = |usage: &str| -> Result<String, String> {
            match rest.as_slice() {
                [arg] => Ok(arg.clone()),
                _ => Err(format!("usage: {}", usage)),
            }
        };

        let parsed = match command.to_lowercase().as_str() {
            "launches" | "ls" => Self::Launches,
            "more" => Self::More,
            "add" if !rest.is_empty() => Self::Add(rest.clone()),
            "add" => return Err("usage: add <id>...".to_string()),
            "remove" | "rm" => Self::Remove(one("remove <id>")?),
            "cart" => Self::Cart,
            "book" => Self::Book,
            "cancel" => Self::Cancel(one("cancel <id>")?),
            "trips" => Self::Trips,
            "login" => Self::Login(one("login <email>")?),
            "logout" => Self::Logout,
            "status" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(format!("unknown command '{}' (try 'help')", other)),
        };
        Ok(parsed)
    }
}

struct Shell {
    ctx: UiContext,
    client: Client,
    listing: Option<QueryHandle>,
}

impl Shell {
    /// Run one command. Returns `false` when the session should end.
    async fn run(&mut self, command: ShellCommand) -> LaunchpadResult<bool> {
        match command {
            ShellCommand::Empty => {}
            ShellCommand::Quit => return Ok(false),
            ShellCommand::Help => {
                for (usage, about) in HELP {
                    println!("  {:<16} {}", usage, about);
                }
            }
            ShellCommand::Launches => self.launches().await?,
            ShellCommand::More => self.more().await?,
            ShellCommand::Add(ids) => {
                for id in ids {
                    if self.client.add_to_cart(&id) {
                        ui::step_ok(&self.ctx, &format!("Added {} to cart", id));
                    } else {
                        ui::step_info(&self.ctx, &format!("{} is already in the cart", id));
                    }
                }
            }
            ShellCommand::Remove(id) => {
                if self.client.remove_from_cart(&id) {
                    ui::step_ok(&self.ctx, &format!("Removed {} from cart", id));
                } else {
                    ui::step_info(&self.ctx, &format!("{} is not in the cart", id));
                }
            }
            ShellCommand::Cart => {
                let items = self.client.cart_items();
                if items.is_empty() {
                    ui::step_info(&self.ctx, "Cart is empty");
                } else {
                    ui::step_info(&self.ctx, &format!("Cart: {}", items.join(", ")));
                }
            }
            ShellCommand::Book => book_cart(&self.ctx, &self.client).await?,
            ShellCommand::Cancel(id) => match self.client.cancel_trip(&id).await {
                MutationOutcome::Committed { .. } => {
                    ui::step_ok(&self.ctx, &format!("Cancelled trip {}", id));
                }
                MutationOutcome::Rejected { message } | MutationOutcome::Failed { message } => {
                    return Err(LaunchpadError::User(message));
                }
            },
            ShellCommand::Trips => self.trips().await?,
            ShellCommand::Login(email) => self.login(&email).await?,
            ShellCommand::Logout => {
                self.client.logout().await?;
                ui::step_ok(&self.ctx, "Logged out");
            }
            ShellCommand::Status => print_status(&self.ctx, &self.client).await,
        }
        Ok(true)
    }

    async fn launches(&mut self) -> LaunchpadResult<()> {
        let handle = self.client.launches().await;
        let state = handle.state();
        if let Some(message) = state.error_message() {
            return Err(LaunchpadError::User(message.to_string()));
        }
        let listing = Listing::from_state(&state);
        print_table(&self.ctx, &listing.launches, listing.has_more);
        self.listing = Some(handle);
        Ok(())
    }

    async fn more(&mut self) -> LaunchpadResult<()> {
        let Some(handle) = &self.listing else {
            return Err(LaunchpadError::User(
                "No listing loaded, run 'launches' first".to_string(),
            ));
        };

        match self.client.load_more(handle).await {
            FetchMoreOutcome::Merged { added, has_more } => {
                let listing = Listing::from_state(&handle.state());
                let start = listing.launches.len().saturating_sub(added);
                print_table(&self.ctx, &listing.launches[start..], has_more);
            }
            FetchMoreOutcome::Exhausted => ui::step_info(&self.ctx, "No more launches"),
            FetchMoreOutcome::Failed(message) => return Err(LaunchpadError::User(message)),
            other => ui::step_warn(&self.ctx, &format!("Nothing loaded ({:?})", other)),
        }
        Ok(())
    }

    async fn trips(&self) -> LaunchpadResult<()> {
        if !self.client.is_logged_in() {
            return Err(LaunchpadError::NotLoggedIn);
        }
        let state = self.client.my_trips().await;
        if let Some(message) = state.error_message() {
            return Err(LaunchpadError::User(message.to_string()));
        }
        let trips = rows(state.get("me").and_then(|me| me.get("trips")));
        print_table(&self.ctx, &trips, false);
        Ok(())
    }

    async fn login(&self, email: &str) -> LaunchpadResult<()> {
        if self.client.auth_state().is_logged_in() {
            ui::step_warn_hint(&self.ctx, "Already logged in", "Run: logout");
            return Ok(());
        }
        let outcome = self.client.login(email).await?;
        if outcome.is_logged_in() {
            ui::step_ok(&self.ctx, &format!("Logged in as {}", email));
            return Ok(());
        }
        let message = outcome
            .message
            .unwrap_or_else(|| self.client.settings().user_text(GENERIC_ERROR_MESSAGE));
        Err(LaunchpadError::User(message))
    }
}

/// Execute the shell command
pub async fn execute(config: &Config) -> LaunchpadResult<()> {
    let ctx = UiContext::detect();
    let mut shell = Shell {
        ctx,
        client: connect(config).await?,
        listing: None,
    };

    if ctx.is_interactive() {
        ui::intro(&ctx, "Launchpad shell");
        ui::step_info(&ctx, "Type 'help' for commands, 'quit' to leave");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if ctx.is_interactive() {
            print!("launchpad> ");
            let _ = std::io::stdout().flush();
        }

        let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| LaunchpadError::io("reading stdin", e))?
        else {
            break;
        };

        let command = match ShellCommand::parse(&line) {
            Ok(command) => command,
            Err(usage) => {
                ui::step_error(&ctx, &usage);
                continue;
            }
        };

        match shell.run(command).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                ui::step_error(&ctx, &e.to_string());
                if let Some(hint) = e.hint() {
                    ui::step_info(&ctx, hint);
                }
            }
        }
    }

    shell.client.shutdown();
    if ctx.is_interactive() {
        ui::outro(&ctx, "Bye");
    }
    Ok(())
}
