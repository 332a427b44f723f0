//! Status lines for CLI output
//!
//! Interactive terminals get cliclack's log gutter; pipes and CI get
//! bracketed tags that are easy to grep.

use super::context::UiContext;
use console::style;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Ok,
    Info,
    Warn,
    Fail,
}

fn step(ctx: &UiContext, level: Level, message: &str) {
    if ctx.use_fancy_output() {
        match level {
            Level::Ok => cliclack::log::success(message).ok(),
            Level::Info => cliclack::log::info(message).ok(),
            Level::Warn => cliclack::log::warning(message).ok(),
            Level::Fail => cliclack::log::error(message).ok(),
        };
        return;
    }

    let tag = match level {
        Level::Ok => style("[OK]").green(),
        Level::Info => style("[INFO]").cyan(),
        Level::Warn => style("[WARN]").yellow(),
        Level::Fail => style("[FAIL]").red(),
    };
    println!("  {} {}", tag, message);
}

/// Heading for a block of output
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        cliclack::intro(style(title).cyan().bold()).ok();
    } else {
        println!("{}", style(title).cyan().bold());
        println!();
    }
}

/// Closing line for a block started with [`intro`]
pub fn outro(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::outro(message).ok();
    } else {
        println!();
        println!("{}", message);
    }
}

pub fn step_ok(ctx: &UiContext, message: &str) {
    step(ctx, Level::Ok, message);
}

pub fn step_info(ctx: &UiContext, message: &str) {
    step(ctx, Level::Info, message);
}

pub fn step_warn(ctx: &UiContext, message: &str) {
    step(ctx, Level::Warn, message);
}

/// Warning followed by what to do about it
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    step(ctx, Level::Warn, &format!("{} - {}", message, style(hint).dim()));
}

pub fn step_error(ctx: &UiContext, message: &str) {
    step(ctx, Level::Fail, message);
}

/// Aligned `key: value` line; `ok` colours the value
pub fn key_value(ctx: &UiContext, key: &str, value: &str, ok: Option<bool>) {
    let value = match ok {
        Some(true) => style(value).green().to_string(),
        Some(false) => style(value).yellow().to_string(),
        None => value.to_string(),
    };
    if ctx.use_fancy_output() {
        println!("  {:<12} {}", style(key).dim(), value);
    } else {
        println!("  {:<12} {}", format!("{}:", key), value);
    }
}
