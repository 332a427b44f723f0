//! Terminal output for the CLI
//!
//! Uses `cliclack` for decorated output on interactive terminals and falls
//! back to plain tagged lines when piped or in CI.

mod context;
mod output;

pub use context::UiContext;
pub use output::{
    intro, key_value, outro, step_error, step_info, step_ok, step_warn, step_warn_hint,
};
