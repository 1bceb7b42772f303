//! CLI module for token-janitor
//!
//! Provides command-line interface for:
//! - find: select tokens and apply one action to them
//! - updatetokens: rewrite tokens from a YAML export
//! - loadtokens: import a PSKC key container

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{parse_tristate, ActionCommand, Cli, Command, FindArgs, FindStage};
pub use commands::{build_action, build_pipeline, load_tokens, run, run_command, update_tokens, ImportSummary};
pub use config::{Config, Settings};
pub use errors::{CliError, CliErrorCode, CliResult};
