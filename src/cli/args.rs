//! CLI argument definitions using clap
//!
//! Commands:
//! - token-janitor find [selection options] action <action> [action options]
//! - token-janitor updatetokens --yaml <file>
//! - token-janitor loadtokens --pskc <file> [--preshared-key-hex <hex>] [--validate-mac <policy>]

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::actions::ExportFormat;
use crate::codec::MacPolicy;

/// Find tokens by criteria and clean them up in bulk
#[derive(Parser, Debug)]
#[command(name = "token-janitor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the token store, overrides the configuration file
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `token_janitor=trace`
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Select tokens and apply an action to them
    Find(FindArgs),

    /// Update existing tokens from a YAML export, e.g. to re-encrypt seeds
    Updatetokens {
        /// YAML file with previously exported tokens
        #[arg(long)]
        yaml: PathBuf,
    },

    /// Import tokens from a PSKC key container
    Loadtokens {
        /// PSKC file
        #[arg(long)]
        pskc: PathBuf,

        /// AES key the seeds are encrypted with, hex encoded
        #[arg(long)]
        preshared_key_hex: Option<String>,

        /// How to treat MACs: no_check, check_fail_soft or check_fail_hard
        #[arg(long, default_value_t = MacPolicy::CheckFailHard)]
        validate_mac: MacPolicy,
    },
}

/// Parse `true`/`false` style flags
pub fn parse_tristate(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(format!("expected true or false, got '{}'", other)),
    }
}

/// Selection options of `find`
#[derive(Args, Debug, Default)]
pub struct FindArgs {
    /// Read the tokens in chunks of this size
    #[arg(long)]
    pub chunksize: Option<NonZeroUsize>,

    /// Skip tokens that authenticated within this age, e.g. 10h, 7d or 1y
    #[arg(long = "last_auth", alias = "last-auth")]
    pub last_auth: Option<String>,

    /// Tokeninfo filter: `key ==|>=|<= value`
    #[arg(long)]
    pub tokeninfo: Option<String>,

    /// Tokeninfo key the value options apply to
    #[arg(long)]
    pub tokeninfo_key: Option<String>,

    /// Tokeninfo value, as a regular expression
    #[arg(long)]
    pub tokeninfo_value: Option<String>,

    /// Tokeninfo value greater than this integer
    #[arg(long)]
    pub tokeninfo_value_greater_than: Option<String>,

    /// Tokeninfo value less than this integer
    #[arg(long)]
    pub tokeninfo_value_less_than: Option<String>,

    /// Tokeninfo value after this date
    #[arg(long)]
    pub tokeninfo_value_after: Option<String>,

    /// Tokeninfo value before this date
    #[arg(long)]
    pub tokeninfo_value_before: Option<String>,

    /// Keep tokens that have this tokeninfo key
    #[arg(long)]
    pub has_tokeninfo_key: Option<String>,

    /// Keep tokens that lack this tokeninfo key
    #[arg(long)]
    pub has_not_tokeninfo_key: Option<String>,

    /// Token attribute filter: `column ==|>=|<= value`
    #[arg(long)]
    pub tokenattribute: Option<String>,

    /// Token type, e.g. hotp
    #[arg(long)]
    pub tokentype: Option<String>,

    /// Regular expression on the serial
    #[arg(long)]
    pub serial: Option<String>,

    /// Regular expression on the description
    #[arg(long)]
    pub description: Option<String>,

    /// Only assigned (true) or unassigned (false) tokens
    #[arg(long, value_parser = parse_tristate)]
    pub assigned: Option<bool>,

    /// Only active (true) or disabled (false) tokens
    #[arg(long, value_parser = parse_tristate)]
    pub active: Option<bool>,

    /// Only tokens whose owner no longer exists (true) or the others (false)
    #[arg(long, value_parser = parse_tristate)]
    pub orphaned: Option<bool>,

    #[command(subcommand)]
    pub stage: FindStage,
}

#[derive(Subcommand, Debug)]
pub enum FindStage {
    /// Apply an action to the selected tokens
    Action {
        #[command(subcommand)]
        action: ActionCommand,
    },
}

impl Default for FindStage {
    fn default() -> Self {
        FindStage::Action {
            action: ActionCommand::List {
                sum: false,
                attributes: None,
            },
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ActionCommand {
    /// List serial, type and owner of every token
    #[command(alias = "listuser")]
    List {
        /// Only print the number of tokens per owner
        #[arg(long)]
        sum: bool,

        /// Additional owner attributes to print, comma separated
        #[arg(long)]
        attributes: Option<String>,
    },

    /// Export the tokens to stdout
    Export {
        #[arg(long, default_value_t = ExportFormat::Pskc)]
        format: ExportFormat,

        /// Write seeds base32 instead of hex encoded
        #[arg(long)]
        b32: bool,
    },

    /// Replace the realms of the tokens
    #[command(name = "set_realms", alias = "tokenrealms")]
    SetRealms {
        /// Comma separated realms
        #[arg(long)]
        realms: String,
    },

    /// Disable the tokens
    Disable,

    /// Delete the tokens
    Delete,

    /// Remove the owner of the tokens
    Unassign,

    /// Set the description of the tokens
    #[command(name = "set_description")]
    SetDescription {
        #[arg(long)]
        description: String,
    },

    /// Set tokeninfo values
    #[command(name = "set_tokeninfo")]
    SetTokeninfo {
        /// Comma separated key:value pairs
        #[arg(long)]
        tokeninfo: String,
    },

    /// Delete tokeninfo keys
    #[command(name = "delete_tokeninfo")]
    DeleteTokeninfo {
        /// Comma separated keys
        #[arg(long)]
        tokeninfo: String,
    },
}
