//! CLI command implementations
//!
//! Option values are compiled into a [`PipelineConfig`] before the store is
//! opened. Anything malformed is reported and nothing is touched.

use std::io::Write;
use std::path::Path;

use clap::Parser;
use regex::Regex;

use crate::actions::{parse_tokeninfo_pairs, split_list, Action, ActionError};
use crate::codec::{load_documents, parse_pskc, MacPolicy};
use crate::criteria::{AuthAge, CriterionCompiler, ValueOptions};
use crate::observability::init_logging;
use crate::pipeline::{run as run_pipeline, PipelineConfig};
use crate::selection::SelectionCriteria;
use crate::store::{JsonStore, StoreError, StructuralFilter, TokenStore};

use super::args::{ActionCommand, Cli, Command, FindArgs, FindStage};
use super::config::{Config, Settings};
use super::errors::{CliError, CliResult};
use super::io::{diagnostics, payload, read_input};

/// Parse the command line and run it
pub fn run() -> CliResult<()> {
    run_command(Cli::parse())
}

pub fn run_command(cli: Cli) -> CliResult<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let chunk_size = match &cli.command {
        Command::Find(args) => args.chunksize,
        _ => None,
    };
    let settings = config.resolve(cli.store.as_deref(), chunk_size, cli.log_level.as_deref());
    init_logging(settings.log_level.as_deref(), settings.log_format).map_err(CliError::config_error)?;

    match cli.command {
        Command::Find(args) => find(&settings, &args),
        Command::Updatetokens { yaml } => {
            let mut store = JsonStore::open(settings.store_path()?)?;
            update_tokens(&mut store, &yaml, payload(), diagnostics()).map(|_| ())
        }
        Command::Loadtokens {
            pskc,
            preshared_key_hex,
            validate_mac,
        } => {
            let mut store = JsonStore::open(settings.store_path()?)?;
            load_tokens(
                &mut store,
                &pskc,
                preshared_key_hex.as_deref(),
                validate_mac,
                payload(),
                diagnostics(),
            )
            .map(|_| ())
        }
    }
}

fn find(settings: &Settings, args: &FindArgs) -> CliResult<()> {
    let mut pipeline = build_pipeline(args)?;
    pipeline.chunk_size = settings.chunk_size;

    let mut store = JsonStore::open(settings.store_path()?)?;
    let report = run_pipeline(&pipeline, &mut store, payload(), diagnostics())?;
    if report.outcomes.has_failures() {
        tracing::warn!(failed = report.outcomes.failed, "some tokens could not be processed");
    }
    Ok(())
}

fn pattern(option: &str, pattern: Option<&str>) -> CliResult<Option<Regex>> {
    pattern
        .map(|p| {
            Regex::new(p).map_err(|e| CliError::invalid_criterion(format!("Invalid {} pattern '{}': {}", option, p, e)))
        })
        .transpose()
}

/// Compile the selection options and the action
pub fn build_pipeline(args: &FindArgs) -> CliResult<PipelineConfig> {
    let structural = StructuralFilter {
        tokentype: args.tokentype.clone(),
        active: args.active,
        assigned: args.assigned,
    };

    let value_options = ValueOptions {
        value: args.tokeninfo_value.clone(),
        greater_than: args.tokeninfo_value_greater_than.clone(),
        less_than: args.tokeninfo_value_less_than.clone(),
        after: args.tokeninfo_value_after.clone(),
        before: args.tokeninfo_value_before.clone(),
    };

    let selection = SelectionCriteria {
        last_auth: args.last_auth.as_deref().map(str::parse::<AuthAge>).transpose()?,
        serial: pattern("serial", args.serial.as_deref())?,
        description: pattern("description", args.description.as_deref())?,
        has_tokeninfo_key: args.has_tokeninfo_key.clone(),
        has_not_tokeninfo_key: args.has_not_tokeninfo_key.clone(),
        tokeninfo_filter: CriterionCompiler::tokeninfo_filter(
            args.tokeninfo.as_deref(),
            args.tokeninfo_key.as_deref(),
            &value_options,
        )?,
        column_filter: args
            .tokenattribute
            .as_deref()
            .map(CriterionCompiler::column_filter)
            .transpose()?,
        orphaned: args.orphaned,
    };

    let FindStage::Action { action } = &args.stage;
    Ok(PipelineConfig {
        structural,
        selection,
        chunk_size: args.chunksize,
        action: build_action(action)?,
    })
}

/// Translate the action subcommand
pub fn build_action(command: &ActionCommand) -> CliResult<Action> {
    let action = match command {
        ActionCommand::List { sum, attributes } => Action::List {
            summary: *sum,
            attributes: attributes.as_deref().map(split_list).unwrap_or_default(),
        },
        ActionCommand::Export { format, b32 } => Action::Export {
            format: *format,
            b32: *b32,
        },
        ActionCommand::SetRealms { realms } => Action::SetRealms(split_list(realms)),
        ActionCommand::Disable => Action::Disable,
        ActionCommand::Delete => Action::Delete,
        ActionCommand::Unassign => Action::Unassign,
        ActionCommand::SetDescription { description } => Action::SetDescription(description.clone()),
        ActionCommand::SetTokeninfo { tokeninfo } => Action::SetTokeninfo(parse_tokeninfo_pairs(tokeninfo)?),
        ActionCommand::DeleteTokeninfo { tokeninfo } => Action::DeleteTokeninfo(split_list(tokeninfo)),
    };
    Ok(action)
}

/// Totals of an import
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub failed: Vec<String>,
    pub not_parsed: Vec<String>,
}

/// Rewrite existing tokens from a YAML export. The `owner` field is ignored.
pub fn update_tokens<S, W, D>(store: &mut S, yaml: &Path, mut out: W, mut diag: D) -> CliResult<ImportSummary>
where
    S: TokenStore,
    W: Write,
    D: Write,
{
    writeln!(diag, "Loading YAML data. This may take a while.")?;
    let documents = load_documents(&read_input(yaml)?)?;

    let mut summary = ImportSummary::default();
    for document in documents {
        let serial = document.serial.clone();
        let Some(mut token) = store.get(&serial)? else {
            writeln!(diag, "Can not find token {}. Not updating.", serial)?;
            summary.failed.push(serial);
            continue;
        };

        writeln!(out, "Updating token {}.", serial)?;
        let updated = document
            .apply_to(&mut token)
            .map_err(ActionError::from)
            .and_then(|_| store.save(&token).map_err(ActionError::from));
        match updated {
            Ok(()) => summary.imported += 1,
            Err(e) => {
                writeln!(diag, "Failed to update token {}: {}", serial, e)?;
                summary.failed.push(serial);
            }
        }
    }

    tracing::info!(updated = summary.imported, failed = summary.failed.len(), "tokens updated");
    Ok(summary)
}

/// Import a PSKC key container.
///
/// With [`MacPolicy::CheckFailHard`] a single bad MAC aborts the import
/// before anything is written.
pub fn load_tokens<S, W, D>(
    store: &mut S,
    pskc: &Path,
    preshared_key_hex: Option<&str>,
    policy: MacPolicy,
    mut out: W,
    mut diag: D,
) -> CliResult<ImportSummary>
where
    S: TokenStore,
    W: Write,
    D: Write,
{
    let parsed = parse_pskc(&read_input(pskc)?, preshared_key_hex, policy)?;

    let mut summary = ImportSummary {
        not_parsed: parsed.not_parsed,
        ..Default::default()
    };
    for token in parsed.tokens {
        let serial = token.serial.clone();
        writeln!(out, "Importing token {}", serial)?;
        let imported = match store.get(&serial)? {
            Some(_) => Err(StoreError::TokenExists(serial.clone())),
            None => store.save(&token.into_record()),
        };
        match imported {
            Ok(()) => summary.imported += 1,
            Err(e) => {
                writeln!(diag, "--- Failed to import token. {}", e)?;
                summary.failed.push(serial);
            }
        }
    }

    if !summary.not_parsed.is_empty() {
        writeln!(
            diag,
            "The following tokens were not read from the PSKC file because they could not be validated: {}",
            summary.not_parsed.join(", ")
        )?;
    }
    writeln!(diag, "Successfully imported {} tokens.", summary.imported)?;
    writeln!(
        diag,
        "Failed to import {} tokens: {}",
        summary.failed.len(),
        summary.failed.join(", ")
    )?;

    tracing::info!(
        imported = summary.imported,
        failed = summary.failed.len(),
        not_parsed = summary.not_parsed.len(),
        "pskc import finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::errors::CliErrorCode;
    use crate::codec::{PskcWriter, TokenDocument};
    use crate::store::{StoreDocument, TokenRecord};

    fn find_args(stage: ActionCommand) -> FindArgs {
        FindArgs {
            stage: FindStage::Action { action: stage },
            ..Default::default()
        }
    }

    #[test]
    fn test_build_pipeline() {
        let mut args = find_args(ActionCommand::Disable);
        args.tokentype = Some("HOTP".into());
        args.serial = Some("^OATH".into());
        args.last_auth = Some("30d".into());
        args.tokeninfo_key = Some("count_auth".into());
        args.tokeninfo_value_greater_than = Some("5".into());

        let pipeline = build_pipeline(&args).unwrap();
        assert_eq!(pipeline.structural.tokentype.as_deref(), Some("HOTP"));
        assert!(pipeline.selection.serial.is_some());
        assert!(pipeline.selection.last_auth.is_some());
        assert_eq!(pipeline.selection.tokeninfo_filter.as_ref().unwrap().field, "count_auth");
        assert_eq!(pipeline.action, Action::Disable);
    }

    #[test]
    fn test_malformed_input_is_invalid_criterion() {
        let mut args = find_args(ActionCommand::Delete);
        args.tokeninfo = Some("hashlib >= sha1".into());
        assert_eq!(build_pipeline(&args).unwrap_err().code(), CliErrorCode::InvalidCriterion);

        let mut args = find_args(ActionCommand::Delete);
        args.serial = Some("(".into());
        assert_eq!(build_pipeline(&args).unwrap_err().code(), CliErrorCode::InvalidCriterion);

        let mut args = find_args(ActionCommand::Delete);
        args.last_auth = Some("3w".into());
        assert_eq!(build_pipeline(&args).unwrap_err().code(), CliErrorCode::InvalidCriterion);

        let mut args = find_args(ActionCommand::Delete);
        args.tokenattribute = Some("nosuchcolumn == 1".into());
        assert_eq!(build_pipeline(&args).unwrap_err().code(), CliErrorCode::InvalidCriterion);
    }

    #[test]
    fn test_build_action_parameters() {
        let action = build_action(&ActionCommand::SetTokeninfo {
            tokeninfo: "hashlib:sha1,tokenkind:hardware".into(),
        })
        .unwrap();
        assert_eq!(
            action,
            Action::SetTokeninfo(vec![
                ("hashlib".into(), "sha1".into()),
                ("tokenkind".into(), "hardware".into())
            ])
        );

        let err = build_action(&ActionCommand::SetTokeninfo {
            tokeninfo: "hashlib".into(),
        })
        .unwrap_err();
        assert_eq!(err.code(), CliErrorCode::InvalidAction);
    }

    fn store_with(tokens: Vec<TokenRecord>) -> JsonStore {
        JsonStore::in_memory(StoreDocument {
            tokens,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_update_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let mut exported = TokenRecord::new("A1", "hotp").with_otpkey("ffff");
        exported.description = "re-encrypted".into();
        let mut yaml = String::new();
        for token in [&exported, &TokenRecord::new("GONE", "hotp")] {
            yaml.push_str(&TokenDocument::from_token(token, None, false).unwrap().to_yaml_item().unwrap());
        }
        let path = dir.path().join("tokens.yaml");
        std::fs::write(&path, yaml).unwrap();

        let mut store = store_with(vec![TokenRecord::new("A1", "hotp").with_otpkey("0000")]);
        let mut diag = Vec::new();
        let summary = update_tokens(&mut store, &path, Vec::new(), &mut diag).unwrap();

        assert_eq!(summary.imported, 1);
        assert_eq!(summary.failed, vec!["GONE".to_string()]);
        let token = store.get("A1").unwrap().unwrap();
        assert_eq!(token.otpkey, "ffff");
        assert_eq!(token.description, "re-encrypted");
        assert!(String::from_utf8(diag).unwrap().contains("Can not find token GONE"));
    }

    #[test]
    fn test_load_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = PskcWriter::new();
        let mut xml = writer.header().unwrap();
        for serial in ["NEW1", "OLD1"] {
            let token = TokenRecord::new(serial, "totp").with_otpkey("abcdef");
            xml.push_str(&writer.key_package(&token, None).unwrap());
        }
        xml.push_str(writer.footer());
        let path = dir.path().join("tokens.xml");
        std::fs::write(&path, xml).unwrap();

        let mut store = store_with(vec![TokenRecord::new("OLD1", "hotp")]);
        let summary = load_tokens(
            &mut store,
            &path,
            Some(writer.key_hex().as_str()),
            MacPolicy::CheckFailHard,
            Vec::new(),
            Vec::new(),
        )
        .unwrap();

        assert_eq!(summary.imported, 1);
        assert_eq!(summary.failed, vec!["OLD1".to_string()]);
        let imported = store.get("NEW1").unwrap().unwrap();
        assert_eq!(imported.otpkey, "abcdef");
        assert_eq!(imported.tokeninfo("timeStep"), Some("30"));
    }
}
