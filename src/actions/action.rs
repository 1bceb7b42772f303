//! The action applied to every selected token

use std::fmt;
use std::str::FromStr;

use crate::store::IdentityBackend;

use super::errors::{ActionError, ActionResult};

/// Target of the `export` action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    Csv,
    Yaml,
    #[default]
    Pskc,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Yaml => "yaml",
            ExportFormat::Pskc => "pskc",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "yaml" => Ok(ExportFormat::Yaml),
            "pskc" => Ok(ExportFormat::Pskc),
            other => Err(format!("unknown export format '{}', expected csv, yaml or pskc", other)),
        }
    }
}

/// One action per run. Parameters are checked by [`Action::validate`]
/// before the scan starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Print serial, type and owner, or per-owner counts when `summary` is set
    List { summary: bool, attributes: Vec<String> },
    Export { format: ExportFormat, b32: bool },
    SetRealms(Vec<String>),
    Disable,
    Delete,
    Unassign,
    SetDescription(String),
    SetTokeninfo(Vec<(String, String)>),
    DeleteTokeninfo(Vec<String>),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::List { .. } => "list",
            Action::Export { .. } => "export",
            Action::SetRealms(_) => "set_realms",
            Action::Disable => "disable",
            Action::Delete => "delete",
            Action::Unassign => "unassign",
            Action::SetDescription(_) => "set_description",
            Action::SetTokeninfo(_) => "set_tokeninfo",
            Action::DeleteTokeninfo(_) => "delete_tokeninfo",
        }
    }

    /// Whether the action changes the store
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Action::List { .. } | Action::Export { .. })
    }

    /// Reject parameters that would fail for every token
    pub fn validate(&self, identity: &dyn IdentityBackend) -> ActionResult<()> {
        let name = self.name();
        match self {
            Action::SetRealms(realms) => {
                if realms.is_empty() {
                    return Err(ActionError::invalid(name, "no realms given"));
                }
                if let Some(unknown) = realms.iter().find(|r| !identity.realm_exists(r)) {
                    return Err(ActionError::invalid(
                        name,
                        format!("realm '{}' does not exist", unknown),
                    ));
                }
            }
            Action::SetDescription(description) if description.is_empty() => {
                return Err(ActionError::invalid(name, "no description given"));
            }
            Action::SetTokeninfo(pairs) if pairs.is_empty() => {
                return Err(ActionError::invalid(name, "no tokeninfo given"));
            }
            Action::DeleteTokeninfo(keys) if keys.is_empty() => {
                return Err(ActionError::invalid(name, "no tokeninfo keys given"));
            }
            _ => {}
        }
        Ok(())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Split a comma separated option value, dropping empty items
pub fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `key:value,key:value`
pub fn parse_tokeninfo_pairs(text: &str) -> ActionResult<Vec<(String, String)>> {
    split_list(text)
        .into_iter()
        .map(|item| match item.split_once(':') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(ActionError::invalid(
                "set_tokeninfo",
                format!("expected key:value, got '{}'", item),
            )),
        })
        .collect()
}
