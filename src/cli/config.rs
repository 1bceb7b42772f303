//! Configuration file
//!
//! ```json
//! { "store_path": "/var/lib/janitor/tokens.json", "chunk_size": 1000,
//!   "log_level": "info", "log_format": "text" }
//! ```
//!
//! Every field is optional. Command line options override the file.

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::observability::LogFormat;

use super::errors::{CliError, CliResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Token store document
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Default page size for `find`; `null` reads everything at once
    #[serde(default)]
    pub chunk_size: Option<usize>,

    /// Log filter, used unless `--log-level` is given
    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default)]
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config {}: {}", path.display(), e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.chunk_size == Some(0) {
            return Err(CliError::config_error("chunk_size must be > 0"));
        }
        if let Some(level) = &self.log_level {
            if level.trim().is_empty() {
                return Err(CliError::config_error("log_level must not be empty"));
            }
        }
        Ok(())
    }

    /// Overlay command line options
    pub fn resolve(
        &self,
        store: Option<&Path>,
        chunk_size: Option<NonZeroUsize>,
        log_level: Option<&str>,
    ) -> Settings {
        Settings {
            store_path: store.map(Path::to_path_buf).or_else(|| self.store_path.clone()),
            chunk_size: chunk_size.or_else(|| self.chunk_size.and_then(NonZeroUsize::new)),
            log_level: log_level.map(str::to_string).or_else(|| self.log_level.clone()),
            log_format: self.log_format,
        }
    }
}

/// Effective settings of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub store_path: Option<PathBuf>,
    pub chunk_size: Option<NonZeroUsize>,
    pub log_level: Option<String>,
    pub log_format: LogFormat,
}

impl Settings {
    pub fn store_path(&self) -> CliResult<&Path> {
        self.store_path
            .as_deref()
            .ok_or_else(|| CliError::config_error("no token store configured, use --store or store_path"))
    }
}
