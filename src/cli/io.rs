//! Input files and output channels
//!
//! - stdout: payload (listings, exports, status lines)
//! - stderr: diagnostics

use std::fs;
use std::io::{self, Stderr, StdoutLock};
use std::path::Path;

use super::errors::{CliError, CliResult};

/// Read an import file
pub fn read_input(path: &Path) -> CliResult<String> {
    fs::read_to_string(path)
        .map_err(|e| CliError::import_error(format!("Failed to read {}: {}", path.display(), e)))
}

/// Payload channel
pub fn payload() -> StdoutLock<'static> {
    io::stdout().lock()
}

/// Diagnostic channel
pub fn diagnostics() -> Stderr {
    io::stderr()
}
