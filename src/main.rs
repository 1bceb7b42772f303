//! token-janitor CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`. Fatal errors are
//! printed to stderr as one line and the process exits with status 1.

use token_janitor::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
