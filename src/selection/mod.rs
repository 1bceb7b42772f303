//! Selection subsystem
//!
//! # Flow
//!
//! 1. [`PaginatedScanner`] fetches the next batch; the store applies the
//!    structural filter (type, active, assigned)
//! 2. [`Selector`] applies the remaining checks to each token of the batch
//! 3. The resulting [`MatchResult`] is handed to the action stage and
//!    dropped before the next batch is fetched

mod result;
mod scanner;
mod selector;

pub use result::MatchResult;
pub use scanner::PaginatedScanner;
pub use selector::{SelectionCriteria, Selector};
