//! Batch actions on selected tokens
//!
//! One [`Action`] per run. Read-only actions (`list`, `export`) write the
//! payload to the output channel. Mutating actions change exactly one
//! thing per token and persist it before moving on.
//!
//! Every processed token yields an [`ActionOutcome`] that is handed to an
//! [`OutcomeSink`] immediately.

mod action;
mod dispatcher;
mod errors;
mod list;
mod outcome;

pub use action::{parse_tokeninfo_pairs, split_list, Action, ExportFormat};
pub use dispatcher::ActionDispatcher;
pub use errors::{ActionError, ActionResult};
pub use list::{list_row, Owner, OwnerSummary, UNRESOLVED_OWNER};
pub use outcome::{ActionOutcome, OutcomeReport, OutcomeSink, OutcomeStatus};
