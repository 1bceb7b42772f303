//! token-janitor - find tokens by criteria and clean them up in bulk
//!
//! A run compiles the selection options once, scans the token store page by
//! page, keeps the tokens passing every check and applies a single action to
//! each of them, reporting one outcome per token.

pub mod actions;
pub mod cli;
pub mod codec;
pub mod criteria;
pub mod observability;
pub mod pipeline;
pub mod selection;
pub mod store;
