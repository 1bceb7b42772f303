//! Scan, select, act
//!
//! A [`PipelineConfig`] is built once from the compiled command line and is
//! only read afterwards. [`run`] threads it through the three stages:
//!
//! ```text
//! PaginatedScanner --batch--> Selector --matches--> ActionDispatcher
//! ```
//!
//! Batches are processed strictly in fetch order. Tokens within a batch
//! keep the order the store returned them in.

use std::io::Write;
use std::num::NonZeroUsize;

use thiserror::Error;

use crate::actions::{Action, ActionDispatcher, ActionError, OutcomeReport};
use crate::observability::{MetricsSnapshot, RunMetrics};
use crate::selection::{PaginatedScanner, SelectionCriteria, Selector};
use crate::store::{Backend, StoreError, StructuralFilter};

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Rejected before any token was touched, or the output broke
    #[error(transparent)]
    Action(#[from] ActionError),

    /// The store could not deliver the next batch
    #[error("Scan failed: {0}")]
    Scan(#[from] StoreError),
}

/// Everything a run needs, compiled up front
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Evaluated by the store while fetching
    pub structural: StructuralFilter,
    /// Evaluated per token after fetching
    pub selection: SelectionCriteria,
    /// Page size. `None` reads everything in one batch.
    pub chunk_size: Option<NonZeroUsize>,
    pub action: Action,
}

impl PipelineConfig {
    pub fn new(action: Action) -> Self {
        Self {
            structural: StructuralFilter::default(),
            selection: SelectionCriteria::default(),
            chunk_size: None,
            action,
        }
    }
}

/// Totals of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub metrics: MetricsSnapshot,
    pub outcomes: OutcomeReport,
}

/// Run the action over every selected token.
///
/// Fails before touching anything if the action parameters are invalid.
/// Per-token failures are counted in the report, never returned.
pub fn run<B, W, D>(config: &PipelineConfig, backend: &mut B, out: W, diag: D) -> Result<RunReport, PipelineError>
where
    B: Backend,
    W: Write,
    D: Write,
{
    config.action.validate(&*backend)?;

    match config.chunk_size {
        Some(size) => tracing::info!(chunk_size = size.get(), "reading tokens in chunks"),
        None => tracing::info!("reading tokens"),
    }

    let metrics = RunMetrics::new();
    let mut outcomes = OutcomeReport::new();
    let mut scanner = PaginatedScanner::new(config.structural.clone(), config.chunk_size);
    let selector = Selector::new(&config.selection);
    let mut dispatcher = ActionDispatcher::new(config.action.clone(), out, diag);

    while let Some(batch) = scanner.next_batch(&*backend)? {
        let matched = selector.select(batch, &*backend);
        metrics.record_batch(matched.scanned, matched.matched());
        dispatcher.apply_batch(matched, backend, &mut outcomes)?;
    }
    dispatcher.finish()?;

    let report = RunReport {
        metrics: metrics.snapshot(),
        outcomes,
    };
    tracing::info!(
        action = %config.action,
        scanned = report.metrics.scanned,
        matched = report.metrics.matched,
        succeeded = report.outcomes.succeeded,
        failed = report.outcomes.failed,
        skipped = report.outcomes.skipped,
        "run finished"
    );
    tracing::debug!(metrics = %report.metrics.to_json(), "run metrics");
    Ok(report)
}

/// Serials of the selected tokens, in selection order. Nothing is changed.
pub fn select_serials<B: Backend>(config: &PipelineConfig, backend: &B) -> Result<Vec<String>, PipelineError> {
    let mut scanner = PaginatedScanner::new(config.structural.clone(), config.chunk_size);
    let selector = Selector::new(&config.selection);

    let mut serials = Vec::new();
    while let Some(batch) = scanner.next_batch(backend)? {
        serials.extend(selector.select(batch, backend).tokens.into_iter().map(|t| t.serial));
    }
    Ok(serials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{JsonStore, StoreDocument, TokenRecord, TokenStore};

    fn store(n: usize) -> JsonStore {
        JsonStore::in_memory(StoreDocument {
            tokens: (0..n)
                .map(|i| TokenRecord::new(format!("T{:03}", i), "hotp").with_description("temp"))
                .collect(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_chunked_delete_visits_every_token() {
        let mut store = store(7);
        let mut config = PipelineConfig::new(Action::Delete);
        config.chunk_size = NonZeroUsize::new(3);

        let mut out = Vec::new();
        let report = run(&config, &mut store, &mut out, Vec::new()).unwrap();

        assert_eq!(report.outcomes.succeeded, 7);
        assert_eq!(report.metrics.scanned, 7);
        assert!(store.is_empty());
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 7);
    }

    #[test]
    fn test_invalid_parameters_touch_nothing() {
        let mut store = store(2);
        let config = PipelineConfig::new(Action::SetRealms(vec!["nowhere".into()]));

        let err = run(&config, &mut store, Vec::new(), Vec::new()).unwrap_err();
        assert!(matches!(err, PipelineError::Action(ActionError::InvalidParameter { .. })));
        assert!(store.get("T000").unwrap().unwrap().realms.is_empty());
    }

    #[test]
    fn test_select_serials() {
        let store = store(3);
        let mut config = PipelineConfig::new(Action::Delete);
        config.selection.serial = Some(regex::Regex::new("^T00[12]$").unwrap());
        assert_eq!(select_serials(&config, &store).unwrap(), vec!["T001", "T002"]);
        assert_eq!(store.len(), 3);
    }
}
