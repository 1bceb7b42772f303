//! Per-token action results

use std::fmt;

/// How applying the action to one token ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Ok,
    Failed,
    /// Left out of an export
    Skipped,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Ok => "ok",
            OutcomeStatus::Failed => "failed",
            OutcomeStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of applying the action to one token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub serial: String,
    pub status: OutcomeStatus,
    pub detail: String,
}

impl ActionOutcome {
    fn new(serial: impl Into<String>, status: OutcomeStatus, detail: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            status,
            detail: detail.into(),
        }
    }

    pub fn ok(serial: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(serial, OutcomeStatus::Ok, detail)
    }

    pub fn failed(serial: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(serial, OutcomeStatus::Failed, detail)
    }

    pub fn skipped(serial: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::new(serial, OutcomeStatus::Skipped, reason.to_string())
    }

    /// Skips count as unsuccessful
    pub fn success(&self) -> bool {
        self.status == OutcomeStatus::Ok
    }

    pub fn is_skip(&self) -> bool {
        self.status == OutcomeStatus::Skipped
    }
}

/// Consumer of outcomes, fed one outcome at a time
pub trait OutcomeSink {
    fn record(&mut self, outcome: ActionOutcome);
}

impl OutcomeSink for Vec<ActionOutcome> {
    fn record(&mut self, outcome: ActionOutcome) {
        self.push(outcome);
    }
}

/// Counting sink used for the run summary.
///
/// Outcomes are not retained, so arbitrarily large runs use constant memory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeReport {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl OutcomeReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl OutcomeSink for OutcomeReport {
    fn record(&mut self, outcome: ActionOutcome) {
        self.processed += 1;
        match outcome.status {
            OutcomeStatus::Ok => self.succeeded += 1,
            OutcomeStatus::Skipped => self.skipped += 1,
            OutcomeStatus::Failed => {
                self.failed += 1;
                tracing::debug!(serial = %outcome.serial, detail = %outcome.detail, "action failed");
            }
        }
    }
}

impl fmt::Display for OutcomeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} succeeded, {} failed, {} skipped",
            self.processed, self.succeeded, self.failed, self.skipped
        )
    }
}
