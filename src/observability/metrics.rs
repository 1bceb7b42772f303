//! Run counters
//!
//! Counters only, monotonic, reset when a new registry is created.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters of one pipeline run
#[derive(Debug, Default)]
pub struct RunMetrics {
    /// Batches fetched from the store
    batches: AtomicU64,
    /// Tokens returned by the store
    scanned: AtomicU64,
    /// Tokens passing selection
    matched: AtomicU64,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a fetched batch and how much of it was selected
    pub fn record_batch(&self, scanned: usize, matched: usize) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.scanned.fetch_add(scanned as u64, Ordering::Relaxed);
        self.matched.fetch_add(matched as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            scanned: self.scanned.load(Ordering::Relaxed),
            matched: self.matched.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RunMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub batches: u64,
    pub scanned: u64,
    pub matched: u64,
}

impl MetricsSnapshot {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_is_zero() {
        assert_eq!(RunMetrics::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_counters() {
        let metrics = RunMetrics::new();
        metrics.record_batch(10, 3);
        metrics.record_batch(4, 0);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.batches, 2);
        assert_eq!(snapshot.scanned, 14);
        assert_eq!(snapshot.matched, 3);
    }

    #[test]
    fn test_to_json() {
        let metrics = RunMetrics::new();
        metrics.record_batch(2, 1);
        let parsed: serde_json::Value = serde_json::from_str(&metrics.snapshot().to_json()).unwrap();
        assert_eq!(parsed["scanned"], 2);
        assert_eq!(parsed["matched"], 1);
    }
}
