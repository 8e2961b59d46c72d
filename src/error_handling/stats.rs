//! Processing statistics tracking.
//!
//! Thread-safe counters of proxy outcomes, shared by every request handler
//! and reported by the `/status` endpoint.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use strum::IntoEnumIterator;

use super::types::ErrorCategory;

/// Thread-safe processing statistics tracker.
///
/// Every [`ErrorCategory`] is initialized to zero on creation, so recording a
/// failure never allocates.
pub struct ProcessingStats {
    successes: AtomicUsize,
    failures: HashMap<ErrorCategory, AtomicUsize>,
    faults: AtomicUsize,
}

/// Point-in-time copy of [`ProcessingStats`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub successes: usize,
    pub failures: usize,
    pub validation_failures: usize,
    pub network_failures: usize,
    pub content_failures: usize,
    pub filesystem_failures: usize,
    pub faults: usize,
}

impl ProcessingStats {
    pub fn new() -> Self {
        let mut failures = HashMap::new();
        for category in ErrorCategory::iter() {
            failures.insert(category, AtomicUsize::new(0));
        }

        ProcessingStats {
            successes: AtomicUsize::new(0),
            failures,
            faults: AtomicUsize::new(0),
        }
    }

    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the failure counter of a category.
    pub fn record_failure(&self, category: ErrorCategory) {
        if let Some(counter) = self.failures.get(&category) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment failure counter for {:?} which is not in the map",
                category
            );
        }
    }

    /// Increment the counter of faults surfaced outside the JSONP payload.
    pub fn record_fault(&self) {
        self.faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self, category: ErrorCategory) -> usize {
        self.failures
            .get(&category)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let validation = self.failure_count(ErrorCategory::Validation);
        let network = self.failure_count(ErrorCategory::Network);
        let content = self.failure_count(ErrorCategory::Content);
        let filesystem = self.failure_count(ErrorCategory::Filesystem);
        StatsSnapshot {
            successes: self.successes.load(Ordering::SeqCst),
            failures: validation + network + content + filesystem,
            validation_failures: validation,
            network_failures: network,
            content_failures: content,
            filesystem_failures: filesystem,
            faults: self.faults.load(Ordering::SeqCst),
        }
    }
}

impl Default for ProcessingStats {
    fn default() -> Self {
        Self::new()
    }
}
