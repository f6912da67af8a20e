//! Degradation statistics tracking.
//!
//! Counts the failures the tracker absorbed while resolving and persisting
//! visitors, so the run summary can report them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::FailureType;

/// Thread-safe failure counters.
///
/// All failure types are initialized to zero on creation. Share it across
/// components with `Arc`.
pub struct TrackingStats {
    failures: HashMap<FailureType, AtomicUsize>,
}

impl TrackingStats {
    pub fn new() -> Self {
        let mut failures = HashMap::new();
        for failure in FailureType::iter() {
            failures.insert(failure, AtomicUsize::new(0));
        }
        TrackingStats { failures }
    }

    /// Increment a failure counter.
    pub fn increment(&self, failure: FailureType) {
        if let Some(counter) = self.failures.get(&failure) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment counter for {:?} which is not in the map",
                failure
            );
        }
    }

    /// Get the count for a failure type.
    pub fn get_count(&self, failure: FailureType) -> usize {
        self.failures
            .get(&failure)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Total number of recorded failures.
    pub fn total(&self) -> usize {
        self.failures
            .values()
            .map(|c| c.load(Ordering::SeqCst))
            .sum()
    }

    /// Non-zero counters in declaration order.
    pub fn summary(&self) -> Vec<(FailureType, usize)> {
        FailureType::iter()
            .map(|failure| (failure, self.get_count(failure)))
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}

impl Default for TrackingStats {
    fn default() -> Self {
        Self::new()
    }
}
