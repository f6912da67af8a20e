//! Failure statistics printing.

use log::info;

use crate::error_handling::TrackingStats;

/// Logs the failures absorbed during the run, if any.
///
/// Nothing is printed for a clean run.
pub fn print_failure_statistics(stats: &TrackingStats) {
    let total = stats.total();
    if total == 0 {
        return;
    }

    info!("Degraded operations ({} total):", total);
    for (failure, count) in stats.summary() {
        info!("   {}: {}", failure.as_str(), count);
    }
}
