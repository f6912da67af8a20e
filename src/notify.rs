//! New-visitor notifications.
//!
//! Fired once per genuinely new session: by the resolver when it inserts a
//! record, and by the live feed when an insert arrives that is not an echo
//! of a known session. Merges and updates never notify.

use colored::*;

use crate::models::VisitorRecord;

/// Receives a callback for each new visitor session.
pub trait NewVisitorNotifier: Send + Sync {
    fn notify(&self, visitor: &VisitorRecord);
}

/// Announces new visitors through the logger.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NewVisitorNotifier for LogNotifier {
    fn notify(&self, visitor: &VisitorRecord) {
        log::info!(
            "{} from {} ({} on {})",
            "New visitor".bold(),
            visitor.location_label(),
            visitor.browser_family,
            visitor.operating_system
        );
    }
}

/// Discards notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl NewVisitorNotifier for SilentNotifier {
    fn notify(&self, _visitor: &VisitorRecord) {}
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Records every notified visitor for assertions.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub seen: Mutex<Vec<VisitorRecord>>,
    }

    impl RecordingNotifier {
        pub fn count(&self) -> usize {
            self.seen.lock().map(|seen| seen.len()).unwrap_or(0)
        }
    }

    impl NewVisitorNotifier for RecordingNotifier {
        fn notify(&self, visitor: &VisitorRecord) {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(visitor.clone());
            }
        }
    }
}
