//! Resolver output types.

use crate::models::VisitorRecord;

/// Where a resolution's record set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum RecordSource {
    /// Full set re-fetched from the persistent store
    #[strum(serialize = "visitor store")]
    Store,
    /// The local cache, after applying this visit to it
    #[strum(serialize = "local cache")]
    LocalCache,
    /// Previously cached records served as-is because the visit could not
    /// be geolocated
    #[strum(serialize = "cached fallback")]
    CachedFallback,
}

/// Result of resolving one page load.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The current visitor, merged or inserted. `None` when geolocation
    /// failed and older records are served instead.
    pub visitor: Option<VisitorRecord>,
    /// True only when this page load started a new session.
    pub is_new_session: bool,
    /// Records to aggregate, newest first.
    pub records: Vec<VisitorRecord>,
    pub source: RecordSource,
}

impl Resolution {
    /// True when the current visit could not be recorded.
    pub fn is_degraded(&self) -> bool {
        self.visitor.is_none()
    }
}
