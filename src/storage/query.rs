//! Visitor store query filters.

use chrono::{DateTime, Utc};

use crate::models::SessionKey;

/// Result ordering by observation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// Filter for [`VisitorStore::query`](super::VisitorStore::query).
///
/// The default query matches every record, newest first, unlimited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisitorQuery {
    /// Only records with this client fingerprint
    pub session: Option<SessionKey>,
    /// Only records observed at or after this instant
    pub since: Option<DateTime<Utc>>,
    /// Only records observed at or before this instant
    pub until: Option<DateTime<Utc>>,
    pub order: SortOrder,
    pub limit: Option<u32>,
}

impl VisitorQuery {
    pub fn for_session(key: SessionKey) -> Self {
        VisitorQuery {
            session: Some(key),
            ..Default::default()
        }
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}
