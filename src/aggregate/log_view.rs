//! Visitor log view.

use std::collections::{HashMap, HashSet};

use crate::config::{LOG_DIVERSITY_THRESHOLD, LOG_ROWS_COLLAPSED, LOG_ROWS_EXPANDED};
use crate::models::{SessionKey, VisitorRecord};

/// How many log rows to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLimit {
    /// Collapsed widget (3 rows)
    Collapsed,
    /// First expansion (10 rows)
    Expanded,
    Rows(usize),
    Unbounded,
}

impl LogLimit {
    pub fn rows(&self) -> Option<usize> {
        match self {
            LogLimit::Collapsed => Some(LOG_ROWS_COLLAPSED),
            LogLimit::Expanded => Some(LOG_ROWS_EXPANDED),
            LogLimit::Rows(n) => Some(*n),
            LogLimit::Unbounded => None,
        }
    }

    /// The next "load more" step: ten more rows than currently shown.
    pub fn load_more(&self) -> LogLimit {
        match self.rows() {
            Some(rows) => LogLimit::Rows(rows + LOG_ROWS_EXPANDED),
            None => LogLimit::Unbounded,
        }
    }
}

/// Builds the visitor log: recent visits without letting one client flood
/// the feed.
///
/// Records are grouped by client fingerprint over their whole history (no
/// session window). Each group contributes its most recent visit; a group
/// with more than five visits also contributes its middle visit. The result
/// is newest first, truncated to `limit`.
pub fn aggregate_for_log(records: &[VisitorRecord], limit: LogLimit) -> Vec<VisitorRecord> {
    let mut ordered: Vec<&VisitorRecord> = records.iter().collect();
    ordered.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));

    let mut group_order: Vec<SessionKey> = Vec::new();
    let mut groups: HashMap<SessionKey, Vec<&VisitorRecord>> = HashMap::new();
    for record in ordered {
        let key = record.session_key();
        groups
            .entry(key.clone())
            .or_insert_with(|| {
                group_order.push(key);
                Vec::new()
            })
            .push(record);
    }

    let mut rows: Vec<VisitorRecord> = Vec::with_capacity(group_order.len());
    for key in &group_order {
        let Some(visits) = groups.get(key) else {
            continue;
        };
        if let Some(latest) = visits.first() {
            rows.push((*latest).clone());
        }
        if visits.len() > LOG_DIVERSITY_THRESHOLD {
            rows.push(visits[visits.len() / 2].clone());
        }
    }

    rows.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));
    if let Some(max) = limit.rows() {
        rows.truncate(max);
    }
    rows
}

/// Number of distinct clients (network address, browser, OS) across all
/// records.
pub fn unique_visitor_count(records: &[VisitorRecord]) -> usize {
    records
        .iter()
        .map(VisitorRecord::session_key)
        .collect::<HashSet<_>>()
        .len()
}
