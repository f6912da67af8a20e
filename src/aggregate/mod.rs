//! Visitor aggregation.
//!
//! Turns the full set of known visitor records into the views the widget
//! renders:
//! - location buckets with visit counts for map markers
//! - a diversity-limited, newest-first visitor log
//! - the number of distinct clients
//!
//! [`VisitorFeed`] keeps the working record set current as live change
//! events arrive.

mod feed;
mod log_view;
mod map;

// Re-export public API
pub use feed::{LiveUpdateOutcome, VisitorFeed};
pub use log_view::{aggregate_for_log, unique_visitor_count, LogLimit};
pub use map::aggregate_for_map;
