//! Visitor resolution.
//!
//! Turns one page load into exactly one visitor record, deciding whether it
//! starts a new session or extends one seen in the last 30 minutes. The
//! persistent store is used when configured and reachable; the local cache
//! takes over otherwise.

mod session;
mod types;

pub use session::VisitorResolver;
pub use types::{RecordSource, Resolution};
