//! Error handling and degradation statistics.
//!
//! This module provides:
//! - Error type definitions for every fallible boundary (lookup, store, cache)
//! - Degradation statistics: counts of the failures the tracker recovered from
//!
//! None of these errors is fatal to the caller. Lookup and persistence
//! failures are absorbed by falling back to cached data; only a lookup failure
//! with nothing cached surfaces as a [`ResolveError`].

mod stats;
mod types;

// Re-export public API
pub use stats::TrackingStats;
pub use types::{
    CacheError, DatabaseError, FailureType, GeoLookupError, GeoValidationError,
    InitializationError, ResolveError,
};
