//! Configuration constants.
//!
//! This module defines the constants used throughout the application,
//! including the session window, cache limits, and network timeouts.

use std::time::Duration;

/// Two visits with the same client fingerprint closer together than this
/// are the same session.
pub const SESSION_WINDOW: Duration = Duration::from_secs(30 * 60);

// Geolocation lookup
/// Default IP-geolocation endpoint (ipwho.is JSON format)
pub const DEFAULT_GEOLOCATION_URL: &str = "https://ipwho.is/";
/// Geolocation request timeout in seconds
pub const GEOLOCATION_TIMEOUT_SECS: u64 = 8;

// Local fallback cache
/// Default directory for the local fallback cache
pub const DEFAULT_CACHE_DIR: &str = ".visitor_cache";
/// Cache key holding the serialized visitor records
pub const VISITOR_LOG_KEY: &str = "visitorLog";
/// Cache key holding the serialized location buckets
pub const VISITOR_LOCATIONS_KEY: &str = "visitorLocations";
/// Maximum number of records retained in the local cache (oldest dropped)
pub const LOCAL_CACHE_LIMIT: usize = 100;

// Visitor log presentation
/// Rows shown while the log is collapsed
pub const LOG_ROWS_COLLAPSED: usize = 3;
/// Rows shown when the log is first expanded (and per "load more" step)
pub const LOG_ROWS_EXPANDED: usize = 10;
/// A client with more visits than this also contributes one mid-history
/// visit to the log
pub const LOG_DIVERSITY_THRESHOLD: usize = 5;

/// Location buckets are keyed on coordinates rounded to this many
/// subdivisions per degree (one decimal, roughly 10km).
pub const BUCKET_PRECISION: f64 = 10.0;

/// Sentinel for unparseable user-agent tokens and unknown timezones
pub const UNKNOWN: &str = "Unknown";

/// Capacity of the store's change-event broadcast channel
pub const CHANGE_FEED_CAPACITY: usize = 256;

/// Default User-Agent used when none is supplied for the visiting client.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
