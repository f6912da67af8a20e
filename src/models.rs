//! Visitor data model.
//!
//! [`VisitorRecord`] is one observed visit (or a merged session of visits);
//! [`LocationBucket`] is the derived map-marker unit. Serialized field names
//! match the cached JSON layout (`ip`, `os`, `browser`, `timestamp` in epoch
//! milliseconds) so existing caches keep loading.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{BUCKET_PRECISION, UNKNOWN};
use crate::user_agent::{BrowserFamily, ClientFingerprint, OperatingSystem};

/// A finite latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Builds a pair, rejecting non-finite values.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if latitude.is_finite() && longitude.is_finite() {
            Some(Coordinates {
                latitude,
                longitude,
            })
        } else {
            None
        }
    }

    /// Grid cell at one-decimal precision.
    ///
    /// Rounds half toward positive infinity (`floor(x * 10 + 0.5)`), so
    /// -97.75 lands in the -97.7 cell.
    pub fn grid_cell(&self) -> (i64, i64) {
        (
            round_half_up(self.latitude * BUCKET_PRECISION),
            round_half_up(self.longitude * BUCKET_PRECISION),
        )
    }
}

fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Client fingerprint used for deduplication: network address, browser, OS.
///
/// Two records with equal keys are the same client; they are the same
/// *session* only if also observed within the session window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey {
    pub network_address: String,
    pub browser_family: BrowserFamily,
    pub operating_system: OperatingSystem,
}

/// One observed visit, or a session of visits merged into one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitorRecord {
    /// Store row id; `None` for records that only live in the local cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "ip")]
    pub network_address: String,
    pub country: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub region: Option<String>,
    #[serde(default = "unknown_timezone")]
    pub timezone: String,
    #[serde(rename = "os", default = "unknown_os")]
    pub operating_system: OperatingSystem,
    #[serde(rename = "browser", default = "unknown_browser")]
    pub browser_family: BrowserFamily,
    #[serde(rename = "lat", default)]
    pub latitude: Option<f64>,
    #[serde(rename = "lon", default)]
    pub longitude: Option<f64>,
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub observed_at: DateTime<Utc>,
}

fn unknown_timezone() -> String {
    UNKNOWN.to_string()
}

fn unknown_os() -> OperatingSystem {
    OperatingSystem::Unknown
}

fn unknown_browser() -> BrowserFamily {
    BrowserFamily::Unknown
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

impl VisitorRecord {
    /// Fingerprint used for session identity and lifetime grouping.
    pub fn session_key(&self) -> SessionKey {
        SessionKey {
            network_address: self.network_address.clone(),
            browser_family: self.browser_family,
            operating_system: self.operating_system,
        }
    }

    /// Usable map coordinates: both present and finite.
    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::new(self.latitude?, self.longitude?)
    }

    /// True if `other` is the same session: equal fingerprint and observed
    /// no more than `window` apart.
    pub fn is_same_session(&self, other: &VisitorRecord, window: Duration) -> bool {
        self.network_address == other.network_address
            && self.browser_family == other.browser_family
            && self.operating_system == other.operating_system
            && within_window(self.observed_at, other.observed_at, window)
    }

    /// Folds a repeat visit into this record: the observation time and the
    /// client fingerprint are taken from `visit`, everything else is kept.
    pub fn merge_visit(&mut self, visit: &VisitorRecord) {
        self.observed_at = visit.observed_at;
        self.browser_family = visit.browser_family;
        self.operating_system = visit.operating_system;
    }

    /// Applies a parsed User-Agent to this record.
    pub fn with_fingerprint(mut self, fingerprint: ClientFingerprint) -> Self {
        self.operating_system = fingerprint.operating_system;
        self.browser_family = fingerprint.browser_family;
        self
    }

    /// `"city, country"`, or just the country when the city is absent.
    pub fn location_label(&self) -> String {
        location_label(&self.country, self.city.as_deref())
    }
}

pub(crate) fn location_label(country: &str, city: Option<&str>) -> String {
    match city {
        Some(city) if !city.is_empty() => format!("{}, {}", city, country),
        _ => country.to_string(),
    }
}

/// True if the two timestamps are at most `window` apart, in either order.
pub fn within_window(a: DateTime<Utc>, b: DateTime<Utc>, window: Duration) -> bool {
    let gap = (a - b).abs();
    match chrono::Duration::from_std(window) {
        Ok(window) => gap <= window,
        Err(_) => true,
    }
}

/// Map-marker unit: visits grouped by location label and ~10km grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationBucket {
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
    #[serde(rename = "count")]
    pub visit_count: u32,
}

impl LocationBucket {
    /// A bucket read back from the cache is usable only with finite
    /// coordinates, a country, and at least one visit.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && !self.country.is_empty()
            && self.visit_count >= 1
    }

    pub fn location_label(&self) -> String {
        location_label(&self.country, self.city.as_deref())
    }
}
