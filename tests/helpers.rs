// Shared test helpers for resolver setup and test data creation.
//
// This module provides common utilities used across multiple test files to reduce duplication.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use visitor_tracker::cache::LocalCache;
use visitor_tracker::error_handling::TrackingStats;
use visitor_tracker::geolocation::GeolocationClient;
use visitor_tracker::notify::NewVisitorNotifier;
use visitor_tracker::storage::VisitorStore;
use visitor_tracker::user_agent::{BrowserFamily, OperatingSystem};
use visitor_tracker::{VisitorRecord, VisitorResolver};

/// Chrome on Windows, the fingerprint every helper record carries.
#[allow(dead_code)]
pub const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Address the mock geolocation service reports for the caller.
#[allow(dead_code)]
pub const VISITOR_IP: &str = "203.0.113.7";

/// Starts a geolocation mock that places the caller in Austin, US.
#[allow(dead_code)]
pub async fn geolocation_mock() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ip": VISITOR_IP,
            "success": true,
            "country": "United States",
            "city": "Austin",
            "region": "Texas",
            "latitude": 30.27,
            "longitude": -97.74,
            "timezone": { "id": "America/Chicago", "utc": "-06:00" }
        })))
        .mount(&server)
        .await;
    server
}

/// Starts a geolocation mock that always answers 503.
#[allow(dead_code)]
pub async fn failing_geolocation_mock() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    server
}

/// Notifier that only counts calls.
#[derive(Default)]
pub struct CountingNotifier {
    count: AtomicUsize,
}

impl CountingNotifier {
    #[allow(dead_code)]
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl NewVisitorNotifier for CountingNotifier {
    fn notify(&self, _visitor: &VisitorRecord) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// A resolver wired to `server`, `store`, and a cache at `cache`.
#[allow(dead_code)]
pub fn create_resolver(
    server: &MockServer,
    store: Option<Arc<dyn VisitorStore>>,
    cache: LocalCache,
) -> (VisitorResolver, Arc<CountingNotifier>, Arc<TrackingStats>) {
    let notifier = Arc::new(CountingNotifier::default());
    let stats = Arc::new(TrackingStats::new());
    let geolocation = GeolocationClient::new(
        Arc::new(reqwest::Client::new()),
        format!("{}/", server.uri()),
        Duration::from_secs(5),
    );
    let resolver = VisitorResolver::new(geolocation, store, cache, notifier.clone(), stats.clone());
    (resolver, notifier, stats)
}

/// A Chrome/Windows visit from Austin observed `minutes` before `now`.
#[allow(dead_code)]
pub fn visit_minutes_before(ip: &str, minutes: i64, now: DateTime<Utc>) -> VisitorRecord {
    VisitorRecord {
        id: None,
        network_address: ip.to_string(),
        country: "United States".to_string(),
        city: Some("Austin".to_string()),
        region: Some("Texas".to_string()),
        timezone: "-06:00".to_string(),
        operating_system: OperatingSystem::Windows,
        browser_family: BrowserFamily::Chrome,
        latitude: Some(30.27),
        longitude: Some(-97.74),
        observed_at: now - chrono::Duration::minutes(minutes),
    }
}
