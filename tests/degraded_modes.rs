//! Degraded operation: unreachable store, cache-only mode, failed lookups.
//!
//! Visitor tracking never fails the page. Each scenario here must still
//! produce records (or, with nothing cached at all, a typed error).

mod helpers;

use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use tempfile::TempDir;

use helpers::{
    create_resolver, failing_geolocation_mock, geolocation_mock, visit_minutes_before,
    CHROME_WINDOWS, VISITOR_IP,
};
use visitor_tracker::cache::LocalCache;
use visitor_tracker::error_handling::{FailureType, ResolveError};
use visitor_tracker::storage::{SqliteVisitorStore, VisitorStore};
use visitor_tracker::{RecordSource, VisitorRecord};

/// A store that was reachable once and has since gone away.
async fn create_closed_store() -> Arc<dyn VisitorStore> {
    let store = SqliteVisitorStore::connect("sqlite::memory:")
        .await
        .expect("Failed to create test store");
    store.close().await;
    Arc::new(store)
}

/// Five distinct visitors an hour apart. Whole seconds, so they survive
/// the cache's millisecond timestamps unchanged.
fn five_cached_visits() -> Vec<VisitorRecord> {
    let now = Utc::now().trunc_subsecs(0);
    (1..=5)
        .map(|i| visit_minutes_before(&format!("198.51.100.{}", i), i * 60, now))
        .collect()
}

#[tokio::test]
async fn test_unreachable_store_and_failed_lookup_return_cached_records() {
    let server = failing_geolocation_mock().await;
    let cache_dir = TempDir::new().expect("Failed to create temp dir");
    let cache = LocalCache::new(cache_dir.path());
    let cached = five_cached_visits();
    cache.save_records(&cached).await.unwrap();
    let (resolver, notifier, stats) =
        create_resolver(&server, Some(create_closed_store().await), cache);

    let resolution = resolver
        .resolve(CHROME_WINDOWS)
        .await
        .expect("cached records should be served without error");

    assert_eq!(resolution.records, cached);
    assert_eq!(resolution.source, RecordSource::CachedFallback);
    assert!(resolution.visitor.is_none());
    assert_eq!(notifier.count(), 0);
    assert_eq!(stats.get_count(FailureType::LookupFailed), 1);
    assert_eq!(stats.get_count(FailureType::StoreReadFailed), 1);
}

#[tokio::test]
async fn test_unreachable_store_records_visit_in_cache() {
    let server = geolocation_mock().await;
    let cache_dir = TempDir::new().expect("Failed to create temp dir");
    let cache = LocalCache::new(cache_dir.path());
    let cached = five_cached_visits();
    cache.save_records(&cached).await.unwrap();
    let (resolver, notifier, stats) =
        create_resolver(&server, Some(create_closed_store().await), cache.clone());

    let resolution = resolver.resolve(CHROME_WINDOWS).await.unwrap();

    assert_eq!(resolution.source, RecordSource::LocalCache);
    assert!(resolution.is_new_session);
    assert_eq!(resolution.records.len(), 6);
    assert_eq!(resolution.records[0].network_address, VISITOR_IP);
    assert_eq!(&resolution.records[1..], &cached[..]);
    assert_eq!(notifier.count(), 1);
    assert_eq!(stats.get_count(FailureType::StoreReadFailed), 1);
    assert_eq!(cache.load_records().await.unwrap().len(), 6);
}

#[tokio::test]
async fn test_cache_only_mode_writes_both_keys() {
    let server = geolocation_mock().await;
    let cache_dir = TempDir::new().expect("Failed to create temp dir");
    let (resolver, notifier, stats) =
        create_resolver(&server, None, LocalCache::new(cache_dir.path()));

    resolver.resolve(CHROME_WINDOWS).await.unwrap();
    let second = resolver.resolve(CHROME_WINDOWS).await.unwrap();

    assert!(!second.is_new_session);
    assert_eq!(second.records.len(), 1);
    assert_eq!(notifier.count(), 1);
    assert_eq!(stats.total(), 0);
    assert!(cache_dir.path().join("visitorLog.json").exists());
    assert!(cache_dir.path().join("visitorLocations.json").exists());

    let buckets = LocalCache::new(cache_dir.path()).load_buckets().await.unwrap();
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].city.as_deref(), Some("Austin"));
    assert_eq!(buckets[0].visit_count, 1);
}

#[tokio::test]
async fn test_failed_lookup_without_any_data_is_an_error() {
    let server = failing_geolocation_mock().await;
    let cache_dir = TempDir::new().expect("Failed to create temp dir");
    let (resolver, notifier, _) =
        create_resolver(&server, None, LocalCache::new(cache_dir.path()));

    let result = resolver.resolve(CHROME_WINDOWS).await;

    let err = result.expect_err("nothing to fall back to");
    assert!(matches!(err, ResolveError::LookupFailed(_)));
    assert!(err.to_string().starts_with("Unable to load visitor data"));
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn test_corrupt_cache_is_treated_as_empty() {
    let server = geolocation_mock().await;
    let cache_dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(cache_dir.path().join("visitorLog.json"), "not json")
        .expect("Failed to write corrupt cache");
    let (resolver, _, stats) =
        create_resolver(&server, None, LocalCache::new(cache_dir.path()));

    let resolution = resolver.resolve(CHROME_WINDOWS).await.unwrap();

    assert_eq!(resolution.records.len(), 1);
    assert_eq!(stats.get_count(FailureType::CacheReadFailed), 1);
}
