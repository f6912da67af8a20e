//! Local fallback cache.
//!
//! A directory-backed key-value store holding the client's own view of the
//! visitor data: the most recent visitor records under one key and the
//! derived location buckets under another. Each key is one JSON file. The
//! cache is private to this client and never reconciled with the store.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;

use crate::config::{LOCAL_CACHE_LIMIT, VISITOR_LOCATIONS_KEY, VISITOR_LOG_KEY};
use crate::error_handling::CacheError;
use crate::models::{LocationBucket, VisitorRecord};

/// File-backed key-value cache rooted at one directory.
#[derive(Debug, Clone)]
pub struct LocalCache {
    dir: PathBuf,
}

impl LocalCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        LocalCache { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Reads and deserializes `key`. A missing entry reads as `None`.
    async fn read_key<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Serializes `value` under `key`, replacing the previous entry.
    ///
    /// Writes to a sibling temp file first so a crash never leaves a
    /// half-written entry behind.
    async fn write_key<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        let content = serde_json::to_vec(value)?;
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Cached visitor records, newest first.
    pub async fn load_records(&self) -> Result<Vec<VisitorRecord>, CacheError> {
        Ok(self
            .read_key::<Vec<VisitorRecord>>(VISITOR_LOG_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Stores `records` (expected newest first), keeping only the most
    /// recent [`LOCAL_CACHE_LIMIT`] entries.
    pub async fn save_records(&self, records: &[VisitorRecord]) -> Result<(), CacheError> {
        let kept = &records[..records.len().min(LOCAL_CACHE_LIMIT)];
        self.write_key(VISITOR_LOG_KEY, kept).await
    }

    /// Cached location buckets, checked entry by entry. Entries that do not
    /// parse, or have unusable coordinates, no country, or a zero count, are
    /// dropped; the rest are kept.
    ///
    /// The resolver only writes this key; at runtime the map view is derived
    /// from the records. It is kept for readers of the cache directory.
    pub async fn load_buckets(&self) -> Result<Vec<LocationBucket>, CacheError> {
        let entries: Vec<serde_json::Value> = self
            .read_key(VISITOR_LOCATIONS_KEY)
            .await?
            .unwrap_or_default();
        let total = entries.len();
        let valid: Vec<LocationBucket> = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<LocationBucket>(entry).ok())
            .filter(LocationBucket::is_valid)
            .collect();
        if valid.len() < total {
            log::debug!(
                "Dropped {} invalid cached location bucket(s)",
                total - valid.len()
            );
        }
        Ok(valid)
    }

    pub async fn save_buckets(&self, buckets: &[LocationBucket]) -> Result<(), CacheError> {
        self.write_key(VISITOR_LOCATIONS_KEY, buckets).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::record_at;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_cache_reads_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = LocalCache::new(temp_dir.path().join("never-written"));
        assert!(cache.load_records().await.unwrap().is_empty());
        assert!(cache.load_buckets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_records_round_trip_in_order() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = LocalCache::new(temp_dir.path());
        let records = vec![record_at("203.0.113.1", 20), record_at("203.0.113.2", 10)];

        cache.save_records(&records).await.unwrap();
        let loaded = cache.load_records().await.unwrap();

        assert_eq!(loaded, records);
        assert!(temp_dir.path().join("visitorLog.json").exists());
    }

    #[tokio::test]
    async fn test_save_records_caps_history() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = LocalCache::new(temp_dir.path());
        let records: Vec<VisitorRecord> = (0..150)
            .rev()
            .map(|i| record_at(&format!("203.0.113.{}", i % 250), i))
            .collect();

        cache.save_records(&records).await.unwrap();
        let loaded = cache.load_records().await.unwrap();

        assert_eq!(loaded.len(), LOCAL_CACHE_LIMIT);
        // Newest kept, oldest dropped
        assert_eq!(loaded[0], records[0]);
        assert_eq!(loaded[LOCAL_CACHE_LIMIT - 1], records[LOCAL_CACHE_LIMIT - 1]);
    }

    #[tokio::test]
    async fn test_load_buckets_filters_invalid_entries() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::write(
            temp_dir.path().join("visitorLocations.json"),
            r#"[
                {"country":"France","lat":48.85,"lon":2.35,"count":4},
                {"country":"","lat":1.0,"lon":1.0,"count":1},
                {"country":"Spain","lat":40.4,"lon":-3.7,"count":0}
            ]"#,
        )
        .unwrap();

        let cache = LocalCache::new(temp_dir.path());
        let buckets = cache.load_buckets().await.unwrap();

        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].country, "France");
        assert_eq!(buckets[0].visit_count, 4);
    }

    #[tokio::test]
    async fn test_load_buckets_skips_malformed_entries() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::write(
            temp_dir.path().join("visitorLocations.json"),
            r#"[
                {"country":"France","lat":null,"lon":2.35,"count":4},
                {"country":"Spain","lat":"40.4","lon":-3.7,"count":2},
                {"country":"Peru","city":"Lima","lat":-12.05,"lon":-77.04,"count":3},
                "not a bucket"
            ]"#,
        )
        .unwrap();

        let cache = LocalCache::new(temp_dir.path());
        let buckets = cache.load_buckets().await.unwrap();

        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].location_label(), "Lima, Peru");
        assert_eq!(buckets[0].visit_count, 3);
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::write(temp_dir.path().join("visitorLog.json"), "not json").unwrap();

        let cache = LocalCache::new(temp_dir.path());
        let result = cache.load_records().await;
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }
}
