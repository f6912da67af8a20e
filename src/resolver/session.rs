//! Merge-or-insert session resolution.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::types::{RecordSource, Resolution};
use crate::aggregate::aggregate_for_map;
use crate::cache::LocalCache;
use crate::config::{LOCAL_CACHE_LIMIT, SESSION_WINDOW};
use crate::error_handling::{DatabaseError, FailureType, ResolveError, TrackingStats};
use crate::geolocation::{GeoLocation, GeolocationClient};
use crate::models::VisitorRecord;
use crate::notify::NewVisitorNotifier;
use crate::storage::VisitorStore;
use crate::user_agent::parse_user_agent;

/// Outcome of applying one visit to a record set.
struct Applied {
    visitor: VisitorRecord,
    is_new_session: bool,
    records: Vec<VisitorRecord>,
}

/// Ways a store resolution can fail.
enum StoreFailure {
    /// The visit never reached the store.
    Write(FailureType, DatabaseError),
    /// The visit was stored but the full set could not be re-fetched.
    Refetch {
        visitor: VisitorRecord,
        is_new_session: bool,
        error: DatabaseError,
    },
}

/// Resolves page loads into visitor records.
///
/// Construct one per process and share it; it holds no per-visit state.
pub struct VisitorResolver {
    geolocation: GeolocationClient,
    store: Option<Arc<dyn VisitorStore>>,
    cache: LocalCache,
    notifier: Arc<dyn NewVisitorNotifier>,
    stats: Arc<TrackingStats>,
    window: Duration,
}

impl VisitorResolver {
    pub fn new(
        geolocation: GeolocationClient,
        store: Option<Arc<dyn VisitorStore>>,
        cache: LocalCache,
        notifier: Arc<dyn NewVisitorNotifier>,
        stats: Arc<TrackingStats>,
    ) -> Self {
        VisitorResolver {
            geolocation,
            store,
            cache,
            notifier,
            stats,
            window: SESSION_WINDOW,
        }
    }

    /// Overrides the session window (30 minutes by default).
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Resolves the current page load for a client with `user_agent`.
    pub async fn resolve(&self, user_agent: &str) -> Result<Resolution, ResolveError> {
        self.resolve_at(user_agent, Utc::now()).await
    }

    /// Same as [`resolve`](Self::resolve) with an explicit observation time.
    pub async fn resolve_at(
        &self,
        user_agent: &str,
        now: DateTime<Utc>,
    ) -> Result<Resolution, ResolveError> {
        let location = match self.geolocation.lookup().await {
            Ok(location) => location,
            Err(e) => {
                log::warn!("Geolocation lookup failed: {}", e);
                self.stats.increment(FailureType::LookupFailed);
                return self.fallback_records().await.ok_or(ResolveError::LookupFailed(e));
            }
        };

        let visit = visit_from(location, user_agent, now);

        let (applied, source) = match self.store.as_deref() {
            Some(store) => match self.apply_to_store(store, &visit).await {
                Ok(applied) => (applied, RecordSource::Store),
                Err(StoreFailure::Write(failure, e)) => {
                    log::warn!("Visitor store unavailable, using local cache: {}", e);
                    self.stats.increment(failure);
                    (self.apply_to_cache(&visit).await, RecordSource::LocalCache)
                }
                Err(StoreFailure::Refetch {
                    visitor,
                    is_new_session,
                    error,
                }) => {
                    log::warn!(
                        "Visit stored but re-fetch failed, showing cached records: {}",
                        error
                    );
                    self.stats.increment(FailureType::StoreReadFailed);
                    let records = self.cached_with(&visitor).await;
                    let applied = Applied {
                        visitor,
                        is_new_session,
                        records,
                    };
                    (applied, RecordSource::LocalCache)
                }
            },
            None => (self.apply_to_cache(&visit).await, RecordSource::LocalCache),
        };

        if applied.is_new_session {
            self.notifier.notify(&applied.visitor);
        }
        log::info!(
            "Resolved visitor {} ({}) from {}: {} record(s)",
            applied.visitor.network_address,
            if applied.is_new_session {
                "new session"
            } else {
                "returning"
            },
            source,
            applied.records.len()
        );

        Ok(Resolution {
            visitor: Some(applied.visitor),
            is_new_session: applied.is_new_session,
            records: applied.records,
            source,
        })
    }

    /// Merge-or-insert against the store, then re-fetch the full set.
    ///
    /// Once the write succeeds the session decision is final; a failed
    /// re-fetch carries the stored visitor back to the caller.
    async fn apply_to_store(
        &self,
        store: &dyn VisitorStore,
        visit: &VisitorRecord,
    ) -> Result<Applied, StoreFailure> {
        let since = visit
            .observed_at
            .checked_sub_signed(window_as_chrono(self.window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let existing = store
            .find_session(&visit.session_key(), since)
            .await
            .map_err(|e| StoreFailure::Write(FailureType::StoreReadFailed, e))?;

        let (visitor, is_new_session) = match existing {
            Some(mut session) => match session.id {
                Some(id) => {
                    log::debug!(
                        "Merging visit from {} into session {}",
                        visit.network_address,
                        id
                    );
                    session.merge_visit(visit);
                    let stored = store
                        .update(id, &session)
                        .await
                        .map_err(|e| StoreFailure::Write(FailureType::StoreWriteFailed, e))?;
                    (stored, false)
                }
                None => (self.insert(store, visit).await?, true),
            },
            None => (self.insert(store, visit).await?, true),
        };

        match store.fetch_all().await {
            Ok(records) => Ok(Applied {
                visitor,
                is_new_session,
                records,
            }),
            Err(error) => Err(StoreFailure::Refetch {
                visitor,
                is_new_session,
                error,
            }),
        }
    }

    async fn insert(
        &self,
        store: &dyn VisitorStore,
        visit: &VisitorRecord,
    ) -> Result<VisitorRecord, StoreFailure> {
        log::debug!("No session within window for {}; inserting", visit.network_address);
        store
            .insert(visit)
            .await
            .map_err(|e| StoreFailure::Write(FailureType::StoreWriteFailed, e))
    }

    /// Cached records with the stored `visitor` in place of its session.
    /// Read-only: the cache is not touched for a visit the store accepted.
    async fn cached_with(&self, visitor: &VisitorRecord) -> Vec<VisitorRecord> {
        let mut records = self.load_cached_records().await;
        records.retain(|r| !r.is_same_session(visitor, self.window));
        records.insert(0, visitor.clone());
        records.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));
        records
    }

    /// Merge-or-insert against the local cache. Never fails; cache errors
    /// are logged and counted.
    async fn apply_to_cache(&self, visit: &VisitorRecord) -> Applied {
        let mut records = self.load_cached_records().await;

        let existing = records
            .iter()
            .position(|r| r.is_same_session(visit, self.window));

        let (visitor, is_new_session) = match existing {
            Some(index) => {
                log::debug!("Merging visit from {} into cached session", visit.network_address);
                records[index].merge_visit(visit);
                let merged = records[index].clone();
                records.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));
                (merged, false)
            }
            None => {
                records.insert(0, visit.clone());
                records.truncate(LOCAL_CACHE_LIMIT);
                (visit.clone(), true)
            }
        };

        if let Err(e) = self.cache.save_records(&records).await {
            log::warn!("Failed to save visitor log to cache: {}", e);
            self.stats.increment(FailureType::CacheWriteFailed);
        }
        if let Err(e) = self.cache.save_buckets(&aggregate_for_map(&records)).await {
            log::warn!("Failed to save visitor locations to cache: {}", e);
            self.stats.increment(FailureType::CacheWriteFailed);
        }

        Applied {
            visitor,
            is_new_session,
            records,
        }
    }

    async fn load_cached_records(&self) -> Vec<VisitorRecord> {
        match self.cache.load_records().await {
            Ok(records) => records,
            Err(e) => {
                log::warn!("Failed to read cached visitor log: {}", e);
                self.stats.increment(FailureType::CacheReadFailed);
                Vec::new()
            }
        }
    }

    /// Best records available without a current visitor: the store's full
    /// set if it answers with something, else the local cache.
    async fn fallback_records(&self) -> Option<Resolution> {
        if let Some(store) = self.store.as_deref() {
            match store.fetch_all().await {
                Ok(records) if !records.is_empty() => {
                    return Some(degraded(records, RecordSource::Store));
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Visitor store unavailable: {}", e);
                    self.stats.increment(FailureType::StoreReadFailed);
                }
            }
        }

        let cached = self.load_cached_records().await;
        if cached.is_empty() {
            None
        } else {
            log::warn!("Serving {} cached visitor record(s)", cached.len());
            Some(degraded(cached, RecordSource::CachedFallback))
        }
    }
}

fn degraded(records: Vec<VisitorRecord>, source: RecordSource) -> Resolution {
    Resolution {
        visitor: None,
        is_new_session: false,
        records,
        source,
    }
}

fn visit_from(location: GeoLocation, user_agent: &str, now: DateTime<Utc>) -> VisitorRecord {
    let fingerprint = parse_user_agent(user_agent);
    VisitorRecord {
        id: None,
        network_address: location.network_address,
        country: location.country,
        city: location.city,
        region: location.region,
        timezone: location.timezone,
        operating_system: fingerprint.operating_system,
        browser_family: fingerprint.browser_family,
        latitude: Some(location.latitude),
        longitude: Some(location.longitude),
        observed_at: now,
    }
}

fn window_as_chrono(window: Duration) -> chrono::Duration {
    chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX)
}
