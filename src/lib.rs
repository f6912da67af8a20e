//! visitor_tracker library: visitor deduplication and aggregation
//!
//! Resolves each page load into a single visitor record (merging repeat
//! visits from the same client within 30 minutes), persists it to a SQLite
//! visitor store or a local fallback cache, and aggregates the visitor set
//! into map location buckets and a diversity-aware visitor log.
//!
//! # Example
//!
//! ```no_run
//! use visitor_tracker::{run_tracker, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     store: Some("sqlite://visitors.db".to_string()),
//!     ..Default::default()
//! };
//!
//! let report = run_tracker(config).await?;
//! println!(
//!     "{} record(s), {} unique visitor(s), {} map bucket(s)",
//!     report.feed.len(),
//!     report.unique_visitors(),
//!     report.buckets().len()
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime.

pub mod aggregate;
pub mod app;
pub mod cache;
pub mod config;
pub mod error_handling;
pub mod geolocation;
pub mod initialization;
pub mod models;
pub mod notify;
pub mod resolver;
pub mod storage;
pub mod user_agent;

// Re-export public API
pub use aggregate::{LiveUpdateOutcome, LogLimit, VisitorFeed};
pub use config::{Config, LogFormat, LogLevel};
pub use models::{LocationBucket, SessionKey, VisitorRecord};
pub use resolver::{RecordSource, Resolution, VisitorResolver};
pub use run::{run_tracker, Tracker, TrackerReport};

// Wiring of store, cache, lookup client, and resolver for one run
mod run {
    use std::sync::Arc;
    use std::time::Instant;

    use anyhow::{Context, Result};
    use log::{info, warn};

    use crate::aggregate::{LogLimit, VisitorFeed};
    use crate::cache::LocalCache;
    use crate::config::Config;
    use crate::error_handling::{FailureType, TrackingStats};
    use crate::geolocation::GeolocationClient;
    use crate::initialization::init_client;
    use crate::models::{LocationBucket, VisitorRecord};
    use crate::notify::{LogNotifier, NewVisitorNotifier};
    use crate::resolver::{RecordSource, VisitorResolver};
    use crate::storage::{SqliteVisitorStore, Subscription, VisitorStore};

    /// Outcome of one tracker run.
    #[derive(Debug, Clone)]
    pub struct TrackerReport {
        /// The resolved visitor; `None` when only cached data was available
        pub visitor: Option<VisitorRecord>,
        /// Whether this run started a new session
        pub is_new_session: bool,
        /// Where the record set came from
        pub source: RecordSource,
        /// Record set behind the map and log views
        pub feed: VisitorFeed,
        /// Row limit for the visitor log
        pub log_limit: LogLimit,
        /// Failures absorbed during the run, by type
        pub failures: Vec<(FailureType, usize)>,
        /// Elapsed time in seconds
        pub elapsed_seconds: f64,
    }

    impl TrackerReport {
        pub fn buckets(&self) -> Vec<LocationBucket> {
            self.feed.buckets()
        }

        pub fn log(&self) -> Vec<VisitorRecord> {
            self.feed.log(self.log_limit)
        }

        pub fn unique_visitors(&self) -> usize {
            self.feed.unique_visitors()
        }
    }

    /// Explicitly constructed tracker: one resolver over an optional store
    /// and the local cache.
    pub struct Tracker {
        resolver: VisitorResolver,
        store: Option<Arc<SqliteVisitorStore>>,
        stats: Arc<TrackingStats>,
        user_agent: String,
        log_limit: LogLimit,
    }

    impl Tracker {
        /// Builds the HTTP client, opens the store if one is configured,
        /// and wires the resolver.
        ///
        /// An unreachable store is not an error: the tracker logs a warning
        /// and runs on the local cache.
        ///
        /// # Errors
        ///
        /// Returns an error if the HTTP client cannot be built.
        pub async fn init(config: &Config) -> Result<Self> {
            let stats = Arc::new(TrackingStats::new());
            let client = init_client(config).context("Failed to initialize HTTP client")?;
            let geolocation = GeolocationClient::new(
                client,
                config.geolocation_url.clone(),
                config.lookup_timeout(),
            );

            let store = match &config.store {
                Some(location) => match SqliteVisitorStore::connect(location).await {
                    Ok(store) => Some(Arc::new(store)),
                    Err(e) => {
                        warn!(
                            "Visitor store {} unavailable, using local cache only: {}",
                            location, e
                        );
                        stats.increment(FailureType::StoreReadFailed);
                        None
                    }
                },
                None => {
                    info!(
                        "No visitor store configured, using local cache at {}",
                        config.cache_dir.display()
                    );
                    None
                }
            };

            let notifier: Arc<dyn NewVisitorNotifier> = Arc::new(LogNotifier);
            let resolver = VisitorResolver::new(
                geolocation,
                store.clone().map(|store| store as Arc<dyn VisitorStore>),
                LocalCache::new(&config.cache_dir),
                notifier,
                stats.clone(),
            );

            Ok(Tracker {
                resolver,
                store,
                stats,
                user_agent: config.user_agent.clone(),
                log_limit: config.log_limit(),
            })
        }

        /// Live change feed of the store, if one is connected.
        pub fn subscribe(&self) -> Option<Subscription> {
            self.store.as_ref().map(|store| store.subscribe())
        }

        pub fn stats(&self) -> &TrackingStats {
            &self.stats
        }

        /// Resolves the configured client once and builds the views.
        ///
        /// # Errors
        ///
        /// Fails only when the visitor could not be geolocated and no
        /// stored or cached records exist.
        pub async fn run(&self) -> Result<TrackerReport> {
            let start = Instant::now();
            let resolution = self
                .resolver
                .resolve(&self.user_agent)
                .await
                .context("Failed to resolve visitor")?;

            let feed = VisitorFeed::new(resolution.records);
            Ok(TrackerReport {
                visitor: resolution.visitor,
                is_new_session: resolution.is_new_session,
                source: resolution.source,
                feed,
                log_limit: self.log_limit,
                failures: self.stats.summary(),
                elapsed_seconds: start.elapsed().as_secs_f64(),
            })
        }

        /// Closes the store's connection pool.
        pub async fn close(&self) {
            if let Some(store) = &self.store {
                store.close().await;
            }
        }
    }

    /// Runs the tracker once with the provided configuration.
    ///
    /// # Errors
    ///
    /// See [`Tracker::init`] and [`Tracker::run`].
    pub async fn run_tracker(config: Config) -> Result<TrackerReport> {
        let tracker = Tracker::init(&config).await?;
        let report = tracker.run().await;
        tracker.close().await;
        report
    }
}
