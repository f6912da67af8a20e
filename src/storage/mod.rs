// storage/mod.rs
// Persistent visitor store

pub mod feed;
pub mod migrations;
pub mod pool;
pub mod query;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error_handling::DatabaseError;
use crate::models::{SessionKey, VisitorRecord};

// Re-export commonly used items
pub use feed::{ChangeEvent, Subscription};
pub use migrations::run_migrations;
pub use pool::init_db_pool;
pub use query::{SortOrder, VisitorQuery};
pub use sqlite::SqliteVisitorStore;

/// Row storage for visitor records with filtered queries and a change feed.
///
/// Implementations publish a [`ChangeEvent`] to every live [`Subscription`]
/// after each successful insert or update.
#[async_trait]
pub trait VisitorStore: Send + Sync {
    /// Records matching `query`, in the requested order.
    async fn query(&self, query: &VisitorQuery) -> Result<Vec<VisitorRecord>, DatabaseError>;

    /// Inserts a new row and returns the record with its assigned id.
    async fn insert(&self, record: &VisitorRecord) -> Result<VisitorRecord, DatabaseError>;

    /// Overwrites row `id` with `record` and returns the stored record.
    async fn update(&self, id: i64, record: &VisitorRecord) -> Result<VisitorRecord, DatabaseError>;

    /// Subscribes to insert/update notifications made after this call.
    fn subscribe(&self) -> Subscription;

    /// Most recent record for `key` observed at or after `since`.
    async fn find_session(
        &self,
        key: &SessionKey,
        since: DateTime<Utc>,
    ) -> Result<Option<VisitorRecord>, DatabaseError> {
        let query = VisitorQuery::for_session(key.clone())
            .since(since)
            .order(SortOrder::Descending)
            .limit(1);
        Ok(self.query(&query).await?.into_iter().next())
    }

    /// Every record, newest first.
    async fn fetch_all(&self) -> Result<Vec<VisitorRecord>, DatabaseError> {
        self.query(&VisitorQuery::default()).await
    }
}
