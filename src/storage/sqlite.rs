//! SQLite-backed visitor store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tokio::sync::broadcast;

use super::feed::{ChangeEvent, Subscription};
use super::migrations::run_migrations;
use super::pool::init_db_pool;
use super::query::VisitorQuery;
use super::VisitorStore;
use crate::config::CHANGE_FEED_CAPACITY;
use crate::error_handling::DatabaseError;
use crate::models::VisitorRecord;

const SELECT_COLUMNS: &str = "SELECT id, ip, country, city, region, timezone, os, browser, \
     latitude, longitude, observed_at_ms FROM visitors";

/// Visitor store over a SQLite database, publishing writes on a broadcast
/// change feed.
pub struct SqliteVisitorStore {
    pool: SqlitePool,
    changes: broadcast::Sender<ChangeEvent>,
}

impl SqliteVisitorStore {
    /// Wraps an already migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        SqliteVisitorStore { pool, changes }
    }

    /// Opens (creating if needed) the database at `location` and applies
    /// migrations.
    pub async fn connect(location: &str) -> Result<Self, DatabaseError> {
        let pool = init_db_pool(location).await?;
        run_migrations(&pool).await?;
        log::info!("Visitor store ready at {}", location);
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the connection pool. Later calls fail with a pool-closed
    /// error; existing subscriptions stay open until the store is dropped.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn publish(&self, event: ChangeEvent) {
        // No live subscribers is not an error
        let _ = self.changes.send(event);
    }
}

fn record_from_row(row: &SqliteRow) -> Result<VisitorRecord, sqlx::Error> {
    let observed_at_ms: i64 = row.try_get("observed_at_ms")?;
    let os: String = row.try_get("os")?;
    let browser: String = row.try_get("browser")?;
    Ok(VisitorRecord {
        id: Some(row.try_get("id")?),
        network_address: row.try_get("ip")?,
        country: row.try_get("country")?,
        city: row.try_get("city")?,
        region: row.try_get("region")?,
        timezone: row.try_get("timezone")?,
        operating_system: os.into(),
        browser_family: browser.into(),
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        observed_at: DateTime::<Utc>::from_timestamp_millis(observed_at_ms).unwrap_or_default(),
    })
}

/// SQLite stores NaN as NULL; keep that explicit.
fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

#[async_trait]
impl VisitorStore for SqliteVisitorStore {
    async fn query(&self, query: &VisitorQuery) -> Result<Vec<VisitorRecord>, DatabaseError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
        builder.push(" WHERE 1 = 1");

        if let Some(key) = &query.session {
            builder
                .push(" AND ip = ")
                .push_bind(key.network_address.clone())
                .push(" AND browser = ")
                .push_bind(key.browser_family.to_string())
                .push(" AND os = ")
                .push_bind(key.operating_system.to_string());
        }
        if let Some(since) = query.since {
            builder
                .push(" AND observed_at_ms >= ")
                .push_bind(since.timestamp_millis());
        }
        if let Some(until) = query.until {
            builder
                .push(" AND observed_at_ms <= ")
                .push_bind(until.timestamp_millis());
        }

        let order = query.order.as_sql();
        builder.push(format!(" ORDER BY observed_at_ms {order}, id {order}"));

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| record_from_row(row).map_err(DatabaseError::from))
            .collect()
    }

    async fn insert(&self, record: &VisitorRecord) -> Result<VisitorRecord, DatabaseError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO visitors (
                ip, country, city, region, timezone, os, browser,
                latitude, longitude, observed_at_ms
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id",
        )
        .bind(&record.network_address)
        .bind(&record.country)
        .bind(&record.city)
        .bind(&record.region)
        .bind(&record.timezone)
        .bind(record.operating_system.to_string())
        .bind(record.browser_family.to_string())
        .bind(finite(record.latitude))
        .bind(finite(record.longitude))
        .bind(record.observed_at.timestamp_millis())
        .fetch_one(&self.pool)
        .await?;

        let stored = VisitorRecord {
            id: Some(id),
            ..record.clone()
        };
        log::debug!("Inserted visitor record {}", id);
        self.publish(ChangeEvent::Inserted(stored.clone()));
        Ok(stored)
    }

    async fn update(
        &self,
        id: i64,
        record: &VisitorRecord,
    ) -> Result<VisitorRecord, DatabaseError> {
        let result = sqlx::query(
            "UPDATE visitors SET
                ip = ?, country = ?, city = ?, region = ?, timezone = ?, os = ?, browser = ?,
                latitude = ?, longitude = ?, observed_at_ms = ?
            WHERE id = ?",
        )
        .bind(&record.network_address)
        .bind(&record.country)
        .bind(&record.city)
        .bind(&record.region)
        .bind(&record.timezone)
        .bind(record.operating_system.to_string())
        .bind(record.browser_family.to_string())
        .bind(finite(record.latitude))
        .bind(finite(record.longitude))
        .bind(record.observed_at.timestamp_millis())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::RecordNotFound(id));
        }

        let stored = VisitorRecord {
            id: Some(id),
            ..record.clone()
        };
        log::debug!("Updated visitor record {}", id);
        self.publish(ChangeEvent::Updated(stored.clone()));
        Ok(stored)
    }

    fn subscribe(&self) -> Subscription {
        Subscription::new(self.changes.subscribe())
    }
}
