//! Database connection pool management.
//!
//! This module initializes and configures the SQLite connection pool with:
//! - WAL mode enabled for file databases
//! - A single shared connection for in-memory databases
//! - Automatic database file creation

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::Path;

use log::{error, info};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::error_handling::DatabaseError;

const MEMORY_URL: &str = "sqlite::memory:";

/// Normalizes a store location into a SQLite URL.
///
/// Accepts `sqlite::memory:`, `sqlite://path`, `sqlite:path`, or a bare file
/// path. Returns the URL and, for file databases, the file path.
fn normalize_location(location: &str) -> (String, Option<String>) {
    if location == MEMORY_URL || location == ":memory:" {
        return (MEMORY_URL.to_string(), None);
    }
    let path = location
        .strip_prefix("sqlite://")
        .or_else(|| location.strip_prefix("sqlite:"))
        .unwrap_or(location);
    (format!("sqlite:{}", path), Some(path.to_string()))
}

/// Initializes and returns a database connection pool for `location`.
///
/// File databases are created if missing and switched to WAL mode. Each
/// connection to `sqlite::memory:` is its own database, so in-memory pools
/// hold exactly one connection that is never recycled.
pub async fn init_db_pool(location: &str) -> Result<SqlitePool, DatabaseError> {
    let (url, file_path) = normalize_location(location);

    let Some(path) = file_path else {
        return SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(&url)
            .await
            .map_err(|e| {
                error!("Failed to open in-memory database: {e}");
                DatabaseError::SqlError(e)
            });
    };

    if let Some(parent) = Path::new(&path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DatabaseError::FileCreationError(e.to_string()))?;
        }
    }

    match OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(&path)
    {
        Ok(_) => info!("Database file created successfully."),
        Err(ref e) if e.kind() == ErrorKind::AlreadyExists => {
            info!("Database file already exists.")
        }
        Err(e) => {
            error!("Failed to create database file: {e}");
            return Err(DatabaseError::FileCreationError(e.to_string()));
        }
    }

    let pool = SqlitePool::connect(&url).await.map_err(|e| {
        error!("Failed to connect to database: {e}");
        DatabaseError::SqlError(e)
    })?;

    // Enable WAL mode
    sqlx::query("PRAGMA journal_mode=WAL")
        .execute(&pool)
        .await
        .map_err(|e| {
            error!("Failed to set WAL mode: {e}");
            DatabaseError::SqlError(e)
        })?;

    Ok(pool)
}
