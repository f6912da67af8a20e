//! Error type definitions.
//!
//! This module defines all error types used throughout the application.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Error types for persistent store operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// Schema migration error.
    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    /// Update targeted a row that does not exist.
    #[error("Visitor record {0} not found")]
    RecordNotFound(i64),
}

/// Error types for the local fallback cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Reading or writing a cache file failed.
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A cache entry could not be (de)serialized.
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A geolocation response that failed schema validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoValidationError {
    /// Response body was not a JSON object.
    #[error("response is not a JSON object")]
    NotAnObject,

    /// The `success` flag is absent or not a boolean.
    #[error("response has no success flag")]
    MissingSuccessFlag,

    /// The service reported `success: false`.
    #[error("lookup rejected: {0}")]
    LookupRejected(String),

    /// The network address is absent or not a string.
    #[error("missing or non-string network address")]
    InvalidAddress,

    /// The country is absent or not a string.
    #[error("missing or non-string country")]
    InvalidCountry,

    /// A coordinate is absent, non-numeric, or non-finite.
    #[error("missing or non-numeric {0}")]
    InvalidCoordinate(&'static str),
}

/// Error types for the IP-geolocation lookup.
///
/// Every variant is a transient lookup failure: callers recover by falling
/// back to cached records.
#[derive(Error, Debug)]
pub enum GeoLookupError {
    /// The request did not complete within the configured timeout.
    #[error("geolocation lookup timed out")]
    Timeout,

    /// Transport-level failure (connect, TLS, body read).
    #[error("geolocation request failed: {0}")]
    Request(#[from] ReqwestError),

    /// The service answered with a non-success HTTP status.
    #[error("geolocation service returned HTTP {0}")]
    Status(reqwest::StatusCode),

    /// The body was not valid JSON.
    #[error("geolocation response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// The body was JSON but failed schema validation.
    #[error("invalid geolocation response: {0}")]
    Invalid(#[from] GeoValidationError),
}

/// Error returned when a visitor cannot be resolved at all.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Geolocation failed and no store or cached records were available to
    /// fall back to.
    #[error("Unable to load visitor data: {0}")]
    LookupFailed(#[source] GeoLookupError),
}

/// Failures the tracker absorbs instead of surfacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum FailureType {
    /// Geolocation lookup failed (timeout, transport, or validation)
    LookupFailed,
    /// Reading from the persistent store failed
    StoreReadFailed,
    /// Writing to the persistent store failed
    StoreWriteFailed,
    /// Reading the local cache failed
    CacheReadFailed,
    /// Writing the local cache failed
    CacheWriteFailed,
}

impl std::fmt::Display for FailureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FailureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureType::LookupFailed => "Geolocation lookup failed",
            FailureType::StoreReadFailed => "Visitor store read failed",
            FailureType::StoreWriteFailed => "Visitor store write failed",
            FailureType::CacheReadFailed => "Local cache read failed",
            FailureType::CacheWriteFailed => "Local cache write failed",
        }
    }
}
