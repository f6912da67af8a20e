//! Shared resource setup.
//!
//! Builds the logger and the HTTP client used for geolocation lookups. All
//! functions return [`InitializationError`](crate::error_handling::InitializationError)
//! instead of panicking.

mod client;
mod logger;

// Re-export public API
pub use client::init_client;
pub use logger::init_logger_with;
