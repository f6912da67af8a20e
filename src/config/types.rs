//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::aggregate::LogLimit;
use crate::config::constants::{
    DEFAULT_CACHE_DIR, DEFAULT_GEOLOCATION_URL, DEFAULT_USER_AGENT, GEOLOCATION_TIMEOUT_SECS,
    LOG_ROWS_COLLAPSED,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Tracker configuration.
///
/// Parsed from the command line (and environment) by the binary, or built
/// programmatically by library users.
///
/// # Examples
///
/// ```no_run
/// use visitor_tracker::Config;
///
/// let config = Config {
///     store: Some("sqlite://visitors.db".to_string()),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Parser)]
#[command(
    name = "visitor_tracker",
    about = "Resolve the current visitor and print the aggregated visitor map and log"
)]
pub struct Config {
    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain")]
    pub log_format: LogFormat,

    /// User-Agent string of the visiting client
    #[arg(long, env = "VISITOR_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Persistent visitor store (SQLite URL or file path). Without it the
    /// tracker runs on the local cache only.
    #[arg(long, env = "VISITOR_STORE_URL")]
    pub store: Option<String>,

    /// Directory holding the local fallback cache
    #[arg(long, default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// IP-geolocation endpoint
    #[arg(long, env = "VISITOR_GEOLOCATION_URL", default_value = DEFAULT_GEOLOCATION_URL)]
    pub geolocation_url: String,

    /// Geolocation request timeout in seconds
    #[arg(long, default_value_t = GEOLOCATION_TIMEOUT_SECS)]
    pub lookup_timeout_seconds: u64,

    /// Number of visitor log rows to print
    #[arg(long, default_value_t = LOG_ROWS_COLLAPSED)]
    pub log_rows: usize,

    /// Print every visitor log row (overrides --log-rows)
    #[arg(long)]
    pub log_all: bool,

    /// Show ten more visitor log rows per step, like pressing "load more"
    #[arg(long, default_value_t = 0)]
    pub more: usize,

    /// Keep running and apply live store updates until Ctrl-C (requires
    /// --store)
    #[arg(long)]
    pub follow: bool,
}

impl Config {
    /// Geolocation timeout as a `Duration`.
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_seconds)
    }

    /// Row limit for the printed visitor log.
    pub fn log_limit(&self) -> LogLimit {
        let base = if self.log_all {
            LogLimit::Unbounded
        } else {
            LogLimit::Rows(self.log_rows)
        };
        (0..self.more).fold(base, |limit, _| limit.load_more())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            store: None,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            geolocation_url: DEFAULT_GEOLOCATION_URL.to_string(),
            lookup_timeout_seconds: GEOLOCATION_TIMEOUT_SECS,
            log_rows: LOG_ROWS_COLLAPSED,
            log_all: false,
            more: 0,
            follow: false,
        }
    }
}
