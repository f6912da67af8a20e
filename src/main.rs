//! Main application entry point (CLI binary).
//!
//! A thin wrapper around the `visitor_tracker` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use log::{info, warn};
use std::process;
use tokio_util::sync::CancellationToken;

use visitor_tracker::app::{cancel_on_ctrl_c, print_failure_statistics, render_report};
use visitor_tracker::initialization::init_logger_with;
use visitor_tracker::notify::LogNotifier;
use visitor_tracker::{Config, Tracker, TrackerReport};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env from the current directory, else from next to the executable
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let config = Config::parse();

    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    let tracker = match Tracker::init(&config).await {
        Ok(tracker) => tracker,
        Err(e) => {
            eprintln!("visitor_tracker error: {:#}", e);
            process::exit(1);
        }
    };

    // Subscribe before resolving so our own write shows up as an echo
    let subscription = if config.follow {
        let subscription = tracker.subscribe();
        if subscription.is_none() {
            warn!("--follow needs a reachable visitor store; printing once");
        }
        subscription
    } else {
        None
    };

    let report = match tracker.run().await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("visitor_tracker error: {:#}", e);
            tracker.close().await;
            process::exit(1);
        }
    };
    print!("{}", render_report(&report, Utc::now()));

    if let Some(subscription) = subscription {
        let shutdown = CancellationToken::new();
        let listener = cancel_on_ctrl_c(shutdown.clone());
        let mut feed = report.feed;

        info!("Following live visitor updates, press Ctrl-C to stop");
        let applied = feed.follow(subscription, shutdown.clone(), &LogNotifier).await;
        shutdown.cancel();
        let _ = listener.await;
        info!("Applied {} live update(s)", applied);

        let report = TrackerReport { feed, ..report };
        print!("{}", render_report(&report, Utc::now()));
    }

    print_failure_statistics(tracker.stats());
    tracker.close().await;
    Ok(())
}
