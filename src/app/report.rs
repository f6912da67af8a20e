//! Human-readable run report.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use colored::*;

use crate::models::{LocationBucket, VisitorRecord};
use crate::TrackerReport;

const MINUTES_IN_DAY: i64 = 1440;
const MINUTES_IN_MONTH: i64 = 43_200;
const MINUTES_IN_YEAR: i64 = 525_600;

/// Relative age of an observation, e.g. `"5 minutes ago"`.
///
/// Uses the usual coarse buckets: under a minute, minutes, hours, days,
/// months, years. Observations in the future read as just seen.
pub fn format_age(observed_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - observed_at).num_seconds().max(0);
    let minutes = (seconds as f64 / 60.0).round() as i64;
    let rounded = |unit: i64| (minutes as f64 / unit as f64).round() as i64;

    let distance = if minutes < 1 {
        "less than a minute".to_string()
    } else if minutes == 1 {
        "1 minute".to_string()
    } else if minutes < 45 {
        format!("{} minutes", minutes)
    } else if minutes < 90 {
        "about 1 hour".to_string()
    } else if minutes < MINUTES_IN_DAY {
        format!("about {} hours", rounded(60))
    } else if minutes < 2520 {
        "1 day".to_string()
    } else if minutes < MINUTES_IN_MONTH {
        format!("{} days", rounded(MINUTES_IN_DAY))
    } else if minutes < 64_800 {
        "about 1 month".to_string()
    } else if minutes < 2 * MINUTES_IN_MONTH {
        "about 2 months".to_string()
    } else if minutes < MINUTES_IN_YEAR {
        format!("{} months", rounded(MINUTES_IN_MONTH).max(2))
    } else {
        match minutes / MINUTES_IN_YEAR {
            1 => "about 1 year".to_string(),
            years => format!("about {} years", years),
        }
    };
    format!("{} ago", distance)
}

fn or_dash(value: Option<&str>) -> &str {
    match value {
        Some(value) if !value.is_empty() => value,
        _ => "-",
    }
}

fn bucket_line(bucket: &LocationBucket) -> String {
    format!(
        "  {} ({:.2}, {:.2}): {} visit{}",
        bucket.location_label(),
        bucket.latitude,
        bucket.longitude,
        bucket.visit_count,
        if bucket.visit_count == 1 { "" } else { "s" }
    )
}

fn log_line(record: &VisitorRecord, now: DateTime<Utc>) -> String {
    format!(
        "  {:<39} {:<20} {:<16} {:<9} {:<8} {:<16} {}",
        record.network_address,
        record.country,
        or_dash(record.city.as_deref()),
        record.operating_system.to_string(),
        record.browser_family.to_string(),
        or_dash(record.region.as_deref()),
        format_age(record.observed_at, now)
    )
}

fn write_report(out: &mut String, report: &TrackerReport, now: DateTime<Utc>) -> std::fmt::Result {
    match &report.visitor {
        Some(visitor) => writeln!(
            out,
            "Visitor: {} from {} ({} on {}), {}",
            visitor.network_address,
            visitor.location_label(),
            visitor.browser_family,
            visitor.operating_system,
            if report.is_new_session {
                "new session"
            } else {
                "returning within session"
            }
        )?,
        None => writeln!(out, "Visitor: unavailable, showing previously seen visitors")?,
    }
    writeln!(
        out,
        "Records: {} from {}, unique visitors: {}",
        report.feed.len(),
        report.source,
        report.feed.unique_visitors()
    )?;

    writeln!(out)?;
    writeln!(out, "{}", "Visitor locations".bold())?;
    let buckets = report.buckets();
    if buckets.is_empty() {
        writeln!(out, "  (none)")?;
    }
    for bucket in &buckets {
        writeln!(out, "{}", bucket_line(bucket))?;
    }

    writeln!(out)?;
    writeln!(out, "{}", "Recent visitors".bold())?;
    writeln!(
        out,
        "  {:<39} {:<20} {:<16} {:<9} {:<8} {:<16} {}",
        "IP", "Country", "City", "OS", "Browser", "Region", "Last Visit"
    )?;
    for record in report.log() {
        writeln!(out, "{}", log_line(&record, now))?;
    }
    Ok(())
}

/// Renders the resolution, map buckets, and visitor log as text.
pub fn render_report(report: &TrackerReport, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_report(&mut out, report, now);
    out
}
