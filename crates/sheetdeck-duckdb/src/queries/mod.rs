//! Read-side SQL. Each module exposes `*_inner` functions that take the
//! backend plus an explicit cutoff, so tests can pin the window.

pub mod breakdown;
pub mod devices;
pub mod totals;
pub mod traffic;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const HOUR_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DAY_FORMAT: &str = "%Y-%m-%d";

/// Time bucket a series is grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Hour,
    Day,
}

impl Bucket {
    /// SQL expression yielding the bucket label as VARCHAR.
    pub(crate) fn label_sql(&self) -> &'static str {
        match self {
            Bucket::Hour => "strftime(date_trunc('hour', created_at), '%Y-%m-%d %H:%M:%S')",
            Bucket::Day => "strftime(created_at, '%Y-%m-%d')",
        }
    }
}

/// Format a UTC instant the way `created_at` is stored.
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.naive_utc().format(TS_FORMAT).to_string()
}

pub(crate) fn parse_hour(label: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(label, HOUR_FORMAT)
        .map(|ts| ts.and_utc())
        .with_context(|| format!("invalid hour bucket {label:?}"))
}

pub(crate) fn parse_day(label: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(label, DAY_FORMAT)
        .with_context(|| format!("invalid day bucket {label:?}"))
}
