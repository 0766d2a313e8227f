//! Named look-back periods and the windows they select.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

/// Every period key the dashboard may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "24h")]
    Last24Hours,
    #[serde(rename = "7d")]
    Last7Days,
    #[serde(rename = "30d")]
    Last30Days,
    #[serde(rename = "3m")]
    Last3Months,
    #[serde(rename = "6m")]
    Last6Months,
    #[serde(rename = "12m")]
    Last12Months,
}

/// How rows are bucketed for a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// Rolling last 24 hours, one bucket per hour.
    Hourly,
    /// One bucket per UTC calendar day.
    Daily,
}

/// The resolved window for a [`Period`].
///
/// `days` is the number of whole days looked back from the start of today,
/// so `30d` covers 29 full days plus the partial current day. It is `0` for
/// the hourly window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodWindow {
    pub key: Period,
    pub days: u32,
}

impl Period {
    pub const ALL: [Period; 6] = [
        Period::Last24Hours,
        Period::Last7Days,
        Period::Last30Days,
        Period::Last3Months,
        Period::Last6Months,
        Period::Last12Months,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Last24Hours => "24h",
            Period::Last7Days => "7d",
            Period::Last30Days => "30d",
            Period::Last3Months => "3m",
            Period::Last6Months => "6m",
            Period::Last12Months => "12m",
        }
    }

    pub fn window(&self) -> PeriodWindow {
        let days = match self {
            Period::Last24Hours => 0,
            Period::Last7Days => 6,
            Period::Last30Days => 29,
            Period::Last3Months => 89,
            Period::Last6Months => 179,
            Period::Last12Months => 364,
        };
        PeriodWindow { key: *self, days }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = AnalyticsError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .into_iter()
            .find(|p| p.as_str() == raw)
            .ok_or_else(|| AnalyticsError::InvalidPeriod(raw.to_string()))
    }
}

/// Resolve a raw period token. Unknown tokens are rejected, never defaulted.
pub fn resolve(raw: &str) -> Result<PeriodWindow, AnalyticsError> {
    raw.parse::<Period>().map(|p| p.window())
}

/// Start of the rolling 24-hour window ending at `now`.
pub fn hourly_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(24)
}

/// Midnight UTC of the day `days` days before `now`.
pub fn daily_start(days: u32, now: DateTime<Utc>) -> DateTime<Utc> {
    let first_day = now.date_naive() - Duration::days(i64::from(days));
    first_day.and_time(NaiveTime::MIN).and_utc()
}

impl PeriodWindow {
    pub fn granularity(&self) -> Granularity {
        match self.key {
            Period::Last24Hours => Granularity::Hourly,
            _ => Granularity::Daily,
        }
    }

    /// Earliest instant covered by the window when evaluated at `now`.
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.granularity() {
            Granularity::Hourly => hourly_start(now),
            Granularity::Daily => daily_start(self.days, now),
        }
    }

    /// `(start, end)` of the window evaluated at `now`; `end` is `now` itself.
    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.start(now), now)
    }
}
