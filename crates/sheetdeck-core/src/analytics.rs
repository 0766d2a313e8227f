//! Storage abstraction, row shapes, and response models for analytics.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::{StoreEventParams, StorePageviewParams};

/// Breakdown axes that are grouped by value rather than by time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Browser,
    Os,
    Referrer,
    Route,
    Country,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Browser => "browser",
            Dimension::Os => "os",
            Dimension::Referrer => "referrer",
            Dimension::Route => "route",
            Dimension::Country => "country",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Rows returned by the storage layer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficHourRow {
    pub hour: DateTime<Utc>,
    pub views: i64,
    pub unique_visitors: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficDayRow {
    pub date: NaiveDate,
    pub views: i64,
    pub unique_visitors: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHourRow {
    pub hour: DateTime<Utc>,
    pub mobile_views: i64,
    pub mobile_visitors: i64,
    pub desktop_views: i64,
    pub desktop_visitors: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDayRow {
    pub date: NaiveDate,
    pub mobile_views: i64,
    pub mobile_visitors: i64,
    pub desktop_views: i64,
    pub desktop_visitors: i64,
}

/// One dimension value with its counts. Both query paths share this shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionRow {
    pub value: String,
    pub views: i64,
    pub unique_visitors: i64,
}

/// Result of the granularity dispatch: which query ran decides the row type.
#[derive(Debug, Clone)]
pub enum QueryRows<H, D> {
    Hourly(Vec<H>),
    Daily(Vec<D>),
}

// ---------------------------------------------------------------------------
// Uniform output shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DimensionStat {
    pub name: String,
    pub views: i64,
    pub visitors: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeBucket {
    pub date: DateTime<Utc>,
    pub views: i64,
    pub visitors: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceBucket {
    pub date: DateTime<Utc>,
    pub mobile_views: i64,
    pub mobile_visitors: i64,
    pub desktop_views: i64,
    pub desktop_visitors: i64,
}

/// Running sums gathered while folding rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub views: i64,
    pub visitors: i64,
    pub mobile_views: i64,
    pub mobile_visitors: i64,
    pub desktop_views: i64,
    pub desktop_visitors: i64,
}

/// Maps a storage row onto its uniform output entry.
pub trait IntoStat {
    type Stat;
    fn into_stat(self) -> Self::Stat;
}

/// Adds an output entry's counts to the running totals.
pub trait Tally {
    fn tally(&self, totals: &mut Totals);
}

/// Output entries that carry a bucket timestamp.
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

impl IntoStat for TrafficHourRow {
    type Stat = TimeBucket;
    fn into_stat(self) -> TimeBucket {
        TimeBucket {
            date: self.hour,
            views: self.views,
            visitors: self.unique_visitors,
        }
    }
}

impl IntoStat for TrafficDayRow {
    type Stat = TimeBucket;
    fn into_stat(self) -> TimeBucket {
        TimeBucket {
            date: day_start(self.date),
            views: self.views,
            visitors: self.unique_visitors,
        }
    }
}

impl IntoStat for DeviceHourRow {
    type Stat = DeviceBucket;
    fn into_stat(self) -> DeviceBucket {
        DeviceBucket {
            date: self.hour,
            mobile_views: self.mobile_views,
            mobile_visitors: self.mobile_visitors,
            desktop_views: self.desktop_views,
            desktop_visitors: self.desktop_visitors,
        }
    }
}

impl IntoStat for DeviceDayRow {
    type Stat = DeviceBucket;
    fn into_stat(self) -> DeviceBucket {
        DeviceBucket {
            date: day_start(self.date),
            mobile_views: self.mobile_views,
            mobile_visitors: self.mobile_visitors,
            desktop_views: self.desktop_views,
            desktop_visitors: self.desktop_visitors,
        }
    }
}

impl IntoStat for DimensionRow {
    type Stat = DimensionStat;
    fn into_stat(self) -> DimensionStat {
        DimensionStat {
            name: self.value,
            views: self.views,
            visitors: self.unique_visitors,
        }
    }
}

impl Tally for TimeBucket {
    fn tally(&self, totals: &mut Totals) {
        totals.views += self.views;
        totals.visitors += self.visitors;
    }
}

impl Tally for DimensionStat {
    fn tally(&self, totals: &mut Totals) {
        totals.views += self.views;
        totals.visitors += self.visitors;
    }
}

impl Tally for DeviceBucket {
    fn tally(&self, totals: &mut Totals) {
        totals.views += self.mobile_views + self.desktop_views;
        totals.visitors += self.mobile_visitors + self.desktop_visitors;
        totals.mobile_views += self.mobile_views;
        totals.mobile_visitors += self.mobile_visitors;
        totals.desktop_views += self.desktop_views;
        totals.desktop_visitors += self.desktop_visitors;
    }
}

impl Timestamped for TimeBucket {
    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }
}

impl Timestamped for DeviceBucket {
    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }
}

/// Fold either row shape into uniform entries, accumulating totals on the way.
pub fn fold_rows<H, D, S>(rows: QueryRows<H, D>) -> (Vec<S>, Totals)
where
    H: IntoStat<Stat = S>,
    D: IntoStat<Stat = S>,
    S: Tally,
{
    match rows {
        QueryRows::Hourly(rows) => fold_all(rows),
        QueryRows::Daily(rows) => fold_all(rows),
    }
}

fn fold_all<R, S>(rows: Vec<R>) -> (Vec<S>, Totals)
where
    R: IntoStat<Stat = S>,
    S: Tally,
{
    let mut totals = Totals::default();
    let stats = rows
        .into_iter()
        .map(|row| {
            let stat = row.into_stat();
            stat.tally(&mut totals);
            stat
        })
        .collect();
    (stats, totals)
}

/// First and last bucket timestamps, or zero-value dates when empty.
pub fn series_bounds<S: Timestamped>(series: &[S]) -> (DateTime<Utc>, DateTime<Utc>) {
    match (series.first(), series.last()) {
        (Some(first), Some(last)) => (first.timestamp(), last.timestamp()),
        _ => (DateTime::<Utc>::UNIX_EPOCH, DateTime::<Utc>::UNIX_EPOCH),
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Views and visitors over time (`/overview`).
#[derive(Debug, Clone, Serialize)]
pub struct TimeseriesStats {
    pub period: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_views: i64,
    pub total_unique_visitors: i64,
    pub intervals: Vec<TimeBucket>,
}

/// Mobile vs desktop split over time (`/summary/devices`).
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStats {
    pub period: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_views: i64,
    pub total_unique_visitors: i64,
    pub total_mobile_views: i64,
    pub total_mobile_visitors: i64,
    pub total_desktop_views: i64,
    pub total_desktop_visitors: i64,
    pub intervals: Vec<DeviceBucket>,
}

/// Per-value breakdown for a [`Dimension`].
#[derive(Debug, Clone, Serialize)]
pub struct BreakdownStats {
    pub period: String,
    pub dimension: Dimension,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_views: i64,
    pub total_unique_visitors: i64,
    pub breakdown: Vec<DimensionStat>,
}

/// All-time counters shown on the catalog landing page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LifetimeTotals {
    pub total_views: i64,
    pub total_unique_visitors: i64,
    pub total_clicks: i64,
    pub total_downloads: i64,
}

// ---------------------------------------------------------------------------
// Storage collaborator
// ---------------------------------------------------------------------------

/// Everything the analytics core needs from persistence.
///
/// Hourly queries cover the rolling last 24 hours. Daily queries cover the
/// start of the day `days` days ago up to now, bucketed by UTC date.
/// Breakdown rows come back already grouped by dimension value.
#[async_trait]
pub trait AnalyticsStore: Send + Sync + 'static {
    async fn store_pageview(&self, params: &StorePageviewParams) -> anyhow::Result<()>;

    async fn store_event(&self, params: &StoreEventParams) -> anyhow::Result<()>;

    /// `Ok(None)` when no cheatsheet has this slug.
    async fn find_cheatsheet_id_by_slug(&self, slug: &str) -> anyhow::Result<Option<Uuid>>;

    async fn traffic_last_24_hours(&self) -> anyhow::Result<Vec<TrafficHourRow>>;

    async fn traffic_by_day(&self, days: u32) -> anyhow::Result<Vec<TrafficDayRow>>;

    async fn devices_last_24_hours(&self) -> anyhow::Result<Vec<DeviceHourRow>>;

    async fn devices_by_day(&self, days: u32) -> anyhow::Result<Vec<DeviceDayRow>>;

    async fn dimension_last_24_hours(
        &self,
        dimension: Dimension,
    ) -> anyhow::Result<Vec<DimensionRow>>;

    async fn dimension_by_day(
        &self,
        dimension: Dimension,
        days: u32,
    ) -> anyhow::Result<Vec<DimensionRow>>;

    async fn lifetime_totals(&self) -> anyhow::Result<LifetimeTotals>;
}
