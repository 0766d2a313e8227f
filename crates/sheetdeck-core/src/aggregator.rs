//! Period-bucketed stats for the dashboard.
//!
//! Every read follows the same path: resolve the period, run either the
//! hourly or the daily storage query, then fold the returned rows with
//! [`fold_rows`]. Totals are always sums over the folded entries.

use std::sync::Arc;

use chrono::Utc;

use crate::{
    analytics::{
        fold_rows, series_bounds, AnalyticsStore, BreakdownStats, DeviceStats, Dimension,
        LifetimeTotals, QueryRows, TimeseriesStats,
    },
    error::AnalyticsError,
    period::{self, Granularity},
};

#[derive(Clone)]
pub struct StatsAggregator {
    store: Arc<dyn AnalyticsStore>,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn AnalyticsStore>) -> Self {
        Self { store }
    }

    /// Views and unique visitors per bucket.
    pub async fn overview(&self, period: &str) -> Result<TimeseriesStats, AnalyticsError> {
        let window = period::resolve(period)?;

        let rows = match window.granularity() {
            Granularity::Hourly => QueryRows::Hourly(
                self.store
                    .traffic_last_24_hours()
                    .await
                    .map_err(AnalyticsError::storage("fetching traffic timeseries"))?,
            ),
            Granularity::Daily => QueryRows::Daily(
                self.store
                    .traffic_by_day(window.days)
                    .await
                    .map_err(AnalyticsError::storage("fetching traffic timeseries"))?,
            ),
        };

        let (intervals, totals) = fold_rows(rows);
        let (start_date, end_date) = series_bounds(&intervals);

        Ok(TimeseriesStats {
            period: window.key.to_string(),
            start_date,
            end_date,
            total_views: totals.views,
            total_unique_visitors: totals.visitors,
            intervals,
        })
    }

    /// Mobile vs desktop views and visitors per bucket.
    pub async fn devices(&self, period: &str) -> Result<DeviceStats, AnalyticsError> {
        let window = period::resolve(period)?;

        let rows = match window.granularity() {
            Granularity::Hourly => QueryRows::Hourly(
                self.store
                    .devices_last_24_hours()
                    .await
                    .map_err(AnalyticsError::storage("fetching device stats"))?,
            ),
            Granularity::Daily => QueryRows::Daily(
                self.store
                    .devices_by_day(window.days)
                    .await
                    .map_err(AnalyticsError::storage("fetching device stats"))?,
            ),
        };

        let (intervals, totals) = fold_rows(rows);
        let (start_date, end_date) = series_bounds(&intervals);

        Ok(DeviceStats {
            period: window.key.to_string(),
            start_date,
            end_date,
            total_views: totals.views,
            total_unique_visitors: totals.visitors,
            total_mobile_views: totals.mobile_views,
            total_mobile_visitors: totals.mobile_visitors,
            total_desktop_views: totals.desktop_views,
            total_desktop_visitors: totals.desktop_visitors,
            intervals,
        })
    }

    /// Views and visitors grouped by one dimension value.
    ///
    /// Rows carry no timestamps, so the date range comes from the window.
    pub async fn breakdown(
        &self,
        dimension: Dimension,
        period: &str,
    ) -> Result<BreakdownStats, AnalyticsError> {
        let window = period::resolve(period)?;
        let now = Utc::now();

        let rows = match window.granularity() {
            Granularity::Hourly => QueryRows::Hourly(
                self.store
                    .dimension_last_24_hours(dimension)
                    .await
                    .map_err(AnalyticsError::storage("fetching breakdown"))?,
            ),
            Granularity::Daily => QueryRows::Daily(
                self.store
                    .dimension_by_day(dimension, window.days)
                    .await
                    .map_err(AnalyticsError::storage("fetching breakdown"))?,
            ),
        };

        let (breakdown, totals) = fold_rows(rows);
        let (start_date, end_date) = window.bounds(now);

        Ok(BreakdownStats {
            period: window.key.to_string(),
            dimension,
            start_date,
            end_date,
            total_views: totals.views,
            total_unique_visitors: totals.visitors,
            breakdown,
        })
    }

    pub async fn browsers(&self, period: &str) -> Result<BreakdownStats, AnalyticsError> {
        self.breakdown(Dimension::Browser, period).await
    }

    pub async fn operating_systems(&self, period: &str) -> Result<BreakdownStats, AnalyticsError> {
        self.breakdown(Dimension::Os, period).await
    }

    pub async fn referrers(&self, period: &str) -> Result<BreakdownStats, AnalyticsError> {
        self.breakdown(Dimension::Referrer, period).await
    }

    pub async fn routes(&self, period: &str) -> Result<BreakdownStats, AnalyticsError> {
        self.breakdown(Dimension::Route, period).await
    }

    pub async fn countries(&self, period: &str) -> Result<BreakdownStats, AnalyticsError> {
        self.breakdown(Dimension::Country, period).await
    }

    /// All-time views, visitors, clicks and downloads.
    pub async fn lifetime_totals(&self) -> Result<LifetimeTotals, AnalyticsError> {
        self.store
            .lifetime_totals()
            .await
            .map_err(AnalyticsError::storage("fetching lifetime totals"))
    }
}
