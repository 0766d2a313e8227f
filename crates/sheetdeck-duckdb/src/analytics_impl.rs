use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use sheetdeck_core::analytics::{
    AnalyticsStore, DeviceDayRow, DeviceHourRow, Dimension, DimensionRow, LifetimeTotals,
    TrafficDayRow, TrafficHourRow,
};
use sheetdeck_core::event::{StoreEventParams, StorePageviewParams};
use sheetdeck_core::period::{daily_start, hourly_start};

use crate::queries::{breakdown, devices, totals, traffic};
use crate::DuckDbBackend;

#[async_trait]
impl AnalyticsStore for DuckDbBackend {
    async fn store_pageview(&self, params: &StorePageviewParams) -> anyhow::Result<()> {
        DuckDbBackend::insert_pageview(self, params).await
    }

    async fn store_event(&self, params: &StoreEventParams) -> anyhow::Result<()> {
        DuckDbBackend::insert_event(self, params).await
    }

    async fn find_cheatsheet_id_by_slug(&self, slug: &str) -> anyhow::Result<Option<Uuid>> {
        self.find_cheatsheet_id(slug).await
    }

    async fn traffic_last_24_hours(&self) -> anyhow::Result<Vec<TrafficHourRow>> {
        traffic::traffic_hourly_inner(self, hourly_start(Utc::now())).await
    }

    async fn traffic_by_day(&self, days: u32) -> anyhow::Result<Vec<TrafficDayRow>> {
        traffic::traffic_daily_inner(self, daily_start(days, Utc::now())).await
    }

    async fn devices_last_24_hours(&self) -> anyhow::Result<Vec<DeviceHourRow>> {
        devices::devices_hourly_inner(self, hourly_start(Utc::now())).await
    }

    async fn devices_by_day(&self, days: u32) -> anyhow::Result<Vec<DeviceDayRow>> {
        devices::devices_daily_inner(self, daily_start(days, Utc::now())).await
    }

    async fn dimension_last_24_hours(
        &self,
        dimension: Dimension,
    ) -> anyhow::Result<Vec<DimensionRow>> {
        breakdown::dimension_inner(self, dimension, hourly_start(Utc::now())).await
    }

    async fn dimension_by_day(
        &self,
        dimension: Dimension,
        days: u32,
    ) -> anyhow::Result<Vec<DimensionRow>> {
        breakdown::dimension_inner(self, dimension, daily_start(days, Utc::now())).await
    }

    async fn lifetime_totals(&self) -> anyhow::Result<LifetimeTotals> {
        totals::lifetime_totals_inner(self).await
    }
}
