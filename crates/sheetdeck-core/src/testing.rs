//! In-memory spy store shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::analytics::{
    AnalyticsStore, DeviceDayRow, DeviceHourRow, Dimension, DimensionRow, LifetimeTotals,
    TrafficDayRow, TrafficHourRow,
};
use crate::event::{StoreEventParams, StorePageviewParams};

#[derive(Default)]
pub(crate) struct SpyStore {
    pub(crate) fail: bool,
    pub(crate) cheatsheets: HashMap<String, Uuid>,
    pub(crate) pageviews: Mutex<Vec<StorePageviewParams>>,
    pub(crate) events: Mutex<Vec<StoreEventParams>>,
    pub(crate) slug_lookups: AtomicUsize,
    pub(crate) queries: AtomicUsize,
    pub(crate) last_days: Mutex<Option<u32>>,
    pub traffic_hours: Vec<TrafficHourRow>,
    pub traffic_days: Vec<TrafficDayRow>,
    pub device_hours: Vec<DeviceHourRow>,
    pub device_days: Vec<DeviceDayRow>,
    pub dimension_rows: Vec<DimensionRow>,
}

impl SpyStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_cheatsheet(slug: &str, id: Uuid) -> Self {
        let mut store = Self::default();
        store.cheatsheets.insert(slug.to_string(), id);
        store
    }

    /// Registers a cheatsheet on an existing spy, e.g. one built by
    /// [`SpyStore::failing`], so slug lookups succeed and the write fails.
    pub fn and_cheatsheet(mut self, slug: &str, id: Uuid) -> Self {
        self.cheatsheets.insert(slug.to_string(), id);
        self
    }

    pub fn write_count(&self) -> usize {
        self.pageviews().len() + self.events().len()
    }

    pub fn pageviews(&self) -> Vec<StorePageviewParams> {
        self.pageviews.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn events(&self) -> Vec<StoreEventParams> {
        self.events.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn slug_lookups(&self) -> usize {
        self.slug_lookups.load(Ordering::SeqCst)
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn last_days(&self) -> Option<u32> {
        self.last_days.lock().ok().and_then(|d| *d)
    }

    fn query(&self, days: Option<u32>) -> anyhow::Result<()> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_days.lock() {
            *last = days;
        }
        if self.fail {
            anyhow::bail!("connection reset by peer");
        }
        Ok(())
    }
}

#[async_trait]
impl AnalyticsStore for SpyStore {
    async fn store_pageview(&self, params: &StorePageviewParams) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("disk full");
        }
        self.pageviews
            .lock()
            .map_err(|_| anyhow::anyhow!("poisoned"))?
            .push(params.clone());
        Ok(())
    }

    async fn store_event(&self, params: &StoreEventParams) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("disk full");
        }
        self.events
            .lock()
            .map_err(|_| anyhow::anyhow!("poisoned"))?
            .push(params.clone());
        Ok(())
    }

    async fn find_cheatsheet_id_by_slug(&self, slug: &str) -> anyhow::Result<Option<Uuid>> {
        self.slug_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.cheatsheets.get(slug).copied())
    }

    async fn traffic_last_24_hours(&self) -> anyhow::Result<Vec<TrafficHourRow>> {
        self.query(None)?;
        Ok(self.traffic_hours.clone())
    }

    async fn traffic_by_day(&self, days: u32) -> anyhow::Result<Vec<TrafficDayRow>> {
        self.query(Some(days))?;
        Ok(self.traffic_days.clone())
    }

    async fn devices_last_24_hours(&self) -> anyhow::Result<Vec<DeviceHourRow>> {
        self.query(None)?;
        Ok(self.device_hours.clone())
    }

    async fn devices_by_day(&self, days: u32) -> anyhow::Result<Vec<DeviceDayRow>> {
        self.query(Some(days))?;
        Ok(self.device_days.clone())
    }

    async fn dimension_last_24_hours(
        &self,
        _dimension: Dimension,
    ) -> anyhow::Result<Vec<DimensionRow>> {
        self.query(None)?;
        Ok(self.dimension_rows.clone())
    }

    async fn dimension_by_day(
        &self,
        _dimension: Dimension,
        days: u32,
    ) -> anyhow::Result<Vec<DimensionRow>> {
        self.query(Some(days))?;
        Ok(self.dimension_rows.clone())
    }

    async fn lifetime_totals(&self) -> anyhow::Result<LifetimeTotals> {
        self.query(None)?;
        Ok(LifetimeTotals {
            total_views: self.pageviews().len() as i64,
            total_clicks: self
                .events()
                .iter()
                .filter(|e| e.event_type == "click")
                .count() as i64,
            ..LifetimeTotals::default()
        })
    }
}
