use anyhow::Result;
use chrono::{DateTime, Utc};

use sheetdeck_core::analytics::{DeviceDayRow, DeviceHourRow};

use super::{format_ts, parse_day, parse_hour, Bucket};
use crate::DuckDbBackend;

struct DeviceCounts {
    label: String,
    mobile_views: i64,
    mobile_visitors: i64,
    desktop_views: i64,
    desktop_visitors: i64,
}

/// Anything not explicitly `mobile` counts as desktop, including rows
/// written before device classification existed.
async fn device_series(
    db: &DuckDbBackend,
    bucket: Bucket,
    since: DateTime<Utc>,
) -> Result<Vec<DeviceCounts>> {
    let conn = db.conn.lock().await;
    let sql = format!(
        r#"
        SELECT
            {label} AS bucket,
            COUNT(*) FILTER (WHERE device = 'mobile') AS mobile_views,
            COUNT(DISTINCT hashed_ip) FILTER (WHERE device = 'mobile') AS mobile_visitors,
            COUNT(*) FILTER (WHERE device IS DISTINCT FROM 'mobile') AS desktop_views,
            COUNT(DISTINCT hashed_ip) FILTER (WHERE device IS DISTINCT FROM 'mobile') AS desktop_visitors
        FROM pageviews
        WHERE created_at >= CAST(?1 AS TIMESTAMP)
        GROUP BY bucket
        ORDER BY bucket ASC
        "#,
        label = bucket.label_sql()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(duckdb::params![format_ts(since)], |row| {
            Ok(DeviceCounts {
                label: row.get(0)?,
                mobile_views: row.get(1)?,
                mobile_visitors: row.get(2)?,
                desktop_views: row.get(3)?,
                desktop_visitors: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub async fn devices_hourly_inner(
    db: &DuckDbBackend,
    since: DateTime<Utc>,
) -> Result<Vec<DeviceHourRow>> {
    device_series(db, Bucket::Hour, since)
        .await?
        .into_iter()
        .map(|c| {
            Ok(DeviceHourRow {
                hour: parse_hour(&c.label)?,
                mobile_views: c.mobile_views,
                mobile_visitors: c.mobile_visitors,
                desktop_views: c.desktop_views,
                desktop_visitors: c.desktop_visitors,
            })
        })
        .collect()
}

pub async fn devices_daily_inner(
    db: &DuckDbBackend,
    since: DateTime<Utc>,
) -> Result<Vec<DeviceDayRow>> {
    device_series(db, Bucket::Day, since)
        .await?
        .into_iter()
        .map(|c| {
            Ok(DeviceDayRow {
                date: parse_day(&c.label)?,
                mobile_views: c.mobile_views,
                mobile_visitors: c.mobile_visitors,
                desktop_views: c.desktop_views,
                desktop_visitors: c.desktop_visitors,
            })
        })
        .collect()
}
