use anyhow::Result;
use chrono::{DateTime, Utc};

use sheetdeck_core::analytics::{TrafficDayRow, TrafficHourRow};

use super::{format_ts, parse_day, parse_hour, Bucket};
use crate::DuckDbBackend;

/// `(bucket label, views, unique visitors)` ordered by bucket.
async fn traffic_series(
    db: &DuckDbBackend,
    bucket: Bucket,
    since: DateTime<Utc>,
) -> Result<Vec<(String, i64, i64)>> {
    let conn = db.conn.lock().await;
    let sql = format!(
        r#"
        SELECT
            {label} AS bucket,
            COUNT(*) AS views,
            COUNT(DISTINCT hashed_ip) AS unique_visitors
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
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub async fn traffic_hourly_inner(
    db: &DuckDbBackend,
    since: DateTime<Utc>,
) -> Result<Vec<TrafficHourRow>> {
    traffic_series(db, Bucket::Hour, since)
        .await?
        .into_iter()
        .map(|(label, views, unique_visitors)| {
            Ok(TrafficHourRow {
                hour: parse_hour(&label)?,
                views,
                unique_visitors,
            })
        })
        .collect()
}

pub async fn traffic_daily_inner(
    db: &DuckDbBackend,
    since: DateTime<Utc>,
) -> Result<Vec<TrafficDayRow>> {
    traffic_series(db, Bucket::Day, since)
        .await?
        .into_iter()
        .map(|(label, views, unique_visitors)| {
            Ok(TrafficDayRow {
                date: parse_day(&label)?,
                views,
                unique_visitors,
            })
        })
        .collect()
}
