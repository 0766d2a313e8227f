use anyhow::Result;
use chrono::{DateTime, Utc};

use sheetdeck_core::analytics::{Dimension, DimensionRow};

use super::format_ts;
use crate::DuckDbBackend;

/// Grouping expression for a dimension. Values are fixed strings, never
/// user input, so interpolating them into SQL is safe.
pub fn dimension_column(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Browser => "COALESCE(browser, 'Unknown')",
        Dimension::Os => "COALESCE(os, 'Unknown')",
        Dimension::Referrer => "COALESCE(NULLIF(referrer, ''), '(direct)')",
        Dimension::Route => "pathname",
        Dimension::Country => "COALESCE(NULLIF(country, ''), 'Unknown')",
    }
}

/// Views and unique visitors per dimension value since `since`, busiest first.
pub async fn dimension_inner(
    db: &DuckDbBackend,
    dimension: Dimension,
    since: DateTime<Utc>,
) -> Result<Vec<DimensionRow>> {
    let conn = db.conn.lock().await;
    let sql = format!(
        r#"
        SELECT
            {column} AS label,
            COUNT(*) AS views,
            COUNT(DISTINCT hashed_ip) AS unique_visitors
        FROM pageviews
        WHERE created_at >= CAST(?1 AS TIMESTAMP)
        GROUP BY label
        ORDER BY views DESC, label ASC
        "#,
        column = dimension_column(dimension)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(duckdb::params![format_ts(since)], |row| {
            Ok(DimensionRow {
                value: row.get(0)?,
                views: row.get(1)?,
                unique_visitors: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
