use anyhow::Result;

use sheetdeck_core::analytics::LifetimeTotals;

use crate::DuckDbBackend;

pub async fn lifetime_totals_inner(db: &DuckDbBackend) -> Result<LifetimeTotals> {
    let conn = db.conn.lock().await;
    let totals = conn.query_row(
        r#"
        SELECT
            (SELECT COUNT(*) FROM pageviews),
            (SELECT COUNT(DISTINCT hashed_ip) FROM pageviews),
            (SELECT COUNT(*) FROM events WHERE event_type = 'click'),
            (SELECT COUNT(*) FROM events WHERE event_type = 'download')
        "#,
        [],
        |row| {
            Ok(LifetimeTotals {
                total_views: row.get(0)?,
                total_unique_visitors: row.get(1)?,
                total_clicks: row.get(2)?,
                total_downloads: row.get(3)?,
            })
        },
    )?;
    Ok(totals)
}
