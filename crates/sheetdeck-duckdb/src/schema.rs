/// DuckDB initialization SQL, run on every open.
///
/// Every statement is `IF NOT EXISTS`, so re-running it against an existing
/// file is a no-op. `memory_limit` comes from `Config.duckdb_memory_limit`
/// (env `SHEETDECK_DUCKDB_MEMORY`, default `"1GB"`); DuckDB otherwise claims
/// 80% of system RAM.
///
/// Timestamps are naive UTC. The application formats them before binding,
/// so the session time zone never takes part in bucketing.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- CHEATSHEETS (catalog entries events point at)
-- ===========================================
CREATE TABLE IF NOT EXISTS cheatsheets (
    id              VARCHAR PRIMARY KEY,           -- UUID v4
    slug            VARCHAR NOT NULL UNIQUE,
    title           VARCHAR NOT NULL,
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

-- ===========================================
-- PAGEVIEWS
-- ===========================================
CREATE TABLE IF NOT EXISTS pageviews (
    id              VARCHAR PRIMARY KEY,
    pathname        VARCHAR NOT NULL,
    browser         VARCHAR,
    os              VARCHAR,
    device          VARCHAR,                       -- 'mobile' | 'desktop'
    hashed_ip       VARCHAR NOT NULL,              -- hex(sha256(ip ++ salt))
    user_agent      VARCHAR NOT NULL,
    country         VARCHAR,                       -- NULL when geo lookup is disabled
    referrer        VARCHAR,
    created_at      TIMESTAMP NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_pageviews_created ON pageviews(created_at);

-- ===========================================
-- EVENTS (cheatsheet interactions)
-- ===========================================
CREATE TABLE IF NOT EXISTS events (
    id              VARCHAR PRIMARY KEY,
    cheatsheet_id   VARCHAR NOT NULL,
    event_type      VARCHAR NOT NULL,              -- 'click' | 'download' | ...
    pathname        VARCHAR NOT NULL,
    hashed_ip       VARCHAR NOT NULL,
    created_at      TIMESTAMP NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_events_cheatsheet ON events(cheatsheet_id);
CREATE INDEX IF NOT EXISTS idx_events_type       ON events(event_type);
"#
    )
}
