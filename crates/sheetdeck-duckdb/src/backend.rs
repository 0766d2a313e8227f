use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use duckdb::Connection;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use sheetdeck_core::event::{StoreEventParams, StorePageviewParams};

use crate::queries::format_ts;
use crate::schema::init_sql;

/// DuckDB-backed analytics store.
///
/// DuckDB is single-writer, so the connection sits behind `Arc<Mutex<_>>`:
/// handlers share one backend and every statement is serialised through the
/// lock. Memory and thread limits are applied by [`init_sql`] at open time.
pub struct DuckDbBackend {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl DuckDbBackend {
    /// Open (or create) the database file at `path`.
    ///
    /// `memory_limit` is a DuckDB size string such as `"1GB"` or `"512MB"`.
    pub fn open(path: &str, memory_limit: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(&init_sql(memory_limit))?;
        info!(path, memory_limit, "DuckDB opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database. Data is discarded on drop.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(&init_sql("1GB"))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub async fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("SELECT 1")?;
        Ok(())
    }

    pub async fn insert_pageview(&self, params: &StorePageviewParams) -> Result<()> {
        self.insert_pageview_at(params, Utc::now()).await
    }

    /// Insert a pageview with an explicit timestamp. Fixtures use this to
    /// place rows inside or outside a look-back window.
    pub async fn insert_pageview_at(
        &self,
        params: &StorePageviewParams,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT INTO pageviews (
                id, pathname, browser, os, device,
                hashed_ip, user_agent, country, referrer, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
            duckdb::params![
                Uuid::new_v4().to_string(),
                params.pathname,
                params.browser,
                params.os,
                params.device,
                params.hashed_ip,
                params.user_agent,
                params.country,
                params.referrer,
                format_ts(created_at),
            ],
        )?;
        Ok(())
    }

    pub async fn insert_event(&self, params: &StoreEventParams) -> Result<()> {
        self.insert_event_at(params, Utc::now()).await
    }

    pub async fn insert_event_at(
        &self,
        params: &StoreEventParams,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT INTO events (
                id, cheatsheet_id, event_type, pathname, hashed_ip, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            duckdb::params![
                Uuid::new_v4().to_string(),
                params.cheatsheet_id.to_string(),
                params.event_type,
                params.pathname,
                params.hashed_ip,
                format_ts(created_at),
            ],
        )?;
        Ok(())
    }

    pub async fn find_cheatsheet_id(&self, slug: &str) -> Result<Option<Uuid>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT id FROM cheatsheets WHERE slug = ?1")?;
        match stmt.query_row(duckdb::params![slug], |row| row.get::<_, String>(0)) {
            Ok(raw) => Ok(Some(Uuid::parse_str(&raw)?)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(anyhow::anyhow!(e)),
        }
    }

    /// Insert a cheatsheet row and return its id. Re-seeding an existing
    /// slug updates the title and keeps the original id.
    pub async fn seed_cheatsheet(&self, slug: &str, title: &str) -> Result<Uuid> {
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT INTO cheatsheets (id, slug, title)
               VALUES (?1, ?2, ?3)
               ON CONFLICT (slug) DO UPDATE SET title = EXCLUDED.title"#,
            duckdb::params![Uuid::new_v4().to_string(), slug, title],
        )?;
        let id: String = conn.query_row(
            "SELECT id FROM cheatsheets WHERE slug = ?1",
            duckdb::params![slug],
            |row| row.get(0),
        )?;
        Ok(Uuid::parse_str(&id)?)
    }

    /// Acquire the connection lock for direct queries in integration tests.
    pub async fn conn_for_test(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}
