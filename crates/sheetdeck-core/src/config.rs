use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    pub duckdb_memory_limit: String,
    /// Salt mixed into every IP hash. Required; startup fails without it.
    pub ip_hash_salt: String,
    /// `None` disables country resolution.
    pub geo: Option<GeoConfig>,
    pub cors_origins: Vec<String>,
    pub environment: Environment,
    pub rate_limit_per_minute: u32,
    pub write_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

#[derive(Clone, PartialEq, Eq)]
pub struct GeoConfig {
    pub base_url: String,
    pub token: String,
}

impl std::fmt::Debug for GeoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let ip_hash_salt = non_empty("SHEETDECK_IP_HASH_SALT")
            .ok_or_else(|| "SHEETDECK_IP_HASH_SALT is required".to_string())?;

        let geo = match (
            non_empty("SHEETDECK_IPINFO_BASE_URL"),
            non_empty("SHEETDECK_IPINFO_TOKEN"),
        ) {
            (Some(base_url), Some(token)) => Some(GeoConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                token,
            }),
            _ => None,
        };

        Ok(Self {
            port: var("SHEETDECK_PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            data_dir: var("SHEETDECK_DATA_DIR").unwrap_or_else(|| "./data".to_string()),
            duckdb_memory_limit: var("SHEETDECK_DUCKDB_MEMORY")
                .unwrap_or_else(|| "1GB".to_string()),
            ip_hash_salt,
            geo,
            cors_origins: var("SHEETDECK_CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            environment: match var("SHEETDECK_ENV").as_deref() {
                Some("production") | Some("prod") => Environment::Production,
                Some("test") => Environment::Test,
                _ => Environment::Development,
            },
            rate_limit_per_minute: var("SHEETDECK_RATE_LIMIT_PER_MINUTE")
                .unwrap_or_else(|| "150".to_string())
                .parse()
                .map_err(|e| format!("invalid rate limit: {e}"))?,
            write_timeout_secs: 10,
            read_timeout_secs: 30,
        })
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}
