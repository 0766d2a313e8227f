use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::info;

use sheetdeck_core::{
    aggregator::StatsAggregator,
    analytics::AnalyticsStore,
    config::Config,
    enrich::{GeoLookup, IdentityEnricher},
    recorder::EventRecorder,
    visitor::IpHasher,
};
use sheetdeck_duckdb::DuckDbBackend;

use crate::{geo::IpInfoClient, rate_limit::RateLimiter};

/// Shared application state injected into every handler via
/// [`axum::extract::State`].
pub struct AppState {
    /// Kept concretely for the health probe; the recorder and aggregator see
    /// it only through [`AnalyticsStore`].
    pub db: Arc<DuckDbBackend>,

    /// Parsed configuration, loaded once at startup.
    pub config: Arc<Config>,

    pub recorder: EventRecorder,
    pub stats: StatsAggregator,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Build state with the geo client described by `config.geo`.
    pub fn new(db: DuckDbBackend, config: Config) -> Result<Self> {
        let geo: Option<Arc<dyn GeoLookup>> = match &config.geo {
            Some(geo_config) => Some(Arc::new(IpInfoClient::new(geo_config)?)),
            None => None,
        };
        Self::with_geo(db, config, geo)
    }

    /// Build state with an explicit geo lookup (or none).
    pub fn with_geo(
        db: DuckDbBackend,
        config: Config,
        geo: Option<Arc<dyn GeoLookup>>,
    ) -> Result<Self> {
        let hasher = IpHasher::new(config.ip_hash_salt.clone()).map_err(|e| anyhow!(e))?;
        let enricher = IdentityEnricher::new(geo);
        info!(geo_enabled = enricher.geo_enabled(), "identity enrichment ready");

        let db = Arc::new(db);
        let store: Arc<dyn AnalyticsStore> = db.clone();

        Ok(Self {
            recorder: EventRecorder::new(Arc::clone(&store), enricher, hasher),
            stats: StatsAggregator::new(store),
            rate_limiter: Arc::new(RateLimiter::new(config.rate_limit_per_minute)),
            config: Arc::new(config),
            db,
        })
    }
}
