pub mod analytics_impl;
pub mod backend;
pub mod queries;
pub mod schema;

pub use backend::DuckDbBackend;

/// Re-exported so tests can reach `sheetdeck_duckdb::duckdb::params!`
/// without a direct dependency.
pub use duckdb;
