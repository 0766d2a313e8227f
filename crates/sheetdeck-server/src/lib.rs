pub mod app;
pub mod error;
pub mod geo;
pub mod rate_limit;
pub mod routes;
pub mod state;
