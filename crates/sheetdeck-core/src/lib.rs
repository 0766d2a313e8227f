pub mod aggregator;
pub mod analytics;
pub mod config;
pub mod enrich;
pub mod error;
pub mod event;
pub mod period;
pub mod recorder;
pub mod visitor;

#[cfg(test)]
pub(crate) mod testing;
