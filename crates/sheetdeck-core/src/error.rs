use thiserror::Error;

/// Failures surfaced by the analytics core.
///
/// Submissions that are merely incomplete are not errors; see
/// [`crate::recorder::RecordOutcome::Dropped`].
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("invalid period: {0}")]
    InvalidPeriod(String),

    #[error("geo lookup failed: {0}")]
    GeoLookupFailed(#[source] anyhow::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error while {stage}: {source}")]
    Storage {
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl AnalyticsError {
    pub(crate) fn storage(stage: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| AnalyticsError::Storage { stage, source }
    }
}
