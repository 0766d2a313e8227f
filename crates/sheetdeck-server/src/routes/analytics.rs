use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use sheetdeck_core::{
    error::AnalyticsError,
    event::{EventPayload, InteractionEvent, PageviewEvent, PageviewPayload},
    recorder::RecordOutcome,
};

use crate::{error::AppError, rate_limit::ClientIp, state::AppState};

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    /// Missing is treated like an unknown token and rejected with 400.
    #[serde(default)]
    pub period: String,
}

/// Run `fut` under `deadline`; dropping it on expiry cancels in-flight I/O.
async fn with_deadline<T>(
    deadline: Duration,
    fut: impl Future<Output = Result<T, AnalyticsError>>,
) -> Result<T, AppError> {
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result.map_err(AppError::from),
        Err(_) => Err(AppError::Timeout),
    }
}

fn accepted(outcome: RecordOutcome) -> impl IntoResponse {
    let recorded = matches!(outcome, RecordOutcome::Recorded);
    tracing::debug!(recorded, "submission handled");
    (StatusCode::CREATED, Json(json!({ "ok": true })))
}

/// `POST /api/analytics/pageview`
///
/// Incomplete submissions (no route, IP or User-Agent) are accepted and
/// silently discarded.
#[tracing::instrument(skip(state, client_ip, headers, payload))]
pub async fn pageview(
    State(state): State<Arc<AppState>>,
    Extension(client_ip): Extension<ClientIp>,
    headers: HeaderMap,
    Json(payload): Json<PageviewPayload>,
) -> Result<impl IntoResponse, AppError> {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let event = PageviewEvent::from_payload(payload, client_ip.0, user_agent);
    let outcome = with_deadline(
        state.config.write_timeout(),
        state.recorder.record_pageview(event),
    )
    .await?;
    Ok(accepted(outcome))
}

/// `POST /api/analytics/event`. Unknown slugs answer 404.
#[tracing::instrument(skip(state, client_ip, payload))]
pub async fn event(
    State(state): State<Arc<AppState>>,
    Extension(client_ip): Extension<ClientIp>,
    Json(payload): Json<EventPayload>,
) -> Result<impl IntoResponse, AppError> {
    let event = InteractionEvent::from_payload(payload, client_ip.0);
    let outcome = with_deadline(
        state.config.write_timeout(),
        state.recorder.record_event(event),
    )
    .await?;
    Ok(accepted(outcome))
}

/// `GET /api/analytics/overview?period=`
#[tracing::instrument(skip(state))]
pub async fn overview(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<Value>, AppError> {
    let result = with_deadline(
        state.config.read_timeout(),
        state.stats.overview(&query.period),
    )
    .await?;
    Ok(Json(json!({ "data": result })))
}

/// `GET /api/analytics/summary/{kind}?period=`
///
/// `kind` is one of `devices`, `browsers`, `os`, `referrers`, `routes`,
/// `countries`.
#[tracing::instrument(skip(state))]
pub async fn summary(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<Value>, AppError> {
    let deadline = state.config.read_timeout();
    let stats = &state.stats;
    let period = query.period.as_str();

    let data = match kind.as_str() {
        "devices" => json!(with_deadline(deadline, stats.devices(period)).await?),
        "browsers" => json!(with_deadline(deadline, stats.browsers(period)).await?),
        "os" => json!(with_deadline(deadline, stats.operating_systems(period)).await?),
        "referrers" => json!(with_deadline(deadline, stats.referrers(period)).await?),
        "routes" => json!(with_deadline(deadline, stats.routes(period)).await?),
        "countries" => json!(with_deadline(deadline, stats.countries(period)).await?),
        _ => return Err(AppError::NotFound(format!("summary '{kind}'"))),
    };
    Ok(Json(json!({ "data": data })))
}

/// `GET /api/analytics/totals`: all-time counters.
#[tracing::instrument(skip(state))]
pub async fn totals(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let result = with_deadline(state.config.read_timeout(), state.stats.lifetime_totals()).await?;
    Ok(Json(json!({ "data": result })))
}
