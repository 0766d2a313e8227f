use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use sheetdeck_core::config::{Config, Environment};

use crate::{rate_limit, routes, state::AppState};

/// Construct the [`Router`] with all routes and middleware attached.
///
/// `/api/*` routes sit behind the per-IP rate limiter, which also resolves
/// the client IP for the handlers. Outer layers, outermost last:
///
/// 1. `TraceLayer`: request/response spans via `tracing`.
/// 2. `CorsLayer`: configured dashboard origins, or any origin when none are set.
/// 3. Security headers on every response, HSTS only in production.
pub fn build_app(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/api/analytics/pageview", post(routes::analytics::pageview))
        .route("/api/analytics/event", post(routes::analytics::event))
        .route("/api/analytics/overview", get(routes::analytics::overview))
        .route(
            "/api/analytics/summary/{kind}",
            get(routes::analytics::summary),
        )
        .route("/api/analytics/totals", get(routes::analytics::totals))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            rate_limit::enforce,
        ));

    let hsts = (state.config.environment == Environment::Production)
        .then(|| HeaderValue::from_static("max-age=31536000; includeSubDomains"));

    Router::new()
        .route("/healthz", get(routes::health::health))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'self'"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::STRICT_TRANSPORT_SECURITY,
            hsts,
        ))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}
