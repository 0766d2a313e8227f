use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{error::AppError, state::AppState};

const WINDOW: Duration = Duration::from_secs(60);
const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Client address resolved once per request and handed to handlers as an
/// extension. Empty when neither proxy headers nor the peer address are known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientIp(pub String);

/// First `X-Forwarded-For` hop, then `X-Real-IP`, then the socket peer.
///
/// Header values that do not parse as an IP address are skipped.
pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| IpAddr::from_str(s.trim()).ok())
    };
    header("x-forwarded-for")
        .or_else(|| header("x-real-ip"))
        .or_else(|| peer.map(|addr| addr.ip()))
        .map(|ip| ip.to_string())
        .unwrap_or_default()
}

/// Per-IP sliding-window limiter.
///
/// Key: client IP. Value: request timestamps within the last 60 seconds.
/// A limit of `0` disables limiting.
pub struct RateLimiter {
    limit: usize,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(limit_per_minute: u32) -> Self {
        Self {
            limit: limit_per_minute as usize,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// `true` if the request may proceed. Rejected requests are not counted.
    pub async fn check(&self, ip: &str) -> bool {
        self.check_at(ip, Instant::now()).await
    }

    async fn check_at(&self, ip: &str, now: Instant) -> bool {
        if self.limit == 0 {
            return true;
        }
        let mut map = self.hits.lock().await;
        let window = map.entry(ip.to_string()).or_default();
        while window
            .front()
            .is_some_and(|t| now.duration_since(*t) >= WINDOW)
        {
            window.pop_front();
        }
        if window.len() >= self.limit {
            return false;
        }
        window.push_back(now);
        true
    }

    /// Drop clients with no requests inside the window. Returns how many.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Instant::now()).await
    }

    async fn sweep_at(&self, now: Instant) -> usize {
        let mut map = self.hits.lock().await;
        let before = map.len();
        map.retain(|_, window| {
            window
                .back()
                .is_some_and(|t| now.duration_since(*t) < WINDOW)
        });
        before - map.len()
    }

    pub async fn tracked_clients(&self) -> usize {
        self.hits.lock().await.len()
    }

    /// Background loop: sweep stale entries every five minutes.
    pub async fn run_sweep_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = self.sweep().await;
            if removed > 0 {
                debug!(removed, "rate limiter swept idle clients");
            }
        }
    }
}

/// Middleware for `/api/*`: resolves the client IP, enforces the limit and
/// stores [`ClientIp`] on the request for the handlers.
pub async fn enforce(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = resolve_client_ip(&headers, peer);

    let key = if ip.is_empty() { "unknown" } else { ip.as_str() };
    if !state.rate_limiter.check(key).await {
        warn!(client_ip = %key, path = %request.uri().path(), "rate limit exceeded");
        return AppError::RateLimited.into_response();
    }

    request.extensions_mut().insert(ClientIp(ip));
    next.run(request).await
}
