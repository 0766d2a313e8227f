use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use sheetdeck_core::{config::GeoConfig, enrich::GeoLookup};

const GEO_HTTP_TIMEOUT_SECONDS: u64 = 5;

#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    #[serde(default)]
    country: String,
}

/// Country lookup against an ipinfo-compatible API:
/// `GET {base_url}/{ip}?token={token}` answering `{"country": "PL", ...}`.
pub struct IpInfoClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl IpInfoClient {
    pub fn new(config: &GeoConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(GEO_HTTP_TIMEOUT_SECONDS))
            .build()
            .context("building geo http client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl GeoLookup for IpInfoClient {
    async fn lookup_country(&self, ip: &str) -> Result<String> {
        let url = format!("{}/{}", self.base_url, ip);
        let response = self
            .client
            .get(&url)
            .query(&[("token", self.token.as_str())])
            .send()
            .await
            .context("geo request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("geo service returned {status}");
        }

        let body: IpInfoResponse = response
            .json()
            .await
            .context("decoding geo response")?;
        Ok(body.country)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, Query},
        http::StatusCode,
        response::IntoResponse,
        routing::get,
        Json, Router,
    };
    use serde_json::json;
    use std::collections::HashMap;

    async fn fake_ipinfo(
        Path(ip): Path<String>,
        Query(query): Query<HashMap<String, String>>,
    ) -> axum::response::Response {
        if query.get("token").map(String::as_str) != Some("secret") {
            return (StatusCode::FORBIDDEN, "bad token").into_response();
        }
        match ip.as_str() {
            "203.0.113.9" => Json(json!({ "ip": ip, "country": "PL" })).into_response(),
            "198.51.100.1" => Json(json!({ "ip": ip, "bogon": true })).into_response(),
            _ => (StatusCode::OK, "not json").into_response(),
        }
    }

    async fn spawn_fake() -> String {
        let app = Router::new().route("/{ip}", get(fake_ipinfo));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        format!("http://{addr}")
    }

    fn client(base_url: String, token: &str) -> IpInfoClient {
        IpInfoClient::new(&GeoConfig {
            base_url,
            token: token.to_string(),
        })
        .expect("client")
    }

    #[tokio::test]
    async fn resolves_country() {
        let geo = client(spawn_fake().await, "secret");
        assert_eq!(geo.lookup_country("203.0.113.9").await.expect("lookup"), "PL");
    }

    #[tokio::test]
    async fn missing_country_is_empty() {
        let geo = client(spawn_fake().await, "secret");
        assert_eq!(geo.lookup_country("198.51.100.1").await.expect("lookup"), "");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let geo = client(spawn_fake().await, "wrong");
        let err = geo.lookup_country("203.0.113.9").await.expect_err("403");
        assert!(err.to_string().contains("403"), "{err}");
    }

    #[tokio::test]
    async fn undecodable_body_is_an_error() {
        let geo = client(spawn_fake().await, "secret");
        assert!(geo.lookup_country("192.0.2.1").await.is_err());
    }

    #[tokio::test]
    async fn unreachable_service_is_an_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let geo = client(format!("http://{addr}"), "secret");
        assert!(geo.lookup_country("203.0.113.9").await.is_err());
    }
}
