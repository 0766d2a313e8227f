use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AnalyticsError;

/// Country lookup by client IP, usually backed by an HTTP service.
#[async_trait]
pub trait GeoLookup: Send + Sync + 'static {
    async fn lookup_country(&self, ip: &str) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Mobile,
    Desktop,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Mobile => "mobile",
            DeviceClass::Desktop => "desktop",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentInfo {
    pub browser: String,
    pub os: String,
    pub device: DeviceClass,
}

/// Everything derived from a request's identity before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub browser: String,
    pub os: String,
    pub device: DeviceClass,
    /// `None` when geo lookup is disabled.
    pub country: Option<String>,
}

/// Placeholder woothee itself uses for unrecognised agents.
const UNKNOWN: &str = "UNKNOWN";

/// Parse a `User-Agent` string via `woothee`.
///
/// Device class is binary: woothee's `smartphone`, `mobilephone` and `tablet`
/// categories are mobile, everything else is desktop.
pub fn parse_user_agent(user_agent: &str) -> UserAgentInfo {
    let Some(result) = woothee::parser::Parser::new().parse(user_agent) else {
        return UserAgentInfo {
            browser: UNKNOWN.to_string(),
            os: UNKNOWN.to_string(),
            device: DeviceClass::Desktop,
        };
    };

    let device = match result.category {
        "smartphone" | "mobilephone" | "tablet" => DeviceClass::Mobile,
        _ => DeviceClass::Desktop,
    };

    UserAgentInfo {
        browser: result.name.to_string(),
        os: result.os.to_string(),
        device,
    }
}

/// Derives browser, OS, device class and country for a submission.
#[derive(Clone)]
pub struct IdentityEnricher {
    geo: Option<Arc<dyn GeoLookup>>,
}

impl IdentityEnricher {
    /// `geo = None` disables country resolution entirely.
    pub fn new(geo: Option<Arc<dyn GeoLookup>>) -> Self {
        Self { geo }
    }

    pub fn geo_enabled(&self) -> bool {
        self.geo.is_some()
    }

    /// A configured geo service that fails aborts the enrichment; a disabled
    /// one just leaves `country` empty.
    pub async fn enrich(
        &self,
        user_agent: &str,
        client_ip: &str,
    ) -> Result<Identity, AnalyticsError> {
        let ua = parse_user_agent(user_agent);

        let country = match &self.geo {
            Some(geo) => Some(
                geo.lookup_country(client_ip)
                    .await
                    .map_err(AnalyticsError::GeoLookupFailed)?,
            ),
            None => None,
        };

        Ok(Identity {
            browser: ua.browser,
            os: ua.os,
            device: ua.device,
            country: country.filter(|c| !c.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
         AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

    struct FixedGeo(&'static str);

    #[async_trait]
    impl GeoLookup for FixedGeo {
        async fn lookup_country(&self, _ip: &str) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct BrokenGeo;

    #[async_trait]
    impl GeoLookup for BrokenGeo {
        async fn lookup_country(&self, _ip: &str) -> anyhow::Result<String> {
            anyhow::bail!("ipinfo API returned status 429")
        }
    }

    #[test]
    fn desktop_chrome_is_desktop() {
        let ua = parse_user_agent(CHROME_MAC);
        assert_eq!(ua.browser, "Chrome");
        assert_eq!(ua.os, "Mac OSX");
        assert_eq!(ua.device, DeviceClass::Desktop);
    }

    #[test]
    fn iphone_is_mobile() {
        let ua = parse_user_agent(SAFARI_IPHONE);
        assert_eq!(ua.browser, "Safari");
        assert_eq!(ua.os, "iPhone");
        assert_eq!(ua.device, DeviceClass::Mobile);
    }

    #[test]
    fn garbage_user_agent_falls_back_to_unknown_desktop() {
        let ua = parse_user_agent("definitely-not-a-browser");
        assert_eq!(ua.device, DeviceClass::Desktop);
        assert_eq!(ua.browser, "UNKNOWN");
    }

    #[tokio::test]
    async fn disabled_geo_skips_country() {
        let enricher = IdentityEnricher::new(None);
        let identity = enricher.enrich(CHROME_MAC, "8.8.8.8").await.expect("enrich");
        assert_eq!(identity.country, None);
        assert_eq!(identity.device, DeviceClass::Desktop);
    }

    #[tokio::test]
    async fn configured_geo_fills_country() {
        let enricher = IdentityEnricher::new(Some(Arc::new(FixedGeo("Australia"))));
        let identity = enricher.enrich(SAFARI_IPHONE, "1.1.1.1").await.expect("enrich");
        assert_eq!(identity.country.as_deref(), Some("Australia"));
    }

    #[tokio::test]
    async fn failing_geo_fails_enrichment() {
        let enricher = IdentityEnricher::new(Some(Arc::new(BrokenGeo)));
        let err = enricher
            .enrich(CHROME_MAC, "8.8.8.8")
            .await
            .expect_err("must fail");
        assert!(matches!(err, AnalyticsError::GeoLookupFailed(_)));
    }
}
