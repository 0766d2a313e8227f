use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST /api/analytics/pageview`.
///
/// Client IP and User-Agent are taken from the request, never the body.
/// Unknown keys (including any `ip_address` / `user_agent`) are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageviewPayload {
    pub route: String,
    #[serde(default)]
    pub referrer: Option<String>,
}

/// Body of `POST /api/analytics/event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPayload {
    pub route: String,
    pub cheatsheet_slug: String,
    /// Open set (`click`, `download`, ...); stored as sent.
    pub event_type: String,
}

/// A pageview submission with its request-derived fields attached.
#[derive(Debug, Clone, Default)]
pub struct PageviewEvent {
    pub route: String,
    pub referrer: Option<String>,
    pub client_ip: String,
    pub user_agent: String,
}

/// A click/download style interaction on a cheatsheet.
#[derive(Debug, Clone, Default)]
pub struct InteractionEvent {
    pub route: String,
    pub cheatsheet_slug: String,
    pub event_type: String,
    pub client_ip: String,
}

impl PageviewEvent {
    pub fn from_payload(payload: PageviewPayload, client_ip: String, user_agent: String) -> Self {
        Self {
            route: payload.route,
            referrer: payload.referrer,
            client_ip,
            user_agent,
        }
    }
}

impl InteractionEvent {
    pub fn from_payload(payload: EventPayload, client_ip: String) -> Self {
        Self {
            route: payload.route,
            cheatsheet_slug: payload.cheatsheet_slug,
            event_type: payload.event_type,
            client_ip,
        }
    }
}

/// Enriched pageview row handed to storage. Mirrors the `pageviews` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorePageviewParams {
    pub pathname: String,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub device: Option<String>,
    pub hashed_ip: String,
    pub user_agent: String,
    pub country: Option<String>,
    pub referrer: Option<String>,
}

/// Interaction row handed to storage. Mirrors the `events` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreEventParams {
    pub cheatsheet_id: Uuid,
    pub event_type: String,
    pub pathname: String,
    pub hashed_ip: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pageview_payload_referrer_is_optional() {
        let p: PageviewPayload =
            serde_json::from_str(r#"{"route":"/css/flexbox"}"#).expect("parse");
        assert_eq!(p.route, "/css/flexbox");
        assert!(p.referrer.is_none());
    }

    #[test]
    fn pageview_payload_ignores_extra_keys() {
        let p: PageviewPayload = serde_json::from_str(
            r#"{"route":"/","ip_address":"1.2.3.4","user_agent":"curl","title":"Git"}"#,
        )
        .expect("extra keys are ignored");
        assert_eq!(p.route, "/");

        let event = PageviewEvent::from_payload(p, "198.51.100.4".into(), "Firefox".into());
        assert_eq!(event.client_ip, "198.51.100.4");
        assert_eq!(event.user_agent, "Firefox");
    }

    #[test]
    fn event_payload_requires_slug_and_type() {
        let res: Result<EventPayload, _> = serde_json::from_str(r#"{"route":"/"}"#);
        assert!(res.is_err());
    }
}
