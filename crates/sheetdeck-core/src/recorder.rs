use std::sync::Arc;

use tracing::debug;

use crate::{
    analytics::AnalyticsStore,
    enrich::IdentityEnricher,
    error::AnalyticsError,
    event::{InteractionEvent, PageviewEvent, StoreEventParams, StorePageviewParams},
    visitor::IpHasher,
};

/// A required field that was empty on an otherwise acceptable submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Route,
    ClientIp,
    UserAgent,
}

/// Result of a write that did not fail.
///
/// Analytics must never break the page that sent it, so incomplete
/// submissions are dropped and still reported as success to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    Dropped(MissingField),
}

/// Validates, enriches and stores pageviews and interaction events.
#[derive(Clone)]
pub struct EventRecorder {
    store: Arc<dyn AnalyticsStore>,
    enricher: IdentityEnricher,
    hasher: IpHasher,
}

impl EventRecorder {
    pub fn new(store: Arc<dyn AnalyticsStore>, enricher: IdentityEnricher, hasher: IpHasher) -> Self {
        Self {
            store,
            enricher,
            hasher,
        }
    }

    pub async fn record_pageview(
        &self,
        event: PageviewEvent,
    ) -> Result<RecordOutcome, AnalyticsError> {
        let missing = if event.route.is_empty() {
            Some(MissingField::Route)
        } else if event.client_ip.is_empty() {
            Some(MissingField::ClientIp)
        } else if event.user_agent.is_empty() {
            Some(MissingField::UserAgent)
        } else {
            None
        };
        if let Some(field) = missing {
            debug!(?field, "pageview dropped");
            return Ok(RecordOutcome::Dropped(field));
        }

        let identity = self
            .enricher
            .enrich(&event.user_agent, &event.client_ip)
            .await?;

        let params = StorePageviewParams {
            pathname: event.route,
            browser: Some(identity.browser),
            os: Some(identity.os),
            device: Some(identity.device.as_str().to_string()),
            hashed_ip: self.hasher.hash(&event.client_ip),
            user_agent: event.user_agent,
            country: identity.country,
            referrer: event.referrer.filter(|r| !r.is_empty()),
        };

        self.store
            .store_pageview(&params)
            .await
            .map_err(AnalyticsError::storage("recording pageview"))?;

        Ok(RecordOutcome::Recorded)
    }

    pub async fn record_event(
        &self,
        event: InteractionEvent,
    ) -> Result<RecordOutcome, AnalyticsError> {
        if event.client_ip.is_empty() {
            debug!(event_type = %event.event_type, "event dropped: no client ip");
            return Ok(RecordOutcome::Dropped(MissingField::ClientIp));
        }

        let cheatsheet_id = self
            .store
            .find_cheatsheet_id_by_slug(&event.cheatsheet_slug)
            .await
            .map_err(AnalyticsError::storage("resolving cheatsheet slug"))?
            .ok_or_else(|| {
                AnalyticsError::NotFound(format!("cheatsheet '{}'", event.cheatsheet_slug))
            })?;

        let params = StoreEventParams {
            cheatsheet_id,
            event_type: event.event_type,
            pathname: event.route,
            hashed_ip: self.hasher.hash(&event.client_ip),
        };

        self.store
            .store_event(&params)
            .await
            .map_err(AnalyticsError::storage("recording event"))?;

        Ok(RecordOutcome::Recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::GeoLookup;
    use crate::testing::SpyStore;
    use async_trait::async_trait;
    use uuid::Uuid;

    const UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    struct BrokenGeo;

    #[async_trait]
    impl GeoLookup for BrokenGeo {
        async fn lookup_country(&self, _ip: &str) -> anyhow::Result<String> {
            anyhow::bail!("connection refused")
        }
    }

    struct FixedGeo;

    #[async_trait]
    impl GeoLookup for FixedGeo {
        async fn lookup_country(&self, _ip: &str) -> anyhow::Result<String> {
            Ok("India".to_string())
        }
    }

    fn recorder(store: Arc<SpyStore>, geo: Option<Arc<dyn GeoLookup>>) -> EventRecorder {
        EventRecorder::new(
            store,
            IdentityEnricher::new(geo),
            IpHasher::new("test-salt").expect("salt"),
        )
    }

    fn pageview() -> PageviewEvent {
        PageviewEvent {
            route: "/cheatsheets/git".to_string(),
            referrer: Some("https://news.ycombinator.com".to_string()),
            client_ip: "198.51.100.4".to_string(),
            user_agent: UA.to_string(),
        }
    }

    fn interaction(slug: &str) -> InteractionEvent {
        InteractionEvent {
            route: "/cheatsheets/git".to_string(),
            cheatsheet_slug: slug.to_string(),
            event_type: "download".to_string(),
            client_ip: "198.51.100.4".to_string(),
        }
    }

    #[tokio::test]
    async fn pageview_with_missing_fields_is_dropped_without_writes() {
        let cases = [
            (PageviewEvent { route: String::new(), ..pageview() }, MissingField::Route),
            (PageviewEvent { client_ip: String::new(), ..pageview() }, MissingField::ClientIp),
            (PageviewEvent { user_agent: String::new(), ..pageview() }, MissingField::UserAgent),
        ];
        for (event, field) in cases {
            let store = Arc::new(SpyStore::default());
            let outcome = recorder(store.clone(), Some(Arc::new(BrokenGeo)))
                .record_pageview(event)
                .await
                .expect("dropping is not an error");
            assert_eq!(outcome, RecordOutcome::Dropped(field));
            assert_eq!(store.write_count(), 0);
        }
    }

    #[tokio::test]
    async fn pageview_is_enriched_and_stored() {
        let store = Arc::new(SpyStore::default());
        let outcome = recorder(store.clone(), Some(Arc::new(FixedGeo)))
            .record_pageview(pageview())
            .await
            .expect("record");
        assert_eq!(outcome, RecordOutcome::Recorded);

        let stored = store.pageviews();
        assert_eq!(stored.len(), 1);
        let row = &stored[0];
        assert_eq!(row.pathname, "/cheatsheets/git");
        assert_eq!(row.browser.as_deref(), Some("Chrome"));
        assert_eq!(row.device.as_deref(), Some("desktop"));
        assert_eq!(row.country.as_deref(), Some("India"));
        assert_eq!(row.referrer.as_deref(), Some("https://news.ycombinator.com"));
        assert_eq!(row.hashed_ip.len(), 64);
        assert!(!row.hashed_ip.contains("198.51.100.4"));
        assert_eq!(row.user_agent, UA);
    }

    #[tokio::test]
    async fn pageview_without_geo_stores_no_country() {
        let store = Arc::new(SpyStore::default());
        recorder(store.clone(), None)
            .record_pageview(pageview())
            .await
            .expect("record");
        assert_eq!(store.pageviews()[0].country, None);
    }

    #[tokio::test]
    async fn pageview_geo_failure_is_an_error_and_writes_nothing() {
        let store = Arc::new(SpyStore::default());
        let err = recorder(store.clone(), Some(Arc::new(BrokenGeo)))
            .record_pageview(pageview())
            .await
            .expect_err("geo failure must surface");
        assert!(matches!(err, AnalyticsError::GeoLookupFailed(_)));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn pageview_storage_failure_surfaces() {
        let store = Arc::new(SpyStore::failing());
        let err = recorder(store, None)
            .record_pageview(pageview())
            .await
            .expect_err("storage failure must surface");
        assert!(matches!(
            err,
            AnalyticsError::Storage { stage: "recording pageview", .. }
        ));
    }

    #[tokio::test]
    async fn event_without_ip_is_dropped() {
        let store = Arc::new(SpyStore::default());
        let outcome = recorder(store.clone(), None)
            .record_event(InteractionEvent {
                client_ip: String::new(),
                ..interaction("git")
            })
            .await
            .expect("drop");
        assert_eq!(outcome, RecordOutcome::Dropped(MissingField::ClientIp));
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.slug_lookups(), 0);
    }

    #[tokio::test]
    async fn event_for_unknown_slug_is_not_found() {
        let store = Arc::new(SpyStore::default());
        let err = recorder(store.clone(), None)
            .record_event(interaction("does-not-exist"))
            .await
            .expect_err("unknown slug");
        assert!(matches!(err, AnalyticsError::NotFound(_)));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn event_storage_failure_surfaces_after_slug_lookup() {
        let store = Arc::new(SpyStore::failing().and_cheatsheet("git", Uuid::new_v4()));
        let err = recorder(store.clone(), None)
            .record_event(interaction("git"))
            .await
            .expect_err("storage failure must surface");
        assert!(matches!(
            err,
            AnalyticsError::Storage { stage: "recording event", .. }
        ));
        assert_eq!(store.slug_lookups(), 1);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn event_is_stored_with_resolved_id() {
        let id = Uuid::new_v4();
        let store = Arc::new(SpyStore::with_cheatsheet("git", id));
        let outcome = recorder(store.clone(), None)
            .record_event(interaction("git"))
            .await
            .expect("record");
        assert_eq!(outcome, RecordOutcome::Recorded);

        let events = store.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].cheatsheet_id, id);
        assert_eq!(events[0].event_type, "download");
        assert_eq!(events[0].pathname, "/cheatsheets/git");
        assert_eq!(events[0].hashed_ip.len(), 64);
    }
}
