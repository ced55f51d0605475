//! One page of the concentric-ring scan.
//!
//! A page request resolves a base center (explicit coordinates win over a
//! text query), derives the probe point for the requested cursor, runs a
//! nearby restaurant search there and enriches every hit with details.
//! Steps up to and including the nearby search fail fast; enrichment and
//! signed annotation degrade per result.

use nearbite_core::{
    compute_scan_center, Candidate, EnrichedResult, GeoPoint, Page, ScanCursor, SearchRadius,
};
use nearbite_places::PlacesGateway;

use crate::error::ScanError;
use crate::fanout::{enrich, DEFAULT_CONCURRENCY};
use crate::signed::{NoSignedLookup, SignedLookup};

/// Caller input for one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRequest {
    pub query: Option<String>,
    /// Raw `(lat, lng)`; validated before use.
    pub center: Option<(f64, f64)>,
    pub radius_km: Option<f64>,
    pub cursor: ScanCursor,
}

impl PageRequest {
    #[must_use]
    pub fn for_query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn for_center(lat: f64, lng: f64) -> Self {
        Self {
            center: Some((lat, lng)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_radius_km(mut self, km: f64) -> Self {
        self.radius_km = Some(km);
        self
    }

    #[must_use]
    pub fn at(mut self, cursor: ScanCursor) -> Self {
        self.cursor = cursor;
        self
    }
}

/// Drives page fetches against a [`PlacesGateway`].
///
/// The gateway is optional so a server without a provider key can still
/// start; every request then fails with a `config` step error.
pub struct ScanOrchestrator<G, S = NoSignedLookup> {
    gateway: Option<G>,
    signed: Option<S>,
    enrich_concurrency: usize,
}

impl<G: PlacesGateway> ScanOrchestrator<G, NoSignedLookup> {
    #[must_use]
    pub fn new(gateway: Option<G>) -> Self {
        Self {
            gateway,
            signed: None,
            enrich_concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl<G: PlacesGateway, S: SignedLookup> ScanOrchestrator<G, S> {
    #[must_use]
    pub fn with_signed_lookup<T: SignedLookup>(self, signed: Option<T>) -> ScanOrchestrator<G, T> {
        ScanOrchestrator {
            gateway: self.gateway,
            signed,
            enrich_concurrency: self.enrich_concurrency,
        }
    }

    #[must_use]
    pub fn with_enrich_concurrency(mut self, limit: usize) -> Self {
        self.enrich_concurrency = limit.max(1);
        self
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.gateway.is_some()
    }

    fn gateway(&self) -> Result<&G, ScanError> {
        self.gateway.as_ref().ok_or(ScanError::NotConfigured)
    }

    /// Fetches the page for `request.cursor`.
    ///
    /// # Errors
    ///
    /// - `config` when no provider is configured.
    /// - `validation` for a bad radius, bad coordinates or a missing target.
    /// - `geocoding` when the query cannot be resolved (including zero results).
    /// - `places_search` when the nearby search fails.
    pub async fn fetch_page(&self, request: &PageRequest) -> Result<Page, ScanError> {
        let gateway = self.gateway()?;
        let cursor = request.cursor;
        let radius = match request.radius_km {
            Some(km) => SearchRadius::from_km(km)?,
            None => SearchRadius::default(),
        };
        let base = resolve_base(gateway, request).await?;

        let probe = compute_scan_center(base, cursor, radius.meters());
        let place_ids = gateway
            .nearby_search(probe, radius.meters())
            .await
            .map_err(ScanError::PlacesSearch)?;

        tracing::info!(
            cursor = %cursor,
            radius_meters = radius.meters(),
            candidates = place_ids.len(),
            "nearby search complete"
        );

        if place_ids.is_empty() {
            return Ok(Page::new(base, radius, cursor, Vec::new()));
        }

        let mut results: Vec<EnrichedResult> =
            enrich(gateway, &place_ids, self.enrich_concurrency)
                .await
                .into_iter()
                .flatten()
                .collect();
        if results.len() < place_ids.len() {
            tracing::warn!(
                cursor = %cursor,
                dropped = place_ids.len() - results.len(),
                "some place details could not be fetched"
            );
        }

        self.annotate_signed(&mut results).await;
        Ok(Page::new(base, radius, cursor, results))
    }

    /// Details for a single place, with best-effort signed annotation.
    ///
    /// # Errors
    ///
    /// `config`, `validation` for a blank id, or `place_details`.
    pub async fn fetch_place(&self, place_id: &str) -> Result<EnrichedResult, ScanError> {
        let gateway = self.gateway()?;
        let place_id = place_id.trim();
        if place_id.is_empty() {
            return Err(ScanError::Validation("Missing placeId".to_owned()));
        }
        let result = gateway
            .get_details(place_id)
            .await
            .map_err(ScanError::PlaceDetails)?;
        let mut results = vec![result];
        self.annotate_signed(&mut results).await;
        results
            .pop()
            .ok_or_else(|| ScanError::Unknown("place result vanished during annotation".to_owned()))
    }

    /// Up to five provider-ranked candidates for free text.
    ///
    /// # Errors
    ///
    /// `config`, `validation` for a blank query, or `places_search`.
    pub async fn resolve_text(&self, query: &str) -> Result<Vec<Candidate>, ScanError> {
        let gateway = self.gateway()?;
        let query = query.trim();
        if query.is_empty() {
            return Err(ScanError::Validation("Missing query".to_owned()));
        }
        gateway
            .text_search_candidates(query)
            .await
            .map_err(ScanError::PlacesSearch)
    }

    async fn annotate_signed(&self, results: &mut [EnrichedResult]) {
        let Some(lookup) = self.signed.as_ref() else {
            return;
        };
        if results.is_empty() {
            return;
        }
        let ids: Vec<String> = results.iter().map(|r| r.place_id.clone()).collect();
        match lookup.signed_among(&ids).await {
            Ok(signed) => {
                for result in results.iter_mut() {
                    result.signed = signed.contains(&result.place_id);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "signed lookup failed; reporting all as unsigned");
            }
        }
    }
}

async fn resolve_base<G: PlacesGateway>(
    gateway: &G,
    request: &PageRequest,
) -> Result<GeoPoint, ScanError> {
    if let Some((lat, lng)) = request.center {
        return GeoPoint::new(lat, lng)
            .map_err(|_| ScanError::Validation("Invalid lat/lng".to_owned()));
    }
    match request.query.as_deref().map(str::trim) {
        Some(query) if !query.is_empty() => {
            gateway.geocode(query).await.map_err(ScanError::Geocoding)
        }
        _ => Err(ScanError::Validation("Missing query or lat/lng".to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use nearbite_core::{Candidate, ScanCursor};

    use super::*;
    use crate::error::Step;
    use crate::test_support::{FakeGateway, FakeSigned};

    fn taipei() -> GeoPoint {
        GeoPoint::new(25.0478, 121.5170).unwrap()
    }

    fn orchestrator(gateway: FakeGateway) -> ScanOrchestrator<FakeGateway, FakeSigned> {
        ScanOrchestrator::new(Some(gateway)).with_signed_lookup(Some(FakeSigned::default()))
    }

    #[tokio::test]
    async fn missing_provider_is_config_error() {
        let orch: ScanOrchestrator<FakeGateway> = ScanOrchestrator::new(None);
        let err = orch
            .fetch_page(&PageRequest::for_query("Taipei"))
            .await
            .unwrap_err();
        assert_eq!(err.step(), Step::Config);
        assert!(!orch.is_configured());
    }

    #[tokio::test]
    async fn explicit_center_wins_over_query() {
        let orch = orchestrator(FakeGateway::default().with_geocode(taipei()));
        let mut request = PageRequest::for_center(25.1, 121.6);
        request.query = Some("somewhere else".to_owned());

        let page = orch.fetch_page(&request).await.unwrap();
        assert_eq!(page.center, GeoPoint::new(25.1, 121.6).unwrap());
        assert_eq!(orch.gateway.as_ref().unwrap().geocode_calls(), 0);
    }

    #[tokio::test]
    async fn query_is_geocoded_when_no_center() {
        let orch = orchestrator(FakeGateway::default().with_geocode(taipei()));
        let page = orch.fetch_page(&PageRequest::for_query("中山區")).await.unwrap();
        assert_eq!(page.center, taipei());
        assert_eq!(orch.gateway.as_ref().unwrap().geocode_calls(), 1);
    }

    #[tokio::test]
    async fn geocode_zero_results_fails_with_geocoding_step() {
        let orch = orchestrator(FakeGateway::default());
        let err = orch
            .fetch_page(&PageRequest::for_query("中山區"))
            .await
            .unwrap_err();
        assert_eq!(err.step(), Step::Geocoding);
        assert_eq!(err.status(), 500);
        assert!(err.to_string().contains("ZERO_RESULTS"));
    }

    #[tokio::test]
    async fn missing_target_is_validation_error() {
        let orch = orchestrator(FakeGateway::default());
        let err = orch
            .fetch_page(&PageRequest {
                query: Some("   ".to_owned()),
                ..PageRequest::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.step(), Step::Validation);
        assert_eq!(err.status(), 400);
    }

    #[tokio::test]
    async fn out_of_range_center_is_validation_error() {
        let orch = orchestrator(FakeGateway::default());
        let err = orch
            .fetch_page(&PageRequest::for_center(95.0, 10.0))
            .await
            .unwrap_err();
        assert_eq!(err.step(), Step::Validation);
    }

    #[tokio::test]
    async fn bad_radius_is_rejected_before_geocoding() {
        let orch = orchestrator(FakeGateway::default().with_geocode(taipei()));
        let err = orch
            .fetch_page(&PageRequest::for_query("Taipei").with_radius_km(12.0))
            .await
            .unwrap_err();
        assert_eq!(err.step(), Step::Validation);
        assert_eq!(orch.gateway.as_ref().unwrap().geocode_calls(), 0);
    }

    #[tokio::test]
    async fn zero_candidates_is_an_empty_page_not_an_error() {
        let orch = orchestrator(FakeGateway::default());
        let page = orch
            .fetch_page(&PageRequest::for_center(25.0, 121.5).at(ScanCursor::normalize(3)))
            .await
            .unwrap();
        assert!(page.results.is_empty());
        assert_eq!(page.scan_index.index(), 3);
        assert_eq!(page.next_scan_index, 4);
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn nearby_search_runs_at_ring_probe_with_full_radius() {
        let gateway = FakeGateway::default();
        let orch = orchestrator(gateway);
        let base = GeoPoint::new(25.0, 121.5).unwrap();
        orch.fetch_page(
            &PageRequest::for_center(base.lat, base.lng)
                .with_radius_km(2.0)
                .at(ScanCursor::normalize(1)),
        )
        .await
        .unwrap();

        let calls = orch.gateway.as_ref().unwrap().nearby_calls();
        assert_eq!(calls.len(), 1);
        let (probe, radius) = calls[0];
        assert_eq!(radius, 2000);
        assert!((probe.lat - base.lat).abs() < 1e-9, "ring-1 cursor 1 points east");
        assert!(probe.lng > base.lng);
    }

    #[tokio::test]
    async fn default_radius_is_five_km() {
        let orch = orchestrator(FakeGateway::default());
        let page = orch
            .fetch_page(&PageRequest::for_center(25.0, 121.5))
            .await
            .unwrap();
        assert_eq!(page.radius_meters, 5000);
    }

    #[tokio::test]
    async fn nearby_failure_is_places_search_error() {
        let orch = orchestrator(FakeGateway::default().failing_nearby());
        let err = orch
            .fetch_page(&PageRequest::for_center(25.0, 121.5))
            .await
            .unwrap_err();
        assert_eq!(err.step(), Step::PlacesSearch);
        assert!(err.public_message().contains("RESOURCE_EXHAUSTED"));
    }

    #[tokio::test]
    async fn one_failed_detail_keeps_the_rest_of_the_page() {
        let ids: Vec<String> = (1..=10).map(|i| format!("p{i}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let gateway = FakeGateway::default()
            .with_nearby(&refs)
            .with_details(&ids)
            .failing_details("p5");
        let orch = orchestrator(gateway);

        let page = orch
            .fetch_page(&PageRequest::for_center(25.0, 121.5))
            .await
            .unwrap();
        assert_eq!(page.results.len(), 9);
        assert!(page.results.iter().all(|r| r.place_id != "p5"));
    }

    #[tokio::test]
    async fn signed_places_are_flagged() {
        let gateway = FakeGateway::default()
            .with_nearby(&["a", "b"])
            .with_details(&["a", "b"]);
        let orch = ScanOrchestrator::new(Some(gateway))
            .with_signed_lookup(Some(FakeSigned::with(&["b"])));

        let page = orch
            .fetch_page(&PageRequest::for_center(25.0, 121.5))
            .await
            .unwrap();
        let flags: Vec<_> = page.results.iter().map(|r| (r.place_id.as_str(), r.signed)).collect();
        assert_eq!(flags, vec![("a", false), ("b", true)]);
    }

    #[tokio::test]
    async fn signed_lookup_failure_degrades_to_unsigned() {
        let gateway = FakeGateway::default()
            .with_nearby(&["a", "b"])
            .with_details(&["a", "b"]);
        let orch = ScanOrchestrator::new(Some(gateway))
            .with_signed_lookup(Some(FakeSigned::failing()));

        let page = orch
            .fetch_page(&PageRequest::for_center(25.0, 121.5))
            .await
            .unwrap();
        assert_eq!(page.results.len(), 2);
        assert!(page.results.iter().all(|r| !r.signed));
    }

    #[tokio::test]
    async fn last_cursor_has_no_more() {
        let orch = orchestrator(FakeGateway::default());
        let page = orch
            .fetch_page(&PageRequest::for_center(25.0, 121.5).at(ScanCursor::LAST))
            .await
            .unwrap();
        assert_eq!(page.scan_index.index(), 24);
        assert_eq!(page.next_scan_index, 25);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn fetch_place_annotates_signed() {
        let gateway = FakeGateway::default().with_details(&["x"]);
        let orch = ScanOrchestrator::new(Some(gateway))
            .with_signed_lookup(Some(FakeSigned::with(&["x"])));
        let place = orch.fetch_place(" x ").await.unwrap();
        assert_eq!(place.place_id, "x");
        assert!(place.signed);
    }

    #[tokio::test]
    async fn fetch_place_failure_is_place_details_step() {
        let orch = orchestrator(FakeGateway::default());
        let err = orch.fetch_place("missing").await.unwrap_err();
        assert_eq!(err.step(), Step::PlaceDetails);

        let err = orch.fetch_place("").await.unwrap_err();
        assert_eq!(err.step(), Step::Validation);
    }

    #[tokio::test]
    async fn resolve_text_returns_candidates() {
        let candidate = Candidate {
            place_id: "c1".to_owned(),
            name: "Zhongshan".to_owned(),
            address: "Taipei".to_owned(),
            lat: 25.06,
            lng: 121.52,
            types: vec!["sublocality".to_owned()],
        };
        let orch = orchestrator(FakeGateway::default().with_candidates(vec![candidate.clone()]));
        assert_eq!(orch.resolve_text("中山").await.unwrap(), vec![candidate]);

        let err = orch.resolve_text(" ").await.unwrap_err();
        assert_eq!(err.step(), Step::Validation);
    }
}
