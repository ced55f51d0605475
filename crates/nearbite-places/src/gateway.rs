use std::future::Future;

use nearbite_core::{Candidate, EnrichedResult, GeoPoint};

use crate::client::PlacesClient;
use crate::error::PlacesError;

/// The provider operations the scan orchestrator depends on.
///
/// [`PlacesClient`] is the production implementation; tests substitute
/// in-memory fakes.
pub trait PlacesGateway: Send + Sync {
    /// Resolves free text to a coordinate (first provider result).
    fn geocode(&self, text: &str) -> impl Future<Output = Result<GeoPoint, PlacesError>> + Send;

    /// Provider-ranked candidates for free text, at most five.
    fn text_search_candidates(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<Vec<Candidate>, PlacesError>> + Send;

    /// Place ids of restaurants near `center`, nearest first, at most 20.
    fn nearby_search(
        &self,
        center: GeoPoint,
        radius_meters: u32,
    ) -> impl Future<Output = Result<Vec<String>, PlacesError>> + Send;

    /// Details for one place, with `signed` left `false`.
    fn get_details(
        &self,
        place_id: &str,
    ) -> impl Future<Output = Result<EnrichedResult, PlacesError>> + Send;
}

impl PlacesGateway for PlacesClient {
    async fn geocode(&self, text: &str) -> Result<GeoPoint, PlacesError> {
        PlacesClient::geocode(self, text).await
    }

    async fn text_search_candidates(&self, text: &str) -> Result<Vec<Candidate>, PlacesError> {
        self.text_search(text).await
    }

    async fn nearby_search(
        &self,
        center: GeoPoint,
        radius_meters: u32,
    ) -> Result<Vec<String>, PlacesError> {
        self.search_nearby(center, radius_meters).await
    }

    async fn get_details(&self, place_id: &str) -> Result<EnrichedResult, PlacesError> {
        self.place_details(place_id).await
    }
}
