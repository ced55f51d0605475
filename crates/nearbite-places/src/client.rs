//! HTTP client for the Geocoding API and Places API (New).

use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use nearbite_core::{Candidate, EnrichedResult, GeoPoint};

use crate::error::PlacesError;
use crate::normalize::{details_to_result, text_place_to_candidate};
use crate::retry::retry_with_backoff;
use crate::types::{
    Circle, GeocodeResponse, LatLng, LocationRestriction, NearbySearchRequest,
    NearbySearchResponse, PlaceDetailsResponse, TextSearchRequest, TextSearchResponse,
};

pub const DEFAULT_PLACES_BASE_URL: &str = "https://places.googleapis.com/";
pub const DEFAULT_GEOCODE_BASE_URL: &str = "https://maps.googleapis.com/";

const NEARBY_FIELD_MASK: &str = "places.id,places.displayName,places.formattedAddress";
const TEXT_SEARCH_FIELD_MASK: &str =
    "places.id,places.displayName,places.formattedAddress,places.location,places.types";
const DETAILS_FIELD_MASK: &str = "id,displayName,formattedAddress,googleMapsUri,reservable,\
priceLevel,dineIn,location,nationalPhoneNumber,internationalPhoneNumber,websiteUri";

const NEARBY_MAX_RESULTS: u32 = 20;
const TEXT_SEARCH_MAX_RESULTS: u32 = 5;

/// HTTP client for the places provider.
///
/// Every call carries the API key, a field mask limiting the response to the
/// fields we read, and a per-request timeout. Transient failures (429, 5xx,
/// network errors) are retried up to `max_retries` additional times.
pub struct PlacesClient {
    client: Client,
    api_key: String,
    places_base: Url,
    geocode_base: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl std::fmt::Debug for PlacesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacesClient")
            .field("api_key", &"[redacted]")
            .field("places_base", &self.places_base.as_str())
            .field("geocode_base", &self.geocode_base.as_str())
            .field("max_retries", &self.max_retries)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .finish_non_exhaustive()
    }
}

impl PlacesClient {
    /// Creates a client against the public provider endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        api_key: &str,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, PlacesError> {
        Self::with_base_urls(
            api_key,
            timeout_secs,
            max_retries,
            backoff_base_ms,
            DEFAULT_PLACES_BASE_URL,
            DEFAULT_GEOCODE_BASE_URL,
        )
    }

    /// Creates a client with overridden endpoints. Used by tests to point at
    /// a local mock server.
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError::InvalidBaseUrl`] if either URL does not parse,
    /// or [`PlacesError::Http`] if the HTTP client cannot be built.
    pub fn with_base_urls(
        api_key: &str,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
        places_base: &str,
        geocode_base: &str,
    ) -> Result<Self, PlacesError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            places_base: parse_base(places_base)?,
            geocode_base: parse_base(geocode_base)?,
            max_retries,
            backoff_base_ms,
        })
    }

    /// Resolves free text to the first geocoding result.
    ///
    /// # Errors
    ///
    /// - [`PlacesError::GeocodeStatus`] when the provider status is not `OK`
    ///   or no result came back (`ZERO_RESULTS`).
    /// - [`PlacesError::Malformed`] for a coordinate outside valid ranges.
    /// - Transport and decoding errors as for every call.
    pub async fn geocode(&self, address: &str) -> Result<GeoPoint, PlacesError> {
        let mut url = join(&self.geocode_base, "maps/api/geocode/json")?;
        url.query_pairs_mut()
            .append_pair("address", address)
            .append_pair("key", &self.api_key);

        let body: GeocodeResponse = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move {
                let response = self.client.get(url).send().await?;
                decode(response, "geocode").await
            }
        })
        .await?;

        if body.status != "OK" {
            return Err(PlacesError::GeocodeStatus {
                status: body.status,
                message: body.error_message,
            });
        }
        let Some(first) = body.results.into_iter().next() else {
            return Err(PlacesError::GeocodeStatus {
                status: "ZERO_RESULTS".to_owned(),
                message: None,
            });
        };
        let loc = first.geometry.location;
        GeoPoint::new(loc.lat, loc.lng).map_err(|e| PlacesError::Malformed {
            context: "geocode".to_owned(),
            reason: e.to_string(),
        })
    }

    /// Free-text place search, returning at most five usable candidates.
    ///
    /// # Errors
    ///
    /// Transport, status and decoding errors.
    pub async fn text_search(&self, query: &str) -> Result<Vec<Candidate>, PlacesError> {
        let url = join(&self.places_base, "v1/places:searchText")?;
        let request = TextSearchRequest {
            text_query: query,
            max_result_count: TEXT_SEARCH_MAX_RESULTS,
        };

        let body: TextSearchResponse =
            retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
                let url = url.clone();
                let request = &request;
                async move {
                    let response = self
                        .client
                        .post(url)
                        .header("X-Goog-Api-Key", &self.api_key)
                        .header("X-Goog-FieldMask", TEXT_SEARCH_FIELD_MASK)
                        .json(request)
                        .send()
                        .await?;
                    decode(response, "text search").await
                }
            })
            .await?;

        Ok(body
            .places
            .into_iter()
            .filter_map(text_place_to_candidate)
            .collect())
    }

    /// Nearby restaurant search ranked by distance; returns place ids only.
    ///
    /// # Errors
    ///
    /// Transport, status and decoding errors.
    pub async fn search_nearby(
        &self,
        center: GeoPoint,
        radius_meters: u32,
    ) -> Result<Vec<String>, PlacesError> {
        let url = join(&self.places_base, "v1/places:searchNearby")?;
        let request = NearbySearchRequest {
            included_types: vec!["restaurant"],
            max_result_count: NEARBY_MAX_RESULTS,
            rank_preference: "DISTANCE",
            location_restriction: LocationRestriction {
                circle: Circle {
                    center: LatLng {
                        latitude: center.lat,
                        longitude: center.lng,
                    },
                    radius: f64::from(radius_meters),
                },
            },
        };

        let body: NearbySearchResponse =
            retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
                let url = url.clone();
                let request = &request;
                async move {
                    let response = self
                        .client
                        .post(url)
                        .header("X-Goog-Api-Key", &self.api_key)
                        .header("X-Goog-FieldMask", NEARBY_FIELD_MASK)
                        .json(request)
                        .send()
                        .await?;
                    decode(response, "nearby search").await
                }
            })
            .await?;

        Ok(body.places.into_iter().map(|p| p.id).collect())
    }

    /// Fetches contact, pricing and location details for one place.
    ///
    /// # Errors
    ///
    /// Transport, status and decoding errors. A 404 surfaces as
    /// [`PlacesError::Api`] with status 404.
    pub async fn place_details(&self, place_id: &str) -> Result<EnrichedResult, PlacesError> {
        let mut url = join(&self.places_base, "v1/places")?;
        url.path_segments_mut()
            .map_err(|()| PlacesError::InvalidBaseUrl {
                url: self.places_base.to_string(),
                reason: "cannot be a base".to_owned(),
            })?
            .push(place_id);

        let details: PlaceDetailsResponse =
            retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
                let url = url.clone();
                async move {
                    let response = self
                        .client
                        .get(url)
                        .header("X-Goog-Api-Key", &self.api_key)
                        .header("X-Goog-FieldMask", DETAILS_FIELD_MASK)
                        .send()
                        .await?;
                    decode(response, "place details").await
                }
            })
            .await?;

        Ok(details_to_result(details))
    }
}

fn parse_base(raw: &str) -> Result<Url, PlacesError> {
    let mut url = Url::parse(raw).map_err(|e| PlacesError::InvalidBaseUrl {
        url: raw.to_owned(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(PlacesError::InvalidBaseUrl {
            url: raw.to_owned(),
            reason: "cannot be a base".to_owned(),
        });
    }
    // Url::join replaces the last segment unless the path ends in '/'.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn join(base: &Url, path: &str) -> Result<Url, PlacesError> {
    base.join(path).map_err(|e| PlacesError::InvalidBaseUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })
}

async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<T, PlacesError> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(PlacesError::Api {
            status: status.as_u16(),
            body: text,
        });
    }
    serde_json::from_str(&text).map_err(|source| PlacesError::Deserialize {
        context: context.to_owned(),
        source,
    })
}
