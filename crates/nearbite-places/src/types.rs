//! Provider wire types for the Geocoding API and Places API (New).
//!
//! Only the fields named in the request field masks are modeled.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Geocoding
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GeocodeResult {
    pub geometry: GeocodeGeometry,
}

#[derive(Debug, Deserialize)]
pub struct GeocodeGeometry {
    pub location: GeocodeLocation,
}

#[derive(Debug, Deserialize)]
pub struct GeocodeLocation {
    pub lat: f64,
    pub lng: f64,
}

// ---------------------------------------------------------------------------
// Places API (New)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
pub struct LocalizedText {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbySearchRequest {
    pub included_types: Vec<&'static str>,
    pub max_result_count: u32,
    pub rank_preference: &'static str,
    pub location_restriction: LocationRestriction,
}

#[derive(Debug, Serialize)]
pub struct LocationRestriction {
    pub circle: Circle,
}

#[derive(Debug, Serialize)]
pub struct Circle {
    pub center: LatLng,
    pub radius: f64,
}

#[derive(Debug, Deserialize)]
pub struct NearbySearchResponse {
    #[serde(default)]
    pub places: Vec<PlaceRef>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceRef {
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSearchRequest<'a> {
    pub text_query: &'a str,
    pub max_result_count: u32,
}

#[derive(Debug, Deserialize)]
pub struct TextSearchResponse {
    #[serde(default)]
    pub places: Vec<TextSearchPlace>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSearchPlace {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<LocalizedText>,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub location: Option<LatLng>,
    #[serde(default)]
    pub types: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceDetailsResponse {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<LocalizedText>,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub google_maps_uri: Option<String>,
    #[serde(default)]
    pub reservable: Option<bool>,
    #[serde(default)]
    pub price_level: Option<ProviderPriceLevel>,
    #[serde(default)]
    pub dine_in: Option<bool>,
    #[serde(default)]
    pub national_phone_number: Option<String>,
    #[serde(default)]
    pub international_phone_number: Option<String>,
    #[serde(default)]
    pub website_uri: Option<String>,
    #[serde(default)]
    pub location: Option<LatLng>,
}

/// The provider's `priceLevel` enum. Values added by the provider after this
/// was written land in `Unrecognized` instead of failing the whole record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ProviderPriceLevel {
    Unspecified,
    Free,
    Inexpensive,
    Moderate,
    Expensive,
    VeryExpensive,
    Unrecognized(String),
}

impl From<String> for ProviderPriceLevel {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "PRICE_LEVEL_UNSPECIFIED" => Self::Unspecified,
            "PRICE_LEVEL_FREE" => Self::Free,
            "PRICE_LEVEL_INEXPENSIVE" => Self::Inexpensive,
            "PRICE_LEVEL_MODERATE" => Self::Moderate,
            "PRICE_LEVEL_EXPENSIVE" => Self::Expensive,
            "PRICE_LEVEL_VERY_EXPENSIVE" => Self::VeryExpensive,
            _ => Self::Unrecognized(raw),
        }
    }
}
