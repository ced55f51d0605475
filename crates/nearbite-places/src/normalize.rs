//! Conversion from provider wire types into domain records.

use nearbite_core::{Candidate, EnrichedResult, PriceLevel};

use crate::types::{PlaceDetailsResponse, ProviderPriceLevel, TextSearchPlace};

/// Maps the provider price enum onto the four display buckets.
///
/// Free places share the `$` bucket with inexpensive ones. An unrecognized
/// provider value is logged so new enum members show up in the logs instead
/// of silently disappearing.
#[must_use]
pub fn normalize_price_level(level: &ProviderPriceLevel) -> Option<PriceLevel> {
    match level {
        ProviderPriceLevel::Free | ProviderPriceLevel::Inexpensive => Some(PriceLevel::Inexpensive),
        ProviderPriceLevel::Moderate => Some(PriceLevel::Moderate),
        ProviderPriceLevel::Expensive => Some(PriceLevel::Expensive),
        ProviderPriceLevel::VeryExpensive => Some(PriceLevel::VeryExpensive),
        ProviderPriceLevel::Unspecified => None,
        ProviderPriceLevel::Unrecognized(raw) => {
            tracing::warn!(price_level = %raw, "unrecognized provider price level");
            None
        }
    }
}

/// Builds an [`EnrichedResult`] from a Place Details response. `signed` is
/// always `false` here; annotation happens later.
#[must_use]
pub fn details_to_result(details: PlaceDetailsResponse) -> EnrichedResult {
    let price_level = details
        .price_level
        .as_ref()
        .and_then(normalize_price_level);
    let phone = details
        .national_phone_number
        .filter(|p| !p.is_empty())
        .or(details.international_phone_number)
        .filter(|p| !p.is_empty());

    EnrichedResult {
        place_id: details.id,
        name: details.display_name.map(|n| n.text).unwrap_or_default(),
        address: details.formatted_address.unwrap_or_default(),
        maps_url: details.google_maps_uri.unwrap_or_default(),
        reservable: details.reservable.unwrap_or(false),
        price_level,
        dine_in: details.dine_in,
        phone,
        website: details.website_uri.filter(|w| !w.is_empty()),
        lat: details.location.map(|l| l.latitude),
        lng: details.location.map(|l| l.longitude),
        signed: false,
    }
}

/// Converts a text-search hit into a [`Candidate`]; hits without a location
/// or display name are unusable for centering a scan and are dropped.
#[must_use]
pub fn text_place_to_candidate(place: TextSearchPlace) -> Option<Candidate> {
    let location = place.location?;
    let name = place.display_name?.text;
    Some(Candidate {
        place_id: place.id,
        name,
        address: place.formatted_address.unwrap_or_default(),
        lat: location.latitude,
        lng: location.longitude,
        types: place.types,
    })
}
