use serde::Serialize;
use thiserror::Error;

use nearbite_core::CoreError;
use nearbite_places::PlacesError;

/// The pipeline step a scan failure is attributed to. Serialized as the
/// `step` field of an error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Config,
    Validation,
    Geocoding,
    PlacesSearch,
    PlaceDetails,
    Unknown,
}

impl Step {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Config => "config",
            Step::Validation => "validation",
            Step::Geocoding => "geocoding",
            Step::PlacesSearch => "places_search",
            Step::PlaceDetails => "place_details",
            Step::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Missing GOOGLE_MAPS_API_KEY")]
    NotConfigured,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    InvalidInput(#[from] CoreError),

    #[error("{0}")]
    Geocoding(#[source] PlacesError),

    #[error("Places search failed: {0}")]
    PlacesSearch(#[source] PlacesError),

    #[error("Place details failed: {0}")]
    PlaceDetails(#[source] PlacesError),

    #[error("unexpected error: {0}")]
    Unknown(String),
}

impl ScanError {
    #[must_use]
    pub fn step(&self) -> Step {
        match self {
            ScanError::NotConfigured => Step::Config,
            ScanError::Validation(_) | ScanError::InvalidInput(_) => Step::Validation,
            ScanError::Geocoding(_) => Step::Geocoding,
            ScanError::PlacesSearch(_) => Step::PlacesSearch,
            ScanError::PlaceDetails(_) => Step::PlaceDetails,
            ScanError::Unknown(_) => Step::Unknown,
        }
    }

    /// HTTP status for this failure: 400 for caller mistakes, 500 otherwise.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self.step() {
            Step::Validation => 400,
            _ => 500,
        }
    }

    /// Message safe to return to a caller. Unknown failures are reduced to a
    /// generic string; everything else carries the provider's own text.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            ScanError::Unknown(_) => "Unknown error".to_owned(),
            other => other.to_string(),
        }
    }
}
