use thiserror::Error;

/// Errors returned by the places/geocoding provider client.
#[derive(Debug, Error)]
pub enum PlacesError {
    /// Network, TLS or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status. `body` is the raw
    /// response text, kept for diagnostics.
    #[error("provider returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// The Geocoding API answered 200 with a non-`OK` status field
    /// (`ZERO_RESULTS`, `REQUEST_DENIED`, ...).
    #[error("Geocoding failed: {status}")]
    GeocodeStatus {
        status: String,
        message: Option<String>,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The response parsed but carries values we refuse to trust.
    #[error("malformed response for {context}: {reason}")]
    Malformed { context: String, reason: String },

    #[error("invalid base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl PlacesError {
    /// Whether the provider reported that nothing matched the request.
    #[must_use]
    pub fn is_zero_results(&self) -> bool {
        matches!(self, PlacesError::GeocodeStatus { status, .. } if status == "ZERO_RESULTS")
    }
}
