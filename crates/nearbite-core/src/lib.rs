pub mod accumulator;
pub mod app_config;
pub mod config;
pub mod geo;
pub mod ring;
pub mod scan;

pub use accumulator::{AccumulatorState, AppendOutcome, PageTicket, ResultAccumulator};
pub use app_config::{AccountConfig, AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use geo::GeoPoint;
pub use ring::{compute_scan_center, ring_radii, RingRadii};
pub use scan::{
    Candidate, EnrichedResult, Page, PriceLevel, ScanCursor, SearchRadius, DEFAULT_RADIUS_METERS,
    MAX_RADIUS_KM, SCAN_POSITIONS,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("invalid coordinate: lat={lat}, lng={lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error("radiusKm must be between 0 and 10, got {0}")]
    InvalidRadius(String),
}
