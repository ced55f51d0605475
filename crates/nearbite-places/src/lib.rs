pub mod client;
pub mod error;
pub mod gateway;
pub mod normalize;
mod retry;
pub mod types;

pub use client::{PlacesClient, DEFAULT_GEOCODE_BASE_URL, DEFAULT_PLACES_BASE_URL};
pub use error::PlacesError;
pub use gateway::PlacesGateway;
pub use normalize::normalize_price_level;
pub use types::ProviderPriceLevel;
