//! Scan-plan and result types shared by the server, the orchestrator and
//! the client-side accumulator.

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;
use crate::CoreError;

/// Number of positions in the scan plan: the base center plus two rings of 12.
pub const SCAN_POSITIONS: u8 = 25;

/// Radius used when the caller does not supply one.
pub const DEFAULT_RADIUS_METERS: u32 = 5_000;

pub const MAX_RADIUS_KM: f64 = 10.0;

const LAST_CURSOR: u8 = SCAN_POSITIONS - 1;

/// Position in the fixed 25-point scan plan.
///
/// `0` is the base center, `1..=12` ring 1, `13..=24` ring 2. Construction
/// always normalizes: anything outside `0..=24` becomes `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct ScanCursor(u8);

impl ScanCursor {
    pub const START: Self = Self(0);
    pub const LAST: Self = Self(LAST_CURSOR);

    #[must_use]
    pub fn normalize(raw: i64) -> Self {
        match u8::try_from(raw) {
            Ok(v) if v <= LAST_CURSOR => Self(v),
            _ => Self::START,
        }
    }

    /// Normalizes an optional query-string value; missing or non-numeric
    /// input starts a fresh scan.
    #[must_use]
    pub fn from_param(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().parse::<i64>().ok())
            .map_or(Self::START, Self::normalize)
    }

    #[must_use]
    pub fn index(self) -> u8 {
        self.0
    }

    /// Index the caller should send for the following page. For the last
    /// cursor this is 25, which the server would normalize back to 0; callers
    /// stop on `has_more == false` instead.
    #[must_use]
    pub fn next_index(self) -> u8 {
        self.0 + 1
    }

    /// Whether a page served for this cursor leaves positions unscanned.
    #[must_use]
    pub fn has_more(self) -> bool {
        self.0 < LAST_CURSOR
    }
}

impl<'de> Deserialize<'de> for ScanCursor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = i64::deserialize(deserializer)?;
        Ok(Self::normalize(raw))
    }
}

impl std::fmt::Display for ScanCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Search radius in whole meters, derived from a kilometer value in `[0, 10]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchRadius(u32);

impl Default for SearchRadius {
    fn default() -> Self {
        Self(DEFAULT_RADIUS_METERS)
    }
}

impl SearchRadius {
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRadius`] for NaN or values outside `[0, 10]` km.
    pub fn from_km(km: f64) -> Result<Self, CoreError> {
        if !(0.0..=MAX_RADIUS_KM).contains(&km) {
            return Err(CoreError::InvalidRadius(km.to_string()));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meters = (km * 1000.0).round() as u32;
        Ok(Self(meters))
    }

    /// Parses an optional `radiusKm` query value. Absent or blank means the
    /// 5 km default.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRadius`] when the value is not a number in range.
    pub fn from_param(raw: Option<&str>) -> Result<Self, CoreError> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(Self::default()),
            Some(s) => {
                let km = s
                    .parse::<f64>()
                    .map_err(|_| CoreError::InvalidRadius(s.to_string()))?;
                Self::from_km(km)
            }
        }
    }

    #[must_use]
    pub fn meters(self) -> u32 {
        self.0
    }
}

/// Normalized price bucket shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceLevel {
    #[serde(rename = "$")]
    Inexpensive,
    #[serde(rename = "$$")]
    Moderate,
    #[serde(rename = "$$$")]
    Expensive,
    #[serde(rename = "$$$$")]
    VeryExpensive,
}

impl PriceLevel {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            PriceLevel::Inexpensive => "$",
            PriceLevel::Moderate => "$$",
            PriceLevel::Expensive => "$$$",
            PriceLevel::VeryExpensive => "$$$$",
        }
    }
}

/// An unenriched place returned by text search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub place_id: String,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub types: Vec<String>,
}

/// A restaurant with its contact and pricing details. `place_id` is the
/// merge key everywhere results are combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedResult {
    pub place_id: String,
    pub name: String,
    pub address: String,
    pub maps_url: String,
    pub reservable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_level: Option<PriceLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dine_in: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    /// `false` both when the place is not signed and when the lookup could
    /// not be performed.
    #[serde(default)]
    pub signed: bool,
}

/// One scan position's worth of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// The session's base center, not the ring probe point.
    pub center: GeoPoint,
    pub radius_meters: u32,
    pub results: Vec<EnrichedResult>,
    pub scan_index: ScanCursor,
    pub next_scan_index: u8,
    pub has_more: bool,
}

impl Page {
    #[must_use]
    pub fn new(
        center: GeoPoint,
        radius: SearchRadius,
        cursor: ScanCursor,
        results: Vec<EnrichedResult>,
    ) -> Self {
        Self {
            center,
            radius_meters: radius.meters(),
            results,
            scan_index: cursor,
            next_scan_index: cursor.next_index(),
            has_more: cursor.has_more(),
        }
    }
}
