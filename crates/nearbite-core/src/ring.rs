//! Concentric-ring probe geometry.
//!
//! Maps a [`ScanCursor`] to the point a nearby search should be centered on.
//! Offsets use a flat-earth approximation that is only accurate for the
//! sub-1.5 km radii produced here; do not reuse it for larger distances.

use crate::geo::GeoPoint;
use crate::scan::ScanCursor;

const METERS_PER_LAT_DEGREE: f64 = 111_320.0;
const RING_POINTS: u8 = 12;
const STEP_DEGREES: f64 = 30.0;

const RING1_FACTOR: f64 = 0.45;
const RING1_MIN_M: f64 = 150.0;
const RING1_MAX_M: f64 = 800.0;

const RING2_FACTOR: f64 = 0.75;
const RING2_MIN_M: f64 = 250.0;
const RING2_MAX_M: f64 = 1_400.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingRadii {
    pub inner_m: f64,
    pub outer_m: f64,
}

/// Ring radii for a search radius. Both rings have nonzero floors, so a zero
/// radius still produces distinct probe points.
#[must_use]
pub fn ring_radii(radius_meters: u32) -> RingRadii {
    let r = f64::from(radius_meters);
    RingRadii {
        inner_m: (r * RING1_FACTOR).clamp(RING1_MIN_M, RING1_MAX_M),
        outer_m: (r * RING2_FACTOR).clamp(RING2_MIN_M, RING2_MAX_M),
    }
}

/// Probe point for `cursor` around `base`.
///
/// Cursor 0 is `base` itself; 1–12 walk ring 1 and 13–24 walk ring 2, each
/// starting due east and stepping 30° counter-clockwise.
///
/// Latitude is clamped to the poles and longitude wraps into `[-180, 180)`,
/// so a base near the antimeridian still yields a valid point.
#[must_use]
pub fn compute_scan_center(base: GeoPoint, cursor: ScanCursor, radius_meters: u32) -> GeoPoint {
    let radii = ring_radii(radius_meters);
    let (step, r) = match cursor.index() {
        0 => return base,
        i @ 1..=RING_POINTS => (i - 1, radii.inner_m),
        i if i <= 2 * RING_POINTS => (i - RING_POINTS - 1, radii.outer_m),
        _ => return base,
    };

    let angle = (f64::from(step) * STEP_DEGREES).to_radians();
    let east = r * angle.cos();
    let north = r * angle.sin();

    let d_lat = north / METERS_PER_LAT_DEGREE;
    let d_lng = east / (METERS_PER_LAT_DEGREE * base.lat.to_radians().cos());

    GeoPoint {
        lat: (base.lat + d_lat).clamp(-90.0, 90.0),
        lng: (base.lng + d_lng + 180.0).rem_euclid(360.0) - 180.0,
    }
}
