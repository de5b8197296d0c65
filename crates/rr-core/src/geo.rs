//! Geographic coordinate types and spatial utilities.
//!
//! `GeoPoint` uses `f64` latitude/longitude.  Distances feed the admission
//! estimate directly, so the extra precision is kept end to end.

use serde::{Deserialize, Serialize};

/// Mean Earth radius, kilometres.
pub const EARTH_RADIUS_KM: f64 = 6_371.0;

/// A WGS-84 geographic coordinate.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[inline]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Haversine great-circle distance in kilometres.
    pub fn distance_km(self, other: GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_KM * c
    }

    /// Haversine great-circle distance in metres.
    #[inline]
    pub fn distance_m(self, other: GeoPoint) -> f64 {
        self.distance_km(other) * 1_000.0
    }

    /// Arithmetic midpoint of the two coordinates.
    ///
    /// Not the geodesic midpoint; good enough to centre a radius graph that
    /// spans both endpoints.
    pub fn midpoint(self, other: GeoPoint) -> GeoPoint {
        GeoPoint::new((self.lat + other.lat) * 0.5, (self.lon + other.lon) * 0.5)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

// ── BoundingBox ───────────────────────────────────────────────────────────────

/// Axis-aligned lat/lon box.  `north >= south`, `east >= west`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east:  f64,
    pub west:  f64,
}

impl BoundingBox {
    /// Smallest box containing both points, grown by `buffer_deg` on every side.
    pub fn spanning(a: GeoPoint, b: GeoPoint, buffer_deg: f64) -> Self {
        Self {
            north: a.lat.max(b.lat) + buffer_deg,
            south: a.lat.min(b.lat) - buffer_deg,
            east:  a.lon.max(b.lon) + buffer_deg,
            west:  a.lon.min(b.lon) - buffer_deg,
        }
    }

    /// North-east corner.
    pub fn ne(&self) -> GeoPoint {
        GeoPoint::new(self.north, self.east)
    }

    /// South-west corner.
    pub fn sw(&self) -> GeoPoint {
        GeoPoint::new(self.south, self.west)
    }

    #[inline]
    pub fn contains(&self, p: GeoPoint) -> bool {
        p.lat <= self.north && p.lat >= self.south && p.lon <= self.east && p.lon >= self.west
    }
}
