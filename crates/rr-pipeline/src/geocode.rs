//! Place-name lookup.

use std::collections::HashMap;

use thiserror::Error;

use rr_core::GeoPoint;
use rr_core::location::normalize;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("no match for {0:?}")]
    NotFound(String),

    #[error("geocoder failed for {query:?}: {reason}")]
    Failed { query: String, reason: String },
}

/// Resolves a normalized place name to a coordinate.
///
/// Implementations must be `Send + Sync`; one geocoder serves every task
/// worker.
pub trait Geocoder: Send + Sync {
    fn geocode(&self, name: &str) -> Result<GeoPoint, GeocodeError>;
}

/// An in-memory gazetteer.
///
/// Gazetteer entries get the same normalization as requests (trim plus
/// HTML escape), so an already-normalized request name matches its raw
/// entry.  Matching ignores ASCII case.
///
/// ```
/// use rr_core::GeoPoint;
/// use rr_pipeline::{Geocoder, StaticGeocoder};
///
/// let geocoder = StaticGeocoder::new()
///     .with("Sobral, CE", GeoPoint::new(-3.6869, -40.3497))
///     .with("Fortaleza, CE", GeoPoint::new(-3.7319, -38.5267));
/// assert!(geocoder.geocode("  sobral, ce ").is_ok());
/// assert!(geocoder.geocode("Recife").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    places: HashMap<String, GeoPoint>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, point: GeoPoint) -> Self {
        self.insert(name, point);
        self
    }

    pub fn insert(&mut self, name: &str, point: GeoPoint) {
        self.places.insert(normalize(name).to_ascii_lowercase(), point);
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

impl Geocoder for StaticGeocoder {
    fn geocode(&self, name: &str) -> Result<GeoPoint, GeocodeError> {
        self.places
            .get(&name.trim().to_ascii_lowercase())
            .copied()
            .ok_or_else(|| GeocodeError::NotFound(name.to_string()))
    }
}
