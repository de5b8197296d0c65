//! The `WeatherOracle` trait: the seam to a real weather provider.

use rr_core::GeoPoint;

use crate::{Condition, WeatherResult};

/// Reports current weather conditions at a coordinate.
///
/// One call is a blocking, atomic lookup.  A provider may report several
/// conditions for one point (e.g. "Rain" and "Mist"); the route is rainy
/// there if any of them is precipitation.
///
/// # Thread safety
///
/// Samples along one route may be queried in parallel, and one oracle is
/// shared by every task worker, so implementations must be `Send + Sync`.
pub trait WeatherOracle: Send + Sync {
    fn conditions_at(&self, point: GeoPoint) -> WeatherResult<Vec<Condition>>;
}

/// An oracle that always reports clear skies.
///
/// Useful as a placeholder when no provider is configured.
pub struct ClearSkies;

impl WeatherOracle for ClearSkies {
    fn conditions_at(&self, _point: GeoPoint) -> WeatherResult<Vec<Condition>> {
        Ok(vec![Condition::Clear])
    }
}
