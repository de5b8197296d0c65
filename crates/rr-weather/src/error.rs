use thiserror::Error;

use rr_core::GeoPoint;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather query at {at} failed: {reason}")]
    QueryFailed { at: GeoPoint, reason: String },
}

pub type WeatherResult<T> = Result<T, WeatherError>;
