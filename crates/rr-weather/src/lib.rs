//! `rr-weather`: weather lookups along a computed route.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                  |
//! |---------------|-----------------------------------------------------------|
//! | [`condition`] | `Condition`, the coarse weather label reported per point  |
//! | [`oracle`]    | `WeatherOracle` trait, `ClearSkies` placeholder           |
//! | [`segment`]   | sample cadence and `segment_route` → `RainySegments`      |
//! | [`error`]     | `WeatherError`, `WeatherResult<T>`                        |
//!
//! A failed weather query never fails the route: the sample is skipped,
//! logged, and counted in [`RainySegments::failed_samples`].

pub mod condition;
pub mod error;
pub mod oracle;
pub mod segment;


pub use condition::Condition;
pub use error::{WeatherError, WeatherResult};
pub use oracle::{ClearSkies, WeatherOracle};
pub use segment::{RainySegments, sample_count, sample_indices, segment_route};
