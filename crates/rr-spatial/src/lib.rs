//! `rr-spatial`: road network, region extraction, and routing.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                    |
//! |-------------|-------------------------------------------------------------|
//! | [`road`]    | `RoadClass`, `ClassFilter`, speed table                     |
//! | [`network`] | `RoadNetwork` (CSR + R-tree), `RoadNetworkBuilder`          |
//! | [`extract`] | `GraphBuilder` trait, `RegionExtractor`                     |
//! | [`router`]  | `Router` trait, `Route`, `DijkstraRouter`                   |
//! | [`osm`]     | `load_from_pbf` (feature = `"osm"` only)                    |
//! | [`error`]   | `SpatialError`, `SpatialResult<T>`                          |
//!
//! # Feature flags
//!
//! | Flag  | Effect                                                         |
//! |-------|----------------------------------------------------------------|
//! | `osm` | Enables OSM PBF loading via the `osmpbf` crate.                |

pub mod error;
pub mod extract;
pub mod network;
pub mod road;
pub mod router;

#[cfg(feature = "osm")]
pub mod osm;


pub use error::{SpatialError, SpatialResult};
pub use extract::{GraphBuilder, RegionExtractor};
pub use network::{RoadNetwork, RoadNetworkBuilder};
pub use road::{ClassFilter, RoadClass};
pub use router::{DijkstraRouter, Route, Router};
