//! `rr-output`: map rendering and artifact storage.
//!
//! Producing an artifact is two steps, so a worker can report the `map` and
//! `saving` stages separately:
//!
//! 1. a [`MapRenderer`] turns a graph, route and rainy windows into an
//!    in-memory [`RenderedMap`];
//! 2. an [`ArtifactStore`] persists it and returns an [`ArtifactRef`].
//!
//! | Renderer            | Format     | Contents                                         |
//! |---------------------|------------|--------------------------------------------------|
//! | [`GeoJsonRenderer`] | `.geojson` | route line (green) plus rainy overlay (red)      |
//! | [`CsvRouteRenderer`]| `.csv`     | one row per route node with a `rainy` flag       |
//!
//! # Usage
//!
//! ```rust,ignore
//! use rr_output::{ArtifactStore, DirectoryStore, GeoJsonRenderer, MapRenderer};
//!
//! let map = GeoJsonRenderer::default().render(&network, &route, &rainy)?;
//! let artifact = DirectoryStore::new("output/maps").save("sobral-fortaleza", &map)?;
//! println!("saved {artifact}");
//! ```

pub mod csv_table;
pub mod error;
pub mod geojson;
pub mod render;
pub mod store;


pub use csv_table::CsvRouteRenderer;
pub use error::{OutputError, OutputResult};
pub use geojson::{GeoJsonRenderer, OverlayStyle};
pub use render::{MapRenderer, RenderedMap};
pub use store::{ArtifactRef, ArtifactStore, DirectoryStore};
