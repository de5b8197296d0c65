//! The `MapRenderer` trait implemented by every output format.

use rr_spatial::{RoadNetwork, Route};
use rr_weather::RainySegments;

use crate::OutputResult;

/// A rendered map held in memory until an [`ArtifactStore`](crate::ArtifactStore)
/// persists it.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMap {
    pub bytes: Vec<u8>,
    /// File extension without the leading dot, e.g. `"geojson"`.
    pub extension: &'static str,
}

impl RenderedMap {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Pluggable map output.
///
/// Rendering must not touch the filesystem; persisting is the store's job.
/// One renderer is shared by every task worker, hence `Send + Sync`.
pub trait MapRenderer: Send + Sync {
    fn render(&self, network: &RoadNetwork, route: &Route, rainy: &RainySegments) -> OutputResult<RenderedMap>;
}
