//! Graph builders: carve a routable sub-network for one request.
//!
//! The strategy ladder only talks to the [`GraphBuilder`] trait.  The
//! in-process [`RegionExtractor`] cuts sub-graphs out of a pre-loaded regional
//! network (synthetic, or loaded from OSM with the `osm` feature); a
//! deployment fetching graphs from a remote provider implements the same
//! trait.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use rr_core::{BoundingBox, GeoPoint, NodeId};

use crate::network::{RoadNetwork, RoadNetworkBuilder};
use crate::road::ClassFilter;
use crate::{SpatialError, SpatialResult};

/// Produces a road graph covering a region.
///
/// # Thread safety
///
/// Builders are shared by every worker in the task pool, so implementations
/// must be `Send + Sync`.
pub trait GraphBuilder: Send + Sync {
    /// Graph of all roads inside `bbox`, restricted to `filter` when given.
    fn build_bbox(&self, bbox: &BoundingBox, filter: Option<&ClassFilter>) -> SpatialResult<RoadNetwork>;

    /// Graph of all roads within `radius_m` metres of `center`.
    fn build_radius(&self, center: GeoPoint, radius_m: f64) -> SpatialResult<RoadNetwork>;
}

// ── RegionExtractor ───────────────────────────────────────────────────────────

/// [`GraphBuilder`] over an in-memory regional network.
///
/// An edge is kept when both of its endpoints fall inside the region and its
/// class passes the filter.  Node ids are renumbered densely in the result.
#[derive(Clone)]
pub struct RegionExtractor {
    source: Arc<RoadNetwork>,
}

impl RegionExtractor {
    pub fn new(source: Arc<RoadNetwork>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &RoadNetwork {
        &self.source
    }

    fn extract<F>(&self, inside: F, filter: ClassFilter, region: &str) -> SpatialResult<RoadNetwork>
    where
        F: Fn(GeoPoint) -> bool,
    {
        let src = &self.source;
        let mut remap: FxHashMap<NodeId, NodeId> = FxHashMap::default();
        let mut b = RoadNetworkBuilder::new();

        for e in 0..src.edge_count() {
            if !filter.contains(src.edge_class[e]) {
                continue;
            }
            let (from, to) = (src.edge_from[e], src.edge_to[e]);
            let (p_from, p_to) = (src.node_pos[from.index()], src.node_pos[to.index()]);
            if !(inside(p_from) && inside(p_to)) {
                continue;
            }
            let new_from = *remap.entry(from).or_insert_with(|| b.add_node(p_from));
            let new_to = *remap.entry(to).or_insert_with(|| b.add_node(p_to));
            b.add_directed_edge(new_from, new_to, src.edge_length_m[e], src.edge_travel_ms[e], src.edge_class[e]);
        }

        if b.edge_count() == 0 {
            return Err(SpatialError::GraphBuild(format!("no roads found in {region}")));
        }
        debug!(region, nodes = b.node_count(), edges = b.edge_count(), "extracted sub-graph");
        Ok(b.build())
    }
}

impl GraphBuilder for RegionExtractor {
    fn build_bbox(&self, bbox: &BoundingBox, filter: Option<&ClassFilter>) -> SpatialResult<RoadNetwork> {
        let filter = filter.copied().unwrap_or_else(ClassFilter::all);
        self.extract(|p| bbox.contains(p), filter, "bounding box")
    }

    fn build_radius(&self, center: GeoPoint, radius_m: f64) -> SpatialResult<RoadNetwork> {
        if !(radius_m.is_finite() && radius_m > 0.0) {
            return Err(SpatialError::GraphBuild(format!("invalid radius {radius_m} m")));
        }
        self.extract(|p| center.distance_m(p) <= radius_m, ClassFilter::all(), "radius")
    }
}
