//! OSM PBF loader, enabled with the `osm` Cargo feature.
//!
//! # Usage
//!
//! ```ignore
//! use std::path::Path;
//! use std::sync::Arc;
//! use rr_spatial::{osm::load_from_pbf, RegionExtractor};
//!
//! let region = load_from_pbf(Path::new("ceara.osm.pbf"))?;
//! let builder = RegionExtractor::new(Arc::new(region));
//! ```
//!
//! Only car-drivable `highway=*` ways are kept, each edge tagged with its
//! [`RoadClass`].  One-way roads add a single directed edge.
//!
//! # Memory note
//!
//! The first pass buffers every OSM node in a `HashMap<i64, GeoPoint>`
//! because ways reference nodes by OSM id.  The map is dropped before the
//! R-tree is built.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use osmpbf::{Element, ElementReader};
use tracing::info;

use rr_core::{GeoPoint, NodeId};

use crate::network::{RoadNetwork, RoadNetworkBuilder};
use crate::road::RoadClass;
use crate::SpatialError;

/// Load a drivable road network from an OSM PBF file.
///
/// # Errors
///
/// [`SpatialError::Osm`] on parse errors, [`SpatialError::Io`] on file errors.
pub fn load_from_pbf(path: &Path) -> Result<RoadNetwork, SpatialError> {
    // ── Phase 1: collect all OSM nodes + road ways in one sequential pass ──
    let reader = ElementReader::from_path(path)?;

    let mut all_nodes: HashMap<i64, GeoPoint> = HashMap::new();
    let mut road_ways: Vec<OsmWay> = Vec::new();

    reader
        .for_each(|elem| match elem {
            Element::Node(n) => {
                all_nodes.insert(n.id(), GeoPoint::new(n.lat(), n.lon()));
            }
            Element::DenseNode(n) => {
                all_nodes.insert(n.id(), GeoPoint::new(n.lat(), n.lon()));
            }
            Element::Way(w) => {
                let tags: Vec<(&str, &str)> = w.tags().collect();
                let highway = tags
                    .iter()
                    .find(|(k, _)| *k == "highway")
                    .map(|(_, v)| *v);

                if let Some(class) = highway.and_then(RoadClass::from_osm) {
                    let oneway = is_oneway(class, &tags);
                    let refs: Vec<i64> = w.refs().collect();
                    road_ways.push(OsmWay { refs, class, oneway });
                }
            }
            _ => {}
        })
        .map_err(|e| SpatialError::Osm(e.to_string()))?;

    // ── Phase 2: identify road-referenced node IDs ────────────────────────
    let road_node_ids: HashSet<i64> = road_ways
        .iter()
        .flat_map(|w| w.refs.iter().copied())
        .collect();

    // ── Phase 3: build network ────────────────────────────────────────────
    let mut builder = RoadNetworkBuilder::with_capacity(road_node_ids.len(), road_node_ids.len() * 2);

    let mut osm_to_rr: HashMap<i64, NodeId> = HashMap::with_capacity(road_node_ids.len());
    for osm_id in &road_node_ids {
        if let Some(&pos) = all_nodes.get(osm_id) {
            osm_to_rr.insert(*osm_id, builder.add_node(pos));
        }
    }

    drop(all_nodes);
    drop(road_node_ids);

    for way in &road_ways {
        for window in way.refs.windows(2) {
            if let (Some(&from), Some(&to)) = (osm_to_rr.get(&window[0]), osm_to_rr.get(&window[1])) {
                let len_m = builder.node_pos(from).distance_m(builder.node_pos(to));
                let travel_ms = way.class.travel_ms(len_m);

                builder.add_directed_edge(from, to, len_m as f32, travel_ms, way.class);
                if !way.oneway {
                    builder.add_directed_edge(to, from, len_m as f32, travel_ms, way.class);
                }
            }
        }
    }

    let network = builder.build();
    info!(
        path = %path.display(),
        nodes = network.node_count(),
        edges = network.edge_count(),
        "loaded OSM road network"
    );
    Ok(network)
}

struct OsmWay {
    refs:   Vec<i64>,
    class:  RoadClass,
    oneway: bool,
}

/// Motorways and their links are implicitly one-way in OSM convention.
fn is_oneway(class: RoadClass, tags: &[(&str, &str)]) -> bool {
    let explicit = tags
        .iter()
        .any(|(k, v)| *k == "oneway" && matches!(*v, "yes" | "1" | "true"));
    let implicit = matches!(class, RoadClass::Motorway | RoadClass::MotorwayLink);
    explicit || implicit
}
