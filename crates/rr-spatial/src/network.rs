//! Road network representation and builder.
//!
//! # Data layout
//!
//! The graph uses **Compressed Sparse Row (CSR)** format for outgoing edges.
//! Given a `NodeId n`, its outgoing edges occupy the slice:
//!
//! ```text
//! edge_to[ node_out_start[n] .. node_out_start[n+1] ]
//! ```
//!
//! All edge arrays are sorted by source node and indexed by `EdgeId`, so a
//! node's outgoing edges are a contiguous scan in Dijkstra's inner loop.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) maps `(lat, lon)` to the nearest `NodeId`.  Used
//! to snap geocoded endpoints onto the graph.

use rstar::{AABB, PointDistance, RTree, RTreeObject};

use rr_core::{EdgeId, GeoPoint, NodeId};

use crate::road::RoadClass;

// ── R-tree node entry ─────────────────────────────────────────────────────────

/// Entry stored in the R-tree spatial index: a 2-D `[lat, lon]` point with
/// the associated `NodeId`.
#[derive(Clone, Debug)]
struct NodeEntry {
    point: [f64; 2], // [lat, lon]
    id:    NodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    /// Squared Euclidean distance in lat/lon space.  Good enough for picking
    /// the nearest road node to a geocoded point.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.point[0] - point[0];
        let dlon = self.point[1] - point[1];
        dlat * dlat + dlon * dlon
    }
}

// ── RoadNetwork ───────────────────────────────────────────────────────────────

/// Directed road graph in CSR format plus a spatial index for node snapping.
///
/// Do not construct directly; use [`RoadNetworkBuilder`].
#[derive(Debug)]
pub struct RoadNetwork {
    /// Geographic position of each node.  Indexed by `NodeId`.
    pub node_pos: Vec<GeoPoint>,

    /// CSR row pointer.  Outgoing edges of node `n` are at EdgeIds
    /// `node_out_start[n] .. node_out_start[n+1]`.
    /// Length = `node_count + 1`.
    pub node_out_start: Vec<u32>,

    /// Source node of each edge (needed to walk `prev_edge` back to the source).
    pub edge_from: Vec<NodeId>,

    /// Destination node of each edge.
    pub edge_to: Vec<NodeId>,

    /// Length of each edge in metres.
    pub edge_length_m: Vec<f32>,

    /// Car travel time in milliseconds.  Used as Dijkstra edge cost.
    pub edge_travel_ms: Vec<u32>,

    /// Road class of each edge.
    pub edge_class: Vec<RoadClass>,

    spatial_idx: RTree<NodeEntry>,
}

impl RoadNetwork {
    /// Construct an empty network with no nodes or edges.
    pub fn empty() -> Self {
        RoadNetworkBuilder::new().build()
    }

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    /// Position of `node`, or `None` if the id is out of range.
    pub fn position(&self, node: NodeId) -> Option<GeoPoint> {
        self.node_pos.get(node.index()).copied()
    }

    /// Iterator over the `EdgeId`s of all outgoing edges from `node`.
    #[inline]
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        (start..end).map(|i| EdgeId(i as u32))
    }

    #[inline]
    pub fn out_degree(&self, node: NodeId) -> usize {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        end - start
    }

    /// Return the `NodeId` of the nearest road node to `pos`.
    ///
    /// Returns `None` only if the network has no nodes.
    pub fn snap_to_node(&self, pos: GeoPoint) -> Option<NodeId> {
        self.spatial_idx
            .nearest_neighbor(&[pos.lat, pos.lon])
            .map(|e| e.id)
    }

    /// Rough resident size of the graph in bytes.  Logged next to admission
    /// decisions so the multipliers can be tuned against real graphs.
    pub fn approx_bytes(&self) -> usize {
        use std::mem::size_of;
        self.node_count() * (size_of::<GeoPoint>() + size_of::<u32>() + size_of::<NodeEntry>())
            + self.edge_count()
                * (2 * size_of::<NodeId>() + size_of::<f32>() + size_of::<u32>() + size_of::<RoadClass>())
    }
}

// ── RoadNetworkBuilder ────────────────────────────────────────────────────────

/// Construct a [`RoadNetwork`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use rr_core::GeoPoint;
/// use rr_spatial::{RoadClass, RoadNetworkBuilder};
///
/// let mut b = RoadNetworkBuilder::new();
/// let a = b.add_node(GeoPoint::new(-3.69, -40.35));
/// let c = b.add_node(GeoPoint::new(-3.70, -40.30));
/// b.add_road(a, c, 5_600.0, 201_600, RoadClass::Primary);
/// let net = b.build();
/// assert_eq!(net.node_count(), 2);
/// assert_eq!(net.edge_count(), 2); // bidirectional
/// ```
pub struct RoadNetworkBuilder {
    nodes:     Vec<GeoPoint>,
    raw_edges: Vec<RawEdge>,
}

struct RawEdge {
    from:      NodeId,
    to:        NodeId,
    length_m:  f32,
    travel_ms: u32,
    class:     RoadClass,
}

impl RoadNetworkBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new(), raw_edges: Vec::new() }
    }

    /// Pre-allocate for the expected number of nodes and edges.
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            nodes:     Vec::with_capacity(nodes),
            raw_edges: Vec::with_capacity(edges),
        }
    }

    /// Add a road node and return its `NodeId` (sequential from 0).
    pub fn add_node(&mut self, pos: GeoPoint) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(pos);
        id
    }

    /// Add a **directed** edge from `from` to `to`.
    pub fn add_directed_edge(
        &mut self,
        from:      NodeId,
        to:        NodeId,
        length_m:  f32,
        travel_ms: u32,
        class:     RoadClass,
    ) {
        self.raw_edges.push(RawEdge { from, to, length_m, travel_ms, class });
    }

    /// Add edges in **both directions** for an undirected road segment.
    pub fn add_road(&mut self, a: NodeId, b: NodeId, length_m: f32, travel_ms: u32, class: RoadClass) {
        self.add_directed_edge(a, b, length_m, travel_ms, class);
        self.add_directed_edge(b, a, length_m, travel_ms, class);
    }

    /// Add a two-way road whose length comes from the node positions and
    /// whose travel time comes from the class speed table.
    pub fn add_classified_road(&mut self, a: NodeId, b: NodeId, class: RoadClass) {
        let length_m = self.node_pos(a).distance_m(self.node_pos(b));
        self.add_road(a, b, length_m as f32, class.travel_ms(length_m), class);
    }

    pub fn node_pos(&self, id: NodeId) -> GeoPoint {
        self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.raw_edges.len() }

    /// Consume the builder and produce a [`RoadNetwork`].
    ///
    /// O(E log E) for the edge sort plus O(N log N) for the R-tree bulk load.
    pub fn build(self) -> RoadNetwork {
        let node_count = self.nodes.len();
        let edge_count = self.raw_edges.len();

        let mut raw = self.raw_edges;
        raw.sort_unstable_by_key(|e| e.from.0);

        let edge_from:      Vec<NodeId>    = raw.iter().map(|e| e.from).collect();
        let edge_to:        Vec<NodeId>    = raw.iter().map(|e| e.to).collect();
        let edge_length_m:  Vec<f32>       = raw.iter().map(|e| e.length_m).collect();
        let edge_travel_ms: Vec<u32>       = raw.iter().map(|e| e.travel_ms).collect();
        let edge_class:     Vec<RoadClass> = raw.iter().map(|e| e.class).collect();

        let mut node_out_start = vec![0u32; node_count + 1];
        for e in &raw {
            node_out_start[e.from.index() + 1] += 1;
        }
        for i in 1..=node_count {
            node_out_start[i] += node_out_start[i - 1];
        }
        debug_assert_eq!(node_out_start[node_count] as usize, edge_count);

        let entries: Vec<NodeEntry> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, &pos)| NodeEntry {
                point: [pos.lat, pos.lon],
                id:    NodeId(i as u32),
            })
            .collect();
        let spatial_idx = RTree::bulk_load(entries);

        RoadNetwork {
            node_pos: self.nodes,
            node_out_start,
            edge_from,
            edge_to,
            edge_length_m,
            edge_travel_ms,
            edge_class,
            spatial_idx,
        }
    }
}

impl Default for RoadNetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}
