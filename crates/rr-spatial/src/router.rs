//! Routing trait and default Dijkstra implementation.
//!
//! The pipeline calls routing via the [`Router`] trait, so a deployment can
//! swap in contraction hierarchies or a remote engine without touching the
//! escalation logic.  Costs are car travel time in milliseconds.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rr_core::{EdgeId, GeoPoint, NodeId};

use crate::network::RoadNetwork;
use crate::{SpatialError, SpatialResult};

// ── Route ─────────────────────────────────────────────────────────────────────

/// The result of a routing query.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Nodes visited in order, source first, destination last.
    pub nodes: Vec<NodeId>,
    /// Edges traversed in order; always `nodes.len() - 1` long.
    pub edges: Vec<EdgeId>,
    /// Cumulative car travel time in seconds.
    pub total_travel_secs: f32,
}

impl Route {
    /// `true` if the source and destination are the same node.
    pub fn is_trivial(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total length in metres.
    pub fn length_m(&self, network: &RoadNetwork) -> f32 {
        self.edges.iter().map(|e| network.edge_length_m[e.index()]).sum()
    }
}

// ── Router trait ──────────────────────────────────────────────────────────────

/// Pluggable routing engine.
///
/// Implementations must be `Send + Sync` so one router can serve every task
/// worker.
pub trait Router: Send + Sync {
    /// Compute a route between two nodes of `network`.
    ///
    /// `from == to` is an empty (trivial) route, not an error.
    fn route(&self, network: &RoadNetwork, from: NodeId, to: NodeId) -> SpatialResult<Route>;

    /// Snap both coordinates to their nearest graph nodes and route between
    /// them.
    fn shortest_path(
        &self,
        network:     &RoadNetwork,
        origin:      GeoPoint,
        destination: GeoPoint,
    ) -> SpatialResult<Route> {
        let from = network.snap_to_node(origin).ok_or(SpatialError::EmptyNetwork)?;
        let to = network.snap_to_node(destination).ok_or(SpatialError::EmptyNetwork)?;
        self.route(network, from, to)
    }
}

// ── DijkstraRouter ────────────────────────────────────────────────────────────

/// Standard Dijkstra over the CSR road graph using `edge_travel_ms` as cost.
pub struct DijkstraRouter;

impl Router for DijkstraRouter {
    fn route(&self, network: &RoadNetwork, from: NodeId, to: NodeId) -> SpatialResult<Route> {
        dijkstra(network, from, to)
    }
}

fn dijkstra(network: &RoadNetwork, from: NodeId, to: NodeId) -> SpatialResult<Route> {
    let n = network.node_count();
    for node in [from, to] {
        if node.index() >= n {
            return Err(SpatialError::NodeNotFound(node));
        }
    }
    if from == to {
        return Ok(Route { nodes: vec![from], edges: vec![], total_travel_secs: 0.0 });
    }
    // Origin snapped onto a sink (end of a one-way spur).
    if network.out_degree(from) == 0 {
        return Err(SpatialError::NoRoute { from, to });
    }

    let mut dist      = vec![u32::MAX; n];
    let mut prev_edge = vec![EdgeId::INVALID; n];

    dist[from.index()] = 0;

    // Min-heap via Reverse; NodeId as secondary key for deterministic ties.
    let mut heap: BinaryHeap<Reverse<(u32, NodeId)>> = BinaryHeap::new();
    heap.push(Reverse((0, from)));

    while let Some(Reverse((cost, node))) = heap.pop() {
        if node == to {
            return Ok(reconstruct(network, &prev_edge, from, to, cost));
        }

        // Stale heap entry.
        if cost > dist[node.index()] {
            continue;
        }

        for edge in network.out_edges(node) {
            let neighbor = network.edge_to[edge.index()];
            let new_cost = cost.saturating_add(network.edge_travel_ms[edge.index()]);

            if new_cost < dist[neighbor.index()] {
                dist[neighbor.index()] = new_cost;
                prev_edge[neighbor.index()] = edge;
                heap.push(Reverse((new_cost, neighbor)));
            }
        }
    }

    Err(SpatialError::NoRoute { from, to })
}

fn reconstruct(
    network:   &RoadNetwork,
    prev_edge: &[EdgeId],
    from:      NodeId,
    to:        NodeId,
    total_ms:  u32,
) -> Route {
    let mut edges = Vec::new();
    let mut cur = to;
    while cur != from {
        let e = prev_edge[cur.index()];
        if e == EdgeId::INVALID {
            break;
        }
        edges.push(e);
        cur = network.edge_from[e.index()];
    }
    edges.reverse();

    let mut nodes = Vec::with_capacity(edges.len() + 1);
    nodes.push(from);
    nodes.extend(edges.iter().map(|e| network.edge_to[e.index()]));

    Route {
        nodes,
        edges,
        total_travel_secs: total_ms as f32 / 1000.0,
    }
}
