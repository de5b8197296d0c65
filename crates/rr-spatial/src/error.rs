//! Spatial-subsystem error type.

use thiserror::Error;

use rr_core::NodeId;

/// Errors produced by `rr-spatial`.
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("no route from {from} to {to}")]
    NoRoute { from: NodeId, to: NodeId },

    #[error("node {0} not found in network")]
    NodeNotFound(NodeId),

    /// Routing was asked to snap a coordinate onto a graph with no nodes.
    #[error("network has no nodes to snap to")]
    EmptyNetwork,

    /// A graph builder could not produce a routable graph.
    #[error("graph build failed: {0}")]
    GraphBuild(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "osm")]
    #[error("OSM parse error: {0}")]
    Osm(String),
}

pub type SpatialResult<T> = Result<T, SpatialError>;
