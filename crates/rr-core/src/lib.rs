//! `rr-core`: foundational types for the rainy-road workspace.
//!
//! This crate is a dependency of every other `rr-*` crate.  It intentionally
//! has no `rr-*` dependencies.
//!
//! # What lives here
//!
//! | Module        | Contents                                                 |
//! |---------------|----------------------------------------------------------|
//! | [`ids`]       | `NodeId`, `EdgeId`, `TaskId`                             |
//! | [`geo`]       | `GeoPoint`, `BoundingBox`, haversine distance            |
//! | [`location`]  | `LocationPair` (trimmed, HTML-escaped place names)       |
//! | [`config`]    | `RainyRoadConfig` and its sections                       |
//! | [`logging`]   | `init_tracing`                                           |
//! | [`error`]     | `CoreError`, `CoreResult`                                |

pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod location;
pub mod logging;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{LadderConfig, MemoryConfig, OutputConfig, RainyRoadConfig, TaskConfig};
pub use error::{CoreError, CoreResult};
pub use geo::{BoundingBox, GeoPoint};
pub use ids::{EdgeId, NodeId, TaskId};
pub use location::LocationPair;
pub use logging::init_tracing;
