//! GeoJSON map output.
//!
//! The map is a `FeatureCollection` with up to two features:
//!
//! - `route`: a `LineString` through every route node;
//! - `rain` : a `MultiLineString`, one line per rainy window, present only
//!   when at least one window is rainy.
//!
//! Styling uses the simplestyle property names (`stroke`,
//! `stroke-opacity`) understood by most GeoJSON viewers.  Coordinates are
//! `[lon, lat]` as GeoJSON requires.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use rr_spatial::{RoadNetwork, Route};
use rr_weather::RainySegments;

use crate::{MapRenderer, OutputResult, RenderedMap};

/// Stroke colour and opacity of one overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayStyle {
    pub color:   String,
    pub opacity: f64,
}

impl OverlayStyle {
    pub fn new(color: impl Into<String>, opacity: f64) -> Self {
        Self { color: color.into(), opacity }
    }
}

/// Renders the route and its rainy windows as GeoJSON.
#[derive(Debug, Clone)]
pub struct GeoJsonRenderer {
    pub route: OverlayStyle,
    pub rain:  OverlayStyle,
}

impl Default for GeoJsonRenderer {
    fn default() -> Self {
        Self {
            route: OverlayStyle::new("#00c600", 0.5),
            rain:  OverlayStyle::new("#cc0000", 1.0),
        }
    }
}

impl GeoJsonRenderer {
    /// Build the `FeatureCollection` without serializing it.
    pub fn feature_collection(&self, network: &RoadNetwork, route: &Route, rainy: &RainySegments) -> Value {
        let mut features = vec![json!({
            "type": "Feature",
            "properties": {
                "kind": "route",
                "nodes": route.node_count(),
                "travel_secs": route.total_travel_secs,
                "stroke": self.route.color,
                "stroke-opacity": self.route.opacity,
            },
            "geometry": {
                "type": "LineString",
                "coordinates": coordinates(network, route, 0..route.node_count()),
            },
        })];

        // A window [a, b) is drawn up to its sample node b so that the edge
        // into the sample is highlighted too.
        let last = route.node_count();
        let lines: Vec<Vec<[f64; 2]>> = rainy
            .windows
            .iter()
            .map(|w| coordinates(network, route, w.start..(w.end + 1).min(last)))
            .filter(|line| line.len() >= 2)
            .collect();

        if !lines.is_empty() {
            features.push(json!({
                "type": "Feature",
                "properties": {
                    "kind": "rain",
                    "windows": lines.len(),
                    "stroke": self.rain.color,
                    "stroke-opacity": self.rain.opacity,
                },
                "geometry": {
                    "type": "MultiLineString",
                    "coordinates": lines,
                },
            }));
        }

        json!({ "type": "FeatureCollection", "features": features })
    }
}

impl MapRenderer for GeoJsonRenderer {
    fn render(&self, network: &RoadNetwork, route: &Route, rainy: &RainySegments) -> OutputResult<RenderedMap> {
        let bytes = serde_json::to_vec(&self.feature_collection(network, route, rainy))?;
        Ok(RenderedMap { bytes, extension: "geojson" })
    }
}

/// Positions of `route.nodes[range]`.  A range outside the route yields
/// nothing.
fn coordinates(network: &RoadNetwork, route: &Route, range: std::ops::Range<usize>) -> Vec<[f64; 2]> {
    route
        .nodes
        .get(range)
        .unwrap_or_default()
        .iter()
        .filter_map(|&n| network.position(n))
        .map(|p| [p.lon, p.lat])
        .collect()
}
