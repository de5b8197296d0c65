//! CSV route table.
//!
//! One row per route node:
//!
//! ```text
//! index,node,lat,lon,rainy
//! 0,17,-3.686900,-40.349700,0
//! ```

use csv::Writer;

use rr_spatial::{RoadNetwork, Route};
use rr_weather::RainySegments;

use crate::{MapRenderer, OutputError, OutputResult, RenderedMap};

/// Renders the route as a CSV table with a per-node rainy flag.
pub struct CsvRouteRenderer;

impl MapRenderer for CsvRouteRenderer {
    fn render(&self, network: &RoadNetwork, route: &Route, rainy: &RainySegments) -> OutputResult<RenderedMap> {
        let mut w = Writer::from_writer(Vec::new());
        w.write_record(["index", "node", "lat", "lon", "rainy"])?;

        for (i, &node) in route.nodes.iter().enumerate() {
            let Some(p) = network.position(node) else { continue };
            w.write_record(&[
                i.to_string(),
                node.0.to_string(),
                format!("{:.6}", p.lat),
                format!("{:.6}", p.lon),
                (rainy.contains(i) as u8).to_string(),
            ])?;
        }

        let bytes = w.into_inner().map_err(|e| OutputError::Io(e.into_error()))?;
        Ok(RenderedMap { bytes, extension: "csv" })
    }
}
