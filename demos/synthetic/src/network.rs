//! Synthetic road network of northern Ceará.
//!
//! A trunk highway from Sobral to Fortaleza with a tertiary coastal road
//! running parallel to it, linked every fifth node.  Good enough for the
//! strategy ladder and the weather bands; not a map.

use rr_core::GeoPoint;
use rr_pipeline::StaticGeocoder;
use rr_spatial::{RoadClass, RoadNetwork, RoadNetworkBuilder};

pub const SOBRAL:    GeoPoint = GeoPoint { lat: -3.6869, lon: -40.3497 };
pub const ITAPAJE:   GeoPoint = GeoPoint { lat: -3.6864, lon: -39.5858 };
pub const CAUCAIA:   GeoPoint = GeoPoint { lat: -3.7361, lon: -38.6531 };
pub const FORTALEZA: GeoPoint = GeoPoint { lat: -3.7319, lon: -38.5267 };

const HIGHWAY_SEGMENTS: usize = 30;
const COAST_OFFSET_DEG: f64   = 0.15;
const LINK_EVERY:       usize = 5;

fn lerp(a: GeoPoint, b: GeoPoint, t: f64) -> GeoPoint {
    GeoPoint::new(a.lat + (b.lat - a.lat) * t, a.lon + (b.lon - a.lon) * t)
}

pub fn build_network() -> RoadNetwork {
    let mut b = RoadNetworkBuilder::new();

    let highway: Vec<_> = (0..=HIGHWAY_SEGMENTS)
        .map(|i| b.add_node(lerp(SOBRAL, FORTALEZA, i as f64 / HIGHWAY_SEGMENTS as f64)))
        .collect();
    let coast: Vec<_> = (0..=HIGHWAY_SEGMENTS)
        .map(|i| {
            let p = lerp(SOBRAL, FORTALEZA, i as f64 / HIGHWAY_SEGMENTS as f64);
            b.add_node(GeoPoint::new(p.lat + COAST_OFFSET_DEG, p.lon))
        })
        .collect();

    for pair in highway.windows(2) {
        b.add_classified_road(pair[0], pair[1], RoadClass::Trunk);
    }
    for pair in coast.windows(2) {
        b.add_classified_road(pair[0], pair[1], RoadClass::Tertiary);
    }
    for i in (0..=HIGHWAY_SEGMENTS).step_by(LINK_EVERY) {
        b.add_classified_road(highway[i], coast[i], RoadClass::Residential);
    }

    b.build()
}

pub fn gazetteer() -> StaticGeocoder {
    StaticGeocoder::new()
        .with("Sobral, CE", SOBRAL)
        .with("Itapajé, CE", ITAPAJE)
        .with("Caucaia, CE", CAUCAIA)
        .with("Fortaleza, CE", FORTALEZA)
}
