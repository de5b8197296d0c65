//! The strategy ladder: graph-construction tiers from cheapest to most
//! permissive.
//!
//! | # | Tier            | Graph                                         | Multiplier |
//! |---|-----------------|-----------------------------------------------|------------|
//! | 1 | `primary_roads` | bbox, motorway/trunk/primary (+ links)        | 2          |
//! | 2 | `filtered_bbox` | bbox, down to tertiary + unclassified         | 2          |
//! | 3 | `full_bbox`     | bbox, every drivable road                     | 8          |
//! | 4 | `radius`        | circle at midpoint, radius = half distance    | 14         |
//!
//! Tier 1 is only eligible from `min_primary_distance_km` upwards; on short
//! trips the primary network rarely connects the endpoints.
//!
//! The ladder is a plain table.  It is built once from [`LadderConfig`] and
//! never changes afterwards.

use rr_core::{BoundingBox, GeoPoint, LadderConfig};
use rr_spatial::{ClassFilter, GraphBuilder, RoadNetwork, SpatialResult};

/// The endpoints of one request and their great-circle distance.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RouteRequest {
    pub origin:      GeoPoint,
    pub destination: GeoPoint,
    pub distance_km: f64,
}

impl RouteRequest {
    pub fn new(origin: GeoPoint, destination: GeoPoint) -> Self {
        Self { origin, destination, distance_km: origin.distance_km(destination) }
    }
}

// ── Tiers ─────────────────────────────────────────────────────────────────────

/// How a tier builds its graph.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TierKind {
    PrimaryRoads,
    FilteredBbox,
    FullBbox,
    Radius,
}

impl TierKind {
    pub fn name(self) -> &'static str {
        match self {
            TierKind::PrimaryRoads => "primary_roads",
            TierKind::FilteredBbox => "filtered_bbox",
            TierKind::FullBbox     => "full_bbox",
            TierKind::Radius       => "radius",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StrategyTier {
    pub kind:              TierKind,
    /// MB of headroom required per km of route.
    pub memory_multiplier: f64,
    /// Tier is skipped below this distance.
    pub min_distance_km:   Option<f64>,
}

impl StrategyTier {
    pub fn new(kind: TierKind, memory_multiplier: f64) -> Self {
        Self { kind, memory_multiplier, min_distance_km: None }
    }

    pub fn with_min_distance(mut self, km: f64) -> Self {
        self.min_distance_km = Some(km);
        self
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn eligible(&self, distance_km: f64) -> bool {
        self.min_distance_km.is_none_or(|min| distance_km >= min)
    }

    /// Build this tier's graph for `request`.
    pub fn build(
        &self,
        builder:    &dyn GraphBuilder,
        request:    &RouteRequest,
        buffer_deg: f64,
    ) -> SpatialResult<RoadNetwork> {
        let bbox = || BoundingBox::spanning(request.origin, request.destination, buffer_deg);
        match self.kind {
            TierKind::PrimaryRoads => builder.build_bbox(&bbox(), Some(&ClassFilter::primary_roads())),
            TierKind::FilteredBbox => builder.build_bbox(&bbox(), Some(&ClassFilter::main_roads())),
            TierKind::FullBbox     => builder.build_bbox(&bbox(), None),
            TierKind::Radius => {
                let center = request.origin.midpoint(request.destination);
                builder.build_radius(center, request.distance_km * 1_000.0 / 2.0)
            }
        }
    }
}

// ── Ladder ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct StrategyLadder {
    tiers:           Vec<StrategyTier>,
    bbox_buffer_deg: f64,
}

impl StrategyLadder {
    pub fn new(tiers: Vec<StrategyTier>, bbox_buffer_deg: f64) -> Self {
        Self { tiers, bbox_buffer_deg }
    }

    /// The four default tiers with multipliers and thresholds from `config`.
    pub fn from_config(config: &LadderConfig) -> Self {
        Self::new(
            vec![
                StrategyTier::new(TierKind::PrimaryRoads, config.primary_roads_multiplier)
                    .with_min_distance(config.min_primary_distance_km),
                StrategyTier::new(TierKind::FilteredBbox, config.filtered_bbox_multiplier),
                StrategyTier::new(TierKind::FullBbox, config.full_bbox_multiplier),
                StrategyTier::new(TierKind::Radius, config.radius_multiplier),
            ],
            config.bbox_buffer_deg,
        )
    }

    pub fn tiers(&self) -> &[StrategyTier] {
        &self.tiers
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn bbox_buffer_deg(&self) -> f64 {
        self.bbox_buffer_deg
    }
}

impl Default for StrategyLadder {
    fn default() -> Self {
        Self::from_config(&LadderConfig::default())
    }
}
