//! Route weather segmentation.
//!
//! A route of `n` nodes is sampled at `leap, 2*leap, … < n` where
//! `leap = n / sample_count(n)`.  Each sampled node's position is sent to
//! the [`WeatherOracle`]; a sample reporting precipitation marks the window
//! from the previous sample index (0 for the first) up to, but excluding,
//! its own index as rainy.
//!
//! ```text
//! route:   0 ─────── 20 ─────── 40 ─────── 60 ─────── 80 ───── 99
//! samples:           ^          ^          ^          ^
//! rain at 40  →  window [20, 40)
//! ```
//!
//! The tail after the last sample is never marked.

use std::ops::Range;

use rayon::prelude::*;
use tracing::{debug, warn};

use rr_core::NodeId;
use rr_spatial::{RoadNetwork, Route};

use crate::WeatherOracle;

/// Extra samples for routes under this many nodes.
const SHORT_ROUTE_NODES: usize = 10;
const SHORT_ROUTE_EXTRA_SAMPLES: usize = 2;

// ── Sample cadence ────────────────────────────────────────────────────────────

/// Number of weather samples for a route of `n` nodes.
///
/// `round(sqrt(n) / log10(n))`, plus 2 when `n < 10`, clamped to `[1, n]`.
/// `n == 1` (where `log10` is zero) yields 1; `n == 0` yields 0.
pub fn sample_count(n: usize) -> usize {
    match n {
        0 => 0,
        1 => 1,
        _ => {
            let nf = n as f64;
            let mut samples = (nf.sqrt() / nf.log10()).round() as usize;
            if n < SHORT_ROUTE_NODES {
                samples += SHORT_ROUTE_EXTRA_SAMPLES;
            }
            samples.clamp(1, n)
        }
    }
}

/// Route-node indices to sample: multiples of `n / sample_count(n)` below `n`.
pub fn sample_indices(n: usize) -> Vec<usize> {
    let samples = sample_count(n);
    if samples == 0 {
        return Vec::new();
    }
    let leap = n / samples;
    (leap..n).step_by(leap).collect()
}

// ── RainySegments ─────────────────────────────────────────────────────────────

/// Rainy windows of one route, as half-open ranges of route-node indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RainySegments {
    /// Disjoint, ascending `[prev_sample, sample)` windows.
    pub windows: Vec<Range<usize>>,
    /// Number of weather queries issued.
    pub samples: usize,
    /// Queries that failed and were skipped.
    pub failed_samples: usize,
}

impl RainySegments {
    pub fn is_dry(&self) -> bool {
        self.windows.is_empty()
    }

    /// Every route-node index covered by a rainy window, ascending.
    pub fn node_indices(&self) -> Vec<usize> {
        self.windows.iter().flat_map(|w| w.clone()).collect()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.windows.iter().any(|w| w.contains(&index))
    }

    /// The graph nodes of `route` covered by a rainy window.
    pub fn rainy_nodes(&self, route: &Route) -> Vec<NodeId> {
        self.node_indices()
            .into_iter()
            .filter_map(|i| route.nodes.get(i).copied())
            .collect()
    }
}

// ── Segmentation ──────────────────────────────────────────────────────────────

enum Sample {
    Rainy,
    Dry,
    Failed,
}

/// Sample `route` and collect its rainy windows.
///
/// Samples are queried in parallel; a failed query is logged and counted but
/// never fails the whole route.
pub fn segment_route(route: &Route, network: &RoadNetwork, oracle: &dyn WeatherOracle) -> RainySegments {
    let indices = sample_indices(route.node_count());

    let outcomes: Vec<Sample> = indices
        .par_iter()
        .map(|&i| query_sample(route, network, oracle, i))
        .collect();

    let mut windows = Vec::new();
    let mut failed_samples = 0;
    let mut prev = 0;
    for (&index, outcome) in indices.iter().zip(outcomes) {
        match outcome {
            Sample::Rainy  => windows.push(prev..index),
            Sample::Dry    => {}
            Sample::Failed => failed_samples += 1,
        }
        prev = index;
    }

    debug!(
        nodes = route.node_count(),
        samples = indices.len(),
        rainy_windows = windows.len(),
        failed_samples,
        "segmented route"
    );
    RainySegments { windows, samples: indices.len(), failed_samples }
}

fn query_sample(route: &Route, network: &RoadNetwork, oracle: &dyn WeatherOracle, index: usize) -> Sample {
    let Some(point) = route.nodes.get(index).and_then(|&n| network.position(n)) else {
        warn!(index, "route node has no position, skipping weather sample");
        return Sample::Failed;
    };
    match oracle.conditions_at(point) {
        Ok(conditions) => {
            debug!(index, %point, ?conditions, "weather sample");
            if conditions.iter().any(|c| c.is_precipitation()) {
                Sample::Rainy
            } else {
                Sample::Dry
            }
        }
        Err(e) => {
            warn!(index, error = %e, "weather sample failed, skipping");
            Sample::Failed
        }
    }
}
