//! The `Pipeline` struct: one request from place names to a saved map.

use tracing::{info, info_span, warn};

use rr_core::{GeoPoint, LocationPair};
use rr_output::{ArtifactRef, ArtifactStore, MapRenderer};
use rr_spatial::{GraphBuilder, Router};
use rr_weather::{WeatherOracle, segment_route};

use crate::admission::MemorySignal;
use crate::escalation::{EscalationEngine, TierAttempt};
use crate::geocode::Geocoder;
use crate::ladder::{RouteRequest, StrategyLadder};
use crate::progress::{Progress, ProgressGate, ProgressObserver, Stage};
use crate::PipelineResult;

/// Summary of a successful run.
#[derive(Debug, Clone)]
pub struct GeneratedMap {
    pub artifact:      ArtifactRef,
    /// Name of the strategy tier that produced the graph.
    pub tier:          &'static str,
    pub distance_km:   f64,
    pub route_nodes:   usize,
    pub rainy_nodes:   usize,
    pub attempts:      Vec<TierAttempt>,
}

/// The generation pipeline.
///
/// Stages, in order:
///
/// ```text
/// coordinates   geocode both place names
/// memory_check  distance estimate and memory reading
/// graph_tierN   escalation over the strategy ladder
/// route         route found on the winning graph
/// map           weather sampling and rendering
/// saving        artifact persisted
/// complete
/// ```
///
/// Any terminal error publishes `failed` with the error message as detail.
/// The pipeline holds no per-request state, so one instance serves every
/// worker of a task pool.
///
/// Create via [`PipelineBuilder`][crate::PipelineBuilder].
pub struct Pipeline {
    pub(crate) geocoder: Box<dyn Geocoder>,
    pub(crate) graphs:   Box<dyn GraphBuilder>,
    pub(crate) router:   Box<dyn Router>,
    pub(crate) weather:  Box<dyn WeatherOracle>,
    pub(crate) renderer: Box<dyn MapRenderer>,
    pub(crate) store:    Box<dyn ArtifactStore>,
    pub(crate) memory:   Box<dyn MemorySignal>,
    pub(crate) ladder:   StrategyLadder,
}

impl Pipeline {
    pub fn ladder(&self) -> &StrategyLadder {
        &self.ladder
    }

    /// Run the pipeline, naming the artifact after the location pair.
    pub fn run(&self, pair: &LocationPair, observer: &mut dyn ProgressObserver) -> PipelineResult<GeneratedMap> {
        self.run_as(&artifact_stem(pair), pair, observer)
    }

    /// Run the pipeline and save the artifact under `stem`.
    pub fn run_as(
        &self,
        stem:     &str,
        pair:     &LocationPair,
        observer: &mut dyn ProgressObserver,
    ) -> PipelineResult<GeneratedMap> {
        let span = info_span!("pipeline", start = pair.start(), end = pair.end(), stem);
        let _guard = span.enter();

        let mut gate = ProgressGate::new(observer);
        match self.stages(stem, pair, &mut gate) {
            Ok(map) => {
                gate.publish(&Progress::new(Stage::Complete, format!("Map saved to {}", map.artifact)));
                info!(artifact = %map.artifact, tier = map.tier, "map generated");
                Ok(map)
            }
            Err(e) => {
                gate.publish(&Progress::new(Stage::Failed, e.to_string()));
                warn!(category = %e.category(), error = %e, "map generation failed");
                Err(e)
            }
        }
    }

    fn stages(&self, stem: &str, pair: &LocationPair, progress: &mut dyn ProgressObserver) -> PipelineResult<GeneratedMap> {
        // ── Coordinates ───────────────────────────────────────────────────
        progress.publish(&Progress::new(Stage::Coordinates, format!("Looking up {pair}")));
        let origin = self.locate(pair.start())?;
        let destination = self.locate(pair.end())?;

        // ── Memory check ──────────────────────────────────────────────────
        let request = RouteRequest::new(origin, destination);
        let available_mb = self.memory.available_memory_mb();
        progress.publish(&Progress::new(
            Stage::MemoryCheck,
            format!("{:.1} km between endpoints, {available_mb:.0} MB available", request.distance_km),
        ));

        // ── Graph tiers + route ───────────────────────────────────────────
        let engine = EscalationEngine::new(
            &self.ladder,
            self.graphs.as_ref(),
            self.router.as_ref(),
            self.memory.as_ref(),
        );
        let escalation = engine.run(&request, progress)?;
        let route = &escalation.route;
        progress.publish(&Progress::new(
            Stage::Route,
            format!(
                "Route of {} nodes ({:.1} km) on the {} graph",
                route.node_count(),
                route.length_m(&escalation.network) / 1_000.0,
                escalation.tier
            ),
        ));

        // ── Map ───────────────────────────────────────────────────────────
        progress.publish(&Progress::new(Stage::Map, "Checking the weather along the route"));
        let rainy = segment_route(route, &escalation.network, self.weather.as_ref());
        if rainy.failed_samples > 0 {
            warn!(failed = rainy.failed_samples, of = rainy.samples, "some weather samples failed");
        }
        let map = self.renderer.render(&escalation.network, route, &rainy)?;

        // ── Saving ────────────────────────────────────────────────────────
        progress.publish(&Progress::new(Stage::Saving, format!("Saving {} bytes", map.len())));
        let artifact = self.store.save(stem, &map)?;

        Ok(GeneratedMap {
            artifact,
            tier:        escalation.tier,
            distance_km: request.distance_km,
            route_nodes: route.node_count(),
            rainy_nodes: rainy.node_indices().len(),
            attempts:    escalation.attempts,
        })
    }

    fn locate(&self, name: &str) -> PipelineResult<GeoPoint> {
        let point = self.geocoder.geocode(name)?;
        info!(name, %point, "geocoded");
        Ok(point)
    }
}

/// File-name-safe stem for a location pair, e.g. `sobral-ce_to_fortaleza-ce`.
pub fn artifact_stem(pair: &LocationPair) -> String {
    fn slug(s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        for c in s.chars() {
            if c.is_alphanumeric() {
                out.extend(c.to_lowercase());
            } else if !out.ends_with('-') {
                out.push('-');
            }
        }
        out.trim_matches('-').to_string()
    }
    let stem = format!("{}_to_{}", slug(pair.start()), slug(pair.end()));
    if stem == "_to_" { "map".to_string() } else { stem }
}
