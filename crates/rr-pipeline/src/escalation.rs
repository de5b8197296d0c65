//! The escalation engine: walk the strategy ladder until a tier yields a
//! graph with a route.
//!
//! ```text
//! for tier in ladder:
//!   ① ineligible for this distance  → Skipped, next tier
//!   ② admit(distance, memory, mult) → false: fail now, ResourceExhausted
//!   ③ build graph, route on it      → error: remember it, next tier
//!   ④ success                       → done
//! ladder exhausted                  → NoRouteFound(last error)
//! ```
//!
//! Memory is sampled fresh at ② for every tier.  A tier whose admission
//! fails is never built, and no tier is visited twice.
//!
//! A rejection at ② ends the run; later tiers are not tried.

use serde::Serialize;
use tracing::{debug, info, warn};

use rr_spatial::{GraphBuilder, RoadNetwork, Route, Router, SpatialError};

use crate::admission::{MemorySignal, admit, required_mb};
use crate::ladder::{RouteRequest, StrategyLadder};
use crate::progress::{Progress, ProgressObserver, Stage};
use crate::{PipelineError, PipelineResult};

// ── Attempt trace ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Tier not eligible for this distance.
    Skipped { reason: String },
    /// Admission failed; terminates the escalation.
    Rejected { required_mb: f64, available_mb: f64 },
    /// Graph build or routing failed; escalation continues.
    Failed { error: String },
    Succeeded { nodes: usize, edges: usize },
}

/// What happened to one tier.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TierAttempt {
    pub tier:    &'static str,
    pub stage:   Stage,
    pub outcome: AttemptOutcome,
}

/// The graph and route of the first successful tier.
pub struct Escalation {
    pub tier:     &'static str,
    pub network:  RoadNetwork,
    pub route:    Route,
    pub attempts: Vec<TierAttempt>,
}

// ── Engine ────────────────────────────────────────────────────────────────────

pub struct EscalationEngine<'a> {
    ladder:  &'a StrategyLadder,
    graphs:  &'a dyn GraphBuilder,
    router:  &'a dyn Router,
    memory:  &'a dyn MemorySignal,
}

impl<'a> EscalationEngine<'a> {
    pub fn new(
        ladder: &'a StrategyLadder,
        graphs: &'a dyn GraphBuilder,
        router: &'a dyn Router,
        memory: &'a dyn MemorySignal,
    ) -> Self {
        Self { ladder, graphs, router, memory }
    }

    pub fn run(&self, request: &RouteRequest, observer: &mut dyn ProgressObserver) -> PipelineResult<Escalation> {
        let mut attempts: Vec<TierAttempt> = Vec::with_capacity(self.ladder.len());
        let mut last_error: Option<SpatialError> = None;

        for (i, tier) in self.ladder.tiers().iter().enumerate() {
            let stage = Stage::graph_tier(i + 1);
            let name = tier.name();

            // ① eligibility
            if !tier.eligible(request.distance_km) {
                debug!(tier = name, distance_km = request.distance_km, "tier not eligible, skipping");
                let reason = format!(
                    "{:.1} km is below the {:.1} km minimum",
                    request.distance_km,
                    tier.min_distance_km.unwrap_or_default()
                );
                record(&mut attempts, observer, TierAttempt { tier: name, stage, outcome: AttemptOutcome::Skipped { reason } });
                continue;
            }

            // ② admission
            let available_mb = self.memory.available_memory_mb();
            let needed_mb = required_mb(request.distance_km, tier.memory_multiplier);
            if !admit(request.distance_km, available_mb, tier.memory_multiplier) {
                warn!(tier = name, required_mb = needed_mb, available_mb, "admission rejected");
                record(
                    &mut attempts,
                    observer,
                    TierAttempt {
                        tier: name,
                        stage,
                        outcome: AttemptOutcome::Rejected { required_mb: needed_mb, available_mb },
                    },
                );
                return Err(PipelineError::ResourceExhausted { tier: name, required_mb: needed_mb, available_mb });
            }

            // ③ build + route
            observer.publish(&Progress::new(stage, format!("Building {name} road graph")));
            let result = tier
                .build(self.graphs, request, self.ladder.bbox_buffer_deg())
                .and_then(|network| {
                    let route = self.router.shortest_path(&network, request.origin, request.destination)?;
                    Ok((network, route))
                });

            match result {
                Ok((network, route)) => {
                    info!(
                        tier = name,
                        nodes = network.node_count(),
                        edges = network.edge_count(),
                        graph_bytes = network.approx_bytes(),
                        available_mb,
                        route_nodes = route.node_count(),
                        "strategy tier succeeded"
                    );
                    let outcome = AttemptOutcome::Succeeded { nodes: network.node_count(), edges: network.edge_count() };
                    record(&mut attempts, observer, TierAttempt { tier: name, stage, outcome });
                    return Ok(Escalation { tier: name, network, route, attempts });
                }
                Err(e) => {
                    info!(tier = name, error = %e, "strategy tier failed, escalating");
                    let outcome = AttemptOutcome::Failed { error: e.to_string() };
                    record(&mut attempts, observer, TierAttempt { tier: name, stage, outcome });
                    last_error = Some(e);
                }
            }
        }

        let last = last_error
            .unwrap_or_else(|| SpatialError::GraphBuild("no strategy tier was eligible".into()));
        Err(PipelineError::NoRouteFound { last })
    }
}

fn record(attempts: &mut Vec<TierAttempt>, observer: &mut dyn ProgressObserver, attempt: TierAttempt) {
    observer.on_tier_attempt(&attempt);
    attempts.push(attempt);
}
