//! Stage-level progress reporting.
//!
//! Every stage maps to a fixed percentage:
//!
//! | Stage          | %   |
//! |----------------|-----|
//! | `queued`       | 0   |
//! | `coordinates`  | 5   |
//! | `memory_check` | 10  |
//! | `graph_tier1`  | 25  |
//! | `graph_tier2`  | 40  |
//! | `graph_tier3`  | 55  |
//! | `graph_tier4`  | 65  |
//! | `route`        | 75  |
//! | `map`          | 85  |
//! | `saving`       | 97  |
//! | `complete`     | 100 |
//! | `failed`       | 100 |
//!
//! Observers only ever see forward movement: [`Pipeline::run`] passes
//! everything through a [`ProgressGate`] that drops publications which
//! would move backwards.
//!
//! [`Pipeline::run`]: crate::Pipeline::run

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::escalation::TierAttempt;

// ── Stage ─────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Queued,
    Coordinates,
    MemoryCheck,
    GraphTier1,
    GraphTier2,
    GraphTier3,
    GraphTier4,
    Route,
    Map,
    Saving,
    Complete,
    Failed,
}

impl Stage {
    pub const ALL: [Stage; 12] = [
        Stage::Queued,
        Stage::Coordinates,
        Stage::MemoryCheck,
        Stage::GraphTier1,
        Stage::GraphTier2,
        Stage::GraphTier3,
        Stage::GraphTier4,
        Stage::Route,
        Stage::Map,
        Stage::Saving,
        Stage::Complete,
        Stage::Failed,
    ];

    pub fn percent(self) -> u8 {
        match self {
            Stage::Queued      => 0,
            Stage::Coordinates => 5,
            Stage::MemoryCheck => 10,
            Stage::GraphTier1  => 25,
            Stage::GraphTier2  => 40,
            Stage::GraphTier3  => 55,
            Stage::GraphTier4  => 65,
            Stage::Route       => 75,
            Stage::Map         => 85,
            Stage::Saving      => 97,
            Stage::Complete    => 100,
            Stage::Failed      => 100,
        }
    }

    /// Position in the forward order.  `Failed` may follow any stage.
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// The graph stage for the 1-based tier position.  Ladders longer than
    /// four tiers report their extra tiers as `graph_tier4`.
    pub fn graph_tier(position: usize) -> Stage {
        match position {
            0 | 1 => Stage::GraphTier1,
            2     => Stage::GraphTier2,
            3     => Stage::GraphTier3,
            _     => Stage::GraphTier4,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Complete | Stage::Failed)
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Queued      => "queued",
            Stage::Coordinates => "coordinates",
            Stage::MemoryCheck => "memory_check",
            Stage::GraphTier1  => "graph_tier1",
            Stage::GraphTier2  => "graph_tier2",
            Stage::GraphTier3  => "graph_tier3",
            Stage::GraphTier4  => "graph_tier4",
            Stage::Route       => "route",
            Stage::Map         => "map",
            Stage::Saving      => "saving",
            Stage::Complete    => "complete",
            Stage::Failed      => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Progress ──────────────────────────────────────────────────────────────────

/// One progress publication: a stage, its percentage and a human-readable
/// detail line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub stage:   Stage,
    pub percent: u8,
    pub detail:  String,
}

impl Progress {
    pub fn new(stage: Stage, detail: impl Into<String>) -> Self {
        Self { stage, percent: stage.percent(), detail: detail.into() }
    }

    /// `true` if publishing `self` after `previous` does not move backwards.
    pub fn follows(&self, previous: &Progress) -> bool {
        (self.stage.rank(), self.percent) >= (previous.stage.rank(), previous.percent)
    }
}

// ── Observer ──────────────────────────────────────────────────────────────────

/// Callbacks invoked by the pipeline as it moves through its stages.
///
/// Both methods default to no-ops.
pub trait ProgressObserver {
    /// A new stage (or a new detail within the current stage) was reached.
    fn publish(&mut self, _progress: &Progress) {}

    /// The escalation engine finished considering one strategy tier.
    fn on_tier_attempt(&mut self, _attempt: &TierAttempt) {}
}

/// A [`ProgressObserver`] that discards everything.  Used by synchronous
/// runs.
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}

/// Collects every publication; handy in tests and for debugging output.
#[derive(Debug, Default)]
pub struct ProgressLog {
    pub progress: Vec<Progress>,
    pub attempts: Vec<TierAttempt>,
}

impl ProgressLog {
    pub fn stages(&self) -> Vec<Stage> {
        self.progress.iter().map(|p| p.stage).collect()
    }

    pub fn last(&self) -> Option<&Progress> {
        self.progress.last()
    }
}

impl ProgressObserver for ProgressLog {
    fn publish(&mut self, progress: &Progress) {
        self.progress.push(progress.clone());
    }

    fn on_tier_attempt(&mut self, attempt: &TierAttempt) {
        self.attempts.push(attempt.clone());
    }
}

// ── ProgressGate ──────────────────────────────────────────────────────────────

/// Forwards progress to an inner observer, dropping publications that would
/// move backwards or follow a terminal stage.
pub struct ProgressGate<'a> {
    inner: &'a mut dyn ProgressObserver,
    last:  Option<Progress>,
}

impl<'a> ProgressGate<'a> {
    pub fn new(inner: &'a mut dyn ProgressObserver) -> Self {
        Self { inner, last: None }
    }

    pub fn last(&self) -> Option<&Progress> {
        self.last.as_ref()
    }
}

impl ProgressObserver for ProgressGate<'_> {
    fn publish(&mut self, progress: &Progress) {
        if let Some(prev) = &self.last {
            if prev.stage.is_terminal() || !progress.follows(prev) {
                return;
            }
        }
        self.inner.publish(progress);
        self.last = Some(progress.clone());
    }

    fn on_tier_attempt(&mut self, attempt: &TierAttempt) {
        self.inner.on_tier_attempt(attempt);
    }
}
