//! `rr-pipeline`: the admission-controlled, tiered-fallback map generation
//! pipeline.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                      |
//! |----------------|---------------------------------------------------------------|
//! | [`admission`]  | `admit`, `MemorySignal`, process and fixed memory signals     |
//! | [`ladder`]     | `StrategyTier`, `StrategyLadder`, `RouteRequest`              |
//! | [`escalation`] | `EscalationEngine` and its per-tier attempt trace             |
//! | [`progress`]   | `Stage` percent table, `ProgressObserver`, `ProgressGate`     |
//! | [`geocode`]    | `Geocoder` trait, `StaticGeocoder` gazetteer                  |
//! | [`pipeline`]   | `Pipeline::run`: coordinates → graph → route → map → saved    |
//! | [`builder`]    | `PipelineBuilder` with configuration-derived defaults         |
//! | [`error`]      | `PipelineError`, `ErrorCategory`, `PipelineResult<T>`         |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use rr_core::LocationPair;
//! use rr_pipeline::{NoopObserver, PipelineBuilder, StaticGeocoder};
//! use rr_spatial::RegionExtractor;
//! use rr_weather::ClearSkies;
//!
//! let pipeline = PipelineBuilder::new(gazetteer, RegionExtractor::new(region), ClearSkies)
//!     .build()?;
//! let map = pipeline.run(&LocationPair::new("Sobral", "Fortaleza")?, &mut NoopObserver)?;
//! println!("{}", map.artifact);
//! ```

pub mod admission;
pub mod builder;
pub mod error;
pub mod escalation;
pub mod geocode;
pub mod ladder;
pub mod pipeline;
pub mod progress;


pub use admission::{FixedMemorySignal, MemorySignal, ProcessMemorySignal, admit, required_mb};
pub use builder::PipelineBuilder;
pub use error::{ErrorCategory, PipelineError, PipelineResult};
pub use escalation::{AttemptOutcome, Escalation, EscalationEngine, TierAttempt};
pub use geocode::{GeocodeError, Geocoder, StaticGeocoder};
pub use ladder::{RouteRequest, StrategyLadder, StrategyTier, TierKind};
pub use pipeline::{GeneratedMap, Pipeline, artifact_stem};
pub use progress::{NoopObserver, Progress, ProgressGate, ProgressLog, ProgressObserver, Stage};
