//! Fluent builder for constructing a [`Pipeline`].

use rr_core::RainyRoadConfig;
use rr_output::{ArtifactStore, DirectoryStore, GeoJsonRenderer, MapRenderer};
use rr_spatial::{DijkstraRouter, GraphBuilder, Router};
use rr_weather::WeatherOracle;

use crate::admission::{MemorySignal, ProcessMemorySignal};
use crate::geocode::Geocoder;
use crate::ladder::StrategyLadder;
use crate::{Pipeline, PipelineError, PipelineResult};

/// Fluent builder for [`Pipeline`].
///
/// # Required inputs
///
/// - `G: Geocoder`: place-name lookup
/// - `B: GraphBuilder`: road graphs for the strategy tiers
/// - `W: WeatherOracle`: conditions along the route
///
/// # Optional inputs (have defaults)
///
/// | Method         | Default                                              |
/// |----------------|------------------------------------------------------|
/// | `.config(c)`   | `RainyRoadConfig::default()`                         |
/// | `.router(r)`   | `DijkstraRouter`                                     |
/// | `.renderer(r)` | `GeoJsonRenderer::default()`                         |
/// | `.store(s)`    | `DirectoryStore` at `config.output.dir`              |
/// | `.memory(m)`   | `ProcessMemorySignal` with `config.memory.budget_mb` |
/// | `.ladder(l)`   | `StrategyLadder::from_config(&config.ladder)`        |
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = PipelineBuilder::new(geocoder, RegionExtractor::new(region), ClearSkies)
///     .config(config)
///     .build()?;
/// let map = pipeline.run(&LocationPair::new("Sobral", "Fortaleza")?, &mut NoopObserver)?;
/// ```
pub struct PipelineBuilder {
    config:   RainyRoadConfig,
    geocoder: Box<dyn Geocoder>,
    graphs:   Box<dyn GraphBuilder>,
    weather:  Box<dyn WeatherOracle>,
    router:   Option<Box<dyn Router>>,
    renderer: Option<Box<dyn MapRenderer>>,
    store:    Option<Box<dyn ArtifactStore>>,
    memory:   Option<Box<dyn MemorySignal>>,
    ladder:   Option<StrategyLadder>,
}

impl PipelineBuilder {
    pub fn new<G, B, W>(geocoder: G, graphs: B, weather: W) -> Self
    where
        G: Geocoder + 'static,
        B: GraphBuilder + 'static,
        W: WeatherOracle + 'static,
    {
        Self {
            config:   RainyRoadConfig::default(),
            geocoder: Box::new(geocoder),
            graphs:   Box::new(graphs),
            weather:  Box::new(weather),
            router:   None,
            renderer: None,
            store:    None,
            memory:   None,
            ladder:   None,
        }
    }

    /// Configuration used for every component not supplied explicitly.
    pub fn config(mut self, config: RainyRoadConfig) -> Self {
        self.config = config;
        self
    }

    pub fn router(mut self, router: impl Router + 'static) -> Self {
        self.router = Some(Box::new(router));
        self
    }

    pub fn renderer(mut self, renderer: impl MapRenderer + 'static) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    pub fn store(mut self, store: impl ArtifactStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn memory(mut self, memory: impl MemorySignal + 'static) -> Self {
        self.memory = Some(Box::new(memory));
        self
    }

    /// Replace the ladder derived from `config.ladder`.
    pub fn ladder(mut self, ladder: StrategyLadder) -> Self {
        self.ladder = Some(ladder);
        self
    }

    /// Validate the configuration and assemble the [`Pipeline`].
    pub fn build(self) -> PipelineResult<Pipeline> {
        self.config
            .validate()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let ladder = self
            .ladder
            .unwrap_or_else(|| StrategyLadder::from_config(&self.config.ladder));
        if ladder.is_empty() {
            return Err(PipelineError::Config("strategy ladder has no tiers".into()));
        }
        if let Some(tier) = ladder
            .tiers()
            .iter()
            .find(|t| !(t.memory_multiplier.is_finite() && t.memory_multiplier > 0.0))
        {
            return Err(PipelineError::Config(format!(
                "tier {} has a non-positive memory multiplier",
                tier.name()
            )));
        }

        let budget_mb = self.config.memory.budget_mb;
        let output_dir = self.config.output.dir.clone();

        Ok(Pipeline {
            geocoder: self.geocoder,
            graphs:   self.graphs,
            router:   self.router.unwrap_or_else(|| Box::new(DijkstraRouter)),
            weather:  self.weather,
            renderer: self.renderer.unwrap_or_else(|| Box::new(GeoJsonRenderer::default())),
            store:    self.store.unwrap_or_else(|| Box::new(DirectoryStore::new(output_dir))),
            memory:   self.memory.unwrap_or_else(|| Box::new(ProcessMemorySignal::new(budget_mb))),
            ladder,
        })
    }
}
