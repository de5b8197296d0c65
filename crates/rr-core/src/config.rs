//! Workspace configuration.
//!
//! Resolution order (highest priority first):
//! 1. Environment variables (`RAINY_ROAD_*`)
//! 2. TOML file passed to [`RainyRoadConfig::load`]
//! 3. Compiled defaults
//!
//! ```toml
//! [ladder]
//! primary_roads_multiplier = 2.0
//! radius_multiplier        = 14.0
//! min_primary_distance_km  = 10.0
//!
//! [memory]
//! budget_mb = 4096.0
//!
//! [tasks]
//! workers        = 4
//! retention_secs = 3600
//! lease_secs     = 300
//!
//! [output]
//! dir = "output/maps"
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

/// Top-level configuration aggregating all sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RainyRoadConfig {
    pub ladder: LadderConfig,
    pub memory: MemoryConfig,
    pub tasks:  TaskConfig,
    pub output: OutputConfig,
}

/// Strategy-ladder tuning.
///
/// The multipliers are empirical safety factors (MB of headroom required per
/// km of route), not derived constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LadderConfig {
    pub primary_roads_multiplier: f64,
    pub filtered_bbox_multiplier: f64,
    pub full_bbox_multiplier:     f64,
    pub radius_multiplier:        f64,
    /// Below this distance the primary-roads tier is skipped.
    pub min_primary_distance_km:  f64,
    /// Degrees added on every side of the endpoint bounding box.
    pub bbox_buffer_deg:          f64,
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            primary_roads_multiplier: 2.0,
            filtered_bbox_multiplier: 2.0,
            full_bbox_multiplier:     8.0,
            radius_multiplier:        14.0,
            min_primary_distance_km:  10.0,
            bbox_buffer_deg:          0.08,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Memory the process may use in total; available = budget − resident.
    pub budget_mb: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { budget_mb: 4_096.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Worker threads in the task pool.
    pub workers:        usize,
    /// How long a finished task stays retrievable.
    pub retention_secs: u64,
    /// A running task with no progress for this long is reported failed.
    pub lease_secs:     u64,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            workers:        4,
            retention_secs: 3_600,
            lease_secs:     300,
        }
    }
}

impl TaskConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory that rendered map artifacts are written into.
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("output/maps") }
    }
}

impl RainyRoadConfig {
    /// Load defaults, merge `path` if given, then apply `RAINY_ROAD_*`
    /// environment overrides and validate.
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let mut config = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)?;
                Self::parse(&text, &p.display().to_string())?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        tracing::debug!(?path, workers = config.tasks.workers, "configuration loaded");
        Ok(config)
    }

    /// Parse a TOML string without touching the environment.
    pub fn from_toml(text: &str) -> CoreResult<Self> {
        let config = Self::parse(text, "<string>")?;
        config.validate()?;
        Ok(config)
    }

    fn parse(text: &str, path: &str) -> CoreResult<Self> {
        toml::from_str(text).map_err(|e| CoreError::Parse {
            path:    path.to_string(),
            message: e.to_string(),
        })
    }

    /// Apply overrides from a key lookup (the process environment in
    /// production).  A value that fails to parse is a
    /// [`CoreError::Config`] naming the variable; nothing after it is
    /// applied.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> CoreResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_override(&lookup, "RAINY_ROAD_MEMORY_BUDGET_MB")? {
            self.memory.budget_mb = v;
        }
        if let Some(v) = parse_override(&lookup, "RAINY_ROAD_MIN_PRIMARY_DISTANCE_KM")? {
            self.ladder.min_primary_distance_km = v;
        }
        if let Some(v) = parse_override(&lookup, "RAINY_ROAD_TASK_WORKERS")? {
            self.tasks.workers = v;
        }
        if let Some(v) = parse_override(&lookup, "RAINY_ROAD_TASK_RETENTION_SECS")? {
            self.tasks.retention_secs = v;
        }
        if let Some(v) = parse_override(&lookup, "RAINY_ROAD_TASK_LEASE_SECS")? {
            self.tasks.lease_secs = v;
        }
        if let Some(v) = lookup("RAINY_ROAD_OUTPUT_DIR") {
            self.output.dir = PathBuf::from(v);
        }
        Ok(())
    }

    pub fn validate(&self) -> CoreResult<()> {
        let l = &self.ladder;
        let multipliers = [
            ("ladder.primary_roads_multiplier", l.primary_roads_multiplier),
            ("ladder.filtered_bbox_multiplier", l.filtered_bbox_multiplier),
            ("ladder.full_bbox_multiplier", l.full_bbox_multiplier),
            ("ladder.radius_multiplier", l.radius_multiplier),
        ];
        for (field, value) in multipliers {
            if !(value.is_finite() && value > 0.0) {
                return Err(CoreError::Config(format!("{field} must be a positive number")));
            }
        }
        if l.min_primary_distance_km < 0.0 || l.bbox_buffer_deg < 0.0 {
            return Err(CoreError::Config(
                "ladder distances and buffers must not be negative".into(),
            ));
        }
        if !(self.memory.budget_mb.is_finite() && self.memory.budget_mb >= 0.0) {
            return Err(CoreError::Config("memory.budget_mb must not be negative".into()));
        }
        if self.tasks.workers == 0 {
            return Err(CoreError::Config("tasks.workers must be at least 1".into()));
        }
        if self.tasks.lease_secs == 0 {
            return Err(CoreError::Config("tasks.lease_secs must be at least 1".into()));
        }
        Ok(())
    }
}

fn parse_override<T, F>(lookup: &F, key: &str) -> CoreResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| CoreError::Config(format!("{key}: invalid value {raw:?}: {e}"))),
    }
}
