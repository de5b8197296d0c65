//! Admission control: is there enough memory to attempt a strategy tier?
//!
//! The estimate is deliberately crude.  A tier needs `distance_km *
//! multiplier` MB of headroom, where the multiplier is an empirical safety
//! factor from configuration.

use memory_stats::memory_stats;
use tracing::warn;

/// Memory a tier is expected to need, in MB.
#[inline]
pub fn required_mb(distance_km: f64, multiplier: f64) -> f64 {
    distance_km * multiplier
}

/// `false` iff `distance_km * multiplier > available_mb`.  Equality admits.
#[inline]
pub fn admit(distance_km: f64, available_mb: f64, multiplier: f64) -> bool {
    required_mb(distance_km, multiplier) <= available_mb
}

/// Source of the currently available memory.
///
/// Sampled fresh before every tier, never cached.  The probe is
/// process-wide and advisory: concurrent tasks do not reserve memory from
/// each other.
pub trait MemorySignal: Send + Sync {
    fn available_memory_mb(&self) -> f64;
}

/// Available memory = configured budget − current resident set size.
pub struct ProcessMemorySignal {
    budget_mb: f64,
}

impl ProcessMemorySignal {
    pub fn new(budget_mb: f64) -> Self {
        Self { budget_mb }
    }

    pub fn budget_mb(&self) -> f64 {
        self.budget_mb
    }
}

impl MemorySignal for ProcessMemorySignal {
    fn available_memory_mb(&self) -> f64 {
        match memory_stats() {
            Some(stats) => {
                let resident_mb = stats.physical_mem as f64 / (1024.0 * 1024.0);
                (self.budget_mb - resident_mb).max(0.0)
            }
            None => {
                warn!("memory usage unavailable on this platform, assuming the full budget");
                self.budget_mb
            }
        }
    }
}

/// A constant reading.  For tests and for deployments that size the
/// budget externally.
pub struct FixedMemorySignal(pub f64);

impl MemorySignal for FixedMemorySignal {
    fn available_memory_mb(&self) -> f64 {
        self.0
    }
}
