//! synthetic: end-to-end rainy-road demo over a synthetic network.
//!
//! Generates rain maps for a few trips across northern Ceará: one
//! synchronous run, then a batch of background tasks polled until they
//! finish.  Maps land in `output.dir` from the configuration (default
//! `output/maps`).
//!
//! ```text
//! cargo run -p synthetic -- [config.toml]
//! RAINY_ROAD_LOG=rr_pipeline=debug cargo run -p synthetic
//! ```

mod network;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;

use rr_core::{GeoPoint, RainyRoadConfig, TaskId, init_tracing};
use rr_pipeline::PipelineBuilder;
use rr_spatial::RegionExtractor;
use rr_tasks::{TaskManager, TaskState, TaskStatus};
use rr_weather::{Condition, WeatherOracle, WeatherResult};

use network::{build_network, gazetteer};

// ── Constants ─────────────────────────────────────────────────────────────────

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const POLL_TIMEOUT:  Duration = Duration::from_secs(60);

// ── Weather ───────────────────────────────────────────────────────────────────

/// Rain over the serra between two meridians, drizzle west of it, clear
/// skies towards the coast.
struct SerraRain {
    west_lon: f64,
    east_lon: f64,
}

impl WeatherOracle for SerraRain {
    fn conditions_at(&self, point: GeoPoint) -> WeatherResult<Vec<Condition>> {
        Ok(if point.lon < self.west_lon {
            vec![Condition::Clouds, Condition::Drizzle]
        } else if point.lon <= self.east_lon {
            vec![Condition::Rain]
        } else {
            vec![Condition::Clear]
        })
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    init_tracing();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = RainyRoadConfig::load(config_path.as_deref())?;

    println!("=== synthetic: rainy-road demo ===");
    println!(
        "Workers: {}  |  Memory budget: {:.0} MB  |  Output: {}",
        config.tasks.workers,
        config.memory.budget_mb,
        config.output.dir.display()
    );
    println!();

    // 1. Region and collaborators.
    let region = build_network();
    println!("Road network: {} nodes, {} edges", region.node_count(), region.edge_count());

    let pipeline = PipelineBuilder::new(
        gazetteer(),
        RegionExtractor::new(Arc::new(region)),
        SerraRain { west_lon: -39.8, east_lon: -39.2 },
    )
    .config(config.clone())
    .build()?;

    let manager = TaskManager::builder(pipeline).config(&config.tasks).build()?;

    // 2. Synchronous run.
    let t0 = Instant::now();
    let artifact = manager.run("Caucaia, CE", "Fortaleza, CE")?;
    println!("Synchronous run: {artifact} in {:.3} s", t0.elapsed().as_secs_f64());
    println!();

    // 3. Background tasks.
    let trips = [
        ("Sobral, CE", "Fortaleza, CE"),
        ("Itapajé, CE", "Caucaia, CE"),
        ("Sobral, CE", "Atlantis"),
        ("   ", "Fortaleza, CE"),
    ];
    let mut submitted: Vec<(TaskId, String)> = Vec::new();
    for (start, end) in trips {
        match manager.submit(start, end) {
            Ok(id) => {
                println!("Submitted {id}: {start} → {end}");
                submitted.push((id, format!("{start} → {end}")));
            }
            Err(e) => println!("Rejected {start:?} → {end:?}: {e}"),
        }
    }
    println!();

    // 4. Poll until every task is terminal, printing each change.
    let deadline = Instant::now() + POLL_TIMEOUT;
    let mut last: HashMap<TaskId, (TaskState, u8)> = HashMap::new();
    loop {
        let mut pending = 0;
        for (id, _) in &submitted {
            let status = manager.poll(*id)?;
            if last.insert(*id, (status.state, status.percent)) != Some((status.state, status.percent)) {
                print_status(&status);
            }
            if !status.state.is_terminal() {
                pending += 1;
            }
        }
        if pending == 0 {
            break;
        }
        if Instant::now() > deadline {
            anyhow::bail!("{pending} task(s) still running after {} s", POLL_TIMEOUT.as_secs());
        }
        thread::sleep(POLL_INTERVAL);
    }
    println!();

    // 5. Results.
    println!("{:<38} {:<28} {}", "Task", "Trip", "Result");
    println!("{}", "-".repeat(96));
    for (id, trip) in &submitted {
        let result = match manager.fetch_result(*id) {
            Ok(artifact) => artifact.to_string(),
            Err(e) => {
                let status = manager.poll(*id)?;
                match status.error {
                    Some(failure) => format!("{}: {}", failure.category, failure.message),
                    None => e.to_string(),
                }
            }
        };
        println!("{:<38} {:<28} {}", id.to_string(), trip, result);
    }
    println!();

    if let Some((id, _)) = submitted.first() {
        println!("Final status of {id}:");
        println!("{}", serde_json::to_string_pretty(&manager.poll(*id)?)?);
    }

    Ok(())
}

fn print_status(status: &TaskStatus) {
    println!(
        "  {} {:>3}% {:<12} {}",
        status.id,
        status.percent,
        status.stage.name(),
        status.detail
    );
}
