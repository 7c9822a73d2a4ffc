//! bottleneck: evacuation of a waiting hall through a 1 m corridor.
//!
//! Agents are released from a source in batches, walk to the corridor
//! entrance (optionally throttled), and leave through the far end.
//!
//! ```text
//! cargo run -p bottleneck --release -- [gcfm|cfsm] [outflow rate]
//! RUST_LOG=debug cargo run -p bottleneck
//! ```

mod building;

use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ps_core::{Iteration, SimConfig};
use ps_journey::{JourneyDesc, JourneyRegistry, SourceSpec, StageSpec};
use ps_model::{CfsmParams, GcfmParams, ModelConfig};
use ps_output::{CsvWriter, OutputWriter, SimOutputObserver};
use ps_routing::RouterKind;
use ps_sim::{IterationReport, RemovalCause, SimBuilder, SimEvent, SimObserver, SimStats};

use building::{build_bottleneck, spawn_grid};

// ── Constants ─────────────────────────────────────────────────────────────────

const AGENT_COUNT:       usize = 60;
const CHUNK:             usize = 20;
const RELEASE_EVERY:     u64   = 500;   // iterations between batches
const SEED:              u64   = 42;
const DT:                f64   = 0.01;
const MAX_TIME:          f64   = 300.0; // seconds
const SUMMARY_INTERVAL:  u64   = 100;
const OUTPUT_DIR:        &str  = "output/bottleneck";

// ── Observer wrapper: evacuation curve ────────────────────────────────────────

struct EvacuationObserver<W: OutputWriter> {
    inner:     SimOutputObserver<W>,
    /// Time of every exit through the corridor.
    exits:     Vec<f64>,
    last_time: f64,
}

impl<W: OutputWriter> EvacuationObserver<W> {
    fn new(inner: SimOutputObserver<W>) -> Self {
        Self { inner, exits: Vec::new(), last_time: 0.0 }
    }
}

impl<W: OutputWriter> SimObserver for EvacuationObserver<W> {
    fn on_event(&mut self, iteration: Iteration, event: &SimEvent) {
        if let SimEvent::AgentRemoved { cause: RemovalCause::LeftBuilding, .. } = event {
            self.exits.push((iteration.0 + 1) as f64 * DT);
        }
        self.inner.on_event(iteration, event);
    }

    fn on_iteration_end(&mut self, report: &IterationReport<'_>) {
        self.last_time = report.time;
        self.inner.on_iteration_end(report);
    }

    fn on_sim_end(&mut self, final_iteration: Iteration, stats: &SimStats, building: &ps_geometry::Building) {
        self.inner.on_sim_end(final_iteration, stats, building);
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn model_from_arg(arg: Option<&str>) -> Result<ModelConfig> {
    Ok(match arg {
        None | Some("cfsm") => ModelConfig::Cfsm(CfsmParams::default()),
        Some("gcfm") => ModelConfig::Gcfm(GcfmParams::default()),
        Some(other) => bail!("unknown model {other:?}; expected gcfm or cfsm"),
    })
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let model = model_from_arg(args.first().map(String::as_str))?;
    let outflow_rate = match args.get(1) {
        Some(rate) => Some(rate.parse::<f64>()?),
        None => None,
    };

    println!("=== bottleneck — pedestrian evacuation ===");
    println!("Agents: {AGENT_COUNT}  |  Model: {model:?}  |  Seed: {SEED}");
    println!();

    // 1. Geometry.
    let (building, layout) = build_bottleneck(outflow_rate)?;
    println!(
        "Building: {} subrooms, {} doors",
        building.subrooms().len(),
        building.doors().count()
    );

    // 2. Journey: straight to the area beyond the corridor.
    let mut journeys = JourneyRegistry::new();
    let exit = journeys.add_stage(StageSpec::exit_at_goal(&building, layout.outside)?)?;
    let journey = journeys.add_journey(JourneyDesc::single(exit))?;

    // 3. Source: batches of CHUNK on a 1 m grid, desired speed 1.0–1.5 m/s.
    let source = SourceSpec::new(journey, exit, spawn_grid())
        .frequency(RELEASE_EVERY)
        .chunk(CHUNK)
        .max_agents(AGENT_COUNT)
        .v0_range(1.0, 1.5);

    // 4. Sim.  Stop conditions are checked by the loop below.
    let config = SimConfig {
        dt: DT,
        seed: SEED,
        snapshot_interval: 0,
        ..SimConfig::default()
    };
    let mut sim = SimBuilder::new(config, building)
        .model(model)
        .router(RouterKind::default())
        .journeys(journeys)
        .source(source)
        .build()?;

    // 5. Output.
    let writer = CsvWriter::new(Path::new(OUTPUT_DIR))?;
    let inner = SimOutputObserver::new(writer).summary_interval(SUMMARY_INTERVAL);
    let mut obs = EvacuationObserver::new(inner);

    // 6. Run until everyone is out or MAX_TIME passes.
    let t0 = Instant::now();
    loop {
        sim.run_iterations(RELEASE_EVERY, &mut obs)?;
        info!(time = sim.elapsed_time(), agents = sim.agent_count(), "progress");
        let drained = sim.agent_count() == 0 && sim.sources().iter().all(|s| s.is_exhausted());
        if drained || sim.elapsed_time() >= MAX_TIME {
            break;
        }
    }
    let stats = *sim.stats();
    obs.on_sim_end(Iteration(sim.iteration_count()), &stats, sim.building());
    let elapsed = t0.elapsed();

    if let Some(e) = obs.inner.take_error() {
        eprintln!("output error: {e}");
    }

    // 7. Summary.
    println!("Simulation complete in {:.3} s (simulated {:.2} s)", elapsed.as_secs_f64(), obs.last_time);
    println!("  added         : {}", stats.agents_added);
    println!("  left building : {}", stats.left_building);
    println!("  lost          : {}", stats.lost);
    println!("  still inside  : {}", sim.agent_count());
    println!(
        "  door usage    : entrance {}, exit {}",
        sim.door_usage(layout.entrance)?,
        sim.door_usage(layout.exit)?
    );
    if let (Some(first), Some(last)) = (obs.exits.first(), obs.exits.last()) {
        let n = obs.exits.len();
        if n > 1 && last > first {
            println!("  mean flow     : {:.2} persons/s", (n - 1) as f64 / (last - first));
        }
    }
    println!("  output        : {OUTPUT_DIR}/");

    Ok(())
}
