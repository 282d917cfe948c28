//! V2X State Index CLI
//!
//! Builds the state index from a nuScenes-format dataset or a synthetic
//! scenario, runs agent selection, and prints or exports the result.

use clap::Parser;
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use v2x_core::{SelectionMethod, SelectionStrategy, StateIndex};
use v2x_env::read_npy_flat;
use v2x_sim::scenarios::ScenarioId;
use v2x_sim::{IndexExport, Result, RunConfig, ScenarioResult, ScenarioRunner, SimWorld};

#[derive(Parser, Debug)]
#[command(name = "v2x-index")]
#[command(about = "V2X-Sim state index and agent selection")]
struct Args {
    /// Dataset root in nuScenes format (omit to use a synthetic scenario)
    #[arg(short, long)]
    dataroot: Option<PathBuf>,

    /// Catalog version tag under the dataset root
    #[arg(long = "version", value_name = "TAG")]
    catalog_version: Option<String>,

    /// Synthetic scenario (cruise, turning, dropout, stale_clock, swarm; `all` with --check)
    #[arg(short = 'S', long, default_value = "cruise")]
    scenario: String,

    /// Master seed for synthetic datasets
    #[arg(short, long)]
    seed: Option<u64>,

    #[arg(long)]
    scene_start: Option<usize>,

    #[arg(long)]
    scene_end: Option<usize>,

    #[arg(long)]
    agent_start: Option<u32>,

    #[arg(long)]
    agent_end: Option<u32>,

    /// Selection method (identity, closest_k, velocity, heuristic, ml_model, bandwidth)
    #[arg(short, long)]
    method: Option<String>,

    /// Agents to keep (closest_k, velocity)
    #[arg(short, long)]
    k: Option<usize>,

    /// Per-frame data budget (bandwidth)
    #[arg(long)]
    budget: Option<f64>,

    /// Score threshold (ml_model)
    #[arg(long)]
    threshold: Option<f64>,

    /// TOML run configuration; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print only this scene
    #[arg(long)]
    scene: Option<usize>,

    /// Print only this frame of --scene
    #[arg(long, requires = "scene")]
    frame: Option<usize>,

    /// Check synthetic scenarios against ground truth instead of indexing
    #[arg(long, conflicts_with = "dataroot")]
    check: bool,

    /// Export indexed frames to a JSON file
    #[arg(long)]
    export: Option<PathBuf>,

    /// JSON output on stdout
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print the values of one payload file and exit
    #[arg(long, value_name = "PATH")]
    inspect_payload: Option<PathBuf>,

    /// List selection methods and scenarios, then exit
    #[arg(long)]
    list: bool,
}

#[derive(Debug, Serialize)]
struct Entry {
    name: &'static str,
    description: &'static str,
}

#[derive(Debug, Serialize)]
struct Listing {
    methods: Vec<Entry>,
    scenarios: Vec<Entry>,
}

impl Listing {
    fn new() -> Self {
        Self {
            methods: SelectionMethod::all()
                .into_iter()
                .map(|m| Entry {
                    name: m.name(),
                    description: m.description(),
                })
                .collect(),
            scenarios: ScenarioId::all()
                .into_iter()
                .map(|s| Entry {
                    name: s.name(),
                    description: s.description(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SceneSummary {
    scene_id: usize,
    frames: usize,
}

#[derive(Debug, Serialize)]
struct IndexSummary {
    method: String,
    scenes: Vec<SceneSummary>,
    frames: usize,
    observations: usize,
    selected: usize,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging (stderr, so --json output stays clean)
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<ExitCode> {
    if let Some(path) = &args.inspect_payload {
        inspect_payload(path, args.json)?;
        return Ok(ExitCode::SUCCESS);
    }
    if args.list {
        print_listing(args.json)?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => {
            // Synthetic runs default to indexing everything generated
            let mut config = RunConfig::default();
            if args.dataroot.is_none() {
                config.index = config.sim.index_config();
            }
            config
        }
    };
    apply_overrides(&mut config, args)?;

    if args.check {
        return run_checks(args, &config);
    }

    let strategy = config.selection.strategy()?;
    let index = match &args.dataroot {
        Some(root) => {
            info!("Indexing {} ({})", root.display(), config.index.version);
            StateIndex::from_dataroot(root, config.index.clone())?
        }
        None => {
            let scenario: ScenarioId = args.scenario.parse()?;
            let dataset = SimWorld::new(config.sim.clone())
                .with_layout(config.index.layout.clone())
                .generate(scenario)?;
            StateIndex::build(&dataset.provider, config.index.clone())?
        }
    };

    let export = match args.scene {
        Some(scene) => IndexExport::from_scene(&index, &strategy, scene, args.frame),
        None => IndexExport::from_index(&index, &strategy),
    };

    if args.json {
        let summary = summarize(&index, &strategy, &export);
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if args.scene.is_some() {
        print_frames(&export);
    } else {
        let summary = summarize(&index, &strategy, &export);
        info!(
            "{} frames, {} observations, {} selected by {}",
            summary.frames, summary.observations, summary.selected, summary.method
        );
        for scene in &summary.scenes {
            info!("  scene {}: {} frames", scene.scene_id, scene.frames);
        }
    }

    if let Some(path) = &args.export {
        export.write_to_file(path)?;
        info!("Exported {} frames to {}", export.frames.len(), path.display());
    }

    Ok(ExitCode::SUCCESS)
}

/// Applies command-line flags on top of the file configuration.
fn apply_overrides(config: &mut RunConfig, args: &Args) -> Result<()> {
    if let Some(version) = &args.catalog_version {
        config.index.version = version.clone();
    }
    if let Some(seed) = args.seed {
        config.sim.seed = seed;
    }
    if let Some(v) = args.scene_start {
        config.index.scene_start = v;
    }
    if let Some(v) = args.scene_end {
        config.index.scene_end = v;
    }
    if let Some(v) = args.agent_start {
        config.index.agent_start = v;
    }
    if let Some(v) = args.agent_end {
        config.index.agent_end = v;
    }

    if let Some(method) = &args.method {
        config.selection.method = method.parse::<SelectionMethod>()?;
    }
    let options = &mut config.selection.options;
    if let Some(k) = args.k {
        options.remove("K");
        options.insert("k".to_string(), json!(k));
    }
    if let Some(budget) = args.budget {
        options.insert("budget".to_string(), json!(budget));
    }
    if let Some(threshold) = args.threshold {
        options.insert("threshold".to_string(), json!(threshold));
    }
    Ok(())
}

fn print_listing(as_json: bool) -> Result<()> {
    let listing = Listing::new();
    if as_json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!("Selection methods:");
    for entry in &listing.methods {
        println!("  {:<12} {}", entry.name, entry.description);
    }
    println!("Scenarios:");
    for entry in &listing.scenarios {
        println!("  {:<12} {}", entry.name, entry.description);
    }
    Ok(())
}

fn summarize(index: &StateIndex, strategy: &SelectionStrategy, export: &IndexExport) -> IndexSummary {
    IndexSummary {
        method: strategy.method().to_string(),
        scenes: index
            .scene_ids()
            .map(|scene_id| SceneSummary {
                scene_id,
                frames: index.frame_count(scene_id),
            })
            .collect(),
        frames: export.frames.len(),
        observations: export.observation_count(),
        selected: export.selected_count(),
    }
}

fn print_frames(export: &IndexExport) {
    for frame in &export.frames {
        info!(
            "scene {} frame {}: {} agents, selected {:?}",
            frame.scene_id,
            frame.frame_id,
            frame.agents.len(),
            frame.selected
        );
        for meta in &frame.agents {
            info!(
                "  agent {} t={:.3} pos=({:.2}, {:.2}, {:.2}) yaw={:.3} v=({:.2}, {:.2}) yaw_rate={:.3}",
                meta.agent_id,
                meta.timestamp,
                meta.position.x,
                meta.position.y,
                meta.position.z,
                meta.yaw,
                meta.velocity.x,
                meta.velocity.y,
                meta.yaw_rate
            );
        }
    }
}

fn run_checks(args: &Args, config: &RunConfig) -> Result<ExitCode> {
    let scenarios = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse()?]
    };

    let runner = ScenarioRunner::new(config.sim.seed).with_config(config.sim.clone());
    let results: Vec<ScenarioResult> = scenarios
        .into_iter()
        .map(|scenario| runner.run(scenario))
        .collect::<Result<_>>()?;
    let failed = results.iter().filter(|r| !r.passed).count();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            let status = if result.passed { "PASSED" } else { "FAILED" };
            info!(
                "{} (seed={}) {}: {} observations, max velocity error {:.2e}, max yaw rate error {:.2e}",
                result.scenario,
                result.seed,
                status,
                result.indexed_observations,
                result.max_velocity_error,
                result.max_yaw_rate_error
            );
            if let Some(reason) = &result.failure_reason {
                error!("  {}", reason);
            }
        }
        info!("{}/{} scenarios passed", results.len() - failed, results.len());
    }

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn inspect_payload(path: &Path, as_json: bool) -> Result<()> {
    let values = read_npy_flat(path)?;

    if as_json {
        let report = json!({
            "path": path.display().to_string(),
            "len": values.len(),
            "values": values,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        info!("{}: {} values", path.display(), values.len());
        println!("{values:?}");
    }
    Ok(())
}
