//! `orienteer`: plan a route through a course on a JSON map.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use orienteer_cli::{run_route_in_background, Config, RouteReport};
use orienteer_core::{AlgorithmKind, GridCache, Heuristic, ObstacleCostMap, PipelineParams};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find a route through the controls
    Route(RouteArgs),
    /// List the algorithm selectors in this build
    Algorithms,
}

#[derive(clap::Args, Debug)]
struct RouteArgs {
    /// JSON map document
    #[arg(long)]
    map: PathBuf,

    /// JSON controls file
    #[arg(long)]
    controls: PathBuf,

    /// Obstacle cost table (`code: value` per line). Defaults to the built-in table.
    #[arg(long)]
    costs: Option<PathBuf>,

    #[arg(long, default_value_t = 1000)]
    width: usize,

    #[arg(long, default_value_t = 1000)]
    height: usize,

    /// Algorithm selector; repeat to compare several on the same grid
    #[arg(long = "algorithm", default_value = "Optimized A*")]
    algorithms: Vec<String>,

    /// euclidean, diagonal, manhattan or min-cost
    #[arg(long, default_value_t = Heuristic::MinCost)]
    heuristic: Heuristic,

    /// Elevation raster resolution in metres
    #[arg(long, default_value_t = 90.0)]
    elevation_resolution: f64,

    /// Skip the elevation service and use flat terrain
    #[arg(long)]
    offline: bool,

    /// Print one JSON report per run instead of the status line
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let json_layer = args
        .log_json
        .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!args.log_json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    tracing_subscriber::registry()
        .with(json_layer)
        .with(text_layer)
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("orienteer_cli=debug".parse()?)
                .add_directive("orienteer_core=info".parse()?),
        )
        .init();

    match args.command {
        Command::Algorithms => {
            for kind in AlgorithmKind::available() {
                let uses = if kind.uses_heuristic() { " (heuristic)" } else { "" };
                let device = if kind.is_gpu() { " [gpu]" } else { "" };
                println!("{}{}{}", kind, uses, device);
            }
            Ok(())
        }
        Command::Route(route) => run(route).await,
    }
}

async fn run(args: RouteArgs) -> Result<()> {
    let config = Config::from_env();
    let obstacle_costs = match &args.costs {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read cost table {}", path.display()))?;
            ObstacleCostMap::parse(&text)?
        }
        None => ObstacleCostMap::production_defaults(),
    };
    let base = PipelineParams {
        map_path: args.map.display().to_string(),
        controls_path: args.controls.display().to_string(),
        grid_width: args.width,
        grid_height: args.height,
        obstacle_costs,
        num_threads: config.threads,
        elevation_resolution_m: args.elevation_resolution,
        heuristic: args.heuristic,
        reuse_grid: true,
        ..PipelineParams::default()
    };
    tracing::info!(
        "Routing {} on {} at {}x{}",
        base.controls_path,
        base.map_path,
        base.grid_width,
        base.grid_height
    );

    let mut cache = GridCache::new();
    let mut failures = 0usize;
    for algorithm in &args.algorithms {
        cache.invalidate_if_changed(&base.map_path);
        let params = PipelineParams {
            algorithm: algorithm.clone(),
            cached_grid: cache.candidate().cloned(),
            ..base.clone()
        };
        let result = run_route_in_background(params, config.clone(), args.offline).await?;
        cache.remember(&result);

        if args.json {
            println!("{}", serde_json::to_string(&RouteReport::from(&result))?);
        } else {
            println!("[{}] {}", algorithm, result.summary());
        }
        if !result.is_success() {
            failures += 1;
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} run(s) failed", failures, args.algorithms.len());
    }
    Ok(())
}
