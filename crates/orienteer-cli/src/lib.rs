//! File-backed collaborators for the orienteer pipeline:
//! - `map_file`: JSON map documents (scanner and grid generator)
//! - `controls`: JSON controls files (waypoint extractor)
//! - `elevation`: HTTP elevation provider and a disabled stand-in

pub mod config;
pub mod controls;
pub mod elevation;
pub mod map_file;

pub use config::Config;
pub use controls::JsonControlsExtractor;
pub use elevation::{HttpElevationProvider, NoElevation};
pub use map_file::{JsonMapScanner, RasterGridGenerator};

use orienteer_core::{run_pipeline, Collaborators, PipelineParams, RunOutcome, RunResult};
use serde::Serialize;

/// Run the pipeline against files on disk. Blocks; call from a worker.
pub fn run_route(params: &PipelineParams, config: &Config, offline: bool) -> RunResult {
    let http = if offline {
        None
    } else {
        match HttpElevationProvider::from_config(config) {
            Ok(provider) => Some(provider),
            Err(err) => {
                tracing::warn!("Elevation provider unavailable, continuing without terrain: {}", err);
                None
            }
        }
    };
    let elevation: &dyn orienteer_core::ElevationProvider = match &http {
        Some(provider) => provider,
        None => &NoElevation,
    };
    let collaborators = Collaborators::new(
        &JsonMapScanner,
        &RasterGridGenerator,
        &JsonControlsExtractor,
        elevation,
    );
    run_pipeline(params, &collaborators)
}

/// Run on tokio's blocking pool so the async side never stalls.
pub async fn run_route_in_background(
    params: PipelineParams,
    config: Config,
    offline: bool,
) -> anyhow::Result<RunResult> {
    let result = tokio::task::spawn_blocking(move || run_route(&params, &config, offline)).await?;
    Ok(result)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingsMs {
    pub map_processing: f64,
    pub elevation_fetch: f64,
    pub search: f64,
}

/// Machine-readable run summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteReport {
    pub algorithm: String,
    pub success: bool,
    pub error: Option<String>,
    pub error_kind: Option<&'static str>,
    pub note: Option<String>,
    pub waypoints: usize,
    pub grid_reused: bool,
    pub used_dummy_elevation: bool,
    pub logical_resolution_m: Option<f32>,
    pub path: Vec<usize>,
    pub timings_ms: TimingsMs,
}

impl From<&RunResult> for RouteReport {
    fn from(result: &RunResult) -> Self {
        let ms = |d: std::time::Duration| d.as_secs_f64() * 1000.0;
        Self {
            algorithm: result.algorithm.clone(),
            success: result.is_success(),
            error: result.error_message(),
            error_kind: result.error().map(|err| err.kind()),
            note: match &result.outcome {
                RunOutcome::NoPathNeeded(note) => Some(note.clone()),
                _ => None,
            },
            waypoints: result.waypoints_found,
            grid_reused: result.grid_reused,
            used_dummy_elevation: result.used_dummy_elevation,
            logical_resolution_m: result.logical_resolution_m,
            path: result.path.clone(),
            timings_ms: TimingsMs {
                map_processing: ms(result.timings.map_processing),
                elevation_fetch: ms(result.timings.elevation_fetch),
                search: ms(result.timings.search),
            },
        }
    }
}
