//! Top-level run: scan, grid, waypoints, alignment, search.
//!
//! Each stage produces an immutable output consumed by the next. The whole
//! sequence sits behind one failure boundary, so every problem, including a
//! panic inside a collaborator, ends up as a failed [`RunResult`].

use crate::algorithms::{GpuParams, SearchContext};
use crate::alignment::{self, Alignment, AlignmentInput};
use crate::collaborators::{
    ElevationProvider, GeneratedGrid, GridGenerator, GridRequest, MapScanner, WaypointExtractor,
};
use crate::dispatch::{AlgorithmKind, Dispatcher, SearchTable};
use crate::error::PipelineError;
use crate::grid_cache::{self, CachedGrid, ReuseDecision};
use crate::heuristic::Heuristic;
use crate::models::{
    AlignmentOffset, ElevationRaster, GridPoint, LogicalGrid, NormalizationResult, ScanResult,
    WorldBounds,
};
use crate::obstacles::ObstacleCostMap;
use crate::stitch;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt::Write as _;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

/// Note attached to a successful run whose waypoints never moved.
pub const IDENTICAL_POINTS_NOTE: &str = "Path consists of identical points only.";

/// Inputs of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    pub map_path: String,
    pub controls_path: String,
    pub grid_width: usize,
    pub grid_height: usize,
    pub obstacle_costs: ObstacleCostMap,
    pub num_threads: usize,
    pub elevation_resolution_m: f64,
    pub elevation_module: String,
    pub elevation_fetch_function: String,
    pub elevation_convert_function: String,
    pub algorithm: String,
    pub heuristic: Heuristic,
    pub gpu: GpuParams,
    pub reuse_grid: bool,
    /// Grid from an earlier run, considered only when `reuse_grid` is set.
    #[serde(skip)]
    pub cached_grid: Option<CachedGrid>,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            map_path: String::new(),
            controls_path: String::new(),
            grid_width: 1000,
            grid_height: 1000,
            obstacle_costs: ObstacleCostMap::production_defaults(),
            num_threads: 1,
            elevation_resolution_m: 90.0,
            elevation_module: "elevation_logic".to_string(),
            elevation_fetch_function: "get_elevation_grid".to_string(),
            elevation_convert_function: "convert_latlon_to_projected".to_string(),
            algorithm: AlgorithmKind::OptimizedAStar.name().to_string(),
            heuristic: Heuristic::MinCost,
            gpu: GpuParams::default(),
            reuse_grid: false,
            cached_grid: None,
        }
    }
}

/// Collaborators for one run, plus the search entry points to dispatch to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub scanner: &'a dyn MapScanner,
    pub generator: &'a dyn GridGenerator,
    pub extractor: &'a dyn WaypointExtractor,
    pub elevation: &'a dyn ElevationProvider,
    pub search_table: SearchTable,
}

impl<'a> Collaborators<'a> {
    pub fn new(
        scanner: &'a dyn MapScanner,
        generator: &'a dyn GridGenerator,
        extractor: &'a dyn WaypointExtractor,
        elevation: &'a dyn ElevationProvider,
    ) -> Self {
        Self {
            scanner,
            generator,
            extractor,
            elevation,
            search_table: SearchTable::builtin(),
        }
    }

    pub fn with_search_table(mut self, table: SearchTable) -> Self {
        self.search_table = table;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Routed,
    /// Succeeded without searching, with an explanation.
    NoPathNeeded(String),
    Failed(PipelineError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseTimings {
    /// Scan plus grid generation or reuse.
    pub map_processing: Duration,
    pub elevation_fetch: Duration,
    /// Sum of the per-segment search times.
    pub search: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub outcome: RunOutcome,
    pub map_path: String,
    pub controls_path: String,
    pub grid_width: usize,
    pub grid_height: usize,
    pub algorithm: String,
    /// Grid actually used, echoed so the caller can keep it for reuse.
    pub processed_grid: Option<LogicalGrid>,
    pub normalization: Option<NormalizationResult>,
    pub grid_reused: bool,
    pub elevation: Option<ElevationRaster>,
    pub used_dummy_elevation: bool,
    pub logical_resolution_m: Option<f32>,
    pub offset: AlignmentOffset,
    /// Row-major cell indices. Always empty on failure.
    pub path: Vec<usize>,
    pub waypoints_found: usize,
    pub timings: PhaseTimings,
}

impl RunResult {
    fn new(params: &PipelineParams) -> Self {
        Self {
            outcome: RunOutcome::Routed,
            map_path: params.map_path.clone(),
            controls_path: params.controls_path.clone(),
            grid_width: params.grid_width,
            grid_height: params.grid_height,
            algorithm: params.algorithm.clone(),
            processed_grid: None,
            normalization: None,
            grid_reused: false,
            elevation: None,
            used_dummy_elevation: false,
            logical_resolution_m: None,
            offset: AlignmentOffset::default(),
            path: Vec::new(),
            waypoints_found: 0,
            timings: PhaseTimings::default(),
        }
    }

    fn fail(mut self, err: PipelineError) -> Self {
        tracing::error!("Run failed ({}): {}", err.kind(), err);
        self.path.clear();
        self.outcome = RunOutcome::Failed(err);
        self
    }

    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, RunOutcome::Failed(_))
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match &self.outcome {
            RunOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<String> {
        self.error().map(ToString::to_string)
    }

    pub fn note(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::NoPathNeeded(note) => Some(note),
            _ => None,
        }
    }

    /// One-line status as shown after a run.
    pub fn summary(&self) -> String {
        let mut line = match &self.outcome {
            RunOutcome::Routed => format!(
                "Path found ({} waypoints). Length: {} nodes.",
                self.waypoints_found,
                self.path.len()
            ),
            RunOutcome::NoPathNeeded(note) => format!("Success: {}", note),
            RunOutcome::Failed(err) => return format!("Error: {}", err),
        };
        if self.used_dummy_elevation {
            line.push_str(" (Used dummy elevation)");
        }
        let _ = write!(
            line,
            " Map: {:.1} ms, Elevation: {:.1} ms, Search: {:.1} ms.",
            as_ms(self.timings.map_processing),
            as_ms(self.timings.elevation_fetch),
            as_ms(self.timings.search)
        );
        line
    }
}

fn as_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanStage {
    pub scan: ScanResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridStage {
    pub grid: LogicalGrid,
    pub normalization: NormalizationResult,
    pub reused: bool,
}

impl GridStage {
    pub fn world_bounds(&self) -> WorldBounds {
        self.normalization
            .world_bounds(self.grid.width(), self.grid.height())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaypointStage {
    pub waypoints: Vec<GridPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentStage {
    pub alignment: Alignment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchStage {
    pub path: Vec<usize>,
    pub searched_segments: usize,
    pub duration: Duration,
}

/// Checks that belong to the caller, run before anything else.
pub fn validate_params(params: &PipelineParams) -> Result<(), PipelineError> {
    if params.map_path.trim().is_empty() {
        return Err(PipelineError::Configuration("map file path is empty".to_string()));
    }
    if params.controls_path.trim().is_empty() {
        return Err(PipelineError::Configuration("controls file path is empty".to_string()));
    }
    if params.grid_width == 0 || params.grid_height == 0 {
        return Err(PipelineError::Configuration(format!(
            "grid dimensions must be positive, got {}x{}",
            params.grid_width, params.grid_height
        )));
    }
    Ok(())
}

pub fn scan_stage(params: &PipelineParams, scanner: &dyn MapScanner) -> Result<ScanStage, PipelineError> {
    let scan = scanner
        .scan(&params.map_path)
        .map_err(|err| PipelineError::MapScan(err.to_string()))?;
    if scan.raw_bounds.is_none() {
        return Err(PipelineError::MapScan(format!("no coordinates found in {}", params.map_path)));
    }
    match scan.georeference {
        Some(georef) => tracing::debug!("Georeferencing found, scale 1:{}", georef.map_scale),
        None => tracing::warn!("Georeferencing incomplete in {}", params.map_path),
    }
    Ok(ScanStage { scan })
}

pub fn grid_stage(params: &PipelineParams, generator: &dyn GridGenerator) -> Result<GridStage, PipelineError> {
    let decision = grid_cache::decide(
        params.reuse_grid,
        params.cached_grid.as_ref(),
        &params.map_path,
        params.grid_width,
        params.grid_height,
    );
    let stage = match decision {
        ReuseDecision::Reuse(cached) => {
            tracing::info!("Reusing cached {}x{} grid", cached.width, cached.height);
            GridStage {
                grid: cached.grid,
                normalization: cached.normalization,
                reused: true,
            }
        }
        ReuseDecision::Regenerate(reason) => {
            tracing::debug!("Generating grid ({})", reason);
            let request = GridRequest {
                map_path: &params.map_path,
                width: params.grid_width,
                height: params.grid_height,
                obstacle_costs: &params.obstacle_costs,
                num_threads: params.num_threads.max(1),
            };
            let generated = generate_grid(generator, &request)?;
            GridStage {
                grid: generated.grid,
                normalization: generated.normalization,
                reused: false,
            }
        }
    };
    if !stage.normalization.valid {
        return Err(PipelineError::NormalizationInvalid);
    }
    Ok(stage)
}

fn generate_grid(
    generator: &dyn GridGenerator,
    request: &GridRequest<'_>,
) -> Result<GeneratedGrid, PipelineError> {
    let generated = generator
        .generate(request)
        .map_err(|err| PipelineError::GridGeneration(err.to_string()))?;
    if generated.grid.width() != request.width || generated.grid.height() != request.height {
        return Err(PipelineError::GridGeneration(format!(
            "generator returned {}x{} grid, requested {}x{}",
            generated.grid.width(),
            generated.grid.height(),
            request.width,
            request.height
        )));
    }
    Ok(generated)
}

pub fn waypoint_stage(
    params: &PipelineParams,
    grid: &GridStage,
    extractor: &dyn WaypointExtractor,
) -> Result<WaypointStage, PipelineError> {
    let insufficient = |reason: String| PipelineError::InsufficientWaypoints {
        path: params.controls_path.clone(),
        reason,
    };
    let waypoints = extractor
        .extract(
            &params.controls_path,
            &grid.world_bounds(),
            grid.grid.width(),
            grid.grid.height(),
        )
        .map_err(|err| insufficient(err.to_string()))?;
    if waypoints.len() < 2 {
        return Err(insufficient(format!("found {} waypoint(s), need at least 2", waypoints.len())));
    }
    tracing::debug!("Extracted {} waypoints", waypoints.len());
    Ok(WaypointStage { waypoints })
}

pub fn alignment_stage(
    params: &PipelineParams,
    scan: &ScanStage,
    grid: &GridStage,
    provider: &dyn ElevationProvider,
) -> AlignmentStage {
    let input = AlignmentInput {
        scan: &scan.scan,
        normalization: &grid.normalization,
        grid_width: grid.grid.width(),
        grid_height: grid.grid.height(),
        elevation_resolution_m: params.elevation_resolution_m,
        provider_module: &params.elevation_module,
        fetch_function: &params.elevation_fetch_function,
        convert_function: &params.elevation_convert_function,
    };
    AlignmentStage {
        alignment: alignment::align(&input, provider),
    }
}

pub fn search_stage(
    grid: &GridStage,
    waypoints: &WaypointStage,
    aligned: &AlignmentStage,
    dispatcher: &Dispatcher,
) -> Result<SearchStage, (PipelineError, Duration)> {
    let alignment = &aligned.alignment;
    let ctx = SearchContext::new(
        &grid.grid,
        &alignment.raster,
        alignment.logical_resolution_m,
        alignment.offset,
    );
    tracing::info!("Searching {} segment(s) with {}", waypoints.waypoints.len().saturating_sub(1), dispatcher.kind());
    let outcome = stitch::stitch_segments(&ctx, &waypoints.waypoints, dispatcher);
    match outcome.result {
        Ok(()) => Ok(SearchStage {
            path: outcome.path,
            searched_segments: outcome.searched_segments,
            duration: outcome.search_duration,
        }),
        Err(err) => Err((err, outcome.search_duration)),
    }
}

/// Runs the full pipeline. Never panics; every failure is reported in the
/// returned result.
pub fn run_pipeline(params: &PipelineParams, collaborators: &Collaborators<'_>) -> RunResult {
    let mut result = RunResult::new(params);
    tracing::info!(
        "Starting run. Map: {} Controls: {} Algorithm: {}",
        params.map_path,
        params.controls_path,
        params.algorithm
    );

    if let Err(err) = validate_params(params) {
        return result.fail(err);
    }
    let kind = match AlgorithmKind::resolve(&params.algorithm) {
        Ok(kind) => kind,
        Err(err) => return result.fail(err.into()),
    };
    let dispatcher = Dispatcher::new(kind, params.heuristic, params.gpu, &collaborators.search_table);

    let run = panic::catch_unwind(AssertUnwindSafe(|| {
        execute(params, collaborators, &dispatcher, &mut result)
    }));
    match run {
        Ok(Ok(search)) => {
            result.path = search.path;
            if search.searched_segments == 0 {
                tracing::info!("All waypoints identical, no search needed");
                result.outcome = RunOutcome::NoPathNeeded(IDENTICAL_POINTS_NOTE.to_string());
            } else {
                tracing::info!("Full path found. Length: {}", result.path.len());
                result.outcome = RunOutcome::Routed;
            }
            result
        }
        Ok(Err(err)) => result.fail(err),
        Err(payload) => result.fail(PipelineError::Internal(panic_message(payload.as_ref()))),
    }
}

/// Runs the stages in order, copying what the caller may see into `result`
/// as each one completes.
fn execute(
    params: &PipelineParams,
    collaborators: &Collaborators<'_>,
    dispatcher: &Dispatcher,
    result: &mut RunResult,
) -> Result<SearchStage, PipelineError> {
    let map_started = Instant::now();
    let scan = scan_stage(params, collaborators.scanner)?;
    let grid = grid_stage(params, collaborators.generator);
    result.timings.map_processing = map_started.elapsed();
    let grid = grid?;
    tracing::debug!("Map processing took {:?}", result.timings.map_processing);
    result.processed_grid = Some(grid.grid.clone());
    result.normalization = Some(grid.normalization);
    result.grid_reused = grid.reused;

    let waypoints = waypoint_stage(params, &grid, collaborators.extractor)?;
    result.waypoints_found = waypoints.waypoints.len();

    let aligned = alignment_stage(params, &scan, &grid, collaborators.elevation);
    let alignment = &aligned.alignment;
    result.timings.elevation_fetch = alignment.fetch_duration;
    result.elevation = Some(alignment.raster.clone());
    result.used_dummy_elevation = alignment.used_dummy_elevation;
    result.logical_resolution_m = Some(alignment.logical_resolution_m);
    result.offset = alignment.offset;

    match search_stage(&grid, &waypoints, &aligned, dispatcher) {
        Ok(search) => {
            result.timings.search = search.duration;
            Ok(search)
        }
        Err((err, duration)) => {
            result.timings.search = duration;
            Err(err)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("unexpected panic: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("unexpected panic: {}", message)
    } else {
        "an unknown panic occurred".to_string()
    }
}
