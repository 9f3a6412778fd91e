pub mod algorithms;
pub mod alignment;
pub mod collaborators;
pub mod dispatch;
pub mod error;
pub mod grid_cache;
pub mod heuristic;
pub mod models;
pub mod obstacles;
pub mod pipeline;
pub mod stitch;
pub mod terrain;

pub use algorithms::{GpuParams, SearchContext, SearchFn, SearchOptions};
pub use alignment::{align, Alignment, AlignmentInput, SYNTHETIC_ELEVATION_M};
pub use collaborators::{
    ElevationProvider, ElevationRequest, GeneratedGrid, GridGenerator, GridRequest, MapScanner,
    WaypointExtractor,
};
pub use dispatch::{AlgorithmKind, Dispatcher, SearchTable};
pub use error::{CollaboratorError, PipelineError, UnsupportedAlgorithm};
pub use grid_cache::{decide, CachedGrid, GridCache, ReuseDecision};
pub use heuristic::{estimate, Heuristic};
pub use models::{
    AlignmentOffset, ElevationRaster, GeoReference, GridPoint, LatLon, LogicalGrid,
    NormalizationResult, ProjectedPoint, RawBounds, ScanResult, WorldBounds, DEFAULT_MAP_SCALE,
};
pub use obstacles::ObstacleCostMap;
pub use pipeline::{
    run_pipeline, validate_params, Collaborators, PhaseTimings, PipelineParams, RunOutcome,
    RunResult, IDENTICAL_POINTS_NOTE,
};
pub use stitch::{stitch_segments, StitchOutcome};
