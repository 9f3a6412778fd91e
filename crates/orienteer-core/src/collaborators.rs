//! Interfaces to the stages the pipeline does not implement itself.
//!
//! Every call may fail with a [`CollaboratorError`]. Scanner, generator and
//! extractor failures end the run; elevation and projection failures are
//! absorbed by the aligner.

use crate::error::CollaboratorError;
use crate::models::{
    ElevationRaster, GridPoint, LatLon, LogicalGrid, NormalizationResult, ProjectedPoint, RawBounds,
    ScanResult, WorldBounds,
};
use crate::obstacles::ObstacleCostMap;

/// Reads georeferencing and coordinate bounds from a map file.
pub trait MapScanner {
    fn scan(&self, map_path: &str) -> Result<ScanResult, CollaboratorError>;
}

/// Everything the grid generator is told about the grid it should build.
#[derive(Debug, Clone, Copy)]
pub struct GridRequest<'a> {
    pub map_path: &'a str,
    pub width: usize,
    pub height: usize,
    pub obstacle_costs: &'a ObstacleCostMap,
    /// Worker threads the generator may use. Not used by the pipeline itself.
    pub num_threads: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedGrid {
    pub grid: LogicalGrid,
    pub normalization: NormalizationResult,
}

/// Rasterizes a map into a cost grid of the requested size.
pub trait GridGenerator {
    fn generate(&self, request: &GridRequest<'_>) -> Result<GeneratedGrid, CollaboratorError>;
}

/// Turns a controls file into ordered grid coordinates (start, controls, finish).
pub trait WaypointExtractor {
    fn extract(
        &self,
        controls_path: &str,
        bounds: &WorldBounds,
        grid_width: usize,
        grid_height: usize,
    ) -> Result<Vec<GridPoint>, CollaboratorError>;
}

/// Area and sampling density of an elevation request.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationRequest<'a> {
    pub module: &'a str,
    pub function: &'a str,
    pub anchor: LatLon,
    /// Internal-unit coordinates of the anchor; always the origin.
    pub anchor_internal: (f64, f64),
    pub bounds: RawBounds,
    pub map_scale: f64,
    pub resolution_m: f64,
}

/// Elevation source and the lat/lon to projected-CRS conversion that goes
/// with it.
pub trait ElevationProvider {
    fn fetch_raster(&self, request: &ElevationRequest<'_>) -> Result<ElevationRaster, CollaboratorError>;

    fn project(&self, module: &str, function: &str, point: LatLon) -> Result<ProjectedPoint, CollaboratorError>;
}
