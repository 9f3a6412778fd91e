//! Brings the logical grid and an elevation raster into one frame.
//!
//! The result is always usable. When real elevation cannot be obtained the
//! aligner substitutes a flat raster matching the logical grid, with a zero
//! offset, and reports that it did so.

use crate::collaborators::{ElevationProvider, ElevationRequest};
use crate::models::{
    AlignmentOffset, ElevationRaster, NormalizationResult, ProjectedPoint, ScanResult,
};
use std::time::{Duration, Instant};

/// Elevation of the flat stand-in raster, in metres.
pub const SYNTHETIC_ELEVATION_M: f32 = 100.0;

/// Internal map units (micrometres on paper) per metre on paper.
const INTERNAL_UNITS_PER_METRE: f64 = 1_000_000.0;

const MIN_LOGICAL_RESOLUTION_M: f64 = 1e-6;

/// What the aligner needs to know about the current run.
#[derive(Debug, Clone, Copy)]
pub struct AlignmentInput<'a> {
    pub scan: &'a ScanResult,
    pub normalization: &'a NormalizationResult,
    pub grid_width: usize,
    pub grid_height: usize,
    pub elevation_resolution_m: f64,
    pub provider_module: &'a str,
    pub fetch_function: &'a str,
    pub convert_function: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub raster: ElevationRaster,
    pub offset: AlignmentOffset,
    pub logical_resolution_m: f32,
    pub used_dummy_elevation: bool,
    /// Why real elevation was not used, when it was not.
    pub fallback_reason: Option<String>,
    /// Zero when no fetch was attempted.
    pub fetch_duration: Duration,
}

/// Metres on the ground per internal map unit.
pub fn metres_per_internal_unit(map_scale: f64) -> f64 {
    map_scale / INTERNAL_UNITS_PER_METRE
}

/// Ground size of one logical cell. Degenerate scales fall back to 1 m.
pub fn logical_resolution_m(
    normalization: &NormalizationResult,
    grid_width: usize,
    grid_height: usize,
    map_scale: f64,
) -> f32 {
    let bounds = normalization.world_bounds(grid_width, grid_height);
    let units_per_cell = if grid_width > 0 {
        bounds.width() / grid_width as f64
    } else {
        0.0
    };
    let resolution = units_per_cell * metres_per_internal_unit(map_scale);
    if !resolution.is_finite() || resolution <= MIN_LOGICAL_RESOLUTION_M {
        tracing::warn!(
            "Logical resolution {} m is degenerate, using fallback 1.0 m",
            resolution
        );
        return 1.0;
    }
    resolution as f32
}

/// Displacement of the logical grid origin from the raster origin.
///
/// The grid origin is placed relative to the projected anchor. Internal Y
/// grows downwards on the map while projected Y grows north, hence the flip.
pub fn origin_offset(
    raster: &ElevationRaster,
    anchor_projected: ProjectedPoint,
    normalization: &NormalizationResult,
    map_scale: f64,
) -> AlignmentOffset {
    let mpu = metres_per_internal_unit(map_scale);
    let logical_origin_x = anchor_projected.x + normalization.min_x * mpu;
    let logical_origin_y = anchor_projected.y - normalization.min_y * mpu;
    AlignmentOffset {
        x: (raster.origin_x - logical_origin_x) as f32,
        y: (raster.origin_y - logical_origin_y) as f32,
    }
}

pub fn align(input: &AlignmentInput<'_>, provider: &dyn ElevationProvider) -> Alignment {
    let map_scale = input.scan.map_scale();
    let logical_resolution_m =
        logical_resolution_m(input.normalization, input.grid_width, input.grid_height, map_scale);
    tracing::debug!("Logical cell resolution: {} m", logical_resolution_m);

    let (Some(georeference), Some(bounds)) = (input.scan.georeference, input.scan.raw_bounds) else {
        tracing::debug!("Skipping elevation fetch, map has no georeferencing");
        return synthetic(input, logical_resolution_m, "map has no georeferencing".to_string(), Duration::ZERO);
    };

    let resolution_m = input.elevation_resolution_m;
    if !(resolution_m.is_finite() && resolution_m > 0.0) {
        tracing::warn!("Elevation resolution {} m is not usable, skipping fetch", resolution_m);
        let reason = format!("invalid elevation resolution {}", resolution_m);
        return synthetic(input, logical_resolution_m, reason, Duration::ZERO);
    }

    let request = ElevationRequest {
        module: input.provider_module,
        function: input.fetch_function,
        anchor: georeference.anchor,
        anchor_internal: (0.0, 0.0),
        bounds,
        map_scale,
        resolution_m,
    };
    let started = Instant::now();
    let fetched = provider.fetch_raster(&request);
    let fetch_duration = started.elapsed();

    let raster = match fetched {
        Ok(raster) if raster.has_data() && raster.resolution_m > 0.0 => raster,
        Ok(raster) => {
            let reason = format!(
                "elevation provider returned an unusable {}x{} raster",
                raster.width, raster.height
            );
            tracing::warn!("Elevation fetch failed: {}", reason);
            return synthetic(input, logical_resolution_m, reason, fetch_duration);
        }
        Err(err) => {
            tracing::warn!("Elevation fetch failed: {}", err);
            return synthetic(input, logical_resolution_m, err.to_string(), fetch_duration);
        }
    };
    tracing::debug!(
        "Fetched {}x{} elevation raster at {} m in {:?}",
        raster.width,
        raster.height,
        raster.resolution_m,
        fetch_duration
    );

    let anchor = match provider.project(input.provider_module, input.convert_function, georeference.anchor) {
        Ok(anchor) => anchor,
        Err(err) => {
            tracing::warn!("Could not project anchor lat/lon: {}. Using synthetic elevation", err);
            return synthetic(input, logical_resolution_m, err.to_string(), fetch_duration);
        }
    };

    let offset = origin_offset(&raster, anchor, input.normalization, map_scale);
    tracing::debug!("Origin offset (m): x={} y={}", offset.x, offset.y);
    Alignment {
        raster,
        offset,
        logical_resolution_m,
        used_dummy_elevation: false,
        fallback_reason: None,
        fetch_duration,
    }
}

fn synthetic(
    input: &AlignmentInput<'_>,
    logical_resolution_m: f32,
    reason: String,
    fetch_duration: Duration,
) -> Alignment {
    Alignment {
        raster: ElevationRaster::synthetic(
            input.grid_width,
            input.grid_height,
            f64::from(logical_resolution_m),
            SYNTHETIC_ELEVATION_M,
        ),
        offset: AlignmentOffset::default(),
        logical_resolution_m,
        used_dummy_elevation: true,
        fallback_reason: Some(reason),
        fetch_duration,
    }
}
