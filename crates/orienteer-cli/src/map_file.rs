//! JSON map documents: georeferencing, content bounds and a feature-code raster.
//!
//! ```json
//! {
//!   "georeference": { "anchor": { "lat": 46.95, "lon": 7.45 }, "map_scale": 10000 },
//!   "bounds": { "min_x": 0, "min_y": 0, "max_x": 400000, "max_y": 300000 },
//!   "terrain": { "width": 4, "height": 3, "codes": ["401", "401", "201", ...] }
//! }
//! ```
//!
//! Coordinates are internal map units; Y grows down the sheet.

use anyhow::{bail, Context, Result};
use orienteer_core::{
    CollaboratorError, GeneratedGrid, GeoReference, GridGenerator, GridRequest, LogicalGrid,
    MapScanner, NormalizationResult, ObstacleCostMap, RawBounds, ScanResult,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Cost of a feature code missing from the obstacle table.
pub const UNKNOWN_CODE_COST: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDocument {
    #[serde(default)]
    pub georeference: Option<GeoReference>,
    #[serde(default)]
    pub bounds: Option<RawBounds>,
    pub terrain: TerrainRaster,
}

/// Row-major feature codes covering `bounds`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainRaster {
    pub width: usize,
    pub height: usize,
    pub codes: Vec<String>,
}

impl MapDocument {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read map file {}", path.display()))?;
        let doc: MapDocument = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse map file {}", path.display()))?;
        doc.terrain.check()?;
        Ok(doc)
    }
}

impl TerrainRaster {
    fn check(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            bail!("terrain raster is empty ({}x{})", self.width, self.height);
        }
        if self.codes.len() != self.width * self.height {
            bail!(
                "terrain raster has {} codes, expected {}x{}",
                self.codes.len(),
                self.width,
                self.height
            );
        }
        Ok(())
    }

    /// Nearest source code for output cell (x, y) of a `width x height` grid.
    fn code_at(&self, x: usize, y: usize, width: usize, height: usize) -> &str {
        let sx = ((x as f64 + 0.5) * self.width as f64 / width as f64) as usize;
        let sy = ((y as f64 + 0.5) * self.height as f64 / height as f64) as usize;
        let idx = sy.min(self.height - 1) * self.width + sx.min(self.width - 1);
        &self.codes[idx]
    }
}

/// Reports georeferencing and bounds straight from the document.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonMapScanner;

impl MapScanner for JsonMapScanner {
    fn scan(&self, map_path: &str) -> Result<ScanResult, CollaboratorError> {
        let doc = MapDocument::load(map_path)?;
        Ok(ScanResult {
            georeference: doc.georeference,
            raw_bounds: doc.bounds,
        })
    }
}

/// Resamples the document's feature raster to the requested size and
/// burns in costs from the obstacle table.
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterGridGenerator;

impl GridGenerator for RasterGridGenerator {
    fn generate(&self, request: &GridRequest<'_>) -> Result<GeneratedGrid, CollaboratorError> {
        let doc = MapDocument::load(request.map_path)?;
        let bounds = doc
            .bounds
            .with_context(|| format!("map file {} has no bounds", request.map_path))?;
        let costs = burn_costs(
            &doc.terrain,
            request.width,
            request.height,
            request.obstacle_costs,
            request.num_threads,
        )?;
        let grid = LogicalGrid::from_costs(request.width, request.height, costs)
            .context("grid size overflow")?;
        Ok(GeneratedGrid {
            grid,
            normalization: normalize(&bounds, request.width, request.height),
        })
    }
}

pub fn normalize(bounds: &RawBounds, width: usize, height: usize) -> NormalizationResult {
    let resolution_x = (bounds.max_x - bounds.min_x) / width as f64;
    let resolution_y = (bounds.max_y - bounds.min_y) / height as f64;
    let valid = resolution_x.is_finite() && resolution_y.is_finite() && resolution_x > 0.0 && resolution_y > 0.0;
    NormalizationResult {
        min_x: bounds.min_x,
        min_y: bounds.min_y,
        resolution_x,
        resolution_y,
        valid,
    }
}

/// Row-major costs for a `width x height` grid, burned row by row on a
/// pool of `threads` workers.
pub fn burn_costs(
    terrain: &TerrainRaster,
    width: usize,
    height: usize,
    table: &ObstacleCostMap,
    threads: usize,
) -> Result<Vec<f32>> {
    let mut costs = vec![UNKNOWN_CODE_COST; width * height];
    if width == 0 || height == 0 {
        return Ok(costs);
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
        .context("failed to build grid worker pool")?;

    pool.install(|| {
        costs.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
            for (x, cell) in row.iter_mut().enumerate() {
                let code = terrain.code_at(x, y, width, height);
                *cell = table.get(code).unwrap_or(UNKNOWN_CODE_COST);
            }
        });
    });
    tracing::debug!("Burned {}x{} grid on {} worker(s)", width, height, pool.current_num_threads());
    Ok(costs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terrain() -> TerrainRaster {
        TerrainRaster {
            width: 2,
            height: 2,
            codes: vec!["401".into(), "201".into(), "999".into(), "501".into()],
        }
    }

    #[test]
    fn burns_known_and_unknown_codes() {
        let table = ObstacleCostMap::production_defaults();
        let costs = burn_costs(&terrain(), 2, 2, &table, 1).unwrap();
        assert_eq!(costs, vec![1.0, -1.0, UNKNOWN_CODE_COST, 0.6]);
    }

    #[test]
    fn upsampling_repeats_nearest_code() {
        let table = ObstacleCostMap::production_defaults();
        let single = burn_costs(&terrain(), 4, 4, &table, 1).unwrap();
        let threaded = burn_costs(&terrain(), 4, 4, &table, 3).unwrap();
        assert_eq!(single, threaded);
        assert_eq!(&single[0..4], &[1.0, 1.0, -1.0, -1.0]);
        assert_eq!(&single[12..16], &[UNKNOWN_CODE_COST, UNKNOWN_CODE_COST, 0.6, 0.6]);
    }

    #[test]
    fn normalization_spreads_bounds_over_cells() {
        let bounds = RawBounds {
            min_x: -1_000.0,
            min_y: 0.0,
            max_x: 9_000.0,
            max_y: 5_000.0,
        };
        let norm = normalize(&bounds, 10, 5);
        assert!(norm.valid);
        assert_eq!(norm.resolution_x, 1_000.0);
        assert_eq!(norm.resolution_y, 1_000.0);

        let flat = RawBounds { max_y: 0.0, ..bounds };
        assert!(!normalize(&flat, 10, 5).valid);
    }
}
