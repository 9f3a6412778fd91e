//! Core data models shared by every pipeline stage.

use serde::{Deserialize, Serialize};

/// Map scale assumed when the scanner finds no georeferencing block.
pub const DEFAULT_MAP_SCALE: f64 = 10_000.0;

/// Integer cell coordinate in logical-grid space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

impl GridPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Terrain cost grid the searches operate on.
///
/// Each cell holds a cost multiplier; negative or non-finite values mark
/// impassable cells. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalGrid {
    width: usize,
    height: usize,
    costs: Vec<f32>,
}

impl LogicalGrid {
    /// Build a grid from row-major costs. Returns `None` when the cost
    /// count does not match `width * height`.
    pub fn from_costs(width: usize, height: usize, costs: Vec<f32>) -> Option<Self> {
        if costs.len() != width.checked_mul(height)? {
            return None;
        }
        Some(Self {
            width,
            height,
            costs,
        })
    }

    /// Grid with every cell set to `cost`.
    pub fn filled(width: usize, height: usize, cost: f32) -> Self {
        Self {
            width,
            height,
            costs: vec![cost; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    pub fn costs(&self) -> &[f32] {
        &self.costs
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    pub fn contains(&self, point: GridPoint) -> bool {
        self.in_bounds(point.x, point.y)
    }

    /// Row-major index (`y * width + x`). Caller guarantees bounds.
    pub fn index_of(&self, point: GridPoint) -> usize {
        point.y as usize * self.width + point.x as usize
    }

    pub fn point_of(&self, index: usize) -> GridPoint {
        GridPoint {
            x: (index % self.width) as i32,
            y: (index / self.width) as i32,
        }
    }

    pub fn cost(&self, x: i32, y: i32) -> Option<f32> {
        if !self.in_bounds(x, y) {
            return None;
        }
        self.costs.get(y as usize * self.width + x as usize).copied()
    }

    pub fn is_passable(&self, x: i32, y: i32) -> bool {
        self.cost(x, y)
            .map(|cost| cost.is_finite() && cost >= 0.0)
            .unwrap_or(false)
    }
}

/// Mapping between the map file's internal units and the logical grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationResult {
    pub min_x: f64,
    pub min_y: f64,
    /// Internal units per cell along X.
    pub resolution_x: f64,
    /// Internal units per cell along Y.
    pub resolution_y: f64,
    pub valid: bool,
}

impl NormalizationResult {
    /// Extent of a `width x height` grid in internal units.
    pub fn world_bounds(&self, width: usize, height: usize) -> WorldBounds {
        WorldBounds {
            min_x: self.min_x,
            min_y: self.min_y,
            max_x: self.min_x + width as f64 * self.resolution_x,
            max_y: self.min_y + height as f64 * self.resolution_y,
        }
    }
}

/// Extent of the logical grid in internal map units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl WorldBounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Coordinate bounds of the map content in internal units, as scanned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// Georeferencing found in the map file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoReference {
    /// Real-world position of internal coordinate (0, 0).
    pub anchor: LatLon,
    /// Map scale denominator (e.g. 10000 for 1:10000).
    pub map_scale: f64,
}

/// What the map scanner learned about a map file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub georeference: Option<GeoReference>,
    pub raw_bounds: Option<RawBounds>,
}

impl ScanResult {
    pub fn map_scale(&self) -> f64 {
        self.georeference
            .map(|georef| georef.map_scale)
            .filter(|scale| scale.is_finite() && *scale > 0.0)
            .unwrap_or(DEFAULT_MAP_SCALE)
    }
}

/// Elevation samples in a projected, north-up coordinate system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevationRaster {
    pub width: usize,
    pub height: usize,
    pub resolution_m: f64,
    /// Projected X of the raster's top-left corner.
    pub origin_x: f64,
    /// Projected Y of the raster's top-left corner.
    pub origin_y: f64,
    pub values: Vec<f32>,
}

impl ElevationRaster {
    /// Flat stand-in used whenever real elevation is unavailable.
    pub fn synthetic(width: usize, height: usize, resolution_m: f64, value: f32) -> Self {
        Self {
            width,
            height,
            resolution_m,
            origin_x: 0.0,
            origin_y: 0.0,
            values: vec![value; width * height],
        }
    }

    pub fn has_data(&self) -> bool {
        self.width > 0 && self.height > 0 && self.values.len() == self.width * self.height
    }

    pub fn is_uniform(&self) -> bool {
        match self.values.first() {
            Some(first) => self.values.iter().all(|value| value == first),
            None => true,
        }
    }
}

/// Displacement in metres of the logical grid origin relative to the
/// elevation raster origin, both in the raster's projected CRS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignmentOffset {
    pub x: f32,
    pub y: f32,
}

/// Point expressed in a projected CRS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
}
