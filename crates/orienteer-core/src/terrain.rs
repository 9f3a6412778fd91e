//! Elevation sampling and the slope-aware step cost used by the searches.

use crate::heuristic::MIN_COST_FACTOR;
use crate::models::{AlignmentOffset, ElevationRaster, LogicalGrid};

/// Tobler's hiking function: walking speed in km/h for a given slope (dh/dx).
pub fn tobler_speed_kmh(slope: f32) -> f32 {
    6.0 * (-3.5 * (slope + 0.05).abs()).exp()
}

/// Multiplier applied to a step's length relative to walking on flat ground.
pub fn slope_penalty(slope: f32) -> f32 {
    let flat = tobler_speed_kmh(0.0);
    let speed = tobler_speed_kmh(slope).max(1e-3);
    flat / speed
}

/// Combined terrain x slope multiplier per metre, floored at
/// [`MIN_COST_FACTOR`] so the min-cost estimate stays a lower bound.
pub fn cost_multiplier(terrain: f32, slope: f32) -> f32 {
    (terrain * slope_penalty(slope)).max(MIN_COST_FACTOR)
}

/// Looks up elevation under logical-grid cells.
#[derive(Debug, Clone, Copy)]
pub struct ElevationSampler<'a> {
    values: &'a [f32],
    width: usize,
    height: usize,
    elevation_resolution_m: f32,
    logical_resolution_m: f32,
    offset: AlignmentOffset,
}

impl<'a> ElevationSampler<'a> {
    pub fn new(
        values: &'a [f32],
        width: usize,
        height: usize,
        elevation_resolution_m: f32,
        logical_resolution_m: f32,
        offset: AlignmentOffset,
    ) -> Self {
        Self {
            values,
            width,
            height,
            elevation_resolution_m: elevation_resolution_m.max(1e-6),
            logical_resolution_m: logical_resolution_m.max(1e-6),
            offset,
        }
    }

    pub fn from_raster(
        raster: &'a ElevationRaster,
        logical_resolution_m: f32,
        offset: AlignmentOffset,
    ) -> Self {
        Self::new(
            &raster.values,
            raster.width,
            raster.height,
            raster.resolution_m as f32,
            logical_resolution_m,
            offset,
        )
    }

    pub fn logical_resolution_m(&self) -> f32 {
        self.logical_resolution_m
    }

    /// Elevation at the centre of logical cell (x, y).
    pub fn sample_cell(&self, x: i32, y: i32) -> f32 {
        let x_m = (x as f32 + 0.5) * self.logical_resolution_m;
        let y_m = (y as f32 + 0.5) * self.logical_resolution_m;
        let col = (x_m - self.offset.x) / self.elevation_resolution_m - 0.5;
        let row = (y_m + self.offset.y) / self.elevation_resolution_m - 0.5;
        self.bilinear(col, row)
    }

    fn bilinear(&self, col: f32, row: f32) -> f32 {
        if self.width == 0 || self.height == 0 || !col.is_finite() || !row.is_finite() {
            return 0.0;
        }
        let max_col = (self.width - 1) as f32;
        let max_row = (self.height - 1) as f32;
        let col = col.clamp(0.0, max_col);
        let row = row.clamp(0.0, max_row);

        let c0 = col.floor() as usize;
        let r0 = row.floor() as usize;
        let c1 = (c0 + 1).min(self.width - 1);
        let r1 = (r0 + 1).min(self.height - 1);
        let dc = col - c0 as f32;
        let dr = row - r0 as f32;

        let v00 = self.value_at(r0, c0);
        let v01 = self.value_at(r0, c1);
        let v10 = self.value_at(r1, c0);
        let v11 = self.value_at(r1, c1);

        let top = v00 + (v01 - v00) * dc;
        let bottom = v10 + (v11 - v10) * dc;
        top + (bottom - top) * dr
    }

    fn value_at(&self, row: usize, col: usize) -> f32 {
        let idx = row.saturating_mul(self.width) + col.min(self.width - 1);
        self.values
            .get(idx)
            .copied()
            .filter(|value| value.is_finite())
            .unwrap_or(0.0)
    }
}

/// Step cost between two passable cells (any distance, any direction).
///
/// `length_m` x mean terrain multiplier x Tobler slope penalty, see
/// [`cost_multiplier`].
pub fn step_cost(
    grid: &LogicalGrid,
    sampler: &ElevationSampler<'_>,
    from: (i32, i32),
    to: (i32, i32),
) -> Option<f32> {
    let from_cost = grid.cost(from.0, from.1).filter(|c| c.is_finite() && *c >= 0.0)?;
    let to_cost = grid.cost(to.0, to.1).filter(|c| c.is_finite() && *c >= 0.0)?;

    let dx = (to.0 - from.0) as f32;
    let dy = (to.1 - from.1) as f32;
    let length_m = (dx * dx + dy * dy).sqrt() * sampler.logical_resolution_m();
    if length_m <= 0.0 {
        return Some(0.0);
    }

    let rise = sampler.sample_cell(to.0, to.1) - sampler.sample_cell(from.0, from.1);
    let terrain = 0.5 * (from_cost + to_cost);
    Some(length_m * cost_multiplier(terrain, rise / length_m))
}

/// Mean terrain multiplier along a Bresenham line, or `None` if any cell on
/// the line is impassable.
pub fn line_terrain_cost(grid: &LogicalGrid, from: (i32, i32), to: (i32, i32)) -> Option<f32> {
    let mut total = 0.0f32;
    let mut count = 0u32;
    let clear = walk_line(from, to, |x, y| {
        if !grid.is_passable(x, y) {
            return false;
        }
        total += grid.cost(x, y).unwrap_or(0.0);
        count += 1;
        true
    });
    if !clear || count == 0 {
        return None;
    }
    Some(total / count as f32)
}

/// Cost of moving straight from `from` to `to` when the line is clear.
pub fn line_cost(
    grid: &LogicalGrid,
    sampler: &ElevationSampler<'_>,
    from: (i32, i32),
    to: (i32, i32),
) -> Option<f32> {
    let terrain = line_terrain_cost(grid, from, to)?;
    let dx = (to.0 - from.0) as f32;
    let dy = (to.1 - from.1) as f32;
    let length_m = (dx * dx + dy * dy).sqrt() * sampler.logical_resolution_m();
    if length_m <= 0.0 {
        return Some(0.0);
    }
    let rise = sampler.sample_cell(to.0, to.1) - sampler.sample_cell(from.0, from.1);
    Some(length_m * cost_multiplier(terrain, rise / length_m))
}

/// Bresenham walk from `p0` to `p1` inclusive. Stops early and returns
/// `false` as soon as `visit` does.
pub fn walk_line<F>(p0: (i32, i32), p1: (i32, i32), mut visit: F) -> bool
where
    F: FnMut(i32, i32) -> bool,
{
    let (mut x0, mut y0) = p0;
    let (x1, y1) = p1;
    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx - dy;

    loop {
        if !visit(x0, y0) {
            return false;
        }
        if x0 == x1 && y0 == y1 {
            return true;
        }
        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x0 += sx;
        }
        if e2 < dx {
            err += dx;
            y0 += sy;
        }
    }
}
