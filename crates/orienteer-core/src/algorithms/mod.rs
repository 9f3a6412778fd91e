//! Search entry points sharing one calling convention.
//!
//! Every entry point takes a [`SearchContext`], a start and goal cell and
//! [`SearchOptions`], and returns row-major cell indices from start to goal
//! inclusive. An empty vector means no path exists.

mod astar;
mod bfs;
mod dijkstra;
#[cfg(feature = "gpu")]
mod gpu;
mod theta;

pub use astar::find_astar_path;
pub use bfs::find_bfs_path;
pub use dijkstra::find_dijkstra_path;
#[cfg(feature = "gpu")]
pub use gpu::{find_astar_path_gpu, find_delta_stepping_path, find_hads_path};
pub use theta::{find_lazy_theta_star_path, find_theta_star_path};

use crate::heuristic::{self, Heuristic};
use crate::models::{AlignmentOffset, ElevationRaster, GridPoint, LogicalGrid};
use crate::terrain::{self, ElevationSampler};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// 8-connected neighbourhood: orthogonal moves first, then diagonals.
pub(crate) const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (0, 1),
    (-1, 0),
    (0, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
    (1, -1),
];

/// Everything a search needs to price a move.
#[derive(Debug, Clone, Copy)]
pub struct SearchContext<'a> {
    pub grid: &'a LogicalGrid,
    pub elevation_values: &'a [f32],
    pub elevation_width: usize,
    pub elevation_height: usize,
    pub logical_resolution_m: f32,
    pub elevation_resolution_m: f32,
    pub offset: AlignmentOffset,
}

impl<'a> SearchContext<'a> {
    pub fn new(
        grid: &'a LogicalGrid,
        elevation: &'a ElevationRaster,
        logical_resolution_m: f32,
        offset: AlignmentOffset,
    ) -> Self {
        Self {
            grid,
            elevation_values: &elevation.values,
            elevation_width: elevation.width,
            elevation_height: elevation.height,
            logical_resolution_m,
            elevation_resolution_m: elevation.resolution_m as f32,
            offset,
        }
    }

    pub fn sampler(&self) -> ElevationSampler<'a> {
        ElevationSampler::new(
            self.elevation_values,
            self.elevation_width,
            self.elevation_height,
            self.elevation_resolution_m,
            self.logical_resolution_m,
            self.offset,
        )
    }
}

/// Tuning for the GPU selector set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpuParams {
    pub delta: f32,
    pub threshold: f32,
    pub hads_radius: i32,
    pub prune_factor: f32,
    pub heuristic_weight: f32,
}

impl Default for GpuParams {
    fn default() -> Self {
        Self {
            delta: 50.0,
            threshold: 50.0,
            hads_radius: 1000,
            prune_factor: 1.05,
            heuristic_weight: 0.95,
        }
    }
}

/// Per-call options. `heuristic` is only set for heuristic-consuming kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SearchOptions {
    pub heuristic: Option<Heuristic>,
    pub gpu: GpuParams,
}

/// Uniform search entry point.
pub type SearchFn = fn(&SearchContext<'_>, GridPoint, GridPoint, &SearchOptions) -> Vec<usize>;

#[derive(Debug, Clone, Copy)]
pub(crate) struct FloatOrd(pub f32);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OpenNode {
    pub idx: usize,
    pub f_score: FloatOrd,
    pub g_score: FloatOrd,
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_score
            .cmp(&other.f_score)
            .then_with(|| other.g_score.cmp(&self.g_score))
            .then_with(|| self.idx.cmp(&other.idx))
    }
}

pub(crate) const NO_PARENT: usize = usize::MAX;

/// Start and goal indices when both are inside the grid and passable.
pub(crate) fn endpoints(grid: &LogicalGrid, start: GridPoint, goal: GridPoint) -> Option<(usize, usize)> {
    if !grid.contains(start) || !grid.contains(goal) {
        return None;
    }
    if !grid.is_passable(start.x, start.y) || !grid.is_passable(goal.x, goal.y) {
        return None;
    }
    Some((grid.index_of(start), grid.index_of(goal)))
}

/// Passable neighbours of `point`. Diagonal moves are refused when both
/// orthogonal cells they pass between are blocked.
pub(crate) fn neighbors(grid: &LogicalGrid, point: GridPoint, buf: &mut Vec<GridPoint>) {
    buf.clear();
    for (dx, dy) in DIRECTIONS {
        let nx = point.x + dx;
        let ny = point.y + dy;
        if !grid.is_passable(nx, ny) {
            continue;
        }
        if dx != 0 && dy != 0 && !grid.is_passable(point.x + dx, point.y) && !grid.is_passable(point.x, point.y + dy) {
            continue;
        }
        buf.push(GridPoint::new(nx, ny));
    }
}

/// Walk the parent chain back from `goal`.
pub(crate) fn reconstruct(parents: &[usize], start: usize, goal: usize) -> Vec<usize> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        let parent = parents[current];
        if parent == NO_PARENT {
            return Vec::new();
        }
        path.push(parent);
        current = parent;
    }
    path.reverse();
    path
}

/// Heuristic estimate in cost units (metres at unit terrain multiplier).
pub(crate) fn heuristic_cost(metric: Option<Heuristic>, from: GridPoint, to: GridPoint, resolution_m: f32) -> f32 {
    match metric {
        Some(metric) => heuristic::estimate(from.x, from.y, to.x, to.y, metric) * resolution_m,
        None => 0.0,
    }
}

/// Best-first search over 8-connected steps. `weight == 0` gives Dijkstra,
/// `weight == 1` plain A*, larger weights trade optimality for speed.
pub(crate) fn best_first(
    ctx: &SearchContext<'_>,
    start: GridPoint,
    goal: GridPoint,
    metric: Option<Heuristic>,
    weight: f32,
    max_expansions: Option<usize>,
) -> Vec<usize> {
    let grid = ctx.grid;
    let Some((start_idx, goal_idx)) = endpoints(grid, start, goal) else {
        return Vec::new();
    };
    if start_idx == goal_idx {
        return vec![start_idx];
    }

    let sampler = ctx.sampler();
    let mut g_score = vec![f32::INFINITY; grid.len()];
    let mut parents = vec![NO_PARENT; grid.len()];
    let mut closed = vec![false; grid.len()];
    let mut open: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
    let mut nbuf = Vec::with_capacity(8);

    g_score[start_idx] = 0.0;
    open.push(Reverse(OpenNode {
        idx: start_idx,
        f_score: FloatOrd(weight * heuristic_cost(metric, start, goal, ctx.logical_resolution_m)),
        g_score: FloatOrd(0.0),
    }));

    let mut expansions = 0usize;
    while let Some(Reverse(current)) = open.pop() {
        if closed[current.idx] || current.g_score.0 > g_score[current.idx] {
            continue;
        }
        if current.idx == goal_idx {
            return reconstruct(&parents, start_idx, goal_idx);
        }
        closed[current.idx] = true;
        expansions += 1;
        if max_expansions.is_some_and(|cap| expansions > cap) {
            break;
        }

        let point = grid.point_of(current.idx);
        neighbors(grid, point, &mut nbuf);
        for next in nbuf.iter().copied() {
            let next_idx = grid.index_of(next);
            if closed[next_idx] {
                continue;
            }
            let Some(step) = terrain::step_cost(grid, &sampler, (point.x, point.y), (next.x, next.y)) else {
                continue;
            };
            let tentative = g_score[current.idx] + step;
            if tentative < g_score[next_idx] {
                g_score[next_idx] = tentative;
                parents[next_idx] = current.idx;
                let h = weight * heuristic_cost(metric, next, goal, ctx.logical_resolution_m);
                open.push(Reverse(OpenNode {
                    idx: next_idx,
                    f_score: FloatOrd(tentative + h),
                    g_score: FloatOrd(tentative),
                }));
            }
        }
    }

    Vec::new()
}
