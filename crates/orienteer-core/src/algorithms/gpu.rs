//! Host-side reference kernels for the GPU selector set.
//!
//! These follow the device algorithms step for step (bucketed relaxation,
//! light/heavy edge split, heuristic pruning) so results can be compared
//! against the CPU searches on any machine.

use super::{
    best_first, endpoints, heuristic_cost, neighbors, reconstruct, SearchContext, SearchOptions,
    NO_PARENT,
};
use crate::heuristic::Heuristic;
use crate::models::GridPoint;
use crate::terrain;
use std::collections::BTreeMap;

/// Expansion budget for "A* - GPU", as a multiple of the cell count.
const GPU_ASTAR_ITERATION_FACTOR: usize = 4;

/// Delta-stepping single-source search, stopped once the goal's bucket settles.
pub fn find_delta_stepping_path(
    ctx: &SearchContext<'_>,
    start: GridPoint,
    goal: GridPoint,
    options: &SearchOptions,
) -> Vec<usize> {
    delta_stepping(ctx, start, goal, options, None)
}

/// Heuristic-accelerated delta stepping: cells outside the radius around the
/// segment are never relaxed, and cells whose weighted estimate exceeds the
/// best goal cost by `prune_factor` are dropped.
pub fn find_hads_path(
    ctx: &SearchContext<'_>,
    start: GridPoint,
    goal: GridPoint,
    options: &SearchOptions,
) -> Vec<usize> {
    let pruning = Pruning {
        radius: options.gpu.hads_radius.max(0),
        prune_factor: options.gpu.prune_factor.max(1.0),
        heuristic_weight: options.gpu.heuristic_weight.max(0.0),
        metric: options.heuristic.unwrap_or(Heuristic::MinCost),
    };
    delta_stepping(ctx, start, goal, options, Some(pruning))
}

/// A* with an iteration cap, as run by the device kernel.
pub fn find_astar_path_gpu(
    ctx: &SearchContext<'_>,
    start: GridPoint,
    goal: GridPoint,
    options: &SearchOptions,
) -> Vec<usize> {
    let metric = options.heuristic.unwrap_or(Heuristic::MinCost);
    let cap = ctx.grid.len().saturating_mul(GPU_ASTAR_ITERATION_FACTOR);
    best_first(ctx, start, goal, Some(metric), 1.0, Some(cap))
}

#[derive(Debug, Clone, Copy)]
struct Pruning {
    radius: i32,
    prune_factor: f32,
    heuristic_weight: f32,
    metric: Heuristic,
}

impl Pruning {
    fn within_radius(&self, point: GridPoint, start: GridPoint, goal: GridPoint) -> bool {
        let min_x = start.x.min(goal.x) - self.radius;
        let max_x = start.x.max(goal.x) + self.radius;
        let min_y = start.y.min(goal.y) - self.radius;
        let max_y = start.y.max(goal.y) + self.radius;
        (min_x..=max_x).contains(&point.x) && (min_y..=max_y).contains(&point.y)
    }
}

fn delta_stepping(
    ctx: &SearchContext<'_>,
    start: GridPoint,
    goal: GridPoint,
    options: &SearchOptions,
    pruning: Option<Pruning>,
) -> Vec<usize> {
    let grid = ctx.grid;
    let Some((start_idx, goal_idx)) = endpoints(grid, start, goal) else {
        return Vec::new();
    };
    if start_idx == goal_idx {
        return vec![start_idx];
    }

    let delta = if options.gpu.delta.is_finite() && options.gpu.delta > 0.0 {
        options.gpu.delta
    } else {
        ctx.logical_resolution_m.max(1e-3)
    };
    let light_threshold = options.gpu.threshold.max(0.0);
    let sampler = ctx.sampler();
    let mut dist = vec![f32::INFINITY; grid.len()];
    let mut parents = vec![NO_PARENT; grid.len()];
    let mut buckets: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
    let mut nbuf = Vec::with_capacity(8);

    let bucket_of = |d: f32| (d / delta).floor() as u64;
    dist[start_idx] = 0.0;
    buckets.entry(0).or_default().push(start_idx);

    let admissible = |idx: usize, d: f32, dist: &[f32]| -> bool {
        let Some(pruning) = pruning else {
            return true;
        };
        let point = grid.point_of(idx);
        if !pruning.within_radius(point, start, goal) {
            return false;
        }
        let best_goal = dist[goal_idx];
        if !best_goal.is_finite() {
            return true;
        }
        let estimate = d + pruning.heuristic_weight
            * heuristic_cost(Some(pruning.metric), point, goal, ctx.logical_resolution_m);
        estimate <= best_goal * pruning.prune_factor
    };

    while let Some((&bucket, _)) = buckets.iter().next() {
        if dist[goal_idx].is_finite() && bucket_of(dist[goal_idx]) < bucket {
            break;
        }

        // Light phase: repeatedly relax light edges until the bucket empties.
        let mut settled = Vec::new();
        while let Some(frontier) = buckets.remove(&bucket) {
            let mut requests = Vec::new();
            for idx in frontier {
                if bucket_of(dist[idx]) != bucket {
                    continue;
                }
                settled.push(idx);
                collect_requests(ctx, &sampler, idx, &dist, &mut nbuf, &mut requests, |cost| {
                    cost <= light_threshold
                });
            }
            for (target, from, d) in requests {
                if d < dist[target] && admissible(target, d, &dist) {
                    dist[target] = d;
                    parents[target] = from;
                    buckets.entry(bucket_of(d)).or_default().push(target);
                }
            }
        }

        // Heavy phase: relax the remaining edges of every settled cell once.
        let mut requests = Vec::new();
        for idx in settled {
            collect_requests(ctx, &sampler, idx, &dist, &mut nbuf, &mut requests, |cost| {
                cost > light_threshold
            });
        }
        for (target, from, d) in requests {
            if d < dist[target] && admissible(target, d, &dist) {
                dist[target] = d;
                parents[target] = from;
                buckets.entry(bucket_of(d)).or_default().push(target);
            }
        }
    }

    if !dist[goal_idx].is_finite() {
        return Vec::new();
    }
    reconstruct(&parents, start_idx, goal_idx)
}

fn collect_requests<F>(
    ctx: &SearchContext<'_>,
    sampler: &terrain::ElevationSampler<'_>,
    idx: usize,
    dist: &[f32],
    nbuf: &mut Vec<GridPoint>,
    requests: &mut Vec<(usize, usize, f32)>,
    accept: F,
) where
    F: Fn(f32) -> bool,
{
    let grid = ctx.grid;
    let point = grid.point_of(idx);
    neighbors(grid, point, nbuf);
    for next in nbuf.iter().copied() {
        let Some(cost) = terrain::step_cost(grid, sampler, (point.x, point.y), (next.x, next.y)) else {
            continue;
        };
        if accept(cost) {
            requests.push((grid.index_of(next), idx, dist[idx] + cost));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::test_support::*;
    use crate::algorithms::{find_dijkstra_path, GpuParams};
    use crate::models::{ElevationRaster, LogicalGrid};

    #[test]
    fn delta_stepping_matches_dijkstra_cost() {
        let grid = walled_grid();
        let raster = ElevationRaster::synthetic(5, 5, 1.0, 0.0);
        let ctx = flat_context(&grid, &raster);
        let options = SearchOptions {
            heuristic: None,
            gpu: GpuParams {
                delta: 1.0,
                threshold: 1.2,
                ..GpuParams::default()
            },
        };
        let start = GridPoint::new(0, 0);
        let goal = GridPoint::new(4, 0);
        let delta = find_delta_stepping_path(&ctx, start, goal, &options);
        let dijkstra = find_dijkstra_path(&ctx, start, goal, &options);
        assert!(is_connected(&grid, &delta));
        assert!((path_cost(&ctx, &delta) - path_cost(&ctx, &dijkstra)).abs() < 1e-3);
    }

    #[test]
    fn hads_respects_radius() {
        let grid = walled_grid();
        let raster = ElevationRaster::synthetic(5, 5, 1.0, 0.0);
        let ctx = flat_context(&grid, &raster);
        let options = SearchOptions {
            heuristic: Some(Heuristic::MinCost),
            gpu: GpuParams {
                hads_radius: 0,
                ..GpuParams::default()
            },
        };
        // The only way round the wall leaves the start/goal row.
        assert!(find_hads_path(&ctx, GridPoint::new(0, 0), GridPoint::new(4, 0), &options).is_empty());

        let wide = SearchOptions {
            gpu: GpuParams {
                hads_radius: 10,
                ..GpuParams::default()
            },
            ..options
        };
        let path = find_hads_path(&ctx, GridPoint::new(0, 0), GridPoint::new(4, 0), &wide);
        assert_eq!(path.last(), Some(&4));
    }

    #[test]
    fn gpu_astar_finds_open_route() {
        let grid = LogicalGrid::filled(6, 6, 1.0);
        let raster = ElevationRaster::synthetic(6, 6, 1.0, 0.0);
        let ctx = flat_context(&grid, &raster);
        let options = SearchOptions {
            heuristic: Some(Heuristic::Diagonal),
            ..SearchOptions::default()
        };
        let path = find_astar_path_gpu(&ctx, GridPoint::new(0, 0), GridPoint::new(5, 5), &options);
        assert_eq!(path.len(), 6);
    }
}
