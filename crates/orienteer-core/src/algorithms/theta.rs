//! Any-angle searches. Returned indices are the path's turning points.

use super::{
    endpoints, heuristic_cost, neighbors, reconstruct, FloatOrd, OpenNode, SearchContext,
    SearchOptions, NO_PARENT,
};
use crate::heuristic::Heuristic;
use crate::models::GridPoint;
use crate::terrain::{self, ElevationSampler};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Theta*: checks line of sight to the grandparent on every relaxation.
pub fn find_theta_star_path(
    ctx: &SearchContext<'_>,
    start: GridPoint,
    goal: GridPoint,
    options: &SearchOptions,
) -> Vec<usize> {
    any_angle(ctx, start, goal, options.heuristic, false)
}

/// Lazy Theta*: assumes line of sight and repairs the parent on expansion.
pub fn find_lazy_theta_star_path(
    ctx: &SearchContext<'_>,
    start: GridPoint,
    goal: GridPoint,
    options: &SearchOptions,
) -> Vec<usize> {
    any_angle(ctx, start, goal, options.heuristic, true)
}

/// Straight-line cost using endpoint terrain only; line of sight unchecked.
fn assumed_cost(
    ctx: &SearchContext<'_>,
    sampler: &ElevationSampler<'_>,
    from: GridPoint,
    to: GridPoint,
) -> Option<f32> {
    let from_cost = ctx.grid.cost(from.x, from.y)?;
    let to_cost = ctx.grid.cost(to.x, to.y)?;
    let dx = (to.x - from.x) as f32;
    let dy = (to.y - from.y) as f32;
    let length_m = (dx * dx + dy * dy).sqrt() * sampler.logical_resolution_m();
    if length_m <= 0.0 {
        return Some(0.0);
    }
    let rise = sampler.sample_cell(to.x, to.y) - sampler.sample_cell(from.x, from.y);
    Some(length_m * terrain::cost_multiplier(0.5 * (from_cost + to_cost), rise / length_m))
}

fn has_line_of_sight(ctx: &SearchContext<'_>, from: GridPoint, to: GridPoint) -> bool {
    terrain::walk_line((from.x, from.y), (to.x, to.y), |x, y| ctx.grid.is_passable(x, y))
}

fn any_angle(
    ctx: &SearchContext<'_>,
    start: GridPoint,
    goal: GridPoint,
    metric: Option<Heuristic>,
    lazy: bool,
) -> Vec<usize> {
    let grid = ctx.grid;
    let Some((start_idx, goal_idx)) = endpoints(grid, start, goal) else {
        return Vec::new();
    };
    if start_idx == goal_idx {
        return vec![start_idx];
    }

    let metric = metric.or(Some(Heuristic::Euclidean));
    let sampler = ctx.sampler();
    let mut g_score = vec![f32::INFINITY; grid.len()];
    let mut parents = vec![NO_PARENT; grid.len()];
    let mut closed = vec![false; grid.len()];
    let mut open: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
    let mut nbuf = Vec::with_capacity(8);

    g_score[start_idx] = 0.0;
    parents[start_idx] = start_idx;
    open.push(Reverse(OpenNode {
        idx: start_idx,
        f_score: FloatOrd(heuristic_cost(metric, start, goal, ctx.logical_resolution_m)),
        g_score: FloatOrd(0.0),
    }));

    while let Some(Reverse(current)) = open.pop() {
        if closed[current.idx] || current.g_score.0 > g_score[current.idx] {
            continue;
        }
        let point = grid.point_of(current.idx);

        if lazy && current.idx != start_idx {
            let parent = grid.point_of(parents[current.idx]);
            if !has_line_of_sight(ctx, parent, point) {
                // Re-parent onto the cheapest closed neighbour.
                let mut best: Option<(usize, f32)> = None;
                neighbors(grid, point, &mut nbuf);
                for candidate in nbuf.iter().copied() {
                    let candidate_idx = grid.index_of(candidate);
                    if !closed[candidate_idx] {
                        continue;
                    }
                    let Some(step) = terrain::step_cost(grid, &sampler, (candidate.x, candidate.y), (point.x, point.y)) else {
                        continue;
                    };
                    let via = g_score[candidate_idx] + step;
                    if best.map_or(true, |(_, cost)| via < cost) {
                        best = Some((candidate_idx, via));
                    }
                }
                match best {
                    Some((parent_idx, cost)) => {
                        parents[current.idx] = parent_idx;
                        g_score[current.idx] = cost;
                    }
                    None => {
                        // Forget the optimistic cost so a later expansion can reopen it.
                        tracing::debug!("Lazy Theta*: no closed neighbour can parent cell {}, reopening", current.idx);
                        g_score[current.idx] = f32::INFINITY;
                        parents[current.idx] = NO_PARENT;
                        continue;
                    }
                }
            }
        }

        if current.idx == goal_idx {
            parents[start_idx] = NO_PARENT;
            return reconstruct(&parents, start_idx, goal_idx);
        }
        closed[current.idx] = true;

        let parent_idx = parents[current.idx];
        let parent = grid.point_of(parent_idx);
        neighbors(grid, point, &mut nbuf);
        for next in nbuf.iter().copied() {
            let next_idx = grid.index_of(next);
            if closed[next_idx] {
                continue;
            }

            let through_parent = if lazy {
                assumed_cost(ctx, &sampler, parent, next)
            } else {
                terrain::line_cost(grid, &sampler, (parent.x, parent.y), (next.x, next.y))
            };
            let (candidate_parent, tentative) = match through_parent {
                Some(cost) => (parent_idx, g_score[parent_idx] + cost),
                None => match terrain::step_cost(grid, &sampler, (point.x, point.y), (next.x, next.y)) {
                    Some(step) => (current.idx, g_score[current.idx] + step),
                    None => continue,
                },
            };

            if tentative < g_score[next_idx] {
                g_score[next_idx] = tentative;
                parents[next_idx] = candidate_parent;
                let h = heuristic_cost(metric, next, goal, ctx.logical_resolution_m);
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
