use super::{best_first, SearchContext, SearchOptions};
use crate::models::GridPoint;

/// "Optimized A*": 8-connected A* over the slope-aware cost model.
///
/// Falls back to Euclidean when no heuristic was forwarded.
pub fn find_astar_path(
    ctx: &SearchContext<'_>,
    start: GridPoint,
    goal: GridPoint,
    options: &SearchOptions,
) -> Vec<usize> {
    let metric = options.heuristic.unwrap_or(crate::heuristic::Heuristic::Euclidean);
    best_first(ctx, start, goal, Some(metric), 1.0, None)
}
