use super::{best_first, SearchContext, SearchOptions};
use crate::models::GridPoint;

/// Uniform-cost search. Ignores any heuristic in `options`.
pub fn find_dijkstra_path(
    ctx: &SearchContext<'_>,
    start: GridPoint,
    goal: GridPoint,
    _options: &SearchOptions,
) -> Vec<usize> {
    best_first(ctx, start, goal, None, 0.0, None)
}
