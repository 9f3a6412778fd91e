use super::{endpoints, neighbors, reconstruct, SearchContext, SearchOptions, NO_PARENT};
use crate::models::GridPoint;
use std::collections::VecDeque;

/// Fewest-steps search. Terrain cost only matters for passability.
pub fn find_bfs_path(
    ctx: &SearchContext<'_>,
    start: GridPoint,
    goal: GridPoint,
    _options: &SearchOptions,
) -> Vec<usize> {
    let grid = ctx.grid;
    let Some((start_idx, goal_idx)) = endpoints(grid, start, goal) else {
        return Vec::new();
    };
    if start_idx == goal_idx {
        return vec![start_idx];
    }

    let mut parents = vec![NO_PARENT; grid.len()];
    let mut seen = vec![false; grid.len()];
    let mut queue = VecDeque::new();
    let mut nbuf = Vec::with_capacity(8);
    seen[start_idx] = true;
    queue.push_back(start_idx);

    while let Some(current) = queue.pop_front() {
        if current == goal_idx {
            return reconstruct(&parents, start_idx, goal_idx);
        }
        neighbors(grid, grid.point_of(current), &mut nbuf);
        for next in nbuf.iter().copied() {
            let next_idx = grid.index_of(next);
            if seen[next_idx] {
                continue;
            }
            seen[next_idx] = true;
            parents[next_idx] = current;
            queue.push_back(next_idx);
        }
    }

    Vec::new()
}
