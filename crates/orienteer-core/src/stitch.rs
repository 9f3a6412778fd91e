//! Runs the search once per consecutive waypoint pair and joins the pieces.

use crate::algorithms::SearchContext;
use crate::dispatch::Dispatcher;
use crate::error::PipelineError;
use crate::models::GridPoint;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct StitchOutcome {
    /// Joined path so far. Only meaningful when `result` is `Ok`.
    pub path: Vec<usize>,
    /// Summed wall-clock time of every search call, including a failing one.
    pub search_duration: Duration,
    /// Segments that actually invoked a search.
    pub searched_segments: usize,
    pub result: Result<(), PipelineError>,
}

impl StitchOutcome {
    fn failed(mut self, err: PipelineError) -> Self {
        tracing::error!("Stitching stopped: {}", err);
        self.result = Err(err);
        self
    }
}

/// Append `segment` to `path`, dropping the shared join index. Returns
/// `false` when the segment does not start where the path ends.
pub fn append_segment(path: &mut Vec<usize>, segment: &[usize]) -> bool {
    let Some((first, rest)) = segment.split_first() else {
        return true;
    };
    match path.last() {
        Some(last) if last == first => {
            path.extend_from_slice(rest);
            true
        }
        Some(_) => {
            path.extend_from_slice(segment);
            false
        }
        None => {
            path.extend_from_slice(segment);
            true
        }
    }
}

/// Segments are processed strictly in order on the calling thread. The first
/// fatal error stops the run.
pub fn stitch_segments(
    ctx: &SearchContext<'_>,
    waypoints: &[GridPoint],
    dispatcher: &Dispatcher,
) -> StitchOutcome {
    let grid = ctx.grid;
    let total = waypoints.len().saturating_sub(1);
    let mut outcome = StitchOutcome {
        path: Vec::new(),
        search_duration: Duration::ZERO,
        searched_segments: 0,
        result: Ok(()),
    };

    for (i, pair) in waypoints.windows(2).enumerate() {
        let segment = i + 1;
        let (start, goal) = (pair[0], pair[1]);
        tracing::debug!(
            "Segment {}/{} from {},{} to {},{}",
            segment,
            total,
            start.x,
            start.y,
            goal.x,
            goal.y
        );

        if !grid.contains(start) || !grid.contains(goal) {
            return outcome.failed(PipelineError::SegmentOutOfBounds {
                segment,
                start,
                goal,
                width: grid.width(),
                height: grid.height(),
            });
        }

        if start == goal {
            tracing::debug!("Segment {} endpoints identical, skipping search", segment);
            let index = grid.index_of(start);
            if outcome.path.last() != Some(&index) {
                outcome.path.push(index);
            }
            continue;
        }

        let started = Instant::now();
        let found = dispatcher.search(ctx, start, goal);
        outcome.search_duration += started.elapsed();
        outcome.searched_segments += 1;

        if found.is_empty() {
            return outcome.failed(PipelineError::PathNotFound { segment, start, goal });
        }
        if let Some(bad) = found.iter().copied().find(|idx| *idx >= grid.len()) {
            return outcome.failed(PipelineError::Internal(format!(
                "{} returned index {} outside a {}x{} grid for segment {}",
                dispatcher.kind(),
                bad,
                grid.width(),
                grid.height(),
                segment
            )));
        }

        let tail = outcome.path.last().copied();
        if !append_segment(&mut outcome.path, &found) {
            tracing::warn!(
                "Segment {} does not start at the previous segment's end (tail {:?}, head {})",
                segment,
                tail,
                found[0]
            );
        }
        tracing::debug!("Segment {} found with {} nodes", segment, found.len());
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{GpuParams, SearchOptions};
    use crate::dispatch::{AlgorithmKind, SearchTable};
    use crate::heuristic::Heuristic;
    use crate::models::{AlignmentOffset, ElevationRaster, LogicalGrid};

    fn straight_line(ctx: &SearchContext<'_>, start: GridPoint, goal: GridPoint, _: &SearchOptions) -> Vec<usize> {
        let step = (goal.x - start.x).signum();
        let mut path = Vec::new();
        let mut x = start.x;
        loop {
            path.push(ctx.grid.index_of(GridPoint::new(x, start.y)));
            if x == goal.x {
                return path;
            }
            x += step;
        }
    }

    fn nothing(_: &SearchContext<'_>, _: GridPoint, _: GridPoint, _: &SearchOptions) -> Vec<usize> {
        Vec::new()
    }

    fn dispatcher(search: crate::algorithms::SearchFn) -> Dispatcher {
        Dispatcher::new(
            AlgorithmKind::Bfs,
            Heuristic::default(),
            GpuParams::default(),
            &SearchTable::uniform(search),
        )
    }

    fn run(waypoints: &[GridPoint], search: crate::algorithms::SearchFn) -> StitchOutcome {
        let grid = LogicalGrid::filled(10, 1, 0.0);
        let raster = ElevationRaster::synthetic(10, 1, 1.0, 0.0);
        let ctx = SearchContext::new(&grid, &raster, 1.0, AlignmentOffset::default());
        stitch_segments(&ctx, waypoints, &dispatcher(search))
    }

    #[test]
    fn join_points_are_not_duplicated() {
        let outcome = run(
            &[GridPoint::new(0, 0), GridPoint::new(3, 0), GridPoint::new(5, 0)],
            straight_line,
        );
        assert_eq!(outcome.result, Ok(()));
        assert_eq!(outcome.path, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(outcome.searched_segments, 2);
    }

    #[test]
    fn identical_points_skip_search() {
        let outcome = run(
            &[GridPoint::new(2, 0), GridPoint::new(2, 0), GridPoint::new(2, 0)],
            nothing,
        );
        assert_eq!(outcome.result, Ok(()));
        assert_eq!(outcome.path, vec![2]);
        assert_eq!(outcome.searched_segments, 0);
    }

    #[test]
    fn out_of_bounds_stops_before_searching() {
        let outcome = run(&[GridPoint::new(0, 0), GridPoint::new(12, 0)], straight_line);
        assert!(matches!(
            outcome.result,
            Err(PipelineError::SegmentOutOfBounds { segment: 1, .. })
        ));
        assert_eq!(outcome.searched_segments, 0);
    }

    #[test]
    fn empty_segment_is_path_not_found() {
        let outcome = run(
            &[GridPoint::new(0, 0), GridPoint::new(1, 0), GridPoint::new(4, 0)],
            nothing,
        );
        assert!(matches!(outcome.result, Err(PipelineError::PathNotFound { segment: 1, .. })));
        assert_eq!(outcome.searched_segments, 1);
    }

    #[test]
    fn append_keeps_disjoint_segments_whole() {
        let mut path = vec![0, 1];
        assert!(append_segment(&mut path, &[1, 2]));
        assert!(!append_segment(&mut path, &[5, 6]));
        assert_eq!(path, vec![0, 1, 2, 5, 6]);
    }
}
