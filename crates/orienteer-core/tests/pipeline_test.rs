//! End-to-end pipeline tests with in-memory collaborators.

use orienteer_core::{
    run_pipeline, AlignmentOffset, CollaboratorError, Collaborators, ElevationProvider,
    ElevationRaster, ElevationRequest, GeneratedGrid, GeoReference, GridCache, GridGenerator,
    GridPoint, GridRequest, LatLon, LogicalGrid, MapScanner, NormalizationResult, PipelineError,
    PipelineParams, ProjectedPoint, RawBounds, RunOutcome, ScanResult, WaypointExtractor,
    WorldBounds, IDENTICAL_POINTS_NOTE,
};
use std::sync::atomic::{AtomicUsize, Ordering};

struct FakeScanner {
    georeferenced: bool,
}

impl MapScanner for FakeScanner {
    fn scan(&self, _map_path: &str) -> Result<ScanResult, CollaboratorError> {
        Ok(ScanResult {
            georeference: self.georeferenced.then_some(GeoReference {
                anchor: LatLon { lat: 46.95, lon: 7.45 },
                map_scale: 10_000.0,
            }),
            raw_bounds: Some(RawBounds {
                min_x: 0.0,
                min_y: 0.0,
                max_x: 10_000.0,
                max_y: 10_000.0,
            }),
        })
    }
}

/// Builds grids from a fixed cost layout and counts how often it is asked.
struct FakeGenerator {
    costs: Option<Vec<f32>>,
    fill: f32,
    calls: AtomicUsize,
}

impl FakeGenerator {
    fn filled(fill: f32) -> Self {
        Self {
            costs: None,
            fill,
            calls: AtomicUsize::new(0),
        }
    }

    fn with_costs(costs: Vec<f32>) -> Self {
        Self {
            costs: Some(costs),
            fill: 1.0,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GridGenerator for FakeGenerator {
    fn generate(&self, request: &GridRequest<'_>) -> Result<GeneratedGrid, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let grid = match &self.costs {
            Some(costs) => LogicalGrid::from_costs(request.width, request.height, costs.clone())
                .ok_or("cost layout does not match requested size")?,
            None => LogicalGrid::filled(request.width, request.height, self.fill),
        };
        Ok(GeneratedGrid {
            grid,
            normalization: NormalizationResult {
                min_x: 0.0,
                min_y: 0.0,
                resolution_x: 1_000.0,
                resolution_y: 1_000.0,
                valid: true,
            },
        })
    }
}

struct FixedWaypoints(Vec<GridPoint>);

impl WaypointExtractor for FixedWaypoints {
    fn extract(
        &self,
        _controls_path: &str,
        _bounds: &WorldBounds,
        _grid_width: usize,
        _grid_height: usize,
    ) -> Result<Vec<GridPoint>, CollaboratorError> {
        Ok(self.0.clone())
    }
}

struct PanickingExtractor;

impl WaypointExtractor for PanickingExtractor {
    fn extract(&self, _: &str, _: &WorldBounds, _: usize, _: usize) -> Result<Vec<GridPoint>, CollaboratorError> {
        panic!("controls parser blew up");
    }
}

struct FakeElevation {
    online: bool,
}

impl ElevationProvider for FakeElevation {
    fn fetch_raster(&self, request: &ElevationRequest<'_>) -> Result<ElevationRaster, CollaboratorError> {
        if !self.online {
            return Err("elevation service unreachable".into());
        }
        let mut raster = ElevationRaster::synthetic(4, 4, request.resolution_m, 0.0);
        raster.values = (0..16).map(|v| v as f32).collect();
        raster.origin_x = 500.0;
        raster.origin_y = 1_000.0;
        Ok(raster)
    }

    fn project(&self, _: &str, _: &str, _: LatLon) -> Result<ProjectedPoint, CollaboratorError> {
        Ok(ProjectedPoint { x: 400.0, y: 1_050.0 })
    }
}

fn params(width: usize, height: usize, algorithm: &str) -> PipelineParams {
    PipelineParams {
        map_path: "terrain.json".to_string(),
        controls_path: "course.json".to_string(),
        grid_width: width,
        grid_height: height,
        algorithm: algorithm.to_string(),
        ..PipelineParams::default()
    }
}

fn offline() -> (FakeScanner, FakeElevation) {
    (FakeScanner { georeferenced: false }, FakeElevation { online: false })
}

#[test]
fn bfs_walks_a_zero_cost_corridor() {
    let (scanner, elevation) = offline();
    let generator = FakeGenerator::with_costs(vec![0.0; 3]);
    let extractor = FixedWaypoints(vec![GridPoint::new(0, 0), GridPoint::new(2, 0)]);
    let collaborators = Collaborators::new(&scanner, &generator, &extractor, &elevation);

    let result = run_pipeline(&params(3, 1, "BFS"), &collaborators);

    assert_eq!(result.outcome, RunOutcome::Routed);
    assert_eq!(result.path, vec![0, 1, 2]);
    assert_eq!(result.waypoints_found, 2);
}

#[test]
fn identical_waypoints_succeed_without_search() {
    let (scanner, elevation) = offline();
    let generator = FakeGenerator::filled(1.0);
    let extractor = FixedWaypoints(vec![GridPoint::new(0, 0), GridPoint::new(0, 0)]);
    let collaborators = Collaborators::new(&scanner, &generator, &extractor, &elevation);

    let result = run_pipeline(&params(4, 4, "Optimized A*"), &collaborators);

    assert!(result.is_success());
    assert_eq!(result.path, vec![0]);
    assert_eq!(result.note(), Some(IDENTICAL_POINTS_NOTE));
    assert!(result.summary().contains("identical points only"));
}

#[test]
fn waypoint_outside_grid_fails_cleanly() {
    let (scanner, elevation) = offline();
    let generator = FakeGenerator::filled(1.0);
    let extractor = FixedWaypoints(vec![GridPoint::new(-1, 0), GridPoint::new(3, 3)]);
    let collaborators = Collaborators::new(&scanner, &generator, &extractor, &elevation);

    let result = run_pipeline(&params(10, 10, "Dijkstra"), &collaborators);

    assert!(!result.is_success());
    assert!(result.path.is_empty());
    let err = result.error().expect("run must fail");
    assert_eq!(err.kind(), "SegmentOutOfBounds");
    assert!(result
        .error_message()
        .unwrap()
        .contains("out of grid bounds (WxH: 10x10)"));
}

#[test]
fn unknown_algorithm_fails_before_any_stage_runs() {
    let (scanner, elevation) = offline();
    let generator = FakeGenerator::filled(1.0);
    // Waypoints are deliberately invalid; the selector must fail first.
    let extractor = FixedWaypoints(vec![GridPoint::new(-5, -5)]);
    let collaborators = Collaborators::new(&scanner, &generator, &extractor, &elevation);

    let result = run_pipeline(&params(10, 10, "Quantum*"), &collaborators);

    assert_eq!(result.error().map(PipelineError::kind), Some("UnsupportedAlgorithm"));
    assert_eq!(
        result.error_message().as_deref(),
        Some("unsupported algorithm selected: Quantum*")
    );
    assert_eq!(generator.calls(), 0);
}

#[test]
fn reuse_skips_generation_on_matching_key() {
    let (scanner, elevation) = offline();
    let generator = FakeGenerator::filled(1.0);
    let extractor = FixedWaypoints(vec![GridPoint::new(0, 0), GridPoint::new(5, 5)]);
    let collaborators = Collaborators::new(&scanner, &generator, &extractor, &elevation);
    let mut cache = GridCache::new();

    let first = run_pipeline(&params(8, 8, "Optimized A*"), &collaborators);
    assert!(first.is_success());
    assert!(cache.remember(&first));
    assert_eq!(generator.calls(), 1);

    let second_params = PipelineParams {
        reuse_grid: true,
        cached_grid: cache.candidate().cloned(),
        ..params(8, 8, "Optimized A*")
    };
    let second = run_pipeline(&second_params, &collaborators);

    assert!(second.is_success());
    assert!(second.grid_reused);
    assert_eq!(generator.calls(), 1);
    assert_eq!(second.processed_grid, first.processed_grid);
    assert_eq!(second.path, first.path);
}

#[test]
fn reuse_is_denied_when_dimensions_change() {
    let (scanner, elevation) = offline();
    let generator = FakeGenerator::filled(1.0);
    let extractor = FixedWaypoints(vec![GridPoint::new(0, 0), GridPoint::new(3, 3)]);
    let collaborators = Collaborators::new(&scanner, &generator, &extractor, &elevation);
    let mut cache = GridCache::new();

    let first = run_pipeline(&params(8, 8, "Dijkstra"), &collaborators);
    cache.remember(&first);

    let resized = PipelineParams {
        reuse_grid: true,
        cached_grid: cache.candidate().cloned(),
        ..params(8, 6, "Dijkstra")
    };
    let second = run_pipeline(&resized, &collaborators);

    assert!(second.is_success());
    assert!(!second.grid_reused);
    assert_eq!(generator.calls(), 2);
    assert_eq!(second.processed_grid.as_ref().map(LogicalGrid::height), Some(6));
}

#[test]
fn elevation_failure_uses_flat_raster_and_zero_offset() {
    let scanner = FakeScanner { georeferenced: true };
    let elevation = FakeElevation { online: false };
    let generator = FakeGenerator::filled(1.0);
    let extractor = FixedWaypoints(vec![GridPoint::new(0, 0), GridPoint::new(4, 2)]);
    let collaborators = Collaborators::new(&scanner, &generator, &extractor, &elevation);

    let result = run_pipeline(&params(6, 6, "Theta*"), &collaborators);

    assert!(result.is_success());
    assert!(result.used_dummy_elevation);
    let raster = result.elevation.as_ref().expect("raster is echoed");
    assert!(raster.is_uniform());
    assert_eq!((raster.width, raster.height), (6, 6));
    assert_eq!(result.offset, AlignmentOffset { x: 0.0, y: 0.0 });
    assert!(result.summary().contains("(Used dummy elevation)"));
}

#[test]
fn real_elevation_sets_offset() {
    let scanner = FakeScanner { georeferenced: true };
    let elevation = FakeElevation { online: true };
    let generator = FakeGenerator::filled(1.0);
    let extractor = FixedWaypoints(vec![GridPoint::new(0, 0), GridPoint::new(4, 2)]);
    let collaborators = Collaborators::new(&scanner, &generator, &extractor, &elevation);

    let result = run_pipeline(&params(6, 6, "Lazy Theta*"), &collaborators);

    assert!(result.is_success());
    assert!(!result.used_dummy_elevation);
    // Grid origin is the anchor itself, so the offset is raster origin minus anchor.
    assert_eq!(result.offset, AlignmentOffset { x: 100.0, y: -50.0 });
    assert_eq!(result.logical_resolution_m, Some(10.0));
}

#[test]
fn zero_elevation_resolution_still_routes_on_flat_terrain() {
    let extractor = FixedWaypoints(vec![GridPoint::new(0, 0), GridPoint::new(4, 2)]);
    let generator = FakeGenerator::filled(1.0);
    let elevation = FakeElevation { online: true };

    for georeferenced in [true, false] {
        let scanner = FakeScanner { georeferenced };
        let collaborators = Collaborators::new(&scanner, &generator, &extractor, &elevation);
        let run = PipelineParams {
            elevation_resolution_m: 0.0,
            ..params(6, 6, "Optimized A*")
        };

        let result = run_pipeline(&run, &collaborators);

        assert!(result.is_success(), "{}", result.summary());
        assert!(result.used_dummy_elevation);
        assert_eq!(result.path.first(), Some(&0));
        assert_eq!(result.path.last(), Some(&16));
        assert_eq!(result.timings.elevation_fetch, std::time::Duration::ZERO);
    }
}

#[test]
fn stitched_route_has_no_repeated_join_nodes() {
    let (scanner, elevation) = offline();
    let generator = FakeGenerator::filled(1.0);
    let extractor = FixedWaypoints(vec![
        GridPoint::new(0, 0),
        GridPoint::new(4, 0),
        GridPoint::new(4, 4),
        GridPoint::new(0, 4),
    ]);
    let collaborators = Collaborators::new(&scanner, &generator, &extractor, &elevation);

    let result = run_pipeline(&params(5, 5, "Dijkstra"), &collaborators);

    assert!(result.is_success());
    assert!(result.path.windows(2).all(|pair| pair[0] != pair[1]));
    assert_eq!(result.path.first(), Some(&0));
    assert_eq!(result.path.last(), Some(&20));
    assert!(result.path.iter().all(|idx| *idx < 25));
}

#[test]
fn blocked_goal_reports_path_not_found() {
    let (scanner, elevation) = offline();
    let generator = FakeGenerator::with_costs(vec![1.0, -1.0, 1.0]);
    let extractor = FixedWaypoints(vec![GridPoint::new(0, 0), GridPoint::new(2, 0)]);
    let collaborators = Collaborators::new(&scanner, &generator, &extractor, &elevation);

    let result = run_pipeline(&params(3, 1, "Optimized A*"), &collaborators);

    assert!(matches!(
        result.error(),
        Some(PipelineError::PathNotFound { segment: 1, .. })
    ));
    assert!(result.path.is_empty());
    // The grid is still echoed so it can be cached.
    assert!(result.processed_grid.is_some());
}

#[test]
fn single_waypoint_is_insufficient() {
    let (scanner, elevation) = offline();
    let generator = FakeGenerator::filled(1.0);
    let extractor = FixedWaypoints(vec![GridPoint::new(1, 1)]);
    let collaborators = Collaborators::new(&scanner, &generator, &extractor, &elevation);

    let result = run_pipeline(&params(4, 4, "BFS"), &collaborators);

    assert_eq!(result.error().map(PipelineError::kind), Some("InsufficientWaypoints"));
}

#[test]
fn collaborator_panic_becomes_internal_error() {
    let (scanner, elevation) = offline();
    let generator = FakeGenerator::filled(1.0);
    let collaborators = Collaborators::new(&scanner, &generator, &PanickingExtractor, &elevation);

    let result = run_pipeline(&params(4, 4, "BFS"), &collaborators);

    assert_eq!(result.error().map(PipelineError::kind), Some("InternalError"));
    assert!(result.error_message().unwrap().contains("controls parser blew up"));
}

#[test]
fn generator_failure_is_grid_generation_error() {
    let (scanner, elevation) = offline();
    // Three costs cannot fill a 4x4 grid.
    let generator = FakeGenerator::with_costs(vec![1.0; 3]);
    let extractor = FixedWaypoints(vec![GridPoint::new(0, 0), GridPoint::new(1, 1)]);
    let collaborators = Collaborators::new(&scanner, &generator, &extractor, &elevation);

    let result = run_pipeline(&params(4, 4, "BFS"), &collaborators);

    assert_eq!(result.error().map(PipelineError::kind), Some("GridGenerationError"));
}

#[tokio::test]
async fn runs_on_a_blocking_worker() {
    let result = tokio::task::spawn_blocking(|| {
        let (scanner, elevation) = offline();
        let generator = FakeGenerator::filled(1.0);
        let extractor = FixedWaypoints(vec![GridPoint::new(0, 0), GridPoint::new(9, 9)]);
        let collaborators = Collaborators::new(&scanner, &generator, &extractor, &elevation);
        run_pipeline(&params(10, 10, "Optimized A*"), &collaborators)
    })
    .await
    .expect("worker task panicked");

    assert_eq!(result.outcome, RunOutcome::Routed);
    assert_eq!(result.path.len(), 10);
}
