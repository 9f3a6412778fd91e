//! Algorithm selection and dispatch.
//!
//! Selector strings are resolved once, up front, into an [`AlgorithmKind`].
//! The [`Dispatcher`] then forwards every segment to the matching entry in a
//! [`SearchTable`] without further string handling.

use crate::algorithms::{self, GpuParams, SearchContext, SearchFn, SearchOptions};
use crate::error::UnsupportedAlgorithm;
use crate::heuristic::Heuristic;
use crate::models::GridPoint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Substring that marks a selector as belonging to the GPU set.
pub const GPU_MARKER: &str = "GPU";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlgorithmKind {
    OptimizedAStar,
    Dijkstra,
    Bfs,
    ThetaStar,
    LazyThetaStar,
    #[cfg(feature = "gpu")]
    DeltaSteppingGpu,
    #[cfg(feature = "gpu")]
    HadsGpu,
    #[cfg(feature = "gpu")]
    AStarGpu,
}

impl AlgorithmKind {
    /// Every kind compiled into this build, in menu order.
    pub fn available() -> &'static [AlgorithmKind] {
        &[
            AlgorithmKind::OptimizedAStar,
            AlgorithmKind::Dijkstra,
            AlgorithmKind::Bfs,
            AlgorithmKind::ThetaStar,
            AlgorithmKind::LazyThetaStar,
            #[cfg(feature = "gpu")]
            AlgorithmKind::DeltaSteppingGpu,
            #[cfg(feature = "gpu")]
            AlgorithmKind::HadsGpu,
            #[cfg(feature = "gpu")]
            AlgorithmKind::AStarGpu,
        ]
    }

    /// Selector string shown to users and accepted by [`AlgorithmKind::resolve`].
    pub fn name(self) -> &'static str {
        match self {
            AlgorithmKind::OptimizedAStar => "Optimized A*",
            AlgorithmKind::Dijkstra => "Dijkstra",
            AlgorithmKind::Bfs => "BFS",
            AlgorithmKind::ThetaStar => "Theta*",
            AlgorithmKind::LazyThetaStar => "Lazy Theta*",
            #[cfg(feature = "gpu")]
            AlgorithmKind::DeltaSteppingGpu => "Delta Stepping - GPU",
            #[cfg(feature = "gpu")]
            AlgorithmKind::HadsGpu => "HADS - GPU",
            #[cfg(feature = "gpu")]
            AlgorithmKind::AStarGpu => "A* - GPU",
        }
    }

    /// Exact, case-sensitive lookup against the selectors of this build.
    pub fn resolve(name: &str) -> Result<Self, UnsupportedAlgorithm> {
        if let Some(kind) = Self::available().iter().copied().find(|kind| kind.name() == name) {
            return Ok(kind);
        }
        if name.contains(GPU_MARKER) {
            if cfg!(feature = "gpu") {
                return Err(UnsupportedAlgorithm::NotImplemented(name.to_string()));
            }
            return Err(UnsupportedAlgorithm::GpuDisabled(name.to_string()));
        }
        Err(UnsupportedAlgorithm::Unknown(name.to_string()))
    }

    pub fn uses_heuristic(self) -> bool {
        match self {
            AlgorithmKind::OptimizedAStar | AlgorithmKind::ThetaStar | AlgorithmKind::LazyThetaStar => true,
            AlgorithmKind::Dijkstra | AlgorithmKind::Bfs => false,
            #[cfg(feature = "gpu")]
            AlgorithmKind::AStarGpu => true,
            #[cfg(feature = "gpu")]
            AlgorithmKind::DeltaSteppingGpu | AlgorithmKind::HadsGpu => false,
        }
    }

    pub fn is_gpu(self) -> bool {
        self.name().contains(GPU_MARKER)
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry point per algorithm kind.
#[derive(Debug, Clone, Copy)]
pub struct SearchTable {
    pub optimized_astar: SearchFn,
    pub dijkstra: SearchFn,
    pub bfs: SearchFn,
    pub theta_star: SearchFn,
    pub lazy_theta_star: SearchFn,
    #[cfg(feature = "gpu")]
    pub delta_stepping_gpu: SearchFn,
    #[cfg(feature = "gpu")]
    pub hads_gpu: SearchFn,
    #[cfg(feature = "gpu")]
    pub astar_gpu: SearchFn,
}

impl SearchTable {
    pub fn builtin() -> Self {
        Self {
            optimized_astar: algorithms::find_astar_path,
            dijkstra: algorithms::find_dijkstra_path,
            bfs: algorithms::find_bfs_path,
            theta_star: algorithms::find_theta_star_path,
            lazy_theta_star: algorithms::find_lazy_theta_star_path,
            #[cfg(feature = "gpu")]
            delta_stepping_gpu: algorithms::find_delta_stepping_path,
            #[cfg(feature = "gpu")]
            hads_gpu: algorithms::find_hads_path,
            #[cfg(feature = "gpu")]
            astar_gpu: algorithms::find_astar_path_gpu,
        }
    }

    /// Same function for every kind. Handy for counting calls in tests.
    pub fn uniform(search: SearchFn) -> Self {
        Self {
            optimized_astar: search,
            dijkstra: search,
            bfs: search,
            theta_star: search,
            lazy_theta_star: search,
            #[cfg(feature = "gpu")]
            delta_stepping_gpu: search,
            #[cfg(feature = "gpu")]
            hads_gpu: search,
            #[cfg(feature = "gpu")]
            astar_gpu: search,
        }
    }

    pub fn get(&self, kind: AlgorithmKind) -> SearchFn {
        match kind {
            AlgorithmKind::OptimizedAStar => self.optimized_astar,
            AlgorithmKind::Dijkstra => self.dijkstra,
            AlgorithmKind::Bfs => self.bfs,
            AlgorithmKind::ThetaStar => self.theta_star,
            AlgorithmKind::LazyThetaStar => self.lazy_theta_star,
            #[cfg(feature = "gpu")]
            AlgorithmKind::DeltaSteppingGpu => self.delta_stepping_gpu,
            #[cfg(feature = "gpu")]
            AlgorithmKind::HadsGpu => self.hads_gpu,
            #[cfg(feature = "gpu")]
            AlgorithmKind::AStarGpu => self.astar_gpu,
        }
    }
}

impl Default for SearchTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// A resolved algorithm bound to its per-run options.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    kind: AlgorithmKind,
    options: SearchOptions,
    search: SearchFn,
}

impl Dispatcher {
    pub fn new(kind: AlgorithmKind, heuristic: Heuristic, gpu: GpuParams, table: &SearchTable) -> Self {
        let heuristic = kind.uses_heuristic().then_some(heuristic);
        Self {
            kind,
            options: SearchOptions { heuristic, gpu },
            search: table.get(kind),
        }
    }

    pub fn kind(&self) -> AlgorithmKind {
        self.kind
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn search(&self, ctx: &SearchContext<'_>, start: GridPoint, goal: GridPoint) -> Vec<usize> {
        (self.search)(ctx, start, goal, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlignmentOffset, ElevationRaster, LogicalGrid};

    #[test]
    fn resolves_every_listed_selector() {
        for kind in AlgorithmKind::available() {
            assert_eq!(AlgorithmKind::resolve(kind.name()), Ok(*kind));
        }
    }

    #[test]
    fn only_marked_selectors_are_gpu() {
        for kind in AlgorithmKind::available() {
            assert_eq!(kind.is_gpu(), kind.name().contains(GPU_MARKER), "{kind}");
        }
        assert!(!AlgorithmKind::OptimizedAStar.is_gpu());
        assert!(!AlgorithmKind::LazyThetaStar.is_gpu());
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert_eq!(
            AlgorithmKind::resolve("dijkstra"),
            Err(UnsupportedAlgorithm::Unknown("dijkstra".to_string()))
        );
    }

    #[test]
    fn unknown_names_are_unsupported() {
        let err = AlgorithmKind::resolve("Quantum*").unwrap_err();
        assert_eq!(err, UnsupportedAlgorithm::Unknown("Quantum*".to_string()));
    }

    #[cfg(not(feature = "gpu"))]
    #[test]
    fn gpu_names_report_disabled_build() {
        assert!(matches!(
            AlgorithmKind::resolve("A* - GPU"),
            Err(UnsupportedAlgorithm::GpuDisabled(_))
        ));
        assert_eq!(AlgorithmKind::available().len(), 5);
    }

    #[cfg(feature = "gpu")]
    #[test]
    fn unknown_gpu_names_are_not_implemented() {
        assert_eq!(AlgorithmKind::resolve("HADS - GPU"), Ok(AlgorithmKind::HadsGpu));
        assert!(matches!(
            AlgorithmKind::resolve("Bellman-Ford - GPU"),
            Err(UnsupportedAlgorithm::NotImplemented(_))
        ));
    }

    #[test]
    fn heuristic_only_reaches_consuming_kinds() {
        let table = SearchTable::builtin();
        let gpu = GpuParams::default();
        let astar = Dispatcher::new(AlgorithmKind::OptimizedAStar, Heuristic::Manhattan, gpu, &table);
        assert_eq!(astar.options().heuristic, Some(Heuristic::Manhattan));
        let bfs = Dispatcher::new(AlgorithmKind::Bfs, Heuristic::Manhattan, gpu, &table);
        assert_eq!(bfs.options().heuristic, None);
    }

    #[test]
    fn dispatcher_calls_table_entry() {
        fn fixed(_: &SearchContext<'_>, _: GridPoint, _: GridPoint, _: &SearchOptions) -> Vec<usize> {
            vec![7, 8]
        }
        let mut table = SearchTable::builtin();
        table.dijkstra = fixed;
        let dispatcher = Dispatcher::new(AlgorithmKind::Dijkstra, Heuristic::default(), GpuParams::default(), &table);

        let grid = LogicalGrid::filled(3, 3, 1.0);
        let raster = ElevationRaster::synthetic(3, 3, 1.0, 0.0);
        let ctx = SearchContext::new(&grid, &raster, 1.0, AlignmentOffset::default());
        assert_eq!(dispatcher.search(&ctx, GridPoint::new(0, 0), GridPoint::new(2, 2)), vec![7, 8]);
    }
}
