//! Reuse of a previously generated grid across runs.
//!
//! The key is the source map path plus the grid dimensions. The obstacle-cost
//! table is not part of it: a changed table with an otherwise matching key
//! reuses the old grid.

use crate::models::{LogicalGrid, NormalizationResult};
use crate::pipeline::RunResult;
use serde::{Deserialize, Serialize};

/// A grid and its normalization, tagged with what produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedGrid {
    pub source_path: String,
    pub width: usize,
    pub height: usize,
    pub grid: LogicalGrid,
    pub normalization: NormalizationResult,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReuseDecision {
    Reuse(CachedGrid),
    Regenerate(String),
}

/// Grant reuse only when it was asked for, a pair is available, and the
/// pair was built from the same map at the same dimensions. The granted
/// pair is an independent copy.
pub fn decide(
    reuse_requested: bool,
    cached: Option<&CachedGrid>,
    map_path: &str,
    width: usize,
    height: usize,
) -> ReuseDecision {
    if !reuse_requested {
        return ReuseDecision::Regenerate("reuse not requested".to_string());
    }
    let Some(cached) = cached else {
        return ReuseDecision::Regenerate("no cached grid available".to_string());
    };
    if cached.source_path != map_path {
        return ReuseDecision::Regenerate(format!(
            "cached grid was built from '{}'",
            cached.source_path
        ));
    }
    if cached.width != width || cached.height != height {
        return ReuseDecision::Regenerate(format!(
            "cached grid is {}x{}, requested {}x{}",
            cached.width, cached.height, width, height
        ));
    }
    ReuseDecision::Reuse(cached.clone())
}

/// Caller-held store for the last usable grid.
#[derive(Debug, Clone, Default)]
pub struct GridCache {
    entry: Option<CachedGrid>,
}

impl GridCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the grid a run produced or reused. Runs that never got as far as
    /// a valid grid leave the store untouched.
    pub fn remember(&mut self, result: &RunResult) -> bool {
        let (Some(grid), Some(normalization)) = (&result.processed_grid, result.normalization) else {
            return false;
        };
        if !normalization.valid {
            return false;
        }
        self.entry = Some(CachedGrid {
            source_path: result.map_path.clone(),
            width: result.grid_width,
            height: result.grid_height,
            grid: grid.clone(),
            normalization,
        });
        true
    }

    pub fn candidate(&self) -> Option<&CachedGrid> {
        self.entry.as_ref()
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }

    /// Drop the stored grid if it came from a different map.
    pub fn invalidate_if_changed(&mut self, map_path: &str) {
        if self
            .entry
            .as_ref()
            .is_some_and(|cached| cached.source_path != map_path)
        {
            tracing::debug!("Map path changed to {}, clearing cached grid", map_path);
            self.clear();
        }
    }
}
