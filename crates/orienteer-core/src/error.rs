//! Error taxonomy for a pipeline run.
//!
//! Elevation fetch and projection failures are deliberately absent: they are
//! recovered from by falling back to synthetic elevation.

use crate::models::GridPoint;
use thiserror::Error;

/// Error type returned by external collaborators.
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("could not determine coordinate bounds from map file: {0}")]
    MapScan(String),

    #[error("grid generation failed: {0}")]
    GridGeneration(String),

    #[error("normalization results invalid after grid generation")]
    NormalizationInvalid,

    #[error("failed to extract a valid start/control/finish sequence from {path}: {reason}")]
    InsufficientWaypoints { path: String, reason: String },

    #[error(
        "segment {segment} start/end point ({},{} -> {},{}) out of grid bounds (WxH: {width}x{height})",
        .start.x, .start.y, .goal.x, .goal.y
    )]
    SegmentOutOfBounds {
        segment: usize,
        start: GridPoint,
        goal: GridPoint,
        width: usize,
        height: usize,
    },

    #[error("path not found for segment {segment} (start: {},{} end: {},{})", .start.x, .start.y, .goal.x, .goal.y)]
    PathNotFound {
        segment: usize,
        start: GridPoint,
        goal: GridPoint,
    },

    #[error(transparent)]
    UnsupportedAlgorithm(#[from] UnsupportedAlgorithm),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Why an algorithm selector could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnsupportedAlgorithm {
    #[error("selected GPU algorithm '{0}' is not implemented")]
    NotImplemented(String),

    #[error("GPU algorithm '{0}' selected, but GPU support is disabled in this build")]
    GpuDisabled(String),

    #[error("unsupported algorithm selected: {0}")]
    Unknown(String),
}

impl PipelineError {
    /// Short stable name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "ConfigurationError",
            Self::MapScan(_) => "MapScanError",
            Self::GridGeneration(_) => "GridGenerationError",
            Self::NormalizationInvalid => "NormalizationInvalid",
            Self::InsufficientWaypoints { .. } => "InsufficientWaypoints",
            Self::SegmentOutOfBounds { .. } => "SegmentOutOfBounds",
            Self::PathNotFound { .. } => "PathNotFound",
            Self::UnsupportedAlgorithm(_) => "UnsupportedAlgorithm",
            Self::Internal(_) => "InternalError",
        }
    }
}
