//! Grid-space distance estimates for the A*-family searches.
//!
//! All functions are pure and operate on grid coordinates, so they are safe
//! to call from any thread.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cost of an orthogonal step.
pub const ORTHOGONAL_COST: f32 = 1.0;
/// Cost of a diagonal step.
pub const DIAGONAL_COST: f32 = std::f32::consts::SQRT_2;
/// Smallest combined terrain x slope multiplier the cost model produces.
pub const MIN_COST_FACTOR: f32 = 0.8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Heuristic {
    Euclidean,
    Diagonal,
    Manhattan,
    /// Diagonal distance scaled by [`MIN_COST_FACTOR`].
    #[default]
    MinCost,
}

impl Heuristic {
    pub const ALL: [Heuristic; 4] = [
        Heuristic::Euclidean,
        Heuristic::Diagonal,
        Heuristic::Manhattan,
        Heuristic::MinCost,
    ];

    /// Legacy integer selector: 0 Euclidean, 1 Diagonal, 2 Manhattan,
    /// 3 MinCost. Anything else falls back to Euclidean.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Heuristic::Diagonal,
            2 => Heuristic::Manhattan,
            3 => Heuristic::MinCost,
            _ => Heuristic::Euclidean,
        }
    }

    pub fn estimate(self, x1: i32, y1: i32, x2: i32, y2: i32) -> f32 {
        estimate(x1, y1, x2, y2, self)
    }
}

impl fmt::Display for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Heuristic::Euclidean => "euclidean",
            Heuristic::Diagonal => "diagonal",
            Heuristic::Manhattan => "manhattan",
            Heuristic::MinCost => "min-cost",
        };
        f.write_str(name)
    }
}

impl FromStr for Heuristic {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "euclidean" => Ok(Heuristic::Euclidean),
            "diagonal" | "octile" => Ok(Heuristic::Diagonal),
            "manhattan" => Ok(Heuristic::Manhattan),
            "min-cost" | "mincost" => Ok(Heuristic::MinCost),
            other => Err(format!("unknown heuristic '{}'", other)),
        }
    }
}

/// Estimate the distance between two grid cells under `metric`.
pub fn estimate(x1: i32, y1: i32, x2: i32, y2: i32, metric: Heuristic) -> f32 {
    match metric {
        Heuristic::Euclidean => euclidean(x1, y1, x2, y2),
        Heuristic::Diagonal => diagonal(x1, y1, x2, y2),
        Heuristic::Manhattan => manhattan(x1, y1, x2, y2),
        Heuristic::MinCost => diagonal(x1, y1, x2, y2) * MIN_COST_FACTOR,
    }
}

pub fn euclidean(x1: i32, y1: i32, x2: i32, y2: i32) -> f32 {
    let dx = (x1 - x2) as f32;
    let dy = (y1 - y2) as f32;
    (dx * dx + dy * dy).sqrt()
}

/// Octile distance.
pub fn diagonal(x1: i32, y1: i32, x2: i32, y2: i32) -> f32 {
    let dx = (x1 - x2).abs() as f32;
    let dy = (y1 - y2).abs() as f32;
    ORTHOGONAL_COST * (dx + dy) + (DIAGONAL_COST - 2.0 * ORTHOGONAL_COST) * dx.min(dy)
}

pub fn manhattan(x1: i32, y1: i32, x2: i32, y2: i32) -> f32 {
    ((x1 - x2).abs() + (y1 - y2).abs()) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: [(i32, i32, i32, i32); 6] = [
        (0, 0, 3, 4),
        (5, 5, -2, 7),
        (10, 0, 0, 10),
        (-4, -4, 4, 4),
        (0, 0, 0, 9),
        (1, 2, 1, 2),
    ];

    #[test]
    fn every_metric_is_zero_at_the_goal() {
        for metric in Heuristic::ALL {
            assert_eq!(estimate(7, -3, 7, -3, metric), 0.0, "{metric}");
        }
    }

    #[test]
    fn euclidean_matches_pythagoras() {
        assert!((euclidean(0, 0, 3, 4) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn diagonal_uses_octile_costs() {
        let value = diagonal(0, 0, 3, 1);
        assert!((value - (2.0 + std::f32::consts::SQRT_2)).abs() < 1e-5);
    }

    #[test]
    fn min_cost_is_bounded_by_diagonal_and_euclidean() {
        for (x1, y1, x2, y2) in SAMPLES {
            let min_cost = estimate(x1, y1, x2, y2, Heuristic::MinCost);
            let diag = estimate(x1, y1, x2, y2, Heuristic::Diagonal);
            let eucl = estimate(x1, y1, x2, y2, Heuristic::Euclidean);
            assert!(min_cost <= diag + 1e-6);
            assert!(diag <= eucl * std::f32::consts::SQRT_2 + 1e-5);
        }
    }

    #[test]
    fn unknown_codes_fall_back_to_euclidean() {
        assert_eq!(Heuristic::from_code(3), Heuristic::MinCost);
        assert_eq!(Heuristic::from_code(-1), Heuristic::Euclidean);
        assert_eq!(Heuristic::from_code(42), Heuristic::Euclidean);
    }

    #[test]
    fn parses_cli_names() {
        assert_eq!("Min Cost".parse::<Heuristic>(), Ok(Heuristic::MinCost));
        assert_eq!("octile".parse::<Heuristic>(), Ok(Heuristic::Diagonal));
        assert!("chebyshev".parse::<Heuristic>().is_err());
    }
}
