//! Process configuration from environment.

use std::env;

pub const DEFAULT_ELEVATION_URL: &str = "https://api.open-meteo.com/v1/elevation";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Open-Meteo compatible elevation endpoint. Empty disables fetching.
    pub elevation_url: String,
    pub elevation_timeout_s: u64,
    /// Samples sent per HTTP request.
    pub elevation_max_points: usize,
    /// Upper bound on raster samples; resolution is coarsened to fit.
    pub elevation_max_grid_points: usize,
    /// Worker threads handed to the grid generator.
    pub threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            elevation_url: DEFAULT_ELEVATION_URL.to_string(),
            elevation_timeout_s: 20,
            elevation_max_points: 100,
            elevation_max_grid_points: 10_000,
            threads: default_threads(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            elevation_url: env::var("ORIENTEER_ELEVATION_URL").unwrap_or(defaults.elevation_url),
            elevation_timeout_s: env::var("ORIENTEER_ELEVATION_TIMEOUT_S")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.elevation_timeout_s),
            elevation_max_points: env::var("ORIENTEER_ELEVATION_MAX_POINTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.elevation_max_points),
            elevation_max_grid_points: env::var("ORIENTEER_ELEVATION_MAX_GRID_POINTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.elevation_max_grid_points),
            threads: env::var("ORIENTEER_THREADS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|threads: &usize| *threads > 0)
                .unwrap_or(defaults.threads),
        }
    }
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
