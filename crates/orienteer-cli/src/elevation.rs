//! Elevation over HTTP, in a local tangent-plane projection centred on the
//! map anchor.

use crate::config::Config;
use anyhow::{bail, Context, Result};
use orienteer_core::alignment::metres_per_internal_unit;
use orienteer_core::{
    CollaboratorError, ElevationProvider, ElevationRaster, ElevationRequest, LatLon, ProjectedPoint,
};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// Equirectangular projection about an origin. X east, Y north, metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    origin: LatLon,
    meters_per_deg_lon: f64,
}

impl LocalProjection {
    pub fn new(origin: LatLon) -> Self {
        let meters_per_deg_lon = METERS_PER_DEG_LAT * origin.lat.to_radians().cos().max(0.01);
        Self {
            origin,
            meters_per_deg_lon,
        }
    }

    pub fn project(&self, point: LatLon) -> ProjectedPoint {
        ProjectedPoint {
            x: (point.lon - self.origin.lon) * self.meters_per_deg_lon,
            y: (point.lat - self.origin.lat) * METERS_PER_DEG_LAT,
        }
    }

    pub fn unproject(&self, point: ProjectedPoint) -> LatLon {
        LatLon {
            lat: self.origin.lat + point.y / METERS_PER_DEG_LAT,
            lon: self.origin.lon + point.x / self.meters_per_deg_lon,
        }
    }
}

/// North-up layout of the raster to fetch: top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterLayout {
    pub origin_x: f64,
    pub origin_y: f64,
    pub resolution_m: f64,
    pub width: usize,
    pub height: usize,
}

impl RasterLayout {
    /// Cover the requested map bounds with one cell of padding on every side,
    /// coarsening the resolution until at most `max_points` samples remain.
    pub fn covering(request: &ElevationRequest<'_>, max_points: usize) -> Result<Self> {
        if !(request.resolution_m.is_finite() && request.resolution_m > 0.0) {
            bail!("invalid elevation resolution {}", request.resolution_m);
        }
        let mpu = metres_per_internal_unit(request.map_scale);
        let (anchor_x, anchor_y) = request.anchor_internal;
        let west = (request.bounds.min_x - anchor_x) * mpu;
        let east = (request.bounds.max_x - anchor_x) * mpu;
        // Internal Y grows south.
        let north = -(request.bounds.min_y - anchor_y) * mpu;
        let south = -(request.bounds.max_y - anchor_y) * mpu;
        if !(east > west && north > south) {
            bail!("map bounds have no extent");
        }

        let max_points = max_points.max(4);
        let mut resolution = request.resolution_m;
        loop {
            let width = ((east - west) / resolution).ceil() as usize + 2;
            let height = ((north - south) / resolution).ceil() as usize + 2;
            if width.saturating_mul(height) <= max_points {
                return Ok(Self {
                    origin_x: west - resolution,
                    origin_y: north + resolution,
                    resolution_m: resolution,
                    width,
                    height,
                });
            }
            let scale = (width as f64 * height as f64 / max_points as f64).sqrt().max(1.1);
            resolution *= scale;
        }
    }

    /// Projected centre of cell (row, col).
    pub fn cell_centre(&self, row: usize, col: usize) -> ProjectedPoint {
        ProjectedPoint {
            x: self.origin_x + (col as f64 + 0.5) * self.resolution_m,
            y: self.origin_y - (row as f64 + 0.5) * self.resolution_m,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenMeteoElevationResponse {
    elevation: Option<Vec<f64>>,
}

/// Samples an Open-Meteo style `?latitude=..&longitude=..` endpoint.
pub struct HttpElevationProvider {
    client: Client,
    url: String,
    timeout: Duration,
    max_points_per_request: usize,
    max_grid_points: usize,
}

impl HttpElevationProvider {
    pub fn from_config(config: &Config) -> Result<Self> {
        if config.elevation_url.trim().is_empty() {
            bail!("elevation provider URL is empty");
        }
        let client = Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            url: config.elevation_url.clone(),
            timeout: Duration::from_secs(config.elevation_timeout_s.max(3)),
            max_points_per_request: config.elevation_max_points.max(1),
            max_grid_points: config.elevation_max_grid_points,
        })
    }

    fn fetch(&self, request: &ElevationRequest<'_>) -> Result<ElevationRaster> {
        let layout = RasterLayout::covering(request, self.max_grid_points)?;
        let projection = LocalProjection::new(request.anchor);
        tracing::debug!(
            "Fetching {}x{} elevation samples at {:.1} m",
            layout.width,
            layout.height,
            layout.resolution_m
        );

        let total = layout.width * layout.height;
        let mut latitudes = Vec::with_capacity(total);
        let mut longitudes = Vec::with_capacity(total);
        for row in 0..layout.height {
            for col in 0..layout.width {
                let point = projection.unproject(layout.cell_centre(row, col));
                latitudes.push(point.lat);
                longitudes.push(point.lon);
            }
        }

        let mut values = Vec::with_capacity(total);
        for (lat_chunk, lon_chunk) in latitudes
            .chunks(self.max_points_per_request)
            .zip(longitudes.chunks(self.max_points_per_request))
        {
            let url = build_provider_url(&self.url, &join_params(lat_chunk), &join_params(lon_chunk));
            let response = self
                .client
                .get(url)
                .timeout(self.timeout)
                .send()
                .context("elevation request failed")?;
            if !response.status().is_success() {
                bail!("elevation provider HTTP {}", response.status());
            }
            let payload: OpenMeteoElevationResponse =
                response.json().context("failed to parse elevation response")?;
            let chunk = payload
                .elevation
                .context("elevation provider response has no elevation")?;
            if chunk.len() != lat_chunk.len() {
                bail!(
                    "elevation provider returned {} samples, expected {}",
                    chunk.len(),
                    lat_chunk.len()
                );
            }
            values.extend(
                chunk
                    .into_iter()
                    .map(|value| if value.is_finite() { value as f32 } else { 0.0 }),
            );
        }

        Ok(ElevationRaster {
            width: layout.width,
            height: layout.height,
            resolution_m: layout.resolution_m,
            origin_x: layout.origin_x,
            origin_y: layout.origin_y,
            values,
        })
    }
}

impl ElevationProvider for HttpElevationProvider {
    fn fetch_raster(&self, request: &ElevationRequest<'_>) -> Result<ElevationRaster, CollaboratorError> {
        Ok(self.fetch(request)?)
    }

    fn project(&self, _module: &str, _function: &str, point: LatLon) -> Result<ProjectedPoint, CollaboratorError> {
        // The projection is centred on the anchor, which is the only point the
        // aligner converts.
        Ok(LocalProjection::new(point).project(point))
    }
}

/// Provider that never has data. Every run falls back to flat terrain.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoElevation;

impl ElevationProvider for NoElevation {
    fn fetch_raster(&self, _: &ElevationRequest<'_>) -> Result<ElevationRaster, CollaboratorError> {
        Err("elevation disabled".into())
    }

    fn project(&self, _: &str, _: &str, _: LatLon) -> Result<ProjectedPoint, CollaboratorError> {
        Err("elevation disabled".into())
    }
}

fn join_params(values: &[f64]) -> String {
    values
        .iter()
        .map(|value| format!("{:.6}", value))
        .collect::<Vec<_>>()
        .join(",")
}

fn build_provider_url(base: &str, latitudes: &str, longitudes: &str) -> String {
    let separator = if base.contains('?') { "&" } else { "?" };
    format!("{}{}latitude={}&longitude={}", base, separator, latitudes, longitudes)
}
