//! JSON controls files.
//!
//! ```json
//! { "controls": [ { "kind": "start", "x": 1200, "y": 800 }, { "kind": "control", "x": 5400, "y": 2300 } ] }
//! ```

use anyhow::{bail, Context, Result};
use orienteer_core::{CollaboratorError, GridPoint, WaypointExtractor, WorldBounds};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Start,
    Control,
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub kind: ControlKind,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlsFile {
    pub controls: Vec<Control>,
}

impl ControlsFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read controls file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse controls file {}", path.display()))
    }

    /// Start, controls in file order, then finish.
    pub fn course(&self) -> Result<Vec<Control>> {
        let starts = self.controls.iter().filter(|c| c.kind == ControlKind::Start).count();
        let finishes = self.controls.iter().filter(|c| c.kind == ControlKind::Finish).count();
        if starts != 1 || finishes != 1 {
            bail!(
                "expected exactly one start and one finish, found {} and {}",
                starts,
                finishes
            );
        }
        let mut course = self.controls.clone();
        // Stable sort keeps controls in their listed order.
        course.sort_by_key(|c| c.kind);
        Ok(course)
    }
}

/// Cell containing internal-unit point (x, y). Points off the map map to
/// cells outside the grid.
pub fn to_grid(x: f64, y: f64, bounds: &WorldBounds, width: usize, height: usize) -> GridPoint {
    let gx = (x - bounds.min_x) / bounds.width() * width as f64;
    let gy = (y - bounds.min_y) / bounds.height() * height as f64;
    GridPoint::new(gx.floor() as i32, gy.floor() as i32)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonControlsExtractor;

impl WaypointExtractor for JsonControlsExtractor {
    fn extract(
        &self,
        controls_path: &str,
        bounds: &WorldBounds,
        grid_width: usize,
        grid_height: usize,
    ) -> Result<Vec<GridPoint>, CollaboratorError> {
        if !(bounds.width() > 0.0 && bounds.height() > 0.0) {
            return Err(format!("degenerate map bounds {:?}", bounds).into());
        }
        let course = ControlsFile::load(controls_path)?.course()?;
        Ok(course
            .iter()
            .map(|c| to_grid(c.x, c.y, bounds, grid_width, grid_height))
            .collect())
    }
}
