//! GridSchema - per-level cell sizes shared by patches and the meta-grid.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// Relative tolerance when checking that level ratios are integers.
const RATIO_TOLERANCE: f64 = 1e-9;

/// Grid schema: projection code, per-level cell sizes and alignment origin.
///
/// Missing fields deserialize to empty values so that [`GridSchema::validate`]
/// can report them as validation errors rather than parse errors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSchema {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  /// EPSG code of the projected coordinate system (0 = missing).
  #[serde(default)]
  pub epsg: u32,
  /// Cell size `[width, height]` per real level, coarsest first.
  #[serde(default)]
  pub grid_info: Vec<[f64; 2]>,
  #[serde(default)]
  pub alignment_origin: [f64; 2],
}

impl GridSchema {
  /// Load and validate a schema document.
  pub fn load(path: &Path) -> Result<Self> {
    if !path.exists() {
      return Err(GridError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|e| GridError::io(path, e))?;
    let schema: GridSchema =
      serde_json::from_str(&content).map_err(|e| GridError::json(path, e))?;
    schema.validate()?;
    Ok(schema)
  }

  /// Check required fields and the subdivision ratios between levels.
  pub fn validate(&self) -> Result<()> {
    if self.epsg == 0 {
      return Err(GridError::Validation("schema is missing an epsg code".into()));
    }
    subdivision_ratios(&self.grid_info).map(|_| ())
  }

  /// Cell size of the first real level.
  pub fn first_size(&self) -> Option<[f64; 2]> {
    self.grid_info.first().copied()
  }

  /// Area of a first-level cell, used to pick the coarsest schema.
  pub fn first_cell_area(&self) -> f64 {
    self.first_size().map_or(0.0, |[w, h]| w * h)
  }

  /// Pick the schema with the largest first-level cell.
  pub fn coarsest<'a>(schemas: impl IntoIterator<Item = &'a GridSchema>) -> Option<&'a GridSchema> {
    schemas
      .into_iter()
      .max_by(|a, b| a.first_cell_area().total_cmp(&b.first_cell_area()))
  }
}

/// Integer ratios `grid_info[i] / grid_info[i + 1]` for every level pair.
///
/// Rejects empty tables, non-positive sizes and fractional or shrinking
/// ratios.
pub fn subdivision_ratios(grid_info: &[[f64; 2]]) -> Result<Vec<(u32, u32)>> {
  if grid_info.is_empty() {
    return Err(GridError::Validation("grid_info must list at least one level".into()));
  }
  for (level, size) in grid_info.iter().enumerate() {
    if !size.iter().all(|s| s.is_finite() && *s > 0.0) {
      return Err(GridError::Validation(format!(
        "level {} cell size {:?} must be positive",
        level + 1,
        size
      )));
    }
  }

  let mut ratios = Vec::with_capacity(grid_info.len().saturating_sub(1));
  for (level, pair) in grid_info.windows(2).enumerate() {
    let mut ratio = [0u32; 2];
    for axis in 0..2 {
      let raw = pair[0][axis] / pair[1][axis];
      let rounded = raw.round();
      if rounded < 1.0 || (raw - rounded).abs() > RATIO_TOLERANCE * raw || rounded > u32::MAX as f64 {
        return Err(GridError::Validation(format!(
          "level {} to {} ratio {} on axis {} is not a positive integer",
          level + 1,
          level + 2,
          raw,
          axis
        )));
      }
      ratio[axis] = rounded as u32;
    }
    ratios.push((ratio[0], ratio[1]));
  }
  Ok(ratios)
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod schema_test;
