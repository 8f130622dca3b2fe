//! Test utilities shared across modules.
//!
//! Provides schema/geometry fixtures, mock samplers and a few hand-built
//! refinement layouts.

use std::collections::HashSet;

use crate::error::{GridError, Result};
use crate::quadtree::{CellKey, CellStore, DAabb2, GridSchema, LevelGeometry, PatchMeta};
use crate::topology::{Sample, SampleSession, TerrainSampler};

// =============================================================================
// Schema / Geometry Fixtures
// =============================================================================

/// Square schema with first size 50 and halving cell sizes for `levels` levels.
pub fn square_schema(levels: usize) -> GridSchema {
  let grid_info = (0..levels)
    .map(|i| {
      let size = 50.0 / (1u32 << i) as f64;
      [size, size]
    })
    .collect();
  GridSchema {
    name: Some("test".into()),
    epsg: 2326,
    grid_info,
    alignment_origin: [0.0, 0.0],
  }
}

/// `[0,0,100,100]` domain: level 1 is 2×2, every finer level doubles.
pub fn square_geometry(levels: usize) -> LevelGeometry {
  LevelGeometry::from_schema(DAabb2::from_array([0.0, 0.0, 100.0, 100.0]), &square_schema(levels))
    .unwrap()
}

pub fn patch_meta(bounds: [f64; 4], schema: GridSchema) -> PatchMeta {
  PatchMeta { bounds, schema }
}

// =============================================================================
// Refinement Layouts
// =============================================================================

/// Five-level square grid where cell (1,0) is refined along its lower-right
/// corner down to level 5, so level-5 cells touch the level-1 cell (1,1).
pub fn corner_refined_store() -> CellStore {
  let mut store = CellStore::with_default_cells(square_geometry(5));
  for key in [
    CellKey::new(1, 0),
    CellKey::new(2, 1),
    CellKey::new(3, 3),
    CellKey::new(4, 7),
  ] {
    assert!(!store.subdivide(&[key]).is_empty(), "failed to subdivide {key}");
  }
  store
}

/// Active keys of a store as a set.
pub fn active_set(store: &CellStore) -> HashSet<CellKey> {
  store.active_keys().into_iter().collect()
}

// =============================================================================
// Mock Samplers
// =============================================================================

/// Altitude equals `x + y`, category is fixed.
pub struct PlaneSampler {
  pub category: i32,
}

pub struct PlaneSession {
  category: i32,
}

impl TerrainSampler for PlaneSampler {
  type Session = PlaneSession;

  fn open(&self) -> Result<Self::Session> {
    Ok(PlaneSession {
      category: self.category,
    })
  }
}

impl SampleSession for PlaneSession {
  fn sample(&mut self, x: f64, y: f64) -> Option<Sample> {
    Some(Sample {
      altitude: x + y,
      category: self.category,
    })
  }
}

/// Sampler whose sources can never be opened.
pub struct FailingSampler;

impl TerrainSampler for FailingSampler {
  type Session = PlaneSession;

  fn open(&self) -> Result<Self::Session> {
    Err(GridError::NotFound("missing.tif".into()))
  }
}
