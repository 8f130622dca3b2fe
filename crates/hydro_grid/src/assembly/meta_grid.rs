//! MetaGrid - the union domain of all patches and the remapping of their
//! active cells into it.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{GridError, Result};
use crate::quadtree::{CellKey, DAabb2, GridSchema, LevelGeometry, PatchSource};

/// Geometry and schema of the assembled grid.
#[derive(Clone, Debug)]
pub struct MetaGrid {
  pub schema: GridSchema,
  pub geometry: LevelGeometry,
}

/// Counters from remapping patches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RemapStats {
  /// Active patch cells seen.
  pub cells_seen: usize,
  /// Cells dropped because they fall outside the meta-grid.
  pub cells_skipped: usize,
}

impl MetaGrid {
  /// Build the meta-grid over the union of all patch bounds.
  ///
  /// Uses `schema` when given, otherwise the patch schema with the coarsest
  /// first-level cell.
  pub fn from_patches<P: PatchSource>(patches: &[P], schema: Option<&GridSchema>) -> Result<Self> {
    let bounds = union_bounds(patches)?;
    let schema = match schema {
      Some(s) => s.clone(),
      None => GridSchema::coarsest(patches.iter().map(|p| p.schema()))
        .cloned()
        .ok_or_else(|| GridError::Validation("no patches to assemble".into()))?,
    };
    let geometry = LevelGeometry::from_schema(bounds, &schema)?;
    Ok(Self { schema, geometry })
  }
}

/// Component-wise union of every patch's bounds.
pub fn union_bounds<P: PatchSource>(patches: &[P]) -> Result<DAabb2> {
  if patches.is_empty() {
    return Err(GridError::Validation("no patches to assemble".into()));
  }
  let bounds = patches
    .iter()
    .fold(DAabb2::EMPTY, |acc, p| acc.union(&p.bounds()));
  if !bounds.is_valid() {
    return Err(GridError::Validation(format!(
      "patch bounds union {:?} is empty",
      bounds.to_array()
    )));
  }
  Ok(bounds)
}

/// Remap every patch's active cells into meta-grid keys and union them.
pub fn merge_patches<P: PatchSource>(patches: &[P], meta: &LevelGeometry) -> (HashSet<CellKey>, RemapStats) {
  let mut keys = HashSet::new();
  let mut stats = RemapStats::default();
  for (i, patch) in patches.iter().enumerate() {
    let before = keys.len();
    remap_patch(patch, meta, &mut keys, &mut stats);
    debug!(patch = i, added = keys.len() - before, "Merged patch cells");
  }
  (keys, stats)
}

/// Remap one patch into `keys`.
///
/// The patch's bottom-left corner gives a fractional offset inside the
/// union bounds; per level the column/row offset is that fraction times the
/// level's size, rounded half-up.
pub fn remap_patch<P: PatchSource>(
  patch: &P,
  meta: &LevelGeometry,
  keys: &mut HashSet<CellKey>,
  stats: &mut RemapStats,
) {
  let meta_bounds = meta.bounds();
  let offset_frac = (patch.bounds().min - meta_bounds.min) / meta_bounds.size();
  let local = patch.geometry();

  let mut skipped = 0usize;
  let cells = patch.activated_cells();
  stats.cells_seen += cells.len();
  for key in cells {
    let Some(meta_size) = meta.level_size(key.level) else {
      skipped += 1;
      continue;
    };
    let (u, v) = local.uv(key);
    let off_u = (offset_frac.x * meta_size.width as f64 + 0.5).floor() as i64;
    let off_v = (offset_frac.y * meta_size.height as f64 + 0.5).floor() as i64;
    match meta.key_at(key.level, off_u + u as i64, off_v + v as i64) {
      Some(meta_key) => {
        keys.insert(meta_key);
      }
      None => skipped += 1,
    }
  }

  if skipped > 0 {
    warn!(skipped, "Patch cells fall outside the meta-grid");
  }
  stats.cells_skipped += skipped;
}

#[cfg(test)]
#[path = "meta_grid_test.rs"]
mod meta_grid_test;
