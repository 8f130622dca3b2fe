//! LevelGeometry - level dimensions, subdivision rules and coordinate mapping.
//!
//! Derived once from domain bounds and a per-level cell-size table. Cell
//! bounds are never stored; they are recomputed from a key on demand.

use glam::DVec2;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::bounds::DAabb2;
use super::fraction::{CellFractions, Fraction};
use super::schema::{subdivision_ratios, GridSchema};
use super::CellKey;
use crate::error::{GridError, Result};

/// Children per axis `(sub_w, sub_h)` for cells of one level.
pub type SubdivideRule = (u32, u32);

/// Cell columns and rows of one level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSize {
  pub width: u32,
  pub height: u32,
}

impl LevelSize {
  #[inline]
  pub fn cell_count(&self) -> u64 {
    self.width as u64 * self.height as u64
  }
}

/// Per-level grid dimensions and coordinate mapping for one domain.
///
/// Index 0 is the virtual 1×1 root, index 1 the first real level. The last
/// subdivision rule is always `(1, 1)`.
///
/// Coordinates are computed on the aligned domain: the first level is a whole
/// number of first-size cells starting at `bounds.min`, so a level-L cell is
/// exactly `grid_info[L - 1]` wide.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelGeometry {
  bounds: DAabb2,
  extent: DVec2,
  grid_info: Vec<[f64; 2]>,
  level_info: Vec<LevelSize>,
  subdivide_rules: Vec<SubdivideRule>,
}

impl LevelGeometry {
  /// Derive level sizes for `bounds` from a cell-size table.
  pub fn new(bounds: DAabb2, grid_info: &[[f64; 2]]) -> Result<Self> {
    if !bounds.is_valid() {
      return Err(GridError::Validation(format!(
        "domain bounds {:?} must have positive extent",
        bounds.to_array()
      )));
    }
    let ratios = subdivision_ratios(grid_info)?;
    if grid_info.len() >= u8::MAX as usize {
      return Err(GridError::Validation(format!(
        "{} levels exceed the u8 level range",
        grid_info.len()
      )));
    }

    let first = grid_info[0];
    let size = bounds.size();
    let first_rule = (first_level_cells(size.x, first[0])?, first_level_cells(size.y, first[1])?);

    let mut subdivide_rules = Vec::with_capacity(grid_info.len() + 1);
    subdivide_rules.push(first_rule);
    subdivide_rules.extend(ratios);
    subdivide_rules.push((1, 1));

    let mut level_info = vec![LevelSize { width: 1, height: 1 }];
    for (level, rule) in subdivide_rules[..subdivide_rules.len() - 1].iter().enumerate() {
      let prev = level_info[level];
      let width = prev.width as u64 * rule.0 as u64;
      let height = prev.height as u64 * rule.1 as u64;
      if width > u32::MAX as u64 || height > u32::MAX as u64 || width * height > u32::MAX as u64 + 1 {
        return Err(GridError::Validation(format!(
          "level {} has {}x{} cells, beyond the u32 global id range",
          level + 1,
          width,
          height
        )));
      }
      level_info.push(LevelSize {
        width: width as u32,
        height: height as u32,
      });
    }

    let extent = DVec2::new(
      level_info[1].width as f64 * first[0],
      level_info[1].height as f64 * first[1],
    );

    Ok(Self {
      bounds,
      extent,
      grid_info: grid_info.to_vec(),
      level_info,
      subdivide_rules,
    })
  }

  /// Validate `schema` and derive the geometry for `bounds`.
  pub fn from_schema(bounds: DAabb2, schema: &GridSchema) -> Result<Self> {
    schema.validate()?;
    Self::new(bounds, &schema.grid_info)
  }

  /// Domain bounds as supplied.
  #[inline]
  pub fn bounds(&self) -> DAabb2 {
    self.bounds
  }

  /// Domain bounds extended to a whole number of first-level cells.
  #[inline]
  pub fn aligned_bounds(&self) -> DAabb2 {
    DAabb2::new(self.bounds.min, self.bounds.min + self.extent)
  }

  pub fn grid_info(&self) -> &[[f64; 2]] {
    &self.grid_info
  }

  pub fn level_info(&self) -> &[LevelSize] {
    &self.level_info
  }

  pub fn subdivide_rules(&self) -> &[SubdivideRule] {
    &self.subdivide_rules
  }

  /// Deepest real level.
  #[inline]
  pub fn max_level(&self) -> u8 {
    (self.level_info.len() - 1) as u8
  }

  #[inline]
  pub fn level_size(&self, level: u8) -> Option<LevelSize> {
    self.level_info.get(level as usize).copied()
  }

  #[inline]
  pub fn rule(&self, level: u8) -> Option<SubdivideRule> {
    self.subdivide_rules.get(level as usize).copied()
  }

  /// Number of children a cell at `level` splits into (0 at the deepest level).
  pub fn child_count(&self, level: u8) -> usize {
    if level == 0 || level >= self.max_level() {
      return 0;
    }
    let (sw, sh) = self.subdivide_rules[level as usize];
    (sw * sh) as usize
  }

  /// Check that a key addresses a real cell of this geometry.
  pub fn contains(&self, key: CellKey) -> bool {
    key.level >= 1
      && self
        .level_size(key.level)
        .is_some_and(|size| (key.global_id as u64) < size.cell_count())
  }

  /// Column and row of a key at its own level.
  #[inline]
  pub fn uv(&self, key: CellKey) -> (u32, u32) {
    let width = self.level_info[key.level as usize].width;
    (key.global_id % width, key.global_id / width)
  }

  /// Key at `(u, v)` on `level`, or `None` outside the level's grid.
  pub fn key_at(&self, level: u8, u: i64, v: i64) -> Option<CellKey> {
    let size = self.level_size(level)?;
    if u < 0 || v < 0 || u >= size.width as i64 || v >= size.height as i64 {
      return None;
    }
    Some(CellKey::new(level, (v * size.width as i64 + u) as u32))
  }

  /// Children one level deeper, in local-index order.
  ///
  /// Local index `i` sits at column `i % sub_w`, row `i / sub_w` inside the
  /// parent. Empty for the deepest level.
  pub fn children(&self, key: CellKey) -> SmallVec<[CellKey; 4]> {
    if self.child_count(key.level) == 0 {
      return SmallVec::new();
    }
    let (sw, sh) = self.subdivide_rules[key.level as usize];
    let (u, v) = self.uv(key);
    let child_width = self.level_info[key.level as usize + 1].width as u64;

    (0..sw * sh)
      .map(|local_id| {
        let cu = (u * sw + local_id % sw) as u64;
        let cv = (v * sh + local_id / sw) as u64;
        CellKey::new(key.level + 1, (cv * child_width + cu) as u32)
      })
      .collect()
  }

  /// Parent one level up. `None` for level 1 and the root.
  pub fn parent(&self, key: CellKey) -> Option<CellKey> {
    if key.level < 2 || key.level > self.max_level() {
      return None;
    }
    let parent_level = key.level - 1;
    let (sw, sh) = self.subdivide_rules[parent_level as usize];
    let parent_width = self.level_info[parent_level as usize].width;
    let (u, v) = self.uv(key);
    Some(CellKey::new(parent_level, (v / sh) * parent_width + u / sw))
  }

  /// All ancestors from the parent up to level 1.
  pub fn ancestors(&self, key: CellKey) -> SmallVec<[CellKey; 8]> {
    let mut out = SmallVec::new();
    let mut current = key;
    while let Some(parent) = self.parent(current) {
      out.push(parent);
      current = parent;
    }
    out
  }

  /// Boundary fractions of a cell relative to the aligned domain.
  pub fn fractions(&self, key: CellKey) -> CellFractions {
    let size = self.level_info[key.level as usize];
    let (u, v) = self.uv(key);
    CellFractions {
      x_min: Fraction::new(u, size.width),
      x_max: Fraction::new(u + 1, size.width),
      y_min: Fraction::new(v, size.height),
      y_max: Fraction::new(v + 1, size.height),
    }
  }

  /// World position of a fractional point.
  #[inline]
  pub fn point_at(&self, x: Fraction, y: Fraction) -> DVec2 {
    self.bounds.min + self.extent * DVec2::new(x.value(), y.value())
  }

  /// World-space bounds of a cell.
  pub fn cell_bbox(&self, key: CellKey) -> DAabb2 {
    let size = self.level_info[key.level as usize];
    let (u, v) = self.uv(key);
    let w = size.width as f64;
    let h = size.height as f64;
    let min = self.bounds.min + self.extent * DVec2::new(u as f64 / w, v as f64 / h);
    let max = self.bounds.min + self.extent * DVec2::new((u + 1) as f64 / w, (v + 1) as f64 / h);
    DAabb2::new(min, max)
  }
}

/// First-level cells needed to cover `extent`, tolerant of float noise.
fn first_level_cells(extent: f64, first_size: f64) -> Result<u32> {
  let raw = extent / first_size;
  let cells = (raw - raw * 1e-9).ceil().max(1.0);
  if cells > u32::MAX as f64 {
    return Err(GridError::Validation(format!(
      "first level needs {cells} cells along one axis"
    )));
  }
  Ok(cells as u32)
}

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;
