//! Recursive bounding-box bisection of the cell list.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::constants::{BLOCK_ENTRY_SIZE, DEFAULT_MAX_BLOCK_BYTES};
use crate::quadtree::{CellKey, DAabb2};

/// Block sizing and naming.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockConfig {
  /// Byte cap for one block file.
  pub max_block_bytes: usize,
  /// Prefix of block names and file names.
  pub name: String,
}

impl Default for BlockConfig {
  fn default() -> Self {
    Self {
      max_block_bytes: DEFAULT_MAX_BLOCK_BYTES,
      name: "grid".into(),
    }
  }
}

impl BlockConfig {
  /// Cells that fit under the byte cap (at least one).
  #[inline]
  pub fn cells_per_block(&self) -> usize {
    (self.max_block_bytes / BLOCK_ENTRY_SIZE).max(1)
  }
}

/// One cell as stored in a block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockCell {
  /// Zero-based record index in the cell stream.
  pub index: usize,
  pub key: CellKey,
  pub bbox: DAabb2,
}

/// A leaf of the bisection.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
  pub id: usize,
  pub bounds: DAabb2,
  pub cells: Vec<BlockCell>,
}

fn bounds_of(cells: &[BlockCell]) -> DAabb2 {
  cells.iter().fold(DAabb2::EMPTY, |acc, c| acc.union(&c.bbox))
}

#[inline]
fn axis_value(v: DVec2, axis: usize) -> f64 {
  if axis == 0 {
    v.x
  } else {
    v.y
  }
}

/// Bisect `cells` until every block holds at most `cap` cells.
///
/// Lists are split along the longer axis of their bounds at its midpoint,
/// by cell center. When every center falls on one side the list is split at
/// the median instead. Blocks are numbered depth-first, lower half first.
pub fn partition(cells: Vec<BlockCell>, cap: usize) -> Vec<Block> {
  let cap = cap.max(1);
  let mut blocks = Vec::new();
  let mut stack = vec![cells];

  while let Some(cells) = stack.pop() {
    if cells.is_empty() {
      continue;
    }
    let bounds = bounds_of(&cells);
    if cells.len() <= cap {
      blocks.push(Block {
        id: blocks.len(),
        bounds,
        cells,
      });
      continue;
    }

    let size = bounds.size();
    let axis = if size.x >= size.y { 0 } else { 1 };
    let mid = axis_value(bounds.center(), axis);
    let (lower, upper): (Vec<BlockCell>, Vec<BlockCell>) = cells
      .into_iter()
      .partition(|c| axis_value(c.bbox.center(), axis) < mid);

    let (lower, upper) = if lower.is_empty() || upper.is_empty() {
      let mut all = if lower.is_empty() { upper } else { lower };
      all.sort_by(|a, b| axis_value(a.bbox.center(), axis).total_cmp(&axis_value(b.bbox.center(), axis)));
      let upper = all.split_off(all.len() / 2);
      (all, upper)
    } else {
      (lower, upper)
    };

    stack.push(upper);
    stack.push(lower);
  }
  blocks
}

/// Binary block body: one 45-byte big-endian entry per cell.
pub fn encode_block(block: &Block) -> Vec<u8> {
  let mut out = Vec::with_capacity(block.cells.len() * BLOCK_ENTRY_SIZE);
  for cell in &block.cells {
    out.extend_from_slice(&(cell.index as u64 + 1).to_be_bytes());
    out.push(cell.key.level);
    out.extend_from_slice(&cell.key.global_id.to_be_bytes());
    for v in cell.bbox.to_array() {
      out.extend_from_slice(&v.to_be_bytes());
    }
  }
  out
}

#[cfg(test)]
#[path = "partition_test.rs"]
mod partition_test;
