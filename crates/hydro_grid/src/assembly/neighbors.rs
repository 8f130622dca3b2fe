//! Neighbor resolution between assembled leaf cells.
//!
//! Each leaf looks one step across each of its four sides at its own level.
//! A leaf there is a 1:1 neighbor; a branch (a cell with leaf descendants) is
//! descended with an explicit stack, keeping only children that touch the
//! shared side, which yields the one-to-many case. A coarser leaf on the
//! other side is picked up from that leaf's own pass, since every relation
//! is inserted on both cells.

use std::collections::{HashMap, HashSet};

use smallvec::SmallVec;

use crate::quadtree::{CellKey, LevelGeometry};

/// Side of a cell. The discriminant is the on-disk side code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EdgeCode {
  /// `v + 1`
  North = 0,
  /// `u - 1`
  West = 1,
  /// `v - 1`
  South = 2,
  /// `u + 1`
  East = 3,
}

impl EdgeCode {
  pub const ALL: [EdgeCode; 4] = [EdgeCode::North, EdgeCode::West, EdgeCode::South, EdgeCode::East];

  #[inline]
  pub fn index(self) -> usize {
    self as usize
  }

  #[inline]
  pub fn opposite(self) -> Self {
    match self {
      EdgeCode::North => EdgeCode::South,
      EdgeCode::West => EdgeCode::East,
      EdgeCode::South => EdgeCode::North,
      EdgeCode::East => EdgeCode::West,
    }
  }

  /// Column/row step towards this side.
  #[inline]
  pub fn offset(self) -> (i64, i64) {
    match self {
      EdgeCode::North => (0, 1),
      EdgeCode::West => (-1, 0),
      EdgeCode::South => (0, -1),
      EdgeCode::East => (1, 0),
    }
  }

  /// Whether the child at `local_id` of a cell lying on this side of us
  /// touches the shared side.
  ///
  /// A northern neighbor touches with its bottom row, an eastern one with
  /// its left column, and so on.
  #[inline]
  pub fn is_adjacent(self, local_id: u32, sub_w: u32, sub_h: u32) -> bool {
    match self {
      EdgeCode::North => local_id < sub_w,
      EdgeCode::West => local_id % sub_w == sub_w - 1,
      EdgeCode::South => local_id >= sub_w * (sub_h - 1),
      EdgeCode::East => local_id % sub_w == 0,
    }
  }
}

// =============================================================================
// CellIndex
// =============================================================================

/// Sorted leaf cells with key → index lookup.
///
/// The position in `keys` is the cell's zero-based record index.
#[derive(Clone, Debug, Default)]
pub struct CellIndex {
  keys: Vec<CellKey>,
  positions: HashMap<CellKey, usize>,
  branches: HashSet<CellKey>,
}

impl CellIndex {
  /// Index a conflict-free leaf set. Keys are sorted by `(level, global_id)`.
  pub fn new(leaves: impl IntoIterator<Item = CellKey>, geometry: &LevelGeometry) -> Self {
    let mut keys: Vec<CellKey> = leaves.into_iter().collect();
    keys.sort_unstable();
    keys.dedup();
    let positions = keys.iter().enumerate().map(|(i, k)| (*k, i)).collect();
    let branches = branch_set(keys.iter().copied(), geometry);
    Self {
      keys,
      positions,
      branches,
    }
  }

  #[inline]
  pub fn keys(&self) -> &[CellKey] {
    &self.keys
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.keys.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.keys.is_empty()
  }

  #[inline]
  pub fn position(&self, key: CellKey) -> Option<usize> {
    self.positions.get(&key).copied()
  }

  /// Whether `key` is a strict ancestor of some leaf.
  #[inline]
  pub fn is_branch(&self, key: CellKey) -> bool {
    self.branches.contains(&key)
  }
}

/// Every strict ancestor of every leaf.
pub(crate) fn branch_set(leaves: impl Iterator<Item = CellKey>, geometry: &LevelGeometry) -> HashSet<CellKey> {
  let mut branches = HashSet::new();
  for leaf in leaves {
    for ancestor in geometry.ancestors(leaf) {
      // Already walked from a sibling.
      if !branches.insert(ancestor) {
        break;
      }
    }
  }
  branches
}

/// Leaves under `branch` that touch the side of `branch` facing `code.opposite()`.
///
/// `code` is the side of the querying cell on which `branch` lies.
pub(crate) fn adjacent_leaves(
  geometry: &LevelGeometry,
  branch: CellKey,
  code: EdgeCode,
  is_leaf: impl Fn(CellKey) -> bool,
  is_branch: impl Fn(CellKey) -> bool,
) -> SmallVec<[CellKey; 4]> {
  let mut found = SmallVec::new();
  let mut stack = vec![branch];
  while let Some(current) = stack.pop() {
    let Some((sub_w, sub_h)) = geometry.rule(current.level) else {
      continue;
    };
    for (local_id, child) in geometry.children(current).into_iter().enumerate() {
      if !code.is_adjacent(local_id as u32, sub_w, sub_h) {
        continue;
      }
      if is_leaf(child) {
        found.push(child);
      } else if is_branch(child) {
        stack.push(child);
      }
    }
  }
  found
}

// =============================================================================
// NeighborGraph
// =============================================================================

/// Per-cell neighbor indices, one slot per [`EdgeCode`].
#[derive(Clone, Debug, Default)]
pub struct NeighborGraph {
  slots: Vec<[SmallVec<[usize; 4]>; 4]>,
}

impl NeighborGraph {
  fn with_len(len: usize) -> Self {
    Self {
      slots: vec![Default::default(); len],
    }
  }

  fn link(&mut self, cell: usize, code: EdgeCode, neighbor: usize) {
    self.slots[cell][code.index()].push(neighbor);
    self.slots[neighbor][code.opposite().index()].push(cell);
  }

  fn finish(&mut self) {
    for cell in &mut self.slots {
      for slot in cell.iter_mut() {
        slot.sort_unstable();
        slot.dedup();
      }
    }
  }

  /// Neighbor indices of `cell` on side `code`, ascending.
  #[inline]
  pub fn neighbors(&self, cell: usize, code: EdgeCode) -> &[usize] {
    &self.slots[cell][code.index()]
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.slots.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.slots.is_empty()
  }

  /// Total directed neighbor relations.
  pub fn relation_count(&self) -> usize {
    self.slots.iter().flatten().map(|s| s.len()).sum()
  }
}

/// Resolve the four neighbor slots of every indexed leaf.
#[tracing::instrument(skip_all, name = "assembly::resolve_neighbors")]
pub fn resolve_neighbors(index: &CellIndex, geometry: &LevelGeometry) -> NeighborGraph {
  let mut graph = NeighborGraph::with_len(index.len());

  for (i, key) in index.keys().iter().enumerate() {
    let (u, v) = geometry.uv(*key);
    for code in EdgeCode::ALL {
      let (du, dv) = code.offset();
      let Some(across) = geometry.key_at(key.level, u as i64 + du, v as i64 + dv) else {
        continue;
      };

      if let Some(j) = index.position(across) {
        graph.link(i, code, j);
        continue;
      }
      // Either covered by a coarser leaf, which links us from its side, or a hole.
      if !index.is_branch(across) {
        continue;
      }

      let leaves = adjacent_leaves(
        geometry,
        across,
        code,
        |k| index.position(k).is_some(),
        |k| index.is_branch(k),
      );
      for leaf in leaves {
        if let Some(j) = index.position(leaf) {
          graph.link(i, code, j);
        }
      }
    }
  }

  graph.finish();
  graph
}

#[cfg(test)]
#[path = "neighbors_test.rs"]
mod neighbors_test;
