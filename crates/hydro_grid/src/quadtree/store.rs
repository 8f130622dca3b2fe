//! CellStore - per-patch cell state with the subdivide/merge/delete/restore
//! state machine.
//!
//! Every batch operation is best-effort: keys that are missing, stale or
//! already processed are skipped without error, because edit batches may
//! legitimately reference cells another edit already changed.

use std::collections::{BTreeSet, HashMap};

use smallvec::SmallVec;

use super::bounds::DAabb2;
use super::geometry::LevelGeometry;
use super::persist::PersistRow;
use super::transition::TransitionGroup;
use super::CellKey;
use crate::error::{GridError, Result};

/// One stored cell.
///
/// Invariant: `activate` implies `!deleted`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
  pub key: CellKey,
  pub activate: bool,
  pub deleted: bool,
}

impl Cell {
  #[inline]
  fn is_live(&self) -> bool {
    self.activate && !self.deleted
  }
}

/// Cell state for one patch, keyed by `CellKey`.
///
/// Bounds are not stored; see [`CellStore::bboxes`].
#[derive(Clone, Debug)]
pub struct CellStore {
  geometry: LevelGeometry,
  cells: HashMap<CellKey, Cell>,
}

impl CellStore {
  /// Create an empty store.
  pub fn new(geometry: LevelGeometry) -> Self {
    Self {
      geometry,
      cells: HashMap::new(),
    }
  }

  /// Create a store with every level-1 cell active.
  pub fn with_default_cells(geometry: LevelGeometry) -> Self {
    let count = geometry.level_size(1).map_or(0, |s| s.cell_count());
    let cells = (0..count)
      .map(|gid| {
        let key = CellKey::new(1, gid as u32);
        (
          key,
          Cell {
            key,
            activate: true,
            deleted: false,
          },
        )
      })
      .collect();
    Self { geometry, cells }
  }

  /// Rebuild a store from persisted rows.
  ///
  /// Rejects duplicate keys, keys outside the geometry and rows that are both
  /// active and deleted.
  pub fn from_rows(geometry: LevelGeometry, rows: &[PersistRow]) -> Result<Self> {
    let mut cells = HashMap::with_capacity(rows.len());
    for row in rows {
      let key = CellKey::from_index_key(row.index_key)?;
      if !geometry.contains(key) {
        return Err(GridError::Decode(format!("row {key} lies outside the patch grid")));
      }
      if row.activate && row.deleted {
        return Err(GridError::Decode(format!("row {key} is both active and deleted")));
      }
      let cell = Cell {
        key,
        activate: row.activate,
        deleted: row.deleted,
      };
      if cells.insert(key, cell).is_some() {
        return Err(GridError::Decode(format!("duplicate row for {key}")));
      }
    }
    Ok(Self { geometry, cells })
  }

  /// Rows in key order, ready for persistence.
  pub fn to_rows(&self) -> Vec<PersistRow> {
    let mut rows: Vec<PersistRow> = self
      .cells
      .values()
      .map(|c| PersistRow {
        deleted: c.deleted,
        activate: c.activate,
        index_key: c.key.index_key(),
      })
      .collect();
    rows.sort_unstable_by_key(|r| r.index_key);
    rows
  }

  pub fn geometry(&self) -> &LevelGeometry {
    &self.geometry
  }

  pub fn len(&self) -> usize {
    self.cells.len()
  }

  pub fn is_empty(&self) -> bool {
    self.cells.is_empty()
  }

  pub fn get(&self, key: CellKey) -> Option<&Cell> {
    self.cells.get(&key)
  }

  /// Iterate over stored cells in arbitrary order.
  pub fn iter(&self) -> impl Iterator<Item = &Cell> {
    self.cells.values()
  }

  // ===========================================================================
  // Edit operations
  // ===========================================================================

  /// Replace each live key with its children.
  ///
  /// Existing children are reactivated and un-deleted instead of duplicated.
  /// Returns every child key touched, in input order.
  pub fn subdivide(&mut self, keys: &[CellKey]) -> Vec<CellKey> {
    keys
      .iter()
      .filter_map(|key| self.apply_subdivide(*key))
      .flat_map(|group| group.keys_to_add)
      .collect()
  }

  fn apply_subdivide(&mut self, key: CellKey) -> Option<TransitionGroup> {
    if !self.cells.get(&key).is_some_and(Cell::is_live) {
      return None;
    }
    let group = TransitionGroup::new_subdivide(key, self.geometry.children(key))?;

    for child in &group.keys_to_add {
      let cell = self.cells.entry(*child).or_insert(Cell {
        key: *child,
        activate: true,
        deleted: false,
      });
      cell.activate = true;
      cell.deleted = false;
    }
    if let Some(parent) = self.cells.get_mut(&key) {
      parent.activate = false;
    }
    Some(group)
  }

  /// Activate parents whose complete child set is in `keys`.
  ///
  /// A parent merges only if all of its expected children appear in the batch
  /// and its own row exists. Every stored child of a merged parent is then
  /// removed, including children outside the batch. Returns the activated
  /// parents in key order.
  pub fn merge(&mut self, keys: &[CellKey]) -> Vec<CellKey> {
    let unique: BTreeSet<CellKey> = keys
      .iter()
      .copied()
      .filter(|k| k.level > 1 && self.geometry.contains(*k))
      .collect();

    let mut child_counts: HashMap<CellKey, usize> = HashMap::new();
    for key in &unique {
      if let Some(parent) = self.geometry.parent(*key) {
        *child_counts.entry(parent).or_default() += 1;
      }
    }

    let mut parents: Vec<CellKey> = child_counts
      .into_iter()
      .filter(|(parent, count)| {
        *count == self.geometry.child_count(parent.level) && self.cells.contains_key(parent)
      })
      .map(|(parent, _)| parent)
      .collect();
    parents.sort_unstable();

    parents
      .into_iter()
      .map(|parent| self.apply_merge(parent).group_key)
      .collect()
  }

  fn apply_merge(&mut self, parent: CellKey) -> TransitionGroup {
    if let Some(cell) = self.cells.get_mut(&parent) {
      cell.activate = true;
      cell.deleted = false;
    }
    let removed: SmallVec<[CellKey; 4]> = self
      .geometry
      .children(parent)
      .into_iter()
      .filter(|child| self.cells.remove(child).is_some())
      .collect();
    TransitionGroup::new_merge(parent, removed)
  }

  /// Mark live cells as deleted.
  pub fn delete(&mut self, keys: &[CellKey]) {
    for key in keys {
      if let Some(cell) = self.cells.get_mut(key) {
        if cell.is_live() {
          cell.deleted = true;
          cell.activate = false;
        }
      }
    }
  }

  /// Reactivate existing cells regardless of their prior state.
  pub fn restore(&mut self, keys: &[CellKey]) {
    for key in keys {
      if let Some(cell) = self.cells.get_mut(key) {
        cell.activate = true;
        cell.deleted = false;
      }
    }
  }

  // ===========================================================================
  // Queries
  // ===========================================================================

  /// Active keys in key order.
  pub fn active_keys(&self) -> Vec<CellKey> {
    self.keys_where(|c| c.activate)
  }

  /// Deleted keys in key order.
  pub fn deleted_keys(&self) -> Vec<CellKey> {
    self.keys_where(|c| c.deleted)
  }

  /// Active cells as parallel `(levels, global_ids)` arrays.
  pub fn query_active(&self) -> (Vec<u8>, Vec<u32>) {
    CellKey::unzip(self.active_keys())
  }

  /// Deleted cells as parallel `(levels, global_ids)` arrays.
  pub fn query_deleted(&self) -> (Vec<u8>, Vec<u32>) {
    CellKey::unzip(self.deleted_keys())
  }

  fn keys_where(&self, pred: impl Fn(&Cell) -> bool) -> Vec<CellKey> {
    let mut keys: Vec<CellKey> = self.cells.values().filter(|c| pred(c)).map(|c| c.key).collect();
    keys.sort_unstable();
    keys
  }

  /// Bounds for each key, in input order.
  ///
  /// Keys are grouped by level so each level's size is looked up once. Keys
  /// outside the geometry yield `None`. Does not require the keys to be
  /// stored.
  pub fn bboxes(&self, keys: &[CellKey]) -> Vec<Option<DAabb2>> {
    let mut by_level: HashMap<u8, Vec<usize>> = HashMap::new();
    for (i, key) in keys.iter().enumerate() {
      by_level.entry(key.level).or_default().push(i);
    }

    let mut out = vec![None; keys.len()];
    for (level, indices) in by_level {
      let Some(size) = self.geometry.level_size(level) else {
        continue;
      };
      if level == 0 {
        continue;
      }
      for i in indices {
        if (keys[i].global_id as u64) < size.cell_count() {
          out[i] = Some(self.geometry.cell_bbox(keys[i]));
        }
      }
    }
    out
  }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;
