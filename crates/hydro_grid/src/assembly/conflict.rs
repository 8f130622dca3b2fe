//! Leaf-invariant enforcement for merged key sets.

use std::collections::HashSet;

use crate::quadtree::{CellKey, LevelGeometry};

/// Remove every key that has an active descendant.
///
/// Levels are walked deepest first; each key strips all of its ancestors from
/// the set. Afterwards no key in `keys` is an ancestor of another. Returns
/// the number of keys removed.
#[tracing::instrument(skip_all, name = "assembly::resolve_conflicts")]
pub fn resolve_conflicts(keys: &mut HashSet<CellKey>, geometry: &LevelGeometry) -> usize {
  let before = keys.len();
  for level in (2..=geometry.max_level()).rev() {
    let at_level: Vec<CellKey> = keys.iter().copied().filter(|k| k.level == level).collect();
    for key in at_level {
      for ancestor in geometry.ancestors(key) {
        keys.remove(&ancestor);
      }
    }
  }
  before - keys.len()
}
