//! TransitionGroup - atomic quadtree state changes.
//!
//! A transition group represents either a subdivide (1 parent → N children)
//! or merge (N children → 1 parent) operation, where N is the subdivision
//! factor of the parent's level.

use smallvec::SmallVec;

use super::CellKey;

/// Type of quadtree transition.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TransitionType {
  /// 1 parent → N children (finer detail)
  Subdivide,
  /// N children → 1 parent (coarser detail)
  Merge,
}

/// Atomic quadtree state change.
///
/// All keys in a group transition together. Group key is always the parent.
#[derive(Clone, Debug)]
pub struct TransitionGroup {
  /// Type of transition.
  pub transition_type: TransitionType,

  /// Key: the parent cell (for both subdivide and merge).
  pub group_key: CellKey,

  /// Keys that become active.
  /// - Subdivide: the children
  /// - Merge: the parent
  pub keys_to_add: SmallVec<[CellKey; 4]>,

  /// Keys that stop being active.
  /// - Subdivide: the parent
  /// - Merge: the children
  pub keys_to_remove: SmallVec<[CellKey; 4]>,
}

impl TransitionGroup {
  /// Create a subdivide transition: parent → children.
  ///
  /// Returns `None` when there is nothing to subdivide into.
  pub fn new_subdivide(parent: CellKey, children: SmallVec<[CellKey; 4]>) -> Option<Self> {
    if children.is_empty() {
      return None;
    }

    let mut keys_to_remove = SmallVec::new();
    keys_to_remove.push(parent);

    Some(Self {
      transition_type: TransitionType::Subdivide,
      group_key: parent,
      keys_to_add: children,
      keys_to_remove,
    })
  }

  /// Create a merge transition: children → parent.
  ///
  /// `children` are the sibling keys actually removed; may be empty when
  /// they were never materialized.
  pub fn new_merge(parent: CellKey, children: SmallVec<[CellKey; 4]>) -> Self {
    let mut keys_to_add = SmallVec::new();
    keys_to_add.push(parent);

    Self {
      transition_type: TransitionType::Merge,
      group_key: parent,
      keys_to_add,
      keys_to_remove: children,
    }
  }
}
