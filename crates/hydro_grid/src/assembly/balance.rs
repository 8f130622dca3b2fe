//! Resolution-gradient balancing.
//!
//! A risk cell is a leaf more than `risk_threshold` levels coarser than some
//! leaf across one of its sides. Every pass refines all risk cells by one
//! level, which may expose new risk cells further out, so passes repeat until
//! none remain or the iteration bound is hit.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::neighbors::{adjacent_leaves, branch_set, EdgeCode};
use crate::quadtree::{CellKey, LevelGeometry, TransitionGroup};

/// Balancing configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceBudget {
  /// Maximum allowed level difference across a side. Negative disables
  /// balancing.
  pub risk_threshold: i32,
  /// Refinement passes before giving up (0 = derive from the level count).
  pub max_iterations: usize,
}

impl BalanceBudget {
  /// Balancing switched off.
  pub const DISABLED: Self = Self {
    risk_threshold: -1,
    max_iterations: 0,
  };

  pub const fn with_threshold(risk_threshold: i32) -> Self {
    Self {
      risk_threshold,
      max_iterations: 0,
    }
  }

  #[inline]
  pub fn enabled(&self) -> bool {
    self.risk_threshold >= 0
  }

  /// Pass limit for `geometry`.
  ///
  /// One pass moves the refinement front by at least one level, so
  /// `(max_level + 1)` passes per level is never reached by consistent input.
  pub fn iteration_bound(&self, geometry: &LevelGeometry) -> usize {
    if self.max_iterations > 0 {
      return self.max_iterations;
    }
    let levels = geometry.level_info().len();
    (geometry.max_level() as usize + 1) * levels
  }
}

impl Default for BalanceBudget {
  fn default() -> Self {
    Self::DISABLED
  }
}

/// Statistics from balancing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BalanceStats {
  /// Refinement passes performed.
  pub iterations: usize,
  /// Risk cells replaced by their children.
  pub risk_cells_refined: usize,
  /// Children activated by those refinements.
  pub cells_added: usize,
  /// False when the iteration bound stopped balancing early.
  pub converged: bool,
}

/// Leaves in `keys` that are more than `threshold` levels coarser than an
/// adjacent leaf. Sorted.
pub fn find_risk_cells(keys: &HashSet<CellKey>, geometry: &LevelGeometry, threshold: i32) -> Vec<CellKey> {
  let branches = branch_set(keys.iter().copied(), geometry);
  let mut risk: Vec<CellKey> = keys
    .iter()
    .copied()
    .filter(|key| is_risk(*key, keys, &branches, geometry, threshold))
    .collect();
  risk.sort_unstable();
  risk
}

fn is_risk(
  key: CellKey,
  keys: &HashSet<CellKey>,
  branches: &HashSet<CellKey>,
  geometry: &LevelGeometry,
  threshold: i32,
) -> bool {
  let (u, v) = geometry.uv(key);
  EdgeCode::ALL.into_iter().any(|code| {
    let (du, dv) = code.offset();
    let Some(across) = geometry.key_at(key.level, u as i64 + du, v as i64 + dv) else {
      return false;
    };
    // Same-level leaf, coarser leaf or hole: nothing finer on this side.
    if !branches.contains(&across) {
      return false;
    }
    adjacent_leaves(
      geometry,
      across,
      code,
      |k| keys.contains(&k),
      |k| branches.contains(&k),
    )
    .iter()
    .any(|leaf| leaf.level as i32 - key.level as i32 > threshold)
  })
}

/// Refine risk cells until none remain.
///
/// `keys` must already be conflict-free. Does nothing when the budget is
/// disabled.
#[tracing::instrument(skip_all, name = "assembly::balance")]
pub fn balance(keys: &mut HashSet<CellKey>, geometry: &LevelGeometry, budget: &BalanceBudget) -> BalanceStats {
  let mut stats = BalanceStats {
    converged: true,
    ..Default::default()
  };
  if !budget.enabled() {
    return stats;
  }

  let bound = budget.iteration_bound(geometry);
  loop {
    let groups: Vec<TransitionGroup> = find_risk_cells(keys, geometry, budget.risk_threshold)
      .into_iter()
      .filter_map(|cell| TransitionGroup::new_subdivide(cell, geometry.children(cell)))
      .collect();
    if groups.is_empty() {
      break;
    }
    if stats.iterations >= bound {
      warn!(
        iterations = stats.iterations,
        pending = groups.len(),
        "Balancing did not converge; subdivision rules may be inconsistent"
      );
      stats.converged = false;
      break;
    }

    stats.iterations += 1;
    for group in &groups {
      for removed in &group.keys_to_remove {
        keys.remove(removed);
      }
      keys.extend(group.keys_to_add.iter().copied());
      stats.risk_cells_refined += 1;
      stats.cells_added += group.keys_to_add.len();
    }
    debug!(pass = stats.iterations, refined = groups.len(), "Balancing pass");
  }
  stats
}

#[cfg(test)]
#[path = "balance_test.rs"]
mod balance_test;
