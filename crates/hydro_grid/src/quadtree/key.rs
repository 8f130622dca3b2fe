//! CellKey - immutable value type identifying a cell in the hierarchy.
//!
//! Keys order lexicographically on `(level, global_id)`. That order is the
//! on-disk sort order and the index order of assembled cell arrays.

use std::fmt;

use crate::error::{GridError, Result};

/// Cell key - immutable value type.
///
/// `global_id = row * level_width + col`, 0-based, at the key's own level.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct CellKey {
  /// Depth in the hierarchy (0 = virtual root)
  pub level: u8,
  /// Row-major index within the level
  pub global_id: u32,
}

impl CellKey {
  /// Create a new key at the given level.
  pub const fn new(level: u8, global_id: u32) -> Self {
    Self { level, global_id }
  }

  /// Pack into the persisted `(level << 32) | global_id` form.
  #[inline]
  pub const fn index_key(self) -> u64 {
    ((self.level as u64) << 32) | self.global_id as u64
  }

  /// Unpack a persisted index key.
  ///
  /// Fails if the level bits do not fit in a `u8`.
  pub fn from_index_key(index_key: u64) -> Result<Self> {
    let level = index_key >> 32;
    let level = u8::try_from(level)
      .map_err(|_| GridError::Decode(format!("index key {index_key:#x} has level {level}")))?;
    Ok(Self::new(level, (index_key & 0xFFFF_FFFF) as u32))
  }

  /// Zip parallel `levels` / `global_ids` arrays into keys.
  ///
  /// Extra entries in the longer array are ignored.
  pub fn zip(levels: &[u8], global_ids: &[u32]) -> Vec<Self> {
    levels
      .iter()
      .zip(global_ids)
      .map(|(&level, &global_id)| Self::new(level, global_id))
      .collect()
  }

  /// Split keys into parallel `levels` / `global_ids` arrays.
  pub fn unzip(keys: impl IntoIterator<Item = Self>) -> (Vec<u8>, Vec<u32>) {
    keys.into_iter().map(|k| (k.level, k.global_id)).unzip()
  }
}

impl fmt::Display for CellKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "L{}#{}", self.level, self.global_id)
  }
}

#[cfg(test)]
#[path = "key_test.rs"]
mod key_test;
