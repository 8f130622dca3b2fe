//! Fixed-width persistence rows for cell stores.
//!
//! Each row is `u8 deleted, u8 activate, u64 index_key`, big-endian, and a
//! store file is the concatenation of its rows in index-key order.

use crate::constants::PERSIST_ROW_SIZE;
use crate::error::{GridError, Result};

/// One persisted cell row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PersistRow {
  pub deleted: bool,
  pub activate: bool,
  /// `(level << 32) | global_id`
  pub index_key: u64,
}

impl PersistRow {
  /// Append the row's bytes to `out`.
  pub fn encode(&self, out: &mut Vec<u8>) {
    out.push(self.deleted as u8);
    out.push(self.activate as u8);
    out.extend_from_slice(&self.index_key.to_be_bytes());
  }

  /// Decode one row. Flag bytes must be 0 or 1.
  pub fn decode(bytes: &[u8; PERSIST_ROW_SIZE]) -> Result<Self> {
    let flag = |b: u8, name: &str| match b {
      0 => Ok(false),
      1 => Ok(true),
      other => Err(GridError::Decode(format!("{name} flag byte {other} is not 0 or 1"))),
    };
    let mut key = [0u8; 8];
    key.copy_from_slice(&bytes[2..]);
    Ok(Self {
      deleted: flag(bytes[0], "deleted")?,
      activate: flag(bytes[1], "activate")?,
      index_key: u64::from_be_bytes(key),
    })
  }
}

/// Encode rows back to back.
pub fn encode_rows(rows: &[PersistRow]) -> Vec<u8> {
  let mut out = Vec::with_capacity(rows.len() * PERSIST_ROW_SIZE);
  for row in rows {
    row.encode(&mut out);
  }
  out
}

/// Decode a whole store file.
pub fn decode_rows(bytes: &[u8]) -> Result<Vec<PersistRow>> {
  if bytes.len() % PERSIST_ROW_SIZE != 0 {
    return Err(GridError::Decode(format!(
      "store data of {} bytes is not a multiple of {PERSIST_ROW_SIZE}",
      bytes.len()
    )));
  }
  bytes
    .chunks_exact(PERSIST_ROW_SIZE)
    .map(|chunk| {
      let mut row = [0u8; PERSIST_ROW_SIZE];
      row.copy_from_slice(chunk);
      PersistRow::decode(&row)
    })
    .collect()
}
