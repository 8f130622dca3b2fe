use super::*;

// =========================================================================
// Batch 1: CellKey Tests
// =========================================================================

/// Index key packs level into the high 32 bits.
#[test]
fn test_index_key_layout() {
  let key = CellKey::new(3, 17);
  assert_eq!(key.index_key(), (3u64 << 32) | 17);
}

#[test]
fn test_index_key_roundtrip_extremes() {
  for key in [
    CellKey::new(0, 0),
    CellKey::new(1, u32::MAX),
    CellKey::new(u8::MAX, 12345),
  ] {
    assert_eq!(CellKey::from_index_key(key.index_key()).unwrap(), key);
  }
}

/// A level that does not fit in u8 is a decode error, not a truncation.
#[test]
fn test_from_index_key_rejects_wide_level() {
  let err = CellKey::from_index_key(256u64 << 32).unwrap_err();
  assert!(matches!(err, GridError::Decode(_)));
}

/// Ordering is level-major, then global id.
#[test]
fn test_total_order_is_level_then_id() {
  let mut keys = vec![
    CellKey::new(2, 0),
    CellKey::new(1, 5),
    CellKey::new(2, 1),
    CellKey::new(1, 0),
  ];
  keys.sort();
  assert_eq!(
    keys,
    vec![
      CellKey::new(1, 0),
      CellKey::new(1, 5),
      CellKey::new(2, 0),
      CellKey::new(2, 1),
    ]
  );
  // Sorted index keys give the same order
  let packed: Vec<u64> = keys.iter().map(|k| k.index_key()).collect();
  assert!(packed.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_zip_and_unzip() {
  let keys = CellKey::zip(&[1, 2, 2], &[0, 4, 5]);
  assert_eq!(keys[1], CellKey::new(2, 4));
  let (levels, ids) = CellKey::unzip(keys);
  assert_eq!(levels, vec![1, 2, 2]);
  assert_eq!(ids, vec![0, 4, 5]);
}

#[test]
fn test_zip_ignores_unpaired_entries() {
  assert_eq!(CellKey::zip(&[1, 1, 1], &[7]).len(), 1);
}
