use super::*;
use crate::constants::PATCH_TOPO_FILE;
use crate::test_utils::{patch_meta, square_schema};

fn meta() -> PatchMeta {
  patch_meta([0.0, 0.0, 100.0, 100.0], square_schema(3))
}

#[test]
fn test_new_patch_has_default_cells() {
  let patch = Patch::new(meta()).unwrap();
  assert_eq!(patch.activated_cells().len(), 4);
  assert_eq!(patch.bounds().to_array(), [0.0, 0.0, 100.0, 100.0]);
}

#[test]
fn test_new_patch_rejects_invalid_schema() {
  let mut bad = meta();
  bad.schema.epsg = 0;
  assert!(matches!(Patch::new(bad), Err(GridError::Validation(_))));
}

#[test]
fn test_open_missing_dir_is_not_found() {
  let dir = tempfile::tempdir().unwrap();
  let err = Patch::open(&dir.path().join("nope")).unwrap_err();
  assert!(matches!(err, GridError::NotFound(_)));
}

#[test]
fn test_open_missing_meta_is_not_found() {
  let dir = tempfile::tempdir().unwrap();
  let err = Patch::open(dir.path()).unwrap_err();
  assert!(matches!(err, GridError::NotFound(p) if p.ends_with(PATCH_META_FILE)));
}

#[test]
fn test_open_malformed_meta_is_json_error() {
  let dir = tempfile::tempdir().unwrap();
  std::fs::write(dir.path().join(PATCH_META_FILE), "{ not json").unwrap();
  assert!(matches!(Patch::open(dir.path()), Err(GridError::Json { .. })));
}

/// Save then open reproduces the active and deleted sets exactly.
#[test]
fn test_save_open_roundtrip() {
  let dir = tempfile::tempdir().unwrap();
  let mut patch = Patch::new(meta()).unwrap();
  let children = patch.store_mut().subdivide(&[CellKey::new(1, 1)]);
  patch.store_mut().subdivide(&children[..1]);
  patch.store_mut().delete(&[CellKey::new(1, 2), children[3]]);
  patch.save(dir.path()).unwrap();

  let reopened = Patch::open(dir.path()).unwrap();
  assert_eq!(reopened.meta(), patch.meta());
  assert_eq!(reopened.store().active_keys(), patch.store().active_keys());
  assert_eq!(reopened.store().deleted_keys(), patch.store().deleted_keys());
  assert_eq!(
    std::fs::read(dir.path().join(PATCH_TOPO_FILE)).unwrap().len(),
    patch.store().len() * crate::constants::PERSIST_ROW_SIZE
  );
}

#[test]
fn test_open_without_store_initializes_default() {
  let dir = tempfile::tempdir().unwrap();
  let mut patch = Patch::new(meta()).unwrap();
  patch.store_mut().subdivide(&[CellKey::new(1, 0)]);
  patch.save(dir.path()).unwrap();
  std::fs::remove_file(dir.path().join(PATCH_TOPO_FILE)).unwrap();

  let reopened = Patch::open(dir.path()).unwrap();
  assert_eq!(reopened.store().len(), 4);
}

/// A corrupt store is recovered as the default store, not an error.
#[test]
fn test_open_corrupt_store_falls_back() {
  let dir = tempfile::tempdir().unwrap();
  Patch::new(meta()).unwrap().save(dir.path()).unwrap();
  std::fs::write(dir.path().join(PATCH_TOPO_FILE), [1u8, 2, 3]).unwrap();

  let reopened = Patch::open(dir.path()).unwrap();
  assert_eq!(reopened.activated_cells().len(), 4);
}
