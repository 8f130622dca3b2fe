use super::*;
use crate::test_utils::square_geometry;

// =========================================================================
// Batch 2: Level Derivation Tests
// =========================================================================

/// [0,0,100,100] with first-level size 50 gives a 2×2 first level.
#[test]
fn test_first_level_from_bounds() {
  let geo = square_geometry(2);
  assert_eq!(geo.level_info()[0], LevelSize { width: 1, height: 1 });
  assert_eq!(geo.level_info()[1], LevelSize { width: 2, height: 2 });
  assert_eq!(geo.level_info()[2], LevelSize { width: 4, height: 4 });
  assert_eq!(geo.subdivide_rules(), &[(2, 2), (2, 2), (1, 1)]);
  assert_eq!(geo.max_level(), 2);
}

/// Level widths multiply by the rule of the level above.
#[test]
fn test_level_info_matches_rules() {
  let geo = LevelGeometry::new(
    DAabb2::from_array([0.0, 0.0, 300.0, 100.0]),
    &[[100.0, 100.0], [50.0, 25.0], [10.0, 5.0]],
  )
  .unwrap();
  for i in 0..geo.level_info().len() - 1 {
    let (sw, sh) = geo.subdivide_rules()[i];
    assert_eq!(geo.level_info()[i + 1].width, geo.level_info()[i].width * sw);
    assert_eq!(geo.level_info()[i + 1].height, geo.level_info()[i].height * sh);
  }
  assert_eq!(geo.level_info()[3], LevelSize { width: 30, height: 20 });
}

/// Partial coverage rounds the first level up and extends the aligned domain.
#[test]
fn test_unaligned_extent_rounds_up() {
  let geo = LevelGeometry::new(DAabb2::from_array([10.0, 20.0, 110.0, 95.0]), &[[30.0, 30.0]]).unwrap();
  assert_eq!(geo.level_info()[1], LevelSize { width: 4, height: 3 });
  assert_eq!(geo.aligned_bounds().to_array(), [10.0, 20.0, 130.0, 110.0]);
  assert_eq!(geo.bounds().to_array(), [10.0, 20.0, 110.0, 95.0]);
}

#[test]
fn test_float_noise_does_not_add_a_column() {
  let geo = LevelGeometry::new(DAabb2::from_array([0.0, 0.0, 0.3, 0.3]), &[[0.1, 0.1]]).unwrap();
  assert_eq!(geo.level_info()[1].width, 3);
}

#[test]
fn test_degenerate_bounds_rejected() {
  let err = LevelGeometry::new(DAabb2::from_array([0.0, 0.0, 0.0, 10.0]), &[[1.0, 1.0]]).unwrap_err();
  assert!(matches!(err, GridError::Validation(_)));
}

#[test]
fn test_global_id_overflow_rejected() {
  let err = LevelGeometry::new(
    DAabb2::from_array([0.0, 0.0, 1.0e6, 1.0e6]),
    &[[1.0, 1.0], [0.01, 0.01]],
  )
  .unwrap_err();
  assert!(matches!(err, GridError::Validation(_)));
}

// =========================================================================
// Batch 3: Hierarchy Navigation Tests
// =========================================================================

/// Children of (1,0) at width 4 are global ids 0, 1, 4, 5.
#[test]
fn test_children_in_local_order() {
  let geo = square_geometry(2);
  let children = geo.children(CellKey::new(1, 0));
  assert_eq!(
    children.as_slice(),
    &[
      CellKey::new(2, 0),
      CellKey::new(2, 1),
      CellKey::new(2, 4),
      CellKey::new(2, 5),
    ]
  );
}

#[test]
fn test_children_of_last_cell() {
  let geo = square_geometry(2);
  let children = geo.children(CellKey::new(1, 3));
  assert_eq!(
    children.as_slice(),
    &[
      CellKey::new(2, 10),
      CellKey::new(2, 11),
      CellKey::new(2, 14),
      CellKey::new(2, 15),
    ]
  );
}

#[test]
fn test_deepest_level_has_no_children() {
  let geo = square_geometry(2);
  assert!(geo.children(CellKey::new(2, 0)).is_empty());
  assert_eq!(geo.child_count(2), 0);
  assert_eq!(geo.child_count(1), 4);
}

#[test]
fn test_parent_inverts_children() {
  let geo = square_geometry(4);
  for gid in 0..64u32 {
    let key = CellKey::new(3, gid);
    for child in geo.children(key) {
      assert_eq!(geo.parent(child), Some(key));
    }
  }
  assert_eq!(geo.parent(CellKey::new(1, 0)), None);
}

#[test]
fn test_ancestors_walk_to_level_one() {
  let geo = square_geometry(4);
  let ancestors = geo.ancestors(CellKey::new(4, 255));
  assert_eq!(
    ancestors.as_slice(),
    &[CellKey::new(3, 63), CellKey::new(2, 15), CellKey::new(1, 3)]
  );
}

/// Non-square rules still invert.
#[test]
fn test_parent_with_uneven_rule() {
  let geo = LevelGeometry::new(
    DAabb2::from_array([0.0, 0.0, 300.0, 100.0]),
    &[[100.0, 100.0], [50.0, 25.0]],
  )
  .unwrap();
  for gid in 0..3u32 {
    let key = CellKey::new(1, gid);
    let children = geo.children(key);
    assert_eq!(children.len(), 8);
    for child in children {
      assert_eq!(geo.parent(child), Some(key));
    }
  }
}

#[test]
fn test_key_at_bounds() {
  let geo = square_geometry(2);
  assert_eq!(geo.key_at(2, 3, 3), Some(CellKey::new(2, 15)));
  assert_eq!(geo.key_at(2, -1, 0), None);
  assert_eq!(geo.key_at(2, 4, 0), None);
  assert_eq!(geo.key_at(9, 0, 0), None);
}

#[test]
fn test_contains() {
  let geo = square_geometry(2);
  assert!(geo.contains(CellKey::new(1, 3)));
  assert!(!geo.contains(CellKey::new(1, 4)));
  assert!(!geo.contains(CellKey::new(0, 0)));
  assert!(!geo.contains(CellKey::new(3, 0)));
}

// =========================================================================
// Batch 4: Coordinate Tests
// =========================================================================

#[test]
fn test_cell_bbox_of_children() {
  let geo = square_geometry(2);
  let boxes: Vec<[f64; 4]> = geo
    .children(CellKey::new(1, 0))
    .into_iter()
    .map(|k| geo.cell_bbox(k).to_array())
    .collect();
  assert_eq!(
    boxes,
    vec![
      [0.0, 0.0, 25.0, 25.0],
      [25.0, 0.0, 50.0, 25.0],
      [0.0, 25.0, 25.0, 50.0],
      [25.0, 25.0, 50.0, 50.0],
    ]
  );
}

#[test]
fn test_fractions_are_reduced() {
  let geo = square_geometry(2);
  let f = geo.fractions(CellKey::new(2, 6));
  assert_eq!(f.x_min, Fraction { num: 1, den: 2 });
  assert_eq!(f.x_max, Fraction { num: 3, den: 4 });
  assert_eq!(f.y_min, Fraction { num: 1, den: 4 });
  assert_eq!(f.y_max, Fraction { num: 1, den: 2 });
}

#[test]
fn test_point_at_matches_bbox() {
  let geo = square_geometry(3);
  let key = CellKey::new(3, 27);
  let f = geo.fractions(key);
  let bbox = geo.cell_bbox(key);
  assert_eq!(geo.point_at(f.x_min, f.y_min), bbox.min);
  assert_eq!(geo.point_at(f.x_max, f.y_max), bbox.max);
}
