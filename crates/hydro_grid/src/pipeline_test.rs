use super::*;
use crate::blocks::BlockManifest;
use crate::constants::{BLOCK_DIR, BLOCK_MANIFEST_FILE};
use crate::quadtree::{CellKey, Patch};
use crate::topology::{read_ne, read_ns, NullSampler};
use crate::test_utils::{patch_meta, square_schema, FailingSampler, PlaneSampler};

fn halves() -> Vec<Patch> {
  let left = Patch::new(patch_meta([0.0, 0.0, 50.0, 100.0], square_schema(3))).unwrap();
  let mut right = Patch::new(patch_meta([50.0, 0.0, 100.0, 100.0], square_schema(3))).unwrap();
  right.store_mut().subdivide(&[CellKey::new(1, 0)]);
  vec![left, right]
}

fn corner_patch() -> Patch {
  let mut patch = Patch::new(patch_meta([0.0, 0.0, 100.0, 100.0], square_schema(5))).unwrap();
  for key in [CellKey::new(1, 0), CellKey::new(2, 1), CellKey::new(3, 3), CellKey::new(4, 7)] {
    patch.store_mut().subdivide(&[key]);
  }
  patch
}

// =============================================================================
// Batch 1: In-memory assembly
// =============================================================================

/// Adjacent patches at different levels form one mesh.
#[test]
fn test_assemble_mesh_halves() {
  let mesh = assemble_mesh(&halves(), None, &AssembleOptions::default()).unwrap();
  assert_eq!(mesh.stats.cells, 7);
  assert_eq!(mesh.stats.conflicts_removed, 0);
  assert_eq!(mesh.stats.edges, mesh.topology.edges.len());
  assert!(mesh.stats.edges <= 4 * mesh.stats.cells);
  assert_eq!(mesh.index.keys()[0], CellKey::new(1, 0));
}

/// A refined patch overlapping an unrefined one wins over the coarse cell.
#[test]
fn test_assemble_mesh_resolves_overlap() {
  let coarse = Patch::new(patch_meta([0.0, 0.0, 100.0, 100.0], square_schema(3))).unwrap();
  let mut fine = coarse.clone();
  fine.store_mut().subdivide(&[CellKey::new(1, 0)]);

  let mesh = assemble_mesh(&[coarse, fine], None, &AssembleOptions::default()).unwrap();
  assert_eq!(mesh.stats.conflicts_removed, 1);
  assert_eq!(mesh.stats.cells, 7);
  assert!(mesh.index.position(CellKey::new(1, 0)).is_none());
}

/// Balancing runs inside the pipeline when a threshold is set.
#[test]
fn test_assemble_mesh_balanced() {
  let options = AssembleOptions {
    balance: BalanceBudget::with_threshold(1),
    ..Default::default()
  };
  let mesh = assemble_mesh(&[corner_patch()], None, &options).unwrap();
  assert!(mesh.stats.balance.converged);
  assert!(mesh.stats.balance.risk_cells_refined > 0);
  assert!(mesh.index.position(CellKey::new(1, 1)).is_none());
}

#[test]
fn test_assemble_mesh_requires_patches() {
  let none: Vec<Patch> = Vec::new();
  assert!(matches!(
    assemble_mesh(&none, None, &AssembleOptions::default()),
    Err(GridError::Validation(_))
  ));
}

// =============================================================================
// Batch 2: Files
// =============================================================================

/// Every output file is written and agrees with the stats.
#[test]
fn test_assemble_writes_outputs() {
  let dir = tempfile::tempdir().unwrap();
  let options = AssembleOptions {
    export_text: true,
    ..Default::default()
  };
  let stats = assemble(&halves(), None, &PlaneSampler { category: 2 }, &options, dir.path()).unwrap();

  let cells = read_cell_records(&std::fs::read(dir.path().join(CELL_TOPO_FILE)).unwrap()).unwrap();
  let edges = read_edge_records(&std::fs::read(dir.path().join(EDGE_TOPO_FILE)).unwrap()).unwrap();
  assert_eq!(cells.len(), stats.cells);
  assert_eq!(edges.len(), stats.edges);
  assert!(cells.iter().all(|c| c.category == 2));

  let meta: GridMeta =
    serde_json::from_str(&std::fs::read_to_string(dir.path().join(GRID_META_FILE)).unwrap()).unwrap();
  assert_eq!(meta.epsg, 2326);
  assert_eq!(meta.cell_count, stats.cells);
  assert_eq!(meta.edge_count, stats.edges);
  assert_eq!(meta.bounds, [0.0, 0.0, 100.0, 100.0]);
  assert_eq!(meta.subdivide_rules, vec![(2, 2), (2, 2), (2, 2), (1, 1)]);

  let manifest = BlockManifest::load(&dir.path().join(BLOCK_DIR).join(BLOCK_MANIFEST_FILE)).unwrap();
  assert_eq!(manifest.total_blocks, stats.blocks);
  assert_eq!(manifest.blocks.iter().map(|b| b.count).sum::<usize>(), stats.cells);

  let ne = read_ne(&dir.path().join(NE_FILE)).unwrap();
  let ns = read_ns(&dir.path().join(NS_FILE)).unwrap();
  assert_eq!(ne.len(), stats.cells);
  assert_eq!(ns.len(), stats.edges);
  assert!(ne.iter().zip(&cells).all(|(row, cell)| row.edges == cell.edges));
}

/// Text exports are opt-in.
#[test]
fn test_assemble_without_text_export() {
  let dir = tempfile::tempdir().unwrap();
  assemble(&halves(), None, &NullSampler, &AssembleOptions::default(), dir.path()).unwrap();
  assert!(!dir.path().join(NE_FILE).exists());
  assert!(dir.path().join(CELL_TOPO_FILE).exists());
}

/// Batch size changes scheduling, never the bytes.
#[test]
fn test_assemble_output_batch_independent() {
  let a = tempfile::tempdir().unwrap();
  let b = tempfile::tempdir().unwrap();
  let sampler = PlaneSampler { category: 1 };
  let small = AssembleOptions {
    writer: WriterConfig {
      batch_size: 2,
      max_workers: Some(4),
    },
    ..Default::default()
  };
  assemble(&[corner_patch()], None, &sampler, &AssembleOptions::default(), a.path()).unwrap();
  assemble(&[corner_patch()], None, &sampler, &small, b.path()).unwrap();

  for file in [CELL_TOPO_FILE, EDGE_TOPO_FILE] {
    assert_eq!(
      std::fs::read(a.path().join(file)).unwrap(),
      std::fs::read(b.path().join(file)).unwrap()
    );
  }
}

/// Sampler failures degrade to sentinel values without losing topology.
#[test]
fn test_assemble_with_failing_sampler() {
  let dir = tempfile::tempdir().unwrap();
  let stats = assemble(&halves(), None, &FailingSampler, &AssembleOptions::default(), dir.path()).unwrap();
  let edges = read_edge_records(&std::fs::read(dir.path().join(EDGE_TOPO_FILE)).unwrap()).unwrap();
  assert_eq!(edges.len(), stats.edges);
  assert!(edges.iter().all(|e| e.altitude == -9999.0 && e.category == 0));
}

#[test]
fn test_assemble_rejects_zero_batch_size() {
  let dir = tempfile::tempdir().unwrap();
  let options = AssembleOptions {
    writer: WriterConfig {
      batch_size: 0,
      max_workers: None,
    },
    ..Default::default()
  };
  assert!(matches!(
    assemble(&halves(), None, &FailingSampler, &options, dir.path()),
    Err(GridError::Validation(_))
  ));
}

/// Patches saved to disk and reopened assemble the same as in memory.
#[test]
fn test_assemble_from_saved_patches() {
  let dir = tempfile::tempdir().unwrap();
  let mut reopened = Vec::new();
  for (i, patch) in halves().iter().enumerate() {
    let path = dir.path().join(format!("patch_{i}"));
    patch.save(&path).unwrap();
    reopened.push(Patch::open(&path).unwrap());
  }

  let from_disk = assemble_mesh(&reopened, None, &AssembleOptions::default()).unwrap();
  let in_memory = assemble_mesh(&halves(), None, &AssembleOptions::default()).unwrap();
  assert_eq!(from_disk.index.keys(), in_memory.index.keys());
  assert_eq!(from_disk.stats.edges, in_memory.stats.edges);
}
