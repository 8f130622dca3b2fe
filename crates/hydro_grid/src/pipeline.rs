//! End-to-end assembly: patches in, topology files out.
//!
//! ```text
//! patches ──► merge ──► resolve conflicts ──► balance ──► index
//!                                                          │
//!   blocks ◄── records (parallel) ◄── edges ◄── neighbors ◄┘
//! ```
//!
//! Everything up to the edge set runs single-threaded in memory; only record
//! encoding fans out to a worker pool. A failed run leaves no resumable
//! state and is simply re-run.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;
use web_time::Instant;

use crate::assembly::{
  balance, build_edges, merge_patches, resolve_conflicts, resolve_neighbors, BalanceBudget, BalanceStats,
  CellIndex, EdgeTopology, MetaGrid, NeighborGraph, RemapStats,
};
use crate::blocks::{partition, write_blocks, BlockCell, BlockConfig};
use crate::constants::{CELL_TOPO_FILE, EDGE_TOPO_FILE, GRID_META_FILE, NE_FILE, NS_FILE};
use crate::error::{GridError, Result};
use crate::quadtree::{GridSchema, LevelSize, PatchSource, SubdivideRule};
use crate::topology::{
  encode_cell_records, encode_edge_records, read_cell_records, read_edge_records, write_ne, write_ns,
  write_records, TerrainSampler, WriterConfig,
};

/// Options for one assembly run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssembleOptions {
  pub balance: BalanceBudget,
  pub writer: WriterConfig,
  pub blocks: BlockConfig,
  /// Also write `ne.txt` and `ns.txt`.
  pub export_text: bool,
}

/// Wall time per stage, in microseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StageTimings {
  pub merge_us: u64,
  pub conflicts_us: u64,
  pub balance_us: u64,
  pub neighbors_us: u64,
  pub edges_us: u64,
  pub records_us: u64,
  pub blocks_us: u64,
}

impl StageTimings {
  pub fn total_us(&self) -> u64 {
    self.merge_us
      + self.conflicts_us
      + self.balance_us
      + self.neighbors_us
      + self.edges_us
      + self.records_us
      + self.blocks_us
  }
}

/// Summary of an assembly run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AssembleStats {
  pub cells: usize,
  pub edges: usize,
  pub blocks: usize,
  pub remap: RemapStats,
  /// Keys dropped because a descendant was also active.
  pub conflicts_removed: usize,
  pub balance: BalanceStats,
  pub timings: StageTimings,
}

/// In-memory result of assembly, before any file is written.
#[derive(Clone, Debug)]
pub struct AssembledMesh {
  pub meta: MetaGrid,
  pub index: CellIndex,
  pub neighbors: NeighborGraph,
  pub topology: EdgeTopology,
  pub stats: AssembleStats,
}

/// Contents of `grid.meta.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridMeta {
  pub epsg: u32,
  pub bounds: [f64; 4],
  pub grid_info: Vec<[f64; 2]>,
  pub level_info: Vec<LevelSize>,
  pub subdivide_rules: Vec<SubdivideRule>,
  pub alignment_origin: [f64; 2],
  pub cell_count: usize,
  pub edge_count: usize,
}

impl GridMeta {
  pub fn new(mesh: &AssembledMesh) -> Self {
    let geometry = &mesh.meta.geometry;
    Self {
      epsg: mesh.meta.schema.epsg,
      bounds: geometry.bounds().to_array(),
      grid_info: geometry.grid_info().to_vec(),
      level_info: geometry.level_info().to_vec(),
      subdivide_rules: geometry.subdivide_rules().to_vec(),
      alignment_origin: mesh.meta.schema.alignment_origin,
      cell_count: mesh.index.len(),
      edge_count: mesh.topology.edges.len(),
    }
  }
}

#[inline]
fn elapsed_us(start: Instant) -> u64 {
  start.elapsed().as_micros() as u64
}

/// Merge, resolve, balance and connect the patches in memory.
#[tracing::instrument(skip_all, name = "pipeline::assemble_mesh")]
pub fn assemble_mesh<P: PatchSource>(
  patches: &[P],
  schema: Option<&GridSchema>,
  options: &AssembleOptions,
) -> Result<AssembledMesh> {
  let mut stats = AssembleStats::default();
  let meta = MetaGrid::from_patches(patches, schema)?;
  let geometry = &meta.geometry;

  let (mut keys, remap) = {
    let _span = tracing::info_span!("merge").entered();
    let start = Instant::now();
    let merged = merge_patches(patches, geometry);
    stats.timings.merge_us = elapsed_us(start);
    merged
  };
  stats.remap = remap;

  {
    let _span = tracing::info_span!("conflicts").entered();
    let start = Instant::now();
    stats.conflicts_removed = resolve_conflicts(&mut keys, geometry);
    stats.timings.conflicts_us = elapsed_us(start);
  }

  {
    let _span = tracing::info_span!("balance").entered();
    let start = Instant::now();
    stats.balance = balance(&mut keys, geometry, &options.balance);
    stats.timings.balance_us = elapsed_us(start);
  }

  let (index, neighbors) = {
    let _span = tracing::info_span!("neighbors").entered();
    let start = Instant::now();
    let index = CellIndex::new(keys, geometry);
    let neighbors = resolve_neighbors(&index, geometry);
    stats.timings.neighbors_us = elapsed_us(start);
    (index, neighbors)
  };

  let topology = {
    let _span = tracing::info_span!("edges").entered();
    let start = Instant::now();
    let topology = build_edges(&index, &neighbors, geometry);
    stats.timings.edges_us = elapsed_us(start);
    topology
  };

  stats.cells = index.len();
  stats.edges = topology.edges.len();
  info!(
    patches = patches.len(),
    cells = stats.cells,
    edges = stats.edges,
    conflicts = stats.conflicts_removed,
    refined = stats.balance.risk_cells_refined,
    "Assembled mesh"
  );

  Ok(AssembledMesh {
    meta,
    index,
    neighbors,
    topology,
    stats,
  })
}

/// Assemble the patches and write every output file into `output_dir`.
///
/// Writes `cell_topo.bin`, `edge_topo.bin`, `grid.meta.json`, the block
/// files and, with `export_text`, `ne.txt` / `ns.txt`.
#[tracing::instrument(skip_all, name = "pipeline::assemble")]
pub fn assemble<P: PatchSource, S: TerrainSampler>(
  patches: &[P],
  schema: Option<&GridSchema>,
  sampler: &S,
  options: &AssembleOptions,
  output_dir: &Path,
) -> Result<AssembleStats> {
  if options.writer.batch_size == 0 {
    return Err(GridError::Validation("batch_size must be positive".into()));
  }
  let mesh = assemble_mesh(patches, schema, options)?;
  let mut stats = mesh.stats;
  let geometry = &mesh.meta.geometry;

  std::fs::create_dir_all(output_dir).map_err(|e| GridError::io(output_dir, e))?;

  {
    let _span = tracing::info_span!("records").entered();
    let start = Instant::now();
    let cells = encode_cell_records(&mesh.index, &mesh.topology, geometry, sampler, &options.writer)?;
    let edges = encode_edge_records(&mesh.topology, geometry, sampler, &options.writer)?;
    write_records(&output_dir.join(CELL_TOPO_FILE), &cells)?;
    write_records(&output_dir.join(EDGE_TOPO_FILE), &edges)?;

    if options.export_text {
      write_ne(&output_dir.join(NE_FILE), &read_cell_records(&cells)?)?;
      write_ns(&output_dir.join(NS_FILE), &read_edge_records(&edges)?)?;
    }
    stats.timings.records_us = elapsed_us(start);
  }

  let meta_path = output_dir.join(GRID_META_FILE);
  let meta_json =
    serde_json::to_string_pretty(&GridMeta::new(&mesh)).map_err(|e| GridError::json(&meta_path, e))?;
  std::fs::write(&meta_path, meta_json).map_err(|e| GridError::io(&meta_path, e))?;

  {
    let _span = tracing::info_span!("blocks").entered();
    let start = Instant::now();
    let cells: Vec<BlockCell> = mesh
      .index
      .keys()
      .iter()
      .enumerate()
      .map(|(index, key)| BlockCell {
        index,
        key: *key,
        bbox: geometry.cell_bbox(*key),
      })
      .collect();
    let blocks = partition(cells, options.blocks.cells_per_block());
    let manifest = write_blocks(output_dir, &blocks, &options.blocks)?;
    stats.blocks = manifest.total_blocks;
    stats.timings.blocks_us = elapsed_us(start);
  }

  info!(
    cells = stats.cells,
    edges = stats.edges,
    blocks = stats.blocks,
    total_ms = stats.timings.total_us() / 1000,
    path = %output_dir.display(),
    "Assembly complete"
  );
  Ok(stats)
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;
