//! hydro_grid - Adaptive multi-resolution quadtree grids for hydrological
//! modeling.
//!
//! Users edit grid refinement per region ("patches"). This crate assembles any
//! number of patches into one consistent global mesh and exports its topology.
//!
//! # Pipeline
//!
//! 1. **Merge**: remap every patch's active cells into meta-grid coordinates
//! 2. **Resolve conflicts**: drop any cell that has an active descendant
//! 3. **Balance** (optional): refine cells until neighboring levels differ by
//!    at most `risk_threshold`
//! 4. **Neighbors**: find the leaf neighbors on each side of every cell
//! 5. **Edges**: deduplicate shared sides using exact fractional coordinates
//! 6. **Records**: write length-prefixed big-endian cell/edge streams in
//!    parallel batches, sampling altitude and category per item
//! 7. **Blocks**: bisect the mesh into delivery-sized blocks with a manifest
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//!
//! use hydro_grid::pipeline::{assemble, AssembleOptions};
//! use hydro_grid::quadtree::Patch;
//! use hydro_grid::topology::NullSampler;
//!
//! let patches = vec![
//!   Patch::open(Path::new("resource/patches/a"))?,
//!   Patch::open(Path::new("resource/patches/b"))?,
//! ];
//! let stats = assemble(&patches, None, &NullSampler, &AssembleOptions::default(), Path::new("out"))?;
//! println!("{} cells, {} edges, {} blocks", stats.cells, stats.edges, stats.blocks);
//! ```

pub mod constants;
pub mod error;

pub use error::{GridError, Result};

// Hierarchical cell addressing, per-patch cell store and persistence
pub mod quadtree;
pub use quadtree::{CellKey, CellStore, DAabb2, GridSchema, LevelGeometry, Patch};

// Meta-grid assembly: merge, conflicts, balancing, neighbors, edges
pub mod assembly;

// Binary topology records and parallel batch writer
pub mod topology;

// Spatial block partitioning for chunked delivery
pub mod blocks;

// End-to-end orchestration
pub mod pipeline;

#[cfg(test)]
pub(crate) mod test_utils;
