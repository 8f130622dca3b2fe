//! Meta-grid assembly.
//!
//! Turns any number of patches into one conflict-free set of leaf cells, then
//! derives the adjacency and shared-edge topology of that set.
//!
//! # Module Structure
//!
//! - [`meta_grid`]: union bounds, schema selection, patch remapping
//! - [`conflict`]: leaf-invariant enforcement
//! - [`balance`]: resolution-gradient ("risk") balancing
//! - [`neighbors`]: per-side leaf neighbor resolution
//! - [`edges`]: exact-fraction edge construction and deduplication

pub mod balance;
pub mod conflict;
pub mod edges;
pub mod meta_grid;
pub mod neighbors;

pub use balance::{balance, find_risk_cells, BalanceBudget, BalanceStats};
pub use conflict::resolve_conflicts;
pub use edges::{build_edges, Edge, EdgeDirection, EdgeKey, EdgeTopology};
pub use meta_grid::{merge_patches, MetaGrid, RemapStats};
pub use neighbors::{resolve_neighbors, CellIndex, EdgeCode, NeighborGraph};
