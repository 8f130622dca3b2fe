//! Quadtree module for hierarchical cell addressing.
//!
//! The tree is implicit: a cell is identified by its level and its row-major
//! index within that level, and parent/child relationships are computed on
//! demand from the level geometry. Only per-cell state is stored.
//!
//! # Level Convention
//!
//! Level 0 = virtual root (1×1), level 1 = first real level, higher = finer.
//!
//! ```text
//! level_info[i + 1].width  = level_info[i].width  * subdivide_rules[i].0
//! level_info[i + 1].height = level_info[i].height * subdivide_rules[i].1
//! ```
//!
//! # Module Structure
//!
//! - [`key`]: `CellKey` - packed `(level, global_id)` value type
//! - [`geometry`]: `LevelGeometry` - level sizes, subdivision and coordinates
//! - [`schema`]: `GridSchema` - per-level cell sizes and validation
//! - [`store`]: `CellStore` - subdivide/merge/delete/restore state machine
//! - [`transition`]: `TransitionGroup` - atomic subdivide/merge operations
//! - [`persist`]: fixed-width row codec for stores
//! - [`patch`]: `Patch` - a store plus its on-disk meta

pub mod bounds;
pub mod fraction;
pub mod geometry;
pub mod key;
pub mod patch;
pub mod persist;
pub mod schema;
pub mod store;
pub mod transition;

// Re-exports
pub use bounds::DAabb2;
pub use fraction::{CellFractions, Fraction};
pub use geometry::{LevelGeometry, LevelSize, SubdivideRule};
pub use key::CellKey;
pub use patch::{Patch, PatchMeta, PatchSource};
pub use persist::PersistRow;
pub use schema::GridSchema;
pub use store::{Cell, CellStore};
pub use transition::{TransitionGroup, TransitionType};
