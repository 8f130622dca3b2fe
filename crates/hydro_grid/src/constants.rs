//! Constants shared by the record writers, persistence and block files.

/// Altitude written when no sample is available at a point.
pub const SENTINEL_ALTITUDE: f64 = -9999.0;

/// Category written when no sample is available at a point.
pub const DEFAULT_CATEGORY: i32 = 0;

/// Items per writer batch.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Default byte cap for one delivery block.
pub const DEFAULT_MAX_BLOCK_BYTES: usize = 4 * 1024 * 1024;

/// Persisted store row: u8 deleted, u8 activate, u64 index key.
pub const PERSIST_ROW_SIZE: usize = 1 + 1 + 8;

/// Fixed part of a cell record: index, 4 coords, altitude, category, 4 counts.
pub const CELL_RECORD_HEADER_SIZE: usize = 8 + 4 * 8 + 8 + 1 + 4;

/// Edge record: index, direction, 4 coords, 2 cell refs, altitude, category.
pub const EDGE_RECORD_SIZE: usize = 8 + 1 + 4 * 8 + 2 * 8 + 8 + 4;

/// Block file entry: index, level, global id, 4 coords.
pub const BLOCK_ENTRY_SIZE: usize = 8 + 1 + 4 + 4 * 8;

/// Length prefix in front of every topology record.
pub const RECORD_PREFIX_SIZE: usize = 4;

// =============================================================================
// File names
// =============================================================================

pub const PATCH_META_FILE: &str = "patch.meta.json";
pub const PATCH_TOPO_FILE: &str = "patch.topo.bin";
pub const SCHEMA_FILE: &str = "schema.json";
pub const CELL_TOPO_FILE: &str = "cell_topo.bin";
pub const EDGE_TOPO_FILE: &str = "edge_topo.bin";
pub const GRID_META_FILE: &str = "grid.meta.json";
pub const BLOCK_DIR: &str = "blocks";
pub const BLOCK_MANIFEST_FILE: &str = "block_meta.json";
pub const NE_FILE: &str = "ne.txt";
pub const NS_FILE: &str = "ns.txt";

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
