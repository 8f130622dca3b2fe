//! Topology export: binary cell/edge records and their parallel writer.
//!
//! # Module Structure
//!
//! - [`sampler`]: `TerrainSampler` - altitude/category lookup per point
//! - [`records`]: length-prefixed big-endian record codecs
//! - [`writer`]: batched record encoding on a worker pool
//! - [`export`]: `ne.txt` / `ns.txt` text views of the records and their readers

pub mod export;
pub mod records;
pub mod sampler;
pub mod writer;

pub use export::{format_g, read_ne, read_ns, write_ne, write_ns, NeRow, NsRow};
pub use records::{read_cell_records, read_edge_records, CellRecord, EdgeRecord, RECORD_SIDES};
pub use sampler::{ConstantSampler, FnSampler, NullSampler, Sample, SampleSession, TerrainSampler};
pub use writer::{encode_cell_records, encode_edge_records, write_records, WriterConfig};
