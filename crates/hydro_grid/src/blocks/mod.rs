//! Spatial block partitioning for chunked delivery.
//!
//! The assembled cells are bisected into blocks under a byte cap; each block
//! is one binary file and the manifest indexes them by bounds.

pub mod manifest;
pub mod partition;

pub use manifest::{write_blocks, BlockEntry, BlockManifest};
pub use partition::{encode_block, partition, Block, BlockCell, BlockConfig};
