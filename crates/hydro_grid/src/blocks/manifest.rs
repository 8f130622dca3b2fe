//! Block files and the `block_meta.json` spatial index.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::partition::{encode_block, Block, BlockConfig};
use crate::constants::{BLOCK_DIR, BLOCK_MANIFEST_FILE};
use crate::error::{GridError, Result};
use crate::quadtree::DAabb2;

/// One block in the manifest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockEntry {
  pub block_id: usize,
  pub name: String,
  /// File name, relative to the manifest's directory.
  pub file: String,
  pub count: usize,
  /// `[min_x, min_y, max_x, max_y]`
  pub bounds: [f64; 4],
}

/// Contents of `block_meta.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockManifest {
  pub total_blocks: usize,
  pub global_bounds: [f64; 4],
  pub blocks: Vec<BlockEntry>,
}

impl BlockManifest {
  pub fn new(blocks: &[Block], config: &BlockConfig) -> Self {
    let global = blocks.iter().fold(DAabb2::EMPTY, |acc, b| acc.union(&b.bounds));
    let entries = blocks
      .iter()
      .map(|block| {
        let name = format!("{}_{}", config.name, block.id);
        BlockEntry {
          block_id: block.id,
          file: format!("{name}.bin"),
          name,
          count: block.cells.len(),
          bounds: block.bounds.to_array(),
        }
      })
      .collect();
    Self {
      total_blocks: blocks.len(),
      global_bounds: if blocks.is_empty() { [0.0; 4] } else { global.to_array() },
      blocks: entries,
    }
  }

  pub fn load(path: &Path) -> Result<Self> {
    if !path.is_file() {
      return Err(GridError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|e| GridError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| GridError::json(path, e))
  }

  /// Blocks whose bounds overlap `region`.
  pub fn intersecting<'a>(&'a self, region: &'a DAabb2) -> impl Iterator<Item = &'a BlockEntry> + 'a {
    self
      .blocks
      .iter()
      .filter(move |b| DAabb2::from_array(b.bounds).overlaps(region))
  }
}

/// Write every block plus the manifest under `output_dir/blocks`.
#[tracing::instrument(skip_all, name = "blocks::write")]
pub fn write_blocks(output_dir: &Path, blocks: &[Block], config: &BlockConfig) -> Result<BlockManifest> {
  let dir = output_dir.join(BLOCK_DIR);
  std::fs::create_dir_all(&dir).map_err(|e| GridError::io(&dir, e))?;

  let manifest = BlockManifest::new(blocks, config);
  for (block, entry) in blocks.iter().zip(&manifest.blocks) {
    let path = dir.join(&entry.file);
    std::fs::write(&path, encode_block(block)).map_err(|e| GridError::io(&path, e))?;
  }

  let path = dir.join(BLOCK_MANIFEST_FILE);
  let json = serde_json::to_string_pretty(&manifest).map_err(|e| GridError::json(&path, e))?;
  std::fs::write(&path, json).map_err(|e| GridError::io(&path, e))?;

  info!(
    blocks = manifest.total_blocks,
    cells = manifest.blocks.iter().map(|b| b.count).sum::<usize>(),
    path = %dir.display(),
    "Wrote blocks"
  );
  Ok(manifest)
}
