//! Patch - an independently edited cell store plus its on-disk meta.
//!
//! A patch directory holds `patch.meta.json` (bounds and schema) and
//! `patch.topo.bin` (persisted store rows). A missing or unreadable store file
//! falls back to the default store with every level-1 cell active.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::bounds::DAabb2;
use super::geometry::LevelGeometry;
use super::persist::{decode_rows, encode_rows};
use super::schema::GridSchema;
use super::store::CellStore;
use super::CellKey;
use crate::constants::{PATCH_META_FILE, PATCH_TOPO_FILE};
use crate::error::{GridError, Result};

/// Contents of `patch.meta.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatchMeta {
  /// `[min_x, min_y, max_x, max_y]` in the schema's projection.
  pub bounds: [f64; 4],
  pub schema: GridSchema,
}

/// What the meta-grid assembler needs from a patch.
pub trait PatchSource {
  /// Patch bounds in the shared projection.
  fn bounds(&self) -> DAabb2;
  fn schema(&self) -> &GridSchema;
  /// Level geometry the patch's keys are expressed in.
  fn geometry(&self) -> &LevelGeometry;
  /// Active cells in patch-local keys.
  fn activated_cells(&self) -> Vec<CellKey>;
}

/// A patch: meta plus cell store.
#[derive(Clone, Debug)]
pub struct Patch {
  meta: PatchMeta,
  store: CellStore,
}

impl Patch {
  /// Create an in-memory patch with the default store.
  pub fn new(meta: PatchMeta) -> Result<Self> {
    let geometry = LevelGeometry::from_schema(DAabb2::from_array(meta.bounds), &meta.schema)?;
    Ok(Self {
      meta,
      store: CellStore::with_default_cells(geometry),
    })
  }

  /// Open a patch directory.
  pub fn open(dir: &Path) -> Result<Self> {
    if !dir.is_dir() {
      return Err(GridError::NotFound(dir.to_path_buf()));
    }
    let meta_path = dir.join(PATCH_META_FILE);
    if !meta_path.is_file() {
      return Err(GridError::NotFound(meta_path));
    }
    let content = std::fs::read_to_string(&meta_path).map_err(|e| GridError::io(&meta_path, e))?;
    let meta: PatchMeta =
      serde_json::from_str(&content).map_err(|e| GridError::json(&meta_path, e))?;
    let geometry = LevelGeometry::from_schema(DAabb2::from_array(meta.bounds), &meta.schema)?;

    let topo_path = dir.join(PATCH_TOPO_FILE);
    let store = if topo_path.is_file() {
      match load_store(&topo_path, geometry.clone()) {
        Ok(store) => {
          debug!(path = %topo_path.display(), cells = store.len(), "Loaded patch store");
          store
        }
        Err(e) => {
          warn!(path = %topo_path.display(), error = %e, "Patch store unreadable, using default cells");
          CellStore::with_default_cells(geometry)
        }
      }
    } else {
      info!(path = %dir.display(), "No patch store yet, initializing level-1 cells");
      CellStore::with_default_cells(geometry)
    };

    Ok(Self { meta, store })
  }

  /// Write meta and store rows into `dir`, creating it if needed.
  pub fn save(&self, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| GridError::io(dir, e))?;

    let meta_path = dir.join(PATCH_META_FILE);
    let meta_json =
      serde_json::to_vec_pretty(&self.meta).map_err(|e| GridError::json(&meta_path, e))?;
    std::fs::write(&meta_path, meta_json).map_err(|e| GridError::io(&meta_path, e))?;

    let topo_path = dir.join(PATCH_TOPO_FILE);
    let file = File::create(&topo_path).map_err(|e| GridError::io(&topo_path, e))?;
    let mut writer = BufWriter::new(file);
    writer
      .write_all(&encode_rows(&self.store.to_rows()))
      .and_then(|_| writer.flush())
      .map_err(|e| GridError::io(&topo_path, e))?;

    info!(path = %dir.display(), cells = self.store.len(), "Saved patch");
    Ok(())
  }

  pub fn meta(&self) -> &PatchMeta {
    &self.meta
  }

  pub fn store(&self) -> &CellStore {
    &self.store
  }

  pub fn store_mut(&mut self) -> &mut CellStore {
    &mut self.store
  }
}

impl PatchSource for Patch {
  fn bounds(&self) -> DAabb2 {
    DAabb2::from_array(self.meta.bounds)
  }

  fn schema(&self) -> &GridSchema {
    &self.meta.schema
  }

  fn geometry(&self) -> &LevelGeometry {
    self.store.geometry()
  }

  fn activated_cells(&self) -> Vec<CellKey> {
    self.store.active_keys()
  }
}

fn load_store(path: &Path, geometry: LevelGeometry) -> Result<CellStore> {
  let bytes = std::fs::read(path).map_err(|e| GridError::io(path, e))?;
  CellStore::from_rows(geometry, &decode_rows(&bytes)?)
}

#[cfg(test)]
#[path = "patch_test.rs"]
mod patch_test;
