//! Parallel record writer.
//!
//! Items are cut into fixed-size batches. Each batch is a pure
//! `range -> bytes` job on a dedicated rayon pool that opens its own sampler
//! session; results are concatenated in batch order, so the output does not
//! depend on scheduling.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::Range;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::records::{CellRecord, EdgeRecord, RECORD_SIDES};
use super::sampler::{Sample, SampleSession, TerrainSampler};
use crate::assembly::{CellIndex, EdgeTopology};
use crate::constants::DEFAULT_BATCH_SIZE;
use crate::error::{GridError, Result};
use crate::quadtree::LevelGeometry;

/// Batching and pool sizing for the record writer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
  /// Items per batch.
  pub batch_size: usize,
  /// Upper bound on worker threads (None = available cores).
  pub max_workers: Option<usize>,
}

impl Default for WriterConfig {
  fn default() -> Self {
    Self {
      batch_size: DEFAULT_BATCH_SIZE,
      max_workers: None,
    }
  }
}

impl WriterConfig {
  /// Worker count for `batches` batches: min(cores, batches, max_workers).
  pub fn worker_count(&self, batches: usize) -> usize {
    let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
    let mut workers = cores.min(batches);
    if let Some(max) = self.max_workers {
      workers = workers.min(max);
    }
    workers.max(1)
  }
}

/// Sampler session for one batch; falls back to defaults if it can't open.
struct BatchSampler<S: SampleSession> {
  session: Option<S>,
}

impl<S: SampleSession> BatchSampler<S> {
  fn open<T: TerrainSampler<Session = S>>(sampler: &T, batch: &Range<usize>) -> Self {
    let session = match sampler.open() {
      Ok(session) => Some(session),
      Err(e) => {
        warn!(start = batch.start, end = batch.end, error = %e, "Sampler unavailable, using defaults for batch");
        None
      }
    };
    Self { session }
  }

  fn sample(&mut self, x: f64, y: f64) -> Sample {
    self
      .session
      .as_mut()
      .and_then(|s| s.sample(x, y))
      .unwrap_or(Sample::DEFAULT)
  }
}

/// Run `job` over `count` items in batches and concatenate the results.
fn run_batches<F>(count: usize, config: &WriterConfig, job: F) -> Result<Vec<u8>>
where
  F: Fn(Range<usize>) -> Result<Vec<u8>> + Sync,
{
  if count == 0 {
    return Ok(Vec::new());
  }
  let batch_size = config.batch_size.max(1);
  let batches: Vec<Range<usize>> = (0..count)
    .step_by(batch_size)
    .map(|start| start..(start + batch_size).min(count))
    .collect();
  let workers = config.worker_count(batches.len());
  debug!(count, batches = batches.len(), workers, "Dispatching record batches");

  let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build()?;
  let chunks: Vec<Vec<u8>> = pool.install(|| batches.into_par_iter().map(&job).collect::<Result<_>>())?;
  Ok(chunks.concat())
}

/// Encode every cell record, in index order.
///
/// Categories outside `0..=255` are written as 0.
#[tracing::instrument(skip_all, name = "topology::cells")]
pub fn encode_cell_records<S: TerrainSampler>(
  index: &CellIndex,
  topology: &EdgeTopology,
  geometry: &LevelGeometry,
  sampler: &S,
  config: &WriterConfig,
) -> Result<Vec<u8>> {
  run_batches(index.len(), config, |batch| {
    let mut session = BatchSampler::open(sampler, &batch);
    let mut out = Vec::new();
    for i in batch {
      let bbox = geometry.cell_bbox(index.keys()[i]);
      let center = bbox.center();
      let sample = session.sample(center.x, center.y);
      let edges = RECORD_SIDES.map(|code| {
        topology
          .cell_edges(i, code)
          .iter()
          .map(|e| *e as u64 + 1)
          .collect::<Vec<u64>>()
      });
      CellRecord {
        index: i as u64 + 1,
        bbox: bbox.to_array(),
        altitude: sample.altitude,
        category: u8::try_from(sample.category).unwrap_or(0),
        edges,
      }
      .encode(&mut out)?;
    }
    Ok(out)
  })
}

/// Encode every edge record, in index order.
#[tracing::instrument(skip_all, name = "topology::edges")]
pub fn encode_edge_records<S: TerrainSampler>(
  topology: &EdgeTopology,
  geometry: &LevelGeometry,
  sampler: &S,
  config: &WriterConfig,
) -> Result<Vec<u8>> {
  run_batches(topology.edges.len(), config, |batch| {
    let mut session = BatchSampler::open(sampler, &batch);
    let mut out = Vec::new();
    for i in batch {
      let edge = &topology.edges[i];
      let [lo, hi] = edge.key.endpoints();
      let min = geometry.point_at(lo.0, lo.1);
      let max = geometry.point_at(hi.0, hi.1);
      let center = (min + max) * 0.5;
      let sample = session.sample(center.x, center.y);
      EdgeRecord {
        index: i as u64 + 1,
        direction: edge.direction() as u8,
        bbox: [min.x, min.y, max.x, max.y],
        cell_a: edge.cells[0].map_or(0, |c| c as u64 + 1),
        cell_b: edge.cells[1].map_or(0, |c| c as u64 + 1),
        altitude: sample.altitude,
        category: sample.category,
      }
      .encode(&mut out);
    }
    Ok(out)
  })
}

/// Write an encoded stream to `path`.
pub fn write_records(path: &Path, bytes: &[u8]) -> Result<()> {
  let file = File::create(path).map_err(|e| GridError::io(path, e))?;
  let mut writer = BufWriter::new(file);
  writer
    .write_all(bytes)
    .and_then(|_| writer.flush())
    .map_err(|e| GridError::io(path, e))
}

#[cfg(test)]
#[path = "writer_test.rs"]
mod writer_test;
