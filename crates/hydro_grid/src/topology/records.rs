//! Length-prefixed big-endian topology records.
//!
//! Each record is `u32 length` followed by `length` bytes of body. Indices
//! in bodies are 1-based; `0` means "no cell".

use crate::assembly::EdgeCode;
use crate::constants::{CELL_RECORD_HEADER_SIZE, EDGE_RECORD_SIZE, RECORD_PREFIX_SIZE};
use crate::error::{GridError, Result};

/// Side order of the per-cell edge lists in a record.
pub const RECORD_SIDES: [EdgeCode; 4] = [EdgeCode::West, EdgeCode::East, EdgeCode::South, EdgeCode::North];

fn side_name(code: EdgeCode) -> &'static str {
  match code {
    EdgeCode::North => "north",
    EdgeCode::West => "west",
    EdgeCode::South => "south",
    EdgeCode::East => "east",
  }
}

/// One cell: bounds, sample and 1-based edge indices per side.
#[derive(Clone, Debug, PartialEq)]
pub struct CellRecord {
  pub index: u64,
  /// `[min_x, min_y, max_x, max_y]`
  pub bbox: [f64; 4],
  pub altitude: f64,
  pub category: u8,
  /// Edge indices in [`RECORD_SIDES`] order, each list ascending.
  pub edges: [Vec<u64>; 4],
}

impl CellRecord {
  /// Append the prefixed record to `out`.
  pub fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
    let mut counts = [0u8; 4];
    for (slot, code) in RECORD_SIDES.iter().enumerate() {
      let count = self.edges[slot].len();
      counts[slot] = u8::try_from(count).map_err(|_| GridError::RecordOverflow {
        index: self.index,
        side: side_name(*code),
        count,
      })?;
    }

    let total: usize = self.edges.iter().map(Vec::len).sum();
    let length = CELL_RECORD_HEADER_SIZE + total * 8;
    out.reserve(RECORD_PREFIX_SIZE + length);
    out.extend_from_slice(&(length as u32).to_be_bytes());
    out.extend_from_slice(&self.index.to_be_bytes());
    for v in self.bbox {
      out.extend_from_slice(&v.to_be_bytes());
    }
    out.extend_from_slice(&self.altitude.to_be_bytes());
    out.push(self.category);
    out.extend_from_slice(&counts);
    for list in &self.edges {
      for e in list {
        out.extend_from_slice(&e.to_be_bytes());
      }
    }
    Ok(())
  }

  /// Decode one record body (without its length prefix).
  pub fn decode(body: &[u8]) -> Result<Self> {
    let mut r = ByteReader::new(body);
    let index = r.u64()?;
    let bbox = [r.f64()?, r.f64()?, r.f64()?, r.f64()?];
    let altitude = r.f64()?;
    let category = r.u8()?;
    let counts = [r.u8()?, r.u8()?, r.u8()?, r.u8()?];
    let mut edges: [Vec<u64>; 4] = Default::default();
    for (slot, count) in counts.iter().enumerate() {
      edges[slot] = (0..*count).map(|_| r.u64()).collect::<Result<_>>()?;
    }
    r.finish("cell")?;
    Ok(Self {
      index,
      bbox,
      altitude,
      category,
      edges,
    })
  }

  #[inline]
  pub fn center(&self) -> [f64; 2] {
    [(self.bbox[0] + self.bbox[2]) * 0.5, (self.bbox[1] + self.bbox[3]) * 0.5]
  }
}

/// One edge: direction, endpoints, adjacent cells and sample.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeRecord {
  pub index: u64,
  /// 0 = vertical, 1 = horizontal.
  pub direction: u8,
  /// `[min_x, min_y, max_x, max_y]`
  pub bbox: [f64; 4],
  /// North or west cell, 1-based, 0 for none.
  pub cell_a: u64,
  /// South or east cell, 1-based, 0 for none.
  pub cell_b: u64,
  pub altitude: f64,
  pub category: i32,
}

impl EdgeRecord {
  pub fn encode(&self, out: &mut Vec<u8>) {
    out.reserve(RECORD_PREFIX_SIZE + EDGE_RECORD_SIZE);
    out.extend_from_slice(&(EDGE_RECORD_SIZE as u32).to_be_bytes());
    out.extend_from_slice(&self.index.to_be_bytes());
    out.push(self.direction);
    for v in self.bbox {
      out.extend_from_slice(&v.to_be_bytes());
    }
    out.extend_from_slice(&self.cell_a.to_be_bytes());
    out.extend_from_slice(&self.cell_b.to_be_bytes());
    out.extend_from_slice(&self.altitude.to_be_bytes());
    out.extend_from_slice(&self.category.to_be_bytes());
  }

  pub fn decode(body: &[u8]) -> Result<Self> {
    let mut r = ByteReader::new(body);
    let record = Self {
      index: r.u64()?,
      direction: r.u8()?,
      bbox: [r.f64()?, r.f64()?, r.f64()?, r.f64()?],
      cell_a: r.u64()?,
      cell_b: r.u64()?,
      altitude: r.f64()?,
      category: r.i32()?,
    };
    r.finish("edge")?;
    Ok(record)
  }

  /// Euclidean length of the edge.
  #[inline]
  pub fn length(&self) -> f64 {
    (self.bbox[2] - self.bbox[0]).hypot(self.bbox[3] - self.bbox[1])
  }

  #[inline]
  pub fn center(&self) -> [f64; 2] {
    [(self.bbox[0] + self.bbox[2]) * 0.5, (self.bbox[1] + self.bbox[3]) * 0.5]
  }
}

// =============================================================================
// Stream readers
// =============================================================================

/// Decode a whole cell stream.
pub fn read_cell_records(bytes: &[u8]) -> Result<Vec<CellRecord>> {
  split_records(bytes)?.into_iter().map(CellRecord::decode).collect()
}

/// Decode a whole edge stream.
pub fn read_edge_records(bytes: &[u8]) -> Result<Vec<EdgeRecord>> {
  split_records(bytes)?.into_iter().map(EdgeRecord::decode).collect()
}

fn split_records(bytes: &[u8]) -> Result<Vec<&[u8]>> {
  let mut bodies = Vec::new();
  let mut r = ByteReader::new(bytes);
  while !r.is_empty() {
    let length = r.u32()? as usize;
    bodies.push(r.take(length)?);
  }
  Ok(bodies)
}

/// Big-endian cursor over a byte slice.
struct ByteReader<'a> {
  bytes: &'a [u8],
  pos: usize,
}

impl<'a> ByteReader<'a> {
  fn new(bytes: &'a [u8]) -> Self {
    Self { bytes, pos: 0 }
  }

  fn is_empty(&self) -> bool {
    self.pos >= self.bytes.len()
  }

  fn take(&mut self, n: usize) -> Result<&'a [u8]> {
    let end = self.pos + n;
    let slice = self.bytes.get(self.pos..end).ok_or_else(|| {
      GridError::Decode(format!(
        "record truncated: need {} bytes at offset {}, have {}",
        n,
        self.pos,
        self.bytes.len() - self.pos
      ))
    })?;
    self.pos = end;
    Ok(slice)
  }

  fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(self.take(N)?);
    Ok(out)
  }

  fn u8(&mut self) -> Result<u8> {
    Ok(self.array::<1>()?[0])
  }

  fn u32(&mut self) -> Result<u32> {
    self.array().map(u32::from_be_bytes)
  }

  fn i32(&mut self) -> Result<i32> {
    self.array().map(i32::from_be_bytes)
  }

  fn u64(&mut self) -> Result<u64> {
    self.array().map(u64::from_be_bytes)
  }

  fn f64(&mut self) -> Result<f64> {
    self.array().map(f64::from_be_bytes)
  }

  fn finish(&self, what: &str) -> Result<()> {
    if self.pos != self.bytes.len() {
      return Err(GridError::Decode(format!(
        "{} trailing bytes after {what} record",
        self.bytes.len() - self.pos
      )));
    }
    Ok(())
  }
}

#[cfg(test)]
#[path = "records_test.rs"]
mod records_test;
