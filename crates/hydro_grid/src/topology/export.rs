//! Plain-text views of the topology streams for downstream solvers.
//!
//! `ne.txt` lists each cell's edges, `ns.txt` each edge's cells. Both are
//! rendered from decoded records so they always agree with the binary files.
//! Floats use C's `%.14g` so the files match those of the existing solver
//! toolchain byte for byte.

use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::info;

use super::records::{CellRecord, EdgeRecord};
use crate::error::{GridError, Result};

/// Significant digits of every float in the text files.
const SIGNIFICANT_DIGITS: usize = 14;

/// One `ne.txt` line.
#[derive(Clone, Debug, PartialEq)]
pub struct NeRow {
  pub index: u64,
  /// Edge ids per side in west, east, south, north order.
  pub edges: [Vec<u64>; 4],
  pub center: [f64; 2],
  pub altitude: f64,
  pub category: i32,
}

impl From<&CellRecord> for NeRow {
  fn from(cell: &CellRecord) -> Self {
    Self {
      index: cell.index,
      edges: cell.edges.clone(),
      center: cell.center(),
      altitude: cell.altitude,
      category: cell.category as i32,
    }
  }
}

/// One `ns.txt` line.
///
/// `direction` is 1 for horizontal edges (`top`/`bottom` set) and 2 for
/// vertical ones (`left`/`right` set). Cell ids are 1-based, 0 for none.
#[derive(Clone, Debug, PartialEq)]
pub struct NsRow {
  pub index: u64,
  pub direction: u8,
  pub left: u64,
  pub right: u64,
  pub bottom: u64,
  pub top: u64,
  pub length: f64,
  pub center: [f64; 2],
  pub altitude: f64,
  pub category: i32,
}

impl From<&EdgeRecord> for NsRow {
  fn from(edge: &EdgeRecord) -> Self {
    // Slot 0 is the north or west cell.
    let (direction, left, right, bottom, top) = if edge.direction == 1 {
      (1, 0, 0, edge.cell_b, edge.cell_a)
    } else {
      (2, edge.cell_a, edge.cell_b, 0, 0)
    };
    Self {
      index: edge.index,
      direction,
      left,
      right,
      bottom,
      top,
      length: edge.length(),
      center: edge.center(),
      altitude: edge.altitude,
      category: edge.category,
    }
  }
}

// =============================================================================
// Writers
// =============================================================================

/// Write `ne.txt`: `index nW nE nS nN <edges…> cx cy z type`.
pub fn write_ne(path: &Path, cells: &[CellRecord]) -> Result<()> {
  write_text(path, |w| render_ne(w, cells.iter().map(NeRow::from)))
}

/// Write `ns.txt`: `index dir left right bottom top length cx cy z type`.
pub fn write_ns(path: &Path, edges: &[EdgeRecord]) -> Result<()> {
  write_text(path, |w| render_ns(w, edges.iter().map(NsRow::from)))
}

fn write_text(path: &Path, render: impl FnOnce(&mut BufWriter<File>) -> io::Result<()>) -> Result<()> {
  let file = File::create(path).map_err(|e| GridError::io(path, e))?;
  let mut writer = BufWriter::new(file);
  render(&mut writer)
    .and_then(|_| writer.flush())
    .map_err(|e| GridError::io(path, e))
}

pub(crate) fn render_ne<W: Write>(w: &mut W, rows: impl IntoIterator<Item = NeRow>) -> io::Result<()> {
  for row in rows {
    write!(w, "{}", row.index)?;
    for list in &row.edges {
      write!(w, " {}", list.len())?;
    }
    for e in row.edges.iter().flatten() {
      write!(w, " {e}")?;
    }
    writeln!(
      w,
      " {} {} {} {}",
      format_g(row.center[0]),
      format_g(row.center[1]),
      format_g(row.altitude),
      row.category
    )?;
  }
  Ok(())
}

pub(crate) fn render_ns<W: Write>(w: &mut W, rows: impl IntoIterator<Item = NsRow>) -> io::Result<()> {
  for row in rows {
    writeln!(
      w,
      "{} {} {} {} {} {} {} {} {} {} {}",
      row.index,
      row.direction,
      row.left,
      row.right,
      row.bottom,
      row.top,
      format_g(row.length),
      format_g(row.center[0]),
      format_g(row.center[1]),
      format_g(row.altitude),
      row.category
    )?;
  }
  Ok(())
}

/// Format like C's `%.14g`: 14 significant digits, trailing zeros dropped,
/// exponent form below 1e-4 or from 1e14 up.
pub fn format_g(value: f64) -> String {
  if value.is_nan() {
    return "nan".into();
  }
  if value.is_infinite() {
    return if value > 0.0 { "inf".into() } else { "-inf".into() };
  }
  if value == 0.0 {
    return if value.is_sign_negative() { "-0".into() } else { "0".into() };
  }

  // Exponent after rounding to the target precision.
  let sci = format!("{:.*e}", SIGNIFICANT_DIGITS - 1, value);
  let (mantissa, exp) = match sci.split_once('e') {
    Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
    None => (sci.as_str(), 0),
  };

  if exp < -4 || exp >= SIGNIFICANT_DIGITS as i32 {
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{}e{sign}{:02}", strip_zeros(mantissa), exp.unsigned_abs())
  } else {
    let decimals = (SIGNIFICANT_DIGITS as i32 - 1 - exp) as usize;
    strip_zeros(&format!("{value:.decimals$}")).to_string()
  }
}

fn strip_zeros(digits: &str) -> &str {
  if digits.contains('.') {
    digits.trim_end_matches('0').trim_end_matches('.')
  } else {
    digits
  }
}

// =============================================================================
// Readers
// =============================================================================

/// Load `ne.txt`.
pub fn read_ne(path: &Path) -> Result<Vec<NeRow>> {
  let rows = parse_ne(&read_text(path)?).map_err(|e| with_path(path, e))?;
  info!(rows = rows.len(), path = %path.display(), "Loaded ne");
  Ok(rows)
}

/// Load `ns.txt`.
pub fn read_ns(path: &Path) -> Result<Vec<NsRow>> {
  let rows = parse_ns(&read_text(path)?).map_err(|e| with_path(path, e))?;
  info!(rows = rows.len(), path = %path.display(), "Loaded ns");
  Ok(rows)
}

fn read_text(path: &Path) -> Result<String> {
  if !path.is_file() {
    return Err(GridError::NotFound(path.to_path_buf()));
  }
  std::fs::read_to_string(path).map_err(|e| GridError::io(path, e))
}

fn with_path(path: &Path, err: GridError) -> GridError {
  match err {
    GridError::Decode(msg) => GridError::Decode(format!("{}: {msg}", path.display())),
    other => other,
  }
}

/// Non-blank lines, split on any whitespace, with 1-based line numbers.
fn lines(text: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
  text
    .trim_start_matches('\u{feff}')
    .lines()
    .enumerate()
    .map(|(i, line)| (i + 1, line.split_whitespace().collect::<Vec<_>>()))
    .filter(|(_, fields)| !fields.is_empty())
}

fn malformed(line: usize, what: impl Display) -> GridError {
  GridError::Decode(format!("line {line}: {what}"))
}

fn field<T: std::str::FromStr>(fields: &[&str], at: usize, line: usize) -> Result<T> {
  let raw = fields
    .get(at)
    .ok_or_else(|| malformed(line, format_args!("missing field {}", at + 1)))?;
  raw
    .parse()
    .map_err(|_| malformed(line, format_args!("bad value {raw:?} in field {}", at + 1)))
}

/// Category column; older files write it as a float (`3.0`).
fn category(fields: &[&str], at: usize, line: usize) -> Result<i32> {
  if let Ok(value) = field::<i32>(fields, at, line) {
    return Ok(value);
  }
  let value: f64 = field(fields, at, line)?;
  if !value.is_finite() {
    return Err(malformed(line, "non-finite category"));
  }
  Ok(value as i32)
}

pub(crate) fn parse_ne(text: &str) -> Result<Vec<NeRow>> {
  lines(text)
    .map(|(line, fields)| {
      let index = field(&fields, 0, line)?;
      let mut counts = [0usize; 4];
      for (side, count) in counts.iter_mut().enumerate() {
        *count = field(&fields, 1 + side, line)?;
      }
      let required = counts
        .iter()
        .try_fold(5 + 4, |acc: usize, n| acc.checked_add(*n))
        .ok_or_else(|| malformed(line, "edge counts overflow"))?;
      if fields.len() < required {
        return Err(malformed(
          line,
          format_args!("expected at least {required} fields, got {}", fields.len()),
        ));
      }

      let mut edges: [Vec<u64>; 4] = Default::default();
      let mut at = 5;
      for (side, count) in counts.iter().enumerate() {
        edges[side] = (at..at + count)
          .map(|i| field(&fields, i, line))
          .collect::<Result<_>>()?;
        at += count;
      }

      // Trailing four columns regardless of padding in between.
      let tail = fields.len() - 4;
      Ok(NeRow {
        index,
        edges,
        center: [field(&fields, tail, line)?, field(&fields, tail + 1, line)?],
        altitude: field(&fields, tail + 2, line)?,
        category: category(&fields, tail + 3, line)?,
      })
    })
    .collect()
}

pub(crate) fn parse_ns(text: &str) -> Result<Vec<NsRow>> {
  lines(text)
    .map(|(line, fields)| {
      if fields.len() < 11 {
        return Err(malformed(line, format_args!("expected 11 fields, got {}", fields.len())));
      }
      let direction: u8 = field(&fields, 1, line)?;
      if direction != 1 && direction != 2 {
        return Err(malformed(line, format_args!("unknown direction {direction}")));
      }
      Ok(NsRow {
        index: field(&fields, 0, line)?,
        direction,
        left: field(&fields, 2, line)?,
        right: field(&fields, 3, line)?,
        bottom: field(&fields, 4, line)?,
        top: field(&fields, 5, line)?,
        length: field(&fields, 6, line)?,
        center: [field(&fields, 7, line)?, field(&fields, 8, line)?],
        altitude: field(&fields, 9, line)?,
        category: category(&fields, 10, line)?,
      })
    })
    .collect()
}

#[cfg(test)]
#[path = "export_test.rs"]
mod export_test;
