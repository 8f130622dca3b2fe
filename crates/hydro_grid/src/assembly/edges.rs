//! Shared-edge construction with exact-fraction deduplication.
//!
//! Every leaf side is split into edges at the boundaries of the leaves across
//! it. Edges are keyed by reduced fractions of the aligned domain, so the
//! same geometric edge reached from either cell collapses to one entry.

use std::collections::HashMap;

use smallvec::SmallVec;
use tracing::info;

use super::neighbors::{CellIndex, EdgeCode, NeighborGraph};
use crate::quadtree::{CellFractions, Fraction, LevelGeometry};

/// Edge orientation. The discriminant is the on-disk direction code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum EdgeDirection {
  /// Along y, on a west or east side.
  Vertical = 0,
  /// Along x, on a north or south side.
  Horizontal = 1,
}

/// Canonical edge identity: span `[min, max]` along the edge axis at
/// `shared` on the other axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EdgeKey {
  pub direction: EdgeDirection,
  pub min: Fraction,
  pub max: Fraction,
  pub shared: Fraction,
}

impl EdgeKey {
  /// Build a key with the span endpoints ordered.
  pub fn new(direction: EdgeDirection, a: Fraction, b: Fraction, shared: Fraction) -> Self {
    let (min, max) = if a > b { (b, a) } else { (a, b) };
    Self {
      direction,
      min,
      max,
      shared,
    }
  }

  /// `(x, y)` fractions of the lower and upper endpoints.
  pub fn endpoints(&self) -> [(Fraction, Fraction); 2] {
    match self.direction {
      EdgeDirection::Vertical => [(self.shared, self.min), (self.shared, self.max)],
      EdgeDirection::Horizontal => [(self.min, self.shared), (self.max, self.shared)],
    }
  }
}

/// One deduplicated edge.
///
/// `cells[0]` is the north cell of a horizontal edge or the west cell of a
/// vertical one; `None` marks the domain boundary or a hole.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
  pub key: EdgeKey,
  pub cells: [Option<usize>; 2],
}

impl Edge {
  #[inline]
  pub fn direction(&self) -> EdgeDirection {
    self.key.direction
  }

  /// Number of cells the edge separates (1 or 2).
  #[inline]
  pub fn cell_count(&self) -> usize {
    self.cells.iter().flatten().count()
  }
}

/// All edges plus the per-cell, per-side edge index lists.
#[derive(Clone, Debug, Default)]
pub struct EdgeTopology {
  pub edges: Vec<Edge>,
  cell_edges: Vec<[SmallVec<[usize; 4]>; 4]>,
}

impl EdgeTopology {
  /// Edge indices on side `code` of `cell`, ascending.
  #[inline]
  pub fn cell_edges(&self, cell: usize, code: EdgeCode) -> &[usize] {
    &self.cell_edges[cell][code.index()]
  }

  #[inline]
  pub fn cell_count(&self) -> usize {
    self.cell_edges.len()
  }
}

/// Side geometry of one cell: orientation, shared coordinate and span.
fn side(code: EdgeCode, f: &CellFractions) -> (EdgeDirection, Fraction, Fraction, Fraction) {
  match code {
    EdgeCode::North => (EdgeDirection::Horizontal, f.y_max, f.x_min, f.x_max),
    EdgeCode::South => (EdgeDirection::Horizontal, f.y_min, f.x_min, f.x_max),
    EdgeCode::West => (EdgeDirection::Vertical, f.x_min, f.y_min, f.y_max),
    EdgeCode::East => (EdgeDirection::Vertical, f.x_max, f.y_min, f.y_max),
  }
}

/// Span of a neighbor along the axis of side `code`.
fn span(code: EdgeCode, f: &CellFractions) -> (Fraction, Fraction) {
  match code {
    EdgeCode::North | EdgeCode::South => (f.x_min, f.x_max),
    EdgeCode::West | EdgeCode::East => (f.y_min, f.y_max),
  }
}

struct EdgeBuilder {
  edges: Vec<Edge>,
  lookup: HashMap<EdgeKey, usize>,
  cell_edges: Vec<[SmallVec<[usize; 4]>; 4]>,
}

impl EdgeBuilder {
  /// Register the edge `key` on side `code` of `cell` and, if present, on
  /// the opposite side of `neighbor`.
  fn add(&mut self, key: EdgeKey, cell: usize, code: EdgeCode, neighbor: Option<usize>) {
    let index = match self.lookup.get(&key) {
      Some(index) => *index,
      None => {
        let cells = match code {
          EdgeCode::North | EdgeCode::West => [neighbor, Some(cell)],
          EdgeCode::South | EdgeCode::East => [Some(cell), neighbor],
        };
        let index = self.edges.len();
        self.edges.push(Edge { key, cells });
        self.lookup.insert(key, index);
        index
      }
    };
    self.cell_edges[cell][code.index()].push(index);
    if let Some(n) = neighbor {
      self.cell_edges[n][code.opposite().index()].push(index);
    }
  }
}

/// Build the deduplicated edge set of an indexed leaf set.
#[tracing::instrument(skip_all, name = "assembly::build_edges")]
pub fn build_edges(index: &CellIndex, graph: &NeighborGraph, geometry: &LevelGeometry) -> EdgeTopology {
  let fractions: Vec<CellFractions> = index.keys().iter().map(|k| geometry.fractions(*k)).collect();
  let mut builder = EdgeBuilder {
    edges: Vec::with_capacity(index.len() * 2),
    lookup: HashMap::with_capacity(index.len() * 2),
    cell_edges: vec![Default::default(); index.len()],
  };

  for (i, key) in index.keys().iter().enumerate() {
    for code in EdgeCode::ALL {
      let (direction, shared, start, end) = side(code, &fractions[i]);
      let neighbors = graph.neighbors(i, code);

      if neighbors.is_empty() {
        builder.add(EdgeKey::new(direction, start, end, shared), i, code, None);
        continue;
      }
      if let [only] = neighbors {
        if index.keys()[*only].level < key.level {
          builder.add(EdgeKey::new(direction, start, end, shared), i, code, Some(*only));
          continue;
        }
      }

      let mut spans: SmallVec<[(Fraction, Fraction, usize); 8]> = neighbors
        .iter()
        .map(|j| {
          let (lo, hi) = span(code, &fractions[*j]);
          (lo.max(start), hi.min(end), *j)
        })
        .collect();
      spans.sort_by(|a, b| a.0.cmp(&b.0).then(a.2.cmp(&b.2)));

      let mut cursor = start;
      for (lo, hi, j) in spans {
        if cursor < lo {
          builder.add(EdgeKey::new(direction, cursor, lo, shared), i, code, None);
        }
        builder.add(EdgeKey::new(direction, lo, hi, shared), i, code, Some(j));
        cursor = cursor.max(hi);
      }
      if cursor < end {
        builder.add(EdgeKey::new(direction, cursor, end, shared), i, code, None);
      }
    }
  }

  for cell in &mut builder.cell_edges {
    for slot in cell.iter_mut() {
      slot.sort_unstable();
      slot.dedup();
    }
  }

  info!(cells = index.len(), edges = builder.edges.len(), "Built edges");
  EdgeTopology {
    edges: builder.edges,
    cell_edges: builder.cell_edges,
  }
}

#[cfg(test)]
#[path = "edges_test.rs"]
mod edges_test;
