//! Assembly benchmarks.
//!
//! Measures the single-threaded stages on randomly refined grids:
//! - **neighbors**: leaf neighbor resolution
//! - **edges**: edge construction and deduplication
//! - **balance**: risk-cell refinement to a gradient of 1
//! - **records**: parallel cell record encoding

use std::collections::HashSet;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hydro_grid::assembly::{balance, build_edges, resolve_neighbors, BalanceBudget, CellIndex};
use hydro_grid::quadtree::{CellKey, CellStore, DAabb2, GridSchema, LevelGeometry};
use hydro_grid::topology::{encode_cell_records, NullSampler, WriterConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// =============================================================================
// Fixtures
// =============================================================================

fn geometry(levels: usize) -> LevelGeometry {
  let schema = GridSchema {
    name: Some("bench".into()),
    epsg: 2326,
    grid_info: (0..levels)
      .map(|i| {
        let size = 1000.0 / (1u32 << i) as f64;
        [size, size]
      })
      .collect(),
    alignment_origin: [0.0, 0.0],
  };
  LevelGeometry::from_schema(DAabb2::from_array([0.0, 0.0, 16_000.0, 16_000.0]), &schema)
    .expect("valid bench schema")
}

/// Store with `rounds` passes of random subdivisions over 16×16 level-1 cells.
fn refined_store(rounds: usize, seed: u64) -> CellStore {
  let mut rng = StdRng::seed_from_u64(seed);
  let mut store = CellStore::with_default_cells(geometry(6));
  for _ in 0..rounds {
    let active = store.active_keys();
    let picks: Vec<CellKey> = (0..active.len() / 4)
      .map(|_| active[rng.random_range(0..active.len())])
      .collect();
    store.subdivide(&picks);
  }
  store
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_topology(c: &mut Criterion) {
  let mut group = c.benchmark_group("topology");
  for rounds in [1, 3, 5] {
    let store = refined_store(rounds, 7);
    let geometry = store.geometry();
    let index = CellIndex::new(store.active_keys(), geometry);
    let graph = resolve_neighbors(&index, geometry);

    group.bench_with_input(BenchmarkId::new("neighbors", index.len()), &index, |b, index| {
      b.iter(|| resolve_neighbors(black_box(index), geometry))
    });
    group.bench_with_input(BenchmarkId::new("edges", index.len()), &index, |b, index| {
      b.iter(|| build_edges(black_box(index), &graph, geometry))
    });
  }
  group.finish();
}

fn bench_balance(c: &mut Criterion) {
  let store = refined_store(4, 11);
  let keys: HashSet<CellKey> = store.active_keys().into_iter().collect();
  let budget = BalanceBudget::with_threshold(1);

  c.bench_function("balance/threshold_1", |b| {
    b.iter(|| {
      let mut keys = keys.clone();
      balance(&mut keys, store.geometry(), black_box(&budget))
    })
  });
}

fn bench_records(c: &mut Criterion) {
  let store = refined_store(4, 13);
  let geometry = store.geometry();
  let index = CellIndex::new(store.active_keys(), geometry);
  let topology = build_edges(&index, &resolve_neighbors(&index, geometry), geometry);
  let config = WriterConfig {
    batch_size: 1024,
    max_workers: None,
  };

  c.bench_function("records/cells", |b| {
    b.iter(|| encode_cell_records(&index, &topology, geometry, &NullSampler, black_box(&config)))
  });
}

criterion_group!(benches, bench_topology, bench_balance, bench_records);
criterion_main!(benches);
