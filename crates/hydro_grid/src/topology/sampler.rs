//! Terrain sampling interface for the record writer.
//!
//! A sampler is shared by every worker; each batch opens its own session so
//! raster handles and caches never cross threads.

use crate::constants::{DEFAULT_CATEGORY, SENTINEL_ALTITUDE};
use crate::error::Result;

/// Altitude and land-use category at one point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
  pub altitude: f64,
  pub category: i32,
}

impl Sample {
  /// Value written when sampling fails or a point lies outside every source.
  pub const DEFAULT: Self = Self {
    altitude: SENTINEL_ALTITUDE,
    category: DEFAULT_CATEGORY,
  };
}

impl Default for Sample {
  fn default() -> Self {
    Self::DEFAULT
  }
}

/// Per-batch sampling state.
pub trait SampleSession {
  /// Sample at a world position. `None` if the point is not covered.
  fn sample(&mut self, x: f64, y: f64) -> Option<Sample>;
}

/// Source of per-point samples.
///
/// Implementors must be thread-safe; sessions are created on worker threads.
pub trait TerrainSampler: Send + Sync {
  type Session: SampleSession;

  /// Open the sources needed by one batch.
  fn open(&self) -> Result<Self::Session>;
}

// =============================================================================
// Built-in samplers
// =============================================================================

/// Sampler with no sources. Every item gets [`Sample::DEFAULT`].
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSampler;

impl SampleSession for NullSampler {
  fn sample(&mut self, _x: f64, _y: f64) -> Option<Sample> {
    None
  }
}

impl TerrainSampler for NullSampler {
  type Session = NullSampler;

  fn open(&self) -> Result<Self::Session> {
    Ok(NullSampler)
  }
}

/// Same sample everywhere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantSampler(pub Sample);

impl SampleSession for ConstantSampler {
  fn sample(&mut self, _x: f64, _y: f64) -> Option<Sample> {
    Some(self.0)
  }
}

impl TerrainSampler for ConstantSampler {
  type Session = ConstantSampler;

  fn open(&self) -> Result<Self::Session> {
    Ok(*self)
  }
}

/// Adapts a closure into a sampler; each session gets its own clone.
#[derive(Clone)]
pub struct FnSampler<F>(pub F);

impl<F> SampleSession for FnSampler<F>
where
  F: FnMut(f64, f64) -> Option<Sample>,
{
  fn sample(&mut self, x: f64, y: f64) -> Option<Sample> {
    (self.0)(x, y)
  }
}

impl<F> TerrainSampler for FnSampler<F>
where
  F: FnMut(f64, f64) -> Option<Sample> + Clone + Send + Sync,
{
  type Session = FnSampler<F>;

  fn open(&self) -> Result<Self::Session> {
    Ok(self.clone())
  }
}
