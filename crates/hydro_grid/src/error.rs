//! Error types for grid editing and assembly.
//!
//! Recoverable conditions (stale keys in a batch edit, unreadable sampling
//! sources) never surface here; they are silent no-ops or sentinel values.

use std::path::{Path, PathBuf};

/// Errors produced by schema validation, persistence and record writing.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
  /// Malformed schema or configuration, rejected before assembly starts.
  #[error("validation failed: {0}")]
  Validation(String),

  /// A referenced patch directory or meta file does not exist.
  #[error("not found: {}", .0.display())]
  NotFound(PathBuf),

  #[error("i/o error on {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("malformed json in {}: {source}", path.display())]
  Json {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  /// Binary data that does not match the expected layout.
  #[error("decode error: {0}")]
  Decode(String),

  /// A cell side carries more edges than a `u8` count can express.
  #[error("{count} edges on the {side} side of cell {index} exceed the record limit of 255")]
  RecordOverflow {
    index: u64,
    side: &'static str,
    count: usize,
  },

  #[error("failed to build worker pool: {0}")]
  WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl GridError {
  pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
    Self::Io {
      path: path.to_path_buf(),
      source,
    }
  }

  pub(crate) fn json(path: &Path, source: serde_json::Error) -> Self {
    Self::Json {
      path: path.to_path_buf(),
      source,
    }
  }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, GridError>;
