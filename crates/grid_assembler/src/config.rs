//! Run configuration for grid assembly.

use anyhow::{Context, Result};
use hydro_grid::assembly::BalanceBudget;
use hydro_grid::blocks::BlockConfig;
use hydro_grid::constants::{DEFAULT_BATCH_SIZE, DEFAULT_CATEGORY, DEFAULT_MAX_BLOCK_BYTES, SENTINEL_ALTITUDE};
use hydro_grid::pipeline::AssembleOptions;
use hydro_grid::topology::{Sample, WriterConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration for one assembly run.
///
/// Relative paths are resolved against the config file's directory.
#[derive(Debug, Deserialize)]
pub struct Config {
	/// Directory receiving topology files and blocks.
	pub output_dir: PathBuf,
	/// Prefix for block names.
	#[serde(default = "default_name")]
	pub name: String,
	/// Optional `schema.json`; defaults to the coarsest patch schema.
	pub schema: Option<PathBuf>,
	/// Patch directories to assemble.
	pub patches: Vec<PathBuf>,
	/// Maximum level difference across a side (-1 disables balancing).
	#[serde(default = "default_risk_threshold")]
	pub risk_threshold: i32,
	/// Items per record batch.
	#[serde(default = "default_batch_size")]
	pub batch_size: usize,
	/// Cap on record worker threads.
	#[serde(default)]
	pub max_workers: Option<usize>,
	/// Byte cap per block file.
	#[serde(default = "default_max_block_bytes")]
	pub max_block_bytes: usize,
	/// Also write `ne.txt` / `ns.txt`.
	#[serde(default)]
	pub export_text: bool,
	/// Flat sampler for setups without rasters.
	pub sampler: Option<SamplerConfig>,
}

/// Constant sample applied to every cell and edge.
#[derive(Debug, Deserialize)]
pub struct SamplerConfig {
	#[serde(default = "default_altitude")]
	pub altitude: f64,
	#[serde(default = "default_category")]
	pub category: i32,
}

fn default_name() -> String {
	"grid".into()
}

fn default_risk_threshold() -> i32 {
	-1
}

fn default_batch_size() -> usize {
	DEFAULT_BATCH_SIZE
}

fn default_max_block_bytes() -> usize {
	DEFAULT_MAX_BLOCK_BYTES
}

fn default_altitude() -> f64 {
	SENTINEL_ALTITUDE
}

fn default_category() -> i32 {
	DEFAULT_CATEGORY
}

impl Config {
	/// Load configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		let mut config = Self::parse(&content)?;
		let base = path.parent().unwrap_or(Path::new("."));
		config.resolve_paths(base);
		Ok(config)
	}

	/// Parse and validate TOML content.
	pub fn parse(content: &str) -> Result<Self> {
		let config: Config = toml::from_str(content).with_context(|| "Failed to parse config TOML")?;

		if config.patches.is_empty() {
			anyhow::bail!("Config must list at least one patch");
		}
		if config.batch_size == 0 {
			anyhow::bail!("batch_size must be positive");
		}
		if config.max_block_bytes == 0 {
			anyhow::bail!("max_block_bytes must be positive");
		}
		if config.max_workers == Some(0) {
			anyhow::bail!("max_workers must be positive when set");
		}

		Ok(config)
	}

	fn resolve_paths(&mut self, base: &Path) {
		self.output_dir = base.join(&self.output_dir);
		if let Some(schema) = &self.schema {
			self.schema = Some(base.join(schema));
		}
		for patch in &mut self.patches {
			*patch = base.join(&*patch);
		}
	}

	/// Library options for this run.
	pub fn options(&self) -> AssembleOptions {
		AssembleOptions {
			balance: BalanceBudget::with_threshold(self.risk_threshold),
			writer: WriterConfig {
				batch_size: self.batch_size,
				max_workers: self.max_workers,
			},
			blocks: BlockConfig {
				max_block_bytes: self.max_block_bytes,
				name: self.name.clone(),
			},
			export_text: self.export_text,
		}
	}

	/// Constant sample, if configured.
	pub fn sample(&self) -> Option<Sample> {
		self.sampler.as_ref().map(|s| Sample {
			altitude: s.altitude,
			category: s.category,
		})
	}
}
