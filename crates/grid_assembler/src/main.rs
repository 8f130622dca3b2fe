//! Meta-grid assembler.
//!
//! Merges edited quadtree patches into one conflict-free grid and writes its
//! cell/edge topology, grid meta and delivery blocks.

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use hydro_grid::pipeline::{assemble, AssembleOptions, AssembleStats};
use hydro_grid::topology::{ConstantSampler, NullSampler, TerrainSampler};
use hydro_grid::{GridSchema, Patch};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::Config;

/// Meta-grid assembler for hydrological quadtree patches.
#[derive(Parser, Debug)]
#[command(name = "assemble_grid")]
#[command(about = "Assembles quadtree patches into one grid and exports its topology")]
struct Args {
	/// Path to configuration TOML file.
	#[arg(short, long)]
	config: PathBuf,

	/// Output directory (default: `output_dir` from the config).
	#[arg(short, long)]
	output_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
	tracing::subscriber::set_global_default(subscriber).context("Failed to install tracing subscriber")?;

	let args = Args::parse();
	info!(config = %args.config.display(), "Loading config");
	let config = Config::load(&args.config)?;
	let output_dir = args.output_dir.unwrap_or_else(|| config.output_dir.clone());

	let schema = match &config.schema {
		Some(path) => Some(
			GridSchema::load(path).with_context(|| format!("Failed to load schema: {}", path.display()))?,
		),
		None => None,
	};

	let patches = config
		.patches
		.iter()
		.map(|dir| Patch::open(dir).with_context(|| format!("Failed to open patch: {}", dir.display())))
		.collect::<Result<Vec<_>>>()?;
	info!(patches = patches.len(), output = %output_dir.display(), "Assembling grid");

	let options = config.options();
	let stats = match config.sample() {
		Some(sample) => run(&patches, schema.as_ref(), &ConstantSampler(sample), &options, &output_dir)?,
		None => run(&patches, schema.as_ref(), &NullSampler, &options, &output_dir)?,
	};

	info!(
		cells = stats.cells,
		edges = stats.edges,
		blocks = stats.blocks,
		conflicts = stats.conflicts_removed,
		balanced = stats.balance.converged,
		"Done"
	);
	Ok(())
}

fn run<S: TerrainSampler>(
	patches: &[Patch],
	schema: Option<&GridSchema>,
	sampler: &S,
	options: &AssembleOptions,
	output_dir: &Path,
) -> Result<AssembleStats> {
	assemble(patches, schema, sampler, options, output_dir)
		.with_context(|| format!("Failed to assemble grid into {}", output_dir.display()))
}
