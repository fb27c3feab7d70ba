use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use cosicorr_core::batch::{resolve_output_path, BandSource};
use cosicorr_core::engine::{correlate_with_progress, plan_grid, CancelToken};
use cosicorr_core::io::{load_band, write_displacement_field};

use super::options::{cell_progress_bar, CorrelationArgs};
use crate::summary::{print_correlation_summary, print_field_summary};

#[derive(Args)]
pub struct CorrelateArgs {
    /// Base (reference) image
    pub base: PathBuf,

    /// Target (secondary) image
    pub target: PathBuf,

    /// Band of the base image (1-based)
    #[arg(long, default_value_t = 1)]
    pub base_band: usize,

    /// Band of the target image (1-based)
    #[arg(long, default_value_t = 1)]
    pub target_band: usize,

    /// Output file, or a directory to place the default-named output in
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    #[command(flatten)]
    pub params: CorrelationArgs,
}

pub fn run(args: &CorrelateArgs) -> Result<()> {
    let config = args.params.to_config()?;
    let base_source = BandSource::new(&args.base, args.base_band);
    let target_source = BandSource::new(&args.target, args.target_band);
    let output = resolve_output_path(&args.output, &args.base, &args.target, &config);

    print_correlation_summary(&config, &base_source, &target_source, &output);

    let base = load_band(&base_source.path, base_source.band)
        .with_context(|| format!("Failed to load {}", base_source))?;
    let target = load_band(&target_source.path, target_source.band)
        .with_context(|| format!("Failed to load {}", target_source))?;

    let grid = plan_grid(&base, &target, &config)?;
    let pb = cell_progress_bar(grid.len())?;
    let field = correlate_with_progress(&base, &target, &config, &CancelToken::new(), |_| {
        pb.inc(1)
    })?;
    pb.finish();

    write_displacement_field(&output, &field)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    print_field_summary(&field);
    println!("Saved to {}", output.display());
    Ok(())
}
