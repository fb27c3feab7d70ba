use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use cosicorr_core::batch::{correlate_pair, pair_inputs, resolve_output_path, PairingPolicy};
use cosicorr_core::engine::CancelToken;
use cosicorr_core::io::write_displacement_field;
use tracing::warn;

use super::options::{expand_patterns, pair_progress_bar, parse_band_list, CorrelationArgs};

#[derive(Args)]
pub struct BatchArgs {
    /// Comma-separated glob patterns for base images
    #[arg(long)]
    pub base_imgs: String,

    /// Comma-separated glob patterns for target images
    #[arg(long)]
    pub target_imgs: String,

    /// Comma-separated band per base image (default: band 1 for each)
    #[arg(long)]
    pub base_bands: Option<String>,

    /// Comma-separated band per target image (default: band 1 for each)
    #[arg(long)]
    pub target_bands: Option<String>,

    /// Pair the i-th base with the i-th target
    #[arg(long, conflicts_with = "all")]
    pub serial: bool,

    /// Pair every base with every target (default)
    #[arg(long)]
    pub all: bool,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    #[command(flatten)]
    pub params: CorrelationArgs,
}

pub fn run(args: &BatchArgs) -> Result<()> {
    let config = args.params.to_config()?;
    if !args.output.is_dir() {
        anyhow::bail!("Output path {} is not a directory", args.output.display());
    }

    let bases = expand_patterns(&args.base_imgs)?;
    let targets = expand_patterns(&args.target_imgs)?;
    let base_bands = args.base_bands.as_deref().map(parse_band_list).transpose()?;
    let target_bands = args.target_bands.as_deref().map(parse_band_list).transpose()?;
    let policy = if args.serial {
        PairingPolicy::Serial
    } else {
        PairingPolicy::All
    };

    let pairs = pair_inputs(
        &bases,
        &targets,
        base_bands.as_deref(),
        target_bands.as_deref(),
        policy,
    )?;
    println!(
        "Batch correlation: {} base, {} target, {} pairs ({:?})",
        bases.len(),
        targets.len(),
        pairs.len(),
        policy
    );
    println!("  Method:   {}", config.correlator);
    println!();

    let cancel = CancelToken::new();
    let pb = pair_progress_bar(pairs.len())?;
    let mut failed = 0usize;

    for pair in &pairs {
        pb.set_message(format!("{} vs {}", pair.base.stem(), pair.target.stem()));
        let output = resolve_output_path(&args.output, &pair.base.path, &pair.target.path, &config);

        let result = correlate_pair(pair, &config, &cancel, |_| {}).and_then(|field| {
            write_displacement_field(&output, &field)?;
            Ok(field)
        });

        match result {
            Ok(field) => pb.println(format!(
                "  {} -> {} ({}/{} valid)",
                pair.base.stem(),
                output.display(),
                field.valid_count(),
                field.metadata.total_cells()
            )),
            Err(e) => {
                failed += 1;
                warn!(base = %pair.base, target = %pair.target, error = %e, "Pair failed");
                pb.println(format!("  {} vs {} failed: {}", pair.base, pair.target, e));
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("Done");

    if failed > 0 {
        anyhow::bail!("{} of {} pairs failed", failed, pairs.len());
    }
    println!("\nAll {} pairs written to {}", pairs.len(), args.output.display());
    Ok(())
}
