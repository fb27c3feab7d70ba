use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use cosicorr_core::batch::{
    band_combinations, correlate_pair, multiband_output_path, BandSource, CorrelationPair,
};
use cosicorr_core::engine::CancelToken;
use cosicorr_core::io::{band_count, write_displacement_field};
use tracing::warn;

use super::options::{pair_progress_bar, CorrelationArgs};

#[derive(Args)]
pub struct MultiBandArgs {
    /// Multiband input image
    pub image: PathBuf,

    /// Band pairs as "base,target;base,target" (default: every pair i < j)
    #[arg(long)]
    pub band_combinations: Option<String>,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    #[command(flatten)]
    pub params: CorrelationArgs,
}

pub fn run(args: &MultiBandArgs) -> Result<()> {
    let config = args.params.to_config()?;
    if !args.output.is_dir() {
        anyhow::bail!("Output path {} is not a directory", args.output.display());
    }

    let bands = band_count(&args.image)?;
    let combinations = band_combinations(bands, args.band_combinations.as_deref())?;
    println!(
        "Multiband correlation of {} ({} bands, {} combinations)",
        args.image.display(),
        bands,
        combinations.len()
    );
    println!("  Method:   {}", config.correlator);
    println!();

    let cancel = CancelToken::new();
    let pb = pair_progress_bar(combinations.len())?;
    let mut failed = 0usize;

    for &(base_band, target_band) in &combinations {
        pb.set_message(format!("bands {} vs {}", base_band, target_band));
        let pair = CorrelationPair {
            base: BandSource::new(&args.image, base_band),
            target: BandSource::new(&args.image, target_band),
        };
        let output = multiband_output_path(&args.output, &args.image, base_band, target_band);

        let result = correlate_pair(&pair, &config, &cancel, |_| {})
            .and_then(|field| write_displacement_field(&output, &field));
        match result {
            Ok(()) => pb.println(format!("  bands {} vs {} -> {}", base_band, target_band, output.display())),
            Err(e) => {
                failed += 1;
                warn!(base_band, target_band, error = %e, "Band pair failed");
                pb.println(format!("  bands {} vs {} failed: {}", base_band, target_band, e));
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("Done");

    if failed > 0 {
        anyhow::bail!("{} of {} band pairs failed", failed, combinations.len());
    }
    Ok(())
}
