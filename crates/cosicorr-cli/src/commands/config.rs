use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use cosicorr_core::config::{CorrelationConfig, FrequencyConfig, SpatialConfig};

use super::options::MethodArg;

#[derive(Args)]
pub struct ConfigArgs {
    /// Correlation method of the generated config
    #[arg(long, value_enum, default_value = "frequency")]
    pub method: MethodArg,

    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Print or save a default CorrelationConfig as TOML.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let config = match args.method {
        MethodArg::Frequency => CorrelationConfig::frequency(FrequencyConfig::default()),
        MethodArg::Spatial => CorrelationConfig::spatial(SpatialConfig::default()),
    };
    let toml_str = toml::to_string_pretty(&config)?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Default config saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}
