use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use cosicorr_core::config::{
    CorrelationConfig, FrequencyConfig, SearchRange, SpatialConfig, WindowSize,
};
use cosicorr_core::consts::{DEFAULT_ITERATIONS, DEFAULT_MASK_THRESHOLD};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Clone, Copy, ValueEnum)]
pub enum MethodArg {
    Frequency,
    Spatial,
}

/// Correlation parameters shared by every correlating subcommand.
#[derive(Args)]
pub struct CorrelationArgs {
    /// Correlation config file (TOML); overrides the parameter flags
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Correlation method
    #[arg(long, value_enum, default_value = "frequency")]
    pub method: MethodArg,

    /// Window sizes: base width, base height, target width, target height
    #[arg(long, num_args = 4, value_names = ["BW", "BH", "TW", "TH"], default_values_t = [64, 64, 64, 64])]
    pub window_size: Vec<usize>,

    /// Grid step along rows and columns
    #[arg(long, num_args = 2, value_names = ["ROW", "COL"], default_values_t = [8, 8])]
    pub step: Vec<usize>,

    /// Align grid centers to multiples of the step in ground coordinates
    #[arg(long)]
    pub grid: bool,

    /// Correlate at every pixel instead of on a stepped grid
    #[arg(long)]
    pub pixel_based: bool,

    /// Frequency mask threshold (0, 1]
    #[arg(long, default_value_t = DEFAULT_MASK_THRESHOLD)]
    pub mask_th: f64,

    /// Frequency mask refinement iterations
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    pub nb_iters: usize,

    /// Spatial search range along rows and columns
    #[arg(long, num_args = 2, value_names = ["ROW", "COL"], default_values_t = [10, 10])]
    pub search_range: Vec<usize>,
}

impl CorrelationArgs {
    /// Load the config file if given, otherwise build the config from flags.
    pub fn to_config(&self) -> Result<CorrelationConfig> {
        if let Some(ref path) = self.config {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            return toml::from_str(&contents).context("Invalid correlation config");
        }

        let window_size = WindowSize::from_array([
            self.window_size[0],
            self.window_size[1],
            self.window_size[2],
            self.window_size[3],
        ]);

        let mut config = match self.method {
            MethodArg::Frequency => CorrelationConfig::frequency(FrequencyConfig {
                window_size,
                mask_threshold: self.mask_th,
                iterations: self.nb_iters,
            }),
            MethodArg::Spatial => CorrelationConfig::spatial(SpatialConfig {
                window_size,
                search_range: SearchRange {
                    row: self.search_range[0],
                    col: self.search_range[1],
                },
            }),
        }
        .with_step(self.step[0], self.step[1]);
        config.pixel_based = self.pixel_based;
        config.align_to_ground = self.grid;
        Ok(config)
    }
}

/// Comma-separated glob patterns, expanded and sorted per pattern.
pub fn expand_patterns(patterns: &str) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let mut matched: Vec<PathBuf> = glob::glob(pattern)
            .with_context(|| format!("Invalid glob pattern '{}'", pattern))?
            .collect::<std::result::Result<_, _>>()?;
        if matched.is_empty() {
            anyhow::bail!("No files match '{}'", pattern);
        }
        matched.sort();
        paths.extend(matched);
    }
    Ok(paths)
}

/// Comma-separated 1-based band list.
pub fn parse_band_list(list: &str) -> Result<Vec<usize>> {
    list.split(',')
        .map(|s| {
            s.trim()
                .parse::<usize>()
                .with_context(|| format!("Invalid band index '{}'", s.trim()))
        })
        .collect()
}

pub fn cell_progress_bar(cells: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(cells as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("Correlating [{bar:40}] {pos}/{len} cells ({eta})")?
            .progress_chars("=> "),
    );
    Ok(pb)
}

pub fn pair_progress_bar(pairs: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(pairs as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:30} [{bar:40}] {pos}/{len} pairs")?
            .progress_chars("=> "),
    );
    Ok(pb)
}
