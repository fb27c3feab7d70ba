mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cosicorr", about = "Sub-pixel image correlation tool")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Correlate a base image against a target image
    Correlate(commands::correlate::CorrelateArgs),
    /// Correlate every base/target pair matched by glob patterns
    BatchCorrelate(commands::batch::BatchArgs),
    /// Correlate band pairs of a single multiband image
    MultiBandCorrelation(commands::multiband::MultiBandArgs),
    /// Show raster dimensions, bands and georeferencing
    Info(commands::info::InfoArgs),
    /// Print a default correlation config as TOML
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Correlate(args) => commands::correlate::run(args),
        Commands::BatchCorrelate(args) => commands::batch::run(args),
        Commands::MultiBandCorrelation(args) => commands::multiband::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
