pub mod background;
pub mod correlate;
pub mod error;
pub mod io;
pub mod kmer;
pub mod normalize;
pub mod pipeline;
pub mod tile;

#[cfg(test)]
mod scenario_test;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pipeline::global_stats::{self, GlobalStatsArgs};
use pipeline::scan::{self, ScanArgs};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "seekrscan")]
#[command(version)]
#[command(about = "Score transcripts against query sequences by k-mer profile correlation", long_about = None)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hit rate of every transcript's tiles against each query.
    GlobalStats(GlobalStatsArgs),

    /// Per-window correlations and background percentiles for each sequence.
    Scan(ScanArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::GlobalStats(args) => global_stats::run(&args)?,
        Commands::Scan(args) => scan::run(&args)?,
    }
    Ok(())
}
