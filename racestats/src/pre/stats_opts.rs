use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    name = "racestats",
    about = "Replays recorded racing telemetry and computes per-driver race scores"
)]
pub struct StatsOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug printing of the tracking progress
    #[clap(short, long)]
    pub debug: bool,

    /// Export a lap-time plot PNG next to the JSON report
    #[clap(long)]
    pub plot: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set path to a single telemetry capture file (CSV)
    #[clap(short, long)]
    pub capture_path: Option<PathBuf>,

    /// Set path to a directory of capture files, processed in parallel
    #[clap(long)]
    pub capture_dir: Option<PathBuf>,

    /// Set path to the scoring configuration file (OPTIONAL: if not set, uses the built-in defaults)
    #[clap(short = 'f', long)]
    pub config_path: Option<PathBuf>,

    /// Set the output directory for the session statistics
    #[clap(short, long, default_value = "output/race_statistics")]
    pub out_dir: PathBuf,

    /// Score a synthetic session with the given number of cars instead of a capture
    #[clap(long)]
    pub synth_cars: Option<u32>,

    /// Set the number of laps of the synthetic session
    #[clap(long, default_value = "5")]
    pub synth_laps: u32,

    /// Set the RNG seed of the synthetic session
    #[clap(long, default_value = "42")]
    pub synth_seed: u64,
}
