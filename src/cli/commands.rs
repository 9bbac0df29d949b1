// src/cli/commands.rs
use crate::types::RandomXMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// XMR Idle Miner - throttled background RandomX mining
#[derive(Parser, Debug)]
#[command(name = "xmr-idle-miner")]
#[command(version, about, long_about = None)]
pub struct Commands {
    /// The action to perform (start mining, run benchmarks, or generate config)
    #[command(subcommand)]
    pub action: Action,
}

/// Top-level commands for the miner application
#[derive(Subcommand, Debug)]
pub enum Action {
    /// Mine jobs read as JSON lines from a file or stdin
    Start(StartOptions),

    /// Measure hashrate on a synthetic job
    Benchmark(BenchmarkOptions),

    /// Generate configuration file template
    Config(ConfigOptions),
}

/// Options for starting the mining operation
#[derive(Parser, Debug)]
pub struct StartOptions {
    /// Path to configuration file (defaults are used if it does not exist)
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Newline-delimited JSON jobs; "-" reads stdin
    #[arg(short, long, default_value = "-")]
    pub jobs: String,

    /// Number of worker threads to use (overrides config)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Load factor in [0, 1] (overrides config)
    #[arg(short, long)]
    pub load_factor: Option<f64>,

    /// RandomX mode (overrides config)
    #[arg(short, long)]
    pub mode: Option<RandomXMode>,
}

/// Options for running mining benchmarks
#[derive(Parser, Debug)]
pub struct BenchmarkOptions {
    /// RandomX mode to benchmark
    #[arg(short, long, default_value = "light")]
    pub mode: RandomXMode,

    /// Duration of benchmark in seconds
    #[arg(short, long, default_value_t = 60)]
    pub duration: u64,

    /// Load factor in [0, 1]
    #[arg(short, long, default_value_t = 0.5)]
    pub load_factor: f64,

    /// Number of workers (default: cores / 2)
    #[arg(short, long)]
    pub workers: Option<usize>,
}

/// Options for generating configuration files
#[derive(Parser, Debug)]
pub struct ConfigOptions {
    /// Output file path
    #[arg(short, long, default_value = "config.toml")]
    pub output: PathBuf,
}
