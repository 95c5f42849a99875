use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "council-eval",
    version,
    about = "Baseline, ablation and significance evaluation for council answer pipelines"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run configurations against a dataset and write the report
    Run(RunArgs),
    /// Recompute statistics from a raw results JSON file
    Stats(StatsArgs),
    /// Print the configuration catalog
    List,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Dataset name under the datasets directory, or a path ending in .json
    #[arg(long, default_value = "truthfulqa")]
    pub dataset: String,

    #[arg(long, default_value_t = 50)]
    pub samples: usize,

    /// Comma-separated configuration keys, or "all"
    #[arg(long, default_value = "all")]
    pub baselines: String,

    #[arg(long, default_value = "eval/results/baselines.md")]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    #[arg(long, default_value = "eval/results/baselines.json")]
    pub results: PathBuf,

    #[arg(long, default_value = "eval/results/stats_report.md")]
    pub output: PathBuf,
}
