mod baseline;
mod cli;
mod config;
mod dataset;
mod evaluation;
mod metrics;
mod pipeline;
mod report;
mod stats;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use baseline::BaselineRegistry;
use cli::{Cli, Commands, RunArgs, StatsArgs};
use evaluation::BaselineRunner;
use pipeline::PipelineClient;
use report::{ConfigResults, RawReport, RunMetadata};
use stats::BootstrapSettings;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("council_eval=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = config::Config::from_env();

    match cli.command {
        Commands::Run(args) => run(&config, args).await,
        Commands::Stats(args) => stats(&config, args).await,
        Commands::List => {
            list(&BaselineRegistry::with_builtin());
            Ok(())
        }
    }
}

fn bootstrap_settings(config: &config::Config) -> Result<BootstrapSettings> {
    BootstrapSettings::new(config.bootstrap_samples, config.confidence_level)
        .context("Invalid CONFIDENCE_LEVEL")
}

async fn run(config: &config::Config, args: RunArgs) -> Result<()> {
    config.print_banner();
    let settings = bootstrap_settings(config)?;

    let dataset = dataset::load(&args.dataset, &config.datasets_dir, args.samples)?;
    let selected = BaselineRegistry::with_builtin().select(&args.baselines);
    if selected.is_empty() {
        warn!(baselines = %args.baselines, "No known baselines selected, report will be empty");
    }

    let client = PipelineClient::new(
        config.api_url.as_str(),
        config.query_timeout(),
        Duration::from_secs(config.connect_timeout_secs),
    )?;
    info!(url = %client.base_url(), questions = dataset.questions.len(), "Pipeline client ready");
    let metrics = metrics::Metrics::new();
    let runner = BaselineRunner::new(Arc::new(client), metrics.clone())
        .with_query_delay(config.query_delay())
        .with_sample_delay(config.sample_delay());

    let mut all_results = Vec::with_capacity(selected.len());
    for baseline in &selected {
        let results = runner.run(baseline, &dataset.questions).await;
        let entry = ConfigResults {
            key: baseline.key.clone(),
            name: baseline.name.clone(),
            results,
        };
        info!(
            baseline = %entry.name,
            accuracy = %format!("{:.1}%", entry.accuracy() * 100.0),
            "Baseline finished"
        );
        all_results.push(entry);
    }
    metrics.log_summary();

    let metadata = RunMetadata::new(&dataset.name, &dataset.sha256, metrics.snapshot());
    let mut rng = report::report_rng(config.bootstrap_seed);
    let markdown = report::render_markdown(&metadata, &all_results, settings, &mut rng);
    let raw = RawReport::new(metadata, &all_results, config.response_truncate_chars);
    report::write_outputs(&args.output, &markdown, &raw).await?;

    println!("{}", markdown);
    Ok(())
}

async fn stats(config: &config::Config, args: StatsArgs) -> Result<()> {
    let settings = bootstrap_settings(config)?;
    let raw = RawReport::load(&args.results).await?;

    let mut rng = report::report_rng(config.bootstrap_seed);
    let mut markdown = format!(
        "# Statistical Analysis Report\n\nGenerated from {} (dataset {}, run {}).\n",
        args.results.display(),
        raw.metadata.dataset,
        raw.metadata.run_id
    );
    markdown.push_str(&report::render_statistics(&raw.baselines, settings, &mut rng));

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(&args.output, &markdown)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!(report = %args.output.display(), "Stats report saved");
    println!("{}", markdown);
    Ok(())
}

fn list(registry: &BaselineRegistry) {
    println!(
        "{:<20} {:<28} {:>7} {:>6} {:<12} {:>5} {:>8} {:>7}  DESCRIPTION",
        "KEY", "NAME", "COUNCIL", "REVIEW", "VERIFY", "ROLES", "CHAIRMAN", "SAMPLES"
    );
    for c in registry.configs() {
        println!(
            "{:<20} {:<28} {:>7} {:>6} {:<12} {:>5} {:>8} {:>7}  {}",
            c.key,
            c.name,
            c.council_size,
            yes_no(c.enable_cross_review),
            c.verification_mode.as_str(),
            yes_no(c.use_roles),
            yes_no(c.use_chairman),
            c.samples_per_query,
            c.description
        );
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
