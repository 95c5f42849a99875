//! Markdown and raw JSON outputs of an evaluation run.
//!
//! The Markdown report is rendered from per-configuration result sets in
//! the order they ran. Statistical sections never abort rendering: a test
//! whose preconditions fail is reported inline instead.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::baseline::{REFERENCE_KEY, SINGLE_MODEL_KEY};
use crate::evaluation::EvalResult;
use crate::metrics::MetricsSnapshot;
use crate::pipeline::{ClaimCounts, Stage};
use crate::stats::{
    ablation_deltas, accuracy, as_outcomes, bootstrap_ci, mcnemar_test, paired_t_test, percentile,
    BootstrapSettings, SIGNIFICANCE_LEVEL,
};

/// All rows produced by one configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResults {
    pub key: String,
    pub name: String,
    pub results: Vec<EvalResult>,
}

impl ConfigResults {
    pub fn correctness(&self) -> Vec<bool> {
        self.results.iter().map(|r| r.correct).collect()
    }

    pub fn latencies(&self) -> Vec<f64> {
        self.results.iter().map(|r| r.latency_ms).collect()
    }

    pub fn accuracy(&self) -> f64 {
        accuracy(&self.correctness())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: String,
    pub dataset: String,
    pub dataset_sha256: String,
    pub generated_at: DateTime<Utc>,
    pub metrics: MetricsSnapshot,
}

impl RunMetadata {
    pub fn new(dataset: impl Into<String>, dataset_sha256: impl Into<String>, metrics: MetricsSnapshot) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            dataset: dataset.into(),
            dataset_sha256: dataset_sha256.into(),
            generated_at: Utc::now(),
            metrics,
        }
    }
}

/// The JSON companion of the Markdown report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawReport {
    pub metadata: RunMetadata,
    pub baselines: Vec<ConfigResults>,
}

impl RawReport {
    /// Copies `baselines` with every response cut to `max_chars` characters.
    pub fn new(metadata: RunMetadata, baselines: &[ConfigResults], max_chars: usize) -> Self {
        let baselines = baselines
            .iter()
            .map(|c| ConfigResults {
                key: c.key.clone(),
                name: c.name.clone(),
                results: c.results.iter().map(|r| r.truncated(max_chars)).collect(),
            })
            .collect();
        Self { metadata, baselines }
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read results {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid results JSON in {}", path.display()))
    }
}

/// Seeded when a seed is configured, so intervals are reproducible.
pub fn report_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

pub fn render_markdown<R: Rng + ?Sized>(
    metadata: &RunMetadata,
    configs: &[ConfigResults],
    settings: BootstrapSettings,
    rng: &mut R,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Baseline Evaluation Results\n");
    let _ = writeln!(out, "## Dataset: {}", metadata.dataset);
    let _ = writeln!(
        out,
        "Generated: {}",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "Run: {}\n", metadata.run_id);

    main_table(&mut out, configs);
    if let Some(reference) = configs.iter().find(|c| c.key == REFERENCE_KEY) {
        verification_breakdown(&mut out, reference);
        stage_breakdown(&mut out, reference);
    }
    out.push_str(&render_statistics(configs, settings, rng));
    out
}

/// Confidence intervals, headline significance and ablation sections.
pub fn render_statistics<R: Rng + ?Sized>(
    configs: &[ConfigResults],
    settings: BootstrapSettings,
    rng: &mut R,
) -> String {
    let mut out = String::new();
    confidence_table(&mut out, configs, settings, rng);
    significance_table(&mut out, configs);
    ablation_table(&mut out, configs);
    let _ = writeln!(out, "\n## Notes\n");
    let _ = writeln!(
        out,
        "- Confidence intervals use bootstrap resampling (n={})",
        settings.samples
    );
    let _ = writeln!(out, "- McNemar's test (continuity corrected) for paired binary outcomes");
    let _ = writeln!(out, "- α = {} significance level", SIGNIFICANCE_LEVEL);
    out
}

fn main_table(out: &mut String, configs: &[ConfigResults]) {
    let _ = writeln!(out, "## Main Results Table\n");
    let _ = writeln!(out, "| Baseline | Accuracy | Avg Latency | P95 Latency | Tokens |");
    let _ = writeln!(out, "|----------|----------|-------------|-------------|--------|");
    for config in configs.iter().filter(|c| !c.results.is_empty()) {
        let latencies: Vec<f64> = config
            .results
            .iter()
            .map(|r| r.latency_ms)
            .filter(|&l| l > 0.0)
            .collect();
        let avg = if latencies.is_empty() {
            0.0
        } else {
            latencies.iter().sum::<f64>() / latencies.len() as f64
        };
        let tokens: u64 = config.results.iter().map(|r| r.tokens).sum();
        let _ = writeln!(
            out,
            "| {} | {:.1}% | {:.0}ms | {:.0}ms | {} |",
            config.name,
            config.accuracy() * 100.0,
            avg,
            percentile(&latencies, 95.0),
            tokens
        );
    }
}

fn verification_breakdown(out: &mut String, reference: &ConfigResults) {
    let mut counts = ClaimCounts::default();
    for r in &reference.results {
        counts.add(&r.claims);
    }
    let total = counts.total();
    if total == 0 {
        return;
    }
    let pct = |n: usize| n as f64 / total as f64 * 100.0;

    let _ = writeln!(out, "\n## Verification Analysis ({})\n", reference.name);
    let _ = writeln!(out, "| Label | Count | Percentage |");
    let _ = writeln!(out, "|-------|-------|------------|");
    for (label, n) in [
        ("Verified/Consistent", counts.supported()),
        ("Uncertain", counts.uncertain),
        ("Contradicted", counts.contradicted),
    ] {
        let _ = writeln!(out, "| {} | {} | {:.1}% |", label, n, pct(n));
    }
}

fn stage_breakdown(out: &mut String, reference: &ConfigResults) {
    let _ = writeln!(out, "\n## Stage Latency Breakdown ({})\n", reference.name);
    let _ = writeln!(out, "| Stage | Avg (ms) | P50 (ms) | P95 (ms) |");
    let _ = writeln!(out, "|-------|----------|----------|----------|");
    for stage in Stage::ALL {
        let lats: Vec<f64> = reference
            .results
            .iter()
            .filter_map(|r| r.stage_latencies.get(&stage).copied())
            .filter(|&l| l > 0.0)
            .collect();
        if lats.is_empty() {
            continue;
        }
        let avg = lats.iter().sum::<f64>() / lats.len() as f64;
        let _ = writeln!(
            out,
            "| {} | {:.0} | {:.0} | {:.0} |",
            stage.as_str().to_uppercase(),
            avg,
            percentile(&lats, 50.0),
            percentile(&lats, 95.0)
        );
    }
}

fn confidence_table<R: Rng + ?Sized>(
    out: &mut String,
    configs: &[ConfigResults],
    settings: BootstrapSettings,
    rng: &mut R,
) {
    let _ = writeln!(
        out,
        "\n## Confidence Intervals ({:.0}%, Bootstrap n={})\n",
        settings.confidence * 100.0,
        settings.samples
    );
    let _ = writeln!(out, "| Baseline | Accuracy | CI Lower | CI Upper |");
    let _ = writeln!(out, "|----------|----------|----------|----------|");
    for config in configs {
        let ci = bootstrap_ci(&as_outcomes(&config.correctness()), settings, rng);
        let _ = writeln!(
            out,
            "| {} | {:.1}% | {:.1}% | {:.1}% |",
            config.name,
            ci.mean * 100.0,
            ci.lower * 100.0,
            ci.upper * 100.0
        );
    }
}

fn significance_table(out: &mut String, configs: &[ConfigResults]) {
    let baseline = configs.iter().find(|c| c.key == SINGLE_MODEL_KEY);
    let treatment = configs.iter().find(|c| c.key == REFERENCE_KEY);
    let (Some(baseline), Some(treatment)) = (baseline, treatment) else {
        return;
    };

    let _ = writeln!(
        out,
        "\n## Significance Tests ({} vs {})\n",
        treatment.name, baseline.name
    );
    let _ = writeln!(out, "| Test | Statistic | p-value | Significant (α={}) |", SIGNIFICANCE_LEVEL);
    let _ = writeln!(out, "|------|-----------|---------|---------------------|");

    match mcnemar_test(&baseline.correctness(), &treatment.correctness()) {
        Ok(t) => {
            let _ = writeln!(
                out,
                "| McNemar's (accuracy) | {:.3} | {:.4} | {} |",
                t.statistic,
                t.p_value,
                yes_no(t.p_value)
            );
        }
        Err(e) => {
            let _ = writeln!(out, "| McNemar's (accuracy) | n/a | n/a | {} |", e);
        }
    }
    let (baseline_latency, treatment_latency) = answered_latency_pairs(baseline, treatment);
    match paired_t_test(&baseline_latency, &treatment_latency) {
        Ok(t) => {
            let _ = writeln!(
                out,
                "| Paired t-test (latency) | {:.3} | {:.4} | {} |",
                t.statistic,
                t.p_value,
                yes_no(t.p_value)
            );
        }
        Err(e) => {
            let _ = writeln!(out, "| Paired t-test (latency) | n/a | n/a | {} |", e);
        }
    }
}

/// Latencies of question pairs both sides answered. Failed rows carry no
/// real latency. Result sets of different sizes are passed through whole
/// so the test reports the mismatch.
fn answered_latency_pairs(a: &ConfigResults, b: &ConfigResults) -> (Vec<f64>, Vec<f64>) {
    if a.results.len() != b.results.len() {
        return (a.latencies(), b.latencies());
    }
    a.results
        .iter()
        .zip(&b.results)
        .filter(|(x, y)| !x.is_failure() && !y.is_failure())
        .map(|(x, y)| (x.latency_ms, y.latency_ms))
        .unzip()
}

fn ablation_table(out: &mut String, configs: &[ConfigResults]) {
    let _ = writeln!(out, "\n## Ablation Analysis\n");
    let outcomes: Vec<(String, Vec<bool>)> = configs
        .iter()
        .map(|c| (c.key.clone(), c.correctness()))
        .collect();

    let rows = match ablation_deltas(REFERENCE_KEY, &outcomes) {
        Ok(rows) => rows,
        Err(e) => {
            let _ = writeln!(out, "_Ablation skipped: {}_", e);
            return;
        }
    };

    let _ = writeln!(out, "| Configuration | Δ Accuracy | p-value | Contribution |");
    let _ = writeln!(out, "|---------------|------------|---------|--------------|");
    for row in rows {
        let name = configs
            .iter()
            .find(|c| c.key == row.name)
            .map_or(row.name.as_str(), |c| c.name.as_str());
        let _ = writeln!(
            out,
            "| {} | {:+.1}% | {:.4} | {} |",
            name,
            row.accuracy_delta * 100.0,
            row.p_value,
            row.contribution.label()
        );
    }
}

fn yes_no(p_value: f64) -> &'static str {
    if p_value < SIGNIFICANCE_LEVEL {
        "Yes"
    } else {
        "No"
    }
}

/// Writes the Markdown report and its `.json` sibling, creating parent
/// directories. Returns the JSON path.
pub async fn write_outputs(markdown_path: &Path, markdown: &str, raw: &RawReport) -> Result<PathBuf> {
    if let Some(parent) = markdown_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(markdown_path, markdown)
        .await
        .with_context(|| format!("Failed to write report {}", markdown_path.display()))?;

    let json_path = markdown_path.with_extension("json");
    let json = serde_json::to_string_pretty(raw).context("Failed to serialize raw results")?;
    tokio::fs::write(&json_path, json)
        .await
        .with_context(|| format!("Failed to write raw results {}", json_path.display()))?;

    info!(
        report = %markdown_path.display(),
        raw = %json_path.display(),
        "Results saved"
    );
    Ok(json_path)
}
