use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::baseline::BaselineConfig;
use crate::pipeline::PipelineBackend;

#[derive(Debug, Clone, Default)]
pub struct SelfConsistencyOutcome {
    pub answer: String,
    /// Summed over every successful sample.
    pub total_latency_ms: f64,
    pub tokens: u64,
    pub samples: Vec<String>,
    pub failures: usize,
}

pub struct SelfConsistencyRunner<B: PipelineBackend> {
    backend: Arc<B>,
    sample_delay: Duration,
}

impl<B: PipelineBackend> SelfConsistencyRunner<B> {
    pub fn new(backend: Arc<B>, sample_delay: Duration) -> Self {
        Self {
            backend,
            sample_delay,
        }
    }

    /// Queries `k` times one after another and votes on the verbatim answers.
    pub async fn run(&self, question: &str, config: &BaselineConfig, k: u32) -> SelfConsistencyOutcome {
        let mut outcome = SelfConsistencyOutcome::default();

        for sample in 0..k {
            match self.backend.query(question, config).await {
                Ok(result) => {
                    debug!(sample, latency_ms = %result.total_latency_ms, "Self-consistency sample");
                    outcome.total_latency_ms += result.total_latency_ms;
                    outcome.tokens += result.tokens;
                    outcome.samples.push(result.answer);
                }
                Err(e) => {
                    warn!(sample, error = %e, "Self-consistency sample failed");
                    outcome.failures += 1;
                }
            }
            if !self.sample_delay.is_zero() {
                tokio::time::sleep(self.sample_delay).await;
            }
        }

        outcome.answer = consensus(&outcome.samples);
        outcome
    }
}

/// Most frequent answer; ties go to the answer seen first. Empty input
/// yields the empty string.
pub fn consensus(answers: &[String]) -> String {
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for answer in answers {
        match tally.iter_mut().find(|(a, _)| *a == answer.as_str()) {
            Some((_, count)) => *count += 1,
            None => tally.push((answer.as_str(), 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (answer, count) in tally {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((answer, count));
        }
    }
    best.map(|(a, _)| a.to_string()).unwrap_or_default()
}
