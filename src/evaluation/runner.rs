use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::progress::RunProgress;
use super::result::{Answer, EvalResult};
use super::self_consistency::SelfConsistencyRunner;
use crate::baseline::BaselineConfig;
use crate::dataset::Question;
use crate::metrics::Metrics;
use crate::pipeline::{PipelineBackend, QueryError, QueryResult};

/// Drives one configuration over a dataset, one query at a time.
pub struct BaselineRunner<B: PipelineBackend> {
    backend: Arc<B>,
    query_delay: Duration,
    sample_delay: Duration,
    metrics: Arc<Metrics>,
}

impl<B: PipelineBackend> BaselineRunner<B> {
    pub fn new(backend: Arc<B>, metrics: Arc<Metrics>) -> Self {
        Self {
            backend,
            query_delay: Duration::from_secs(1),
            sample_delay: Duration::from_millis(500),
            metrics,
        }
    }

    pub fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = delay;
        self
    }

    pub fn with_sample_delay(mut self, delay: Duration) -> Self {
        self.sample_delay = delay;
        self
    }

    pub async fn run(&self, config: &BaselineConfig, questions: &[Question]) -> Vec<EvalResult> {
        let mut progress = RunProgress::new(config.name.clone(), questions.len());
        let mut results = Vec::with_capacity(questions.len());

        self.metrics.start_run();
        progress.start();

        for (i, question) in questions.iter().enumerate() {
            progress.begin_question(i, &question.question);

            let result = match self.answer(question, config).await {
                Ok(answer) => {
                    let result = EvalResult::scored(question, &config.name, answer);
                    progress.record_answer(result.correct);
                    result
                }
                Err(e) => {
                    self.metrics
                        .record_failure(matches!(e, QueryError::Timeout(_)));
                    progress.record_failure(&question.id, &e.to_string());
                    EvalResult::failed(question, &config.name, &e)
                }
            };
            results.push(result);

            if !self.query_delay.is_zero() {
                tokio::time::sleep(self.query_delay).await;
            }
        }

        progress.complete();
        results
    }

    async fn answer(&self, question: &Question, config: &BaselineConfig) -> Result<Answer, QueryError> {
        if config.is_self_consistency() {
            let sc = SelfConsistencyRunner::new(Arc::clone(&self.backend), self.sample_delay);
            let outcome = sc.run(&question.question, config, config.samples_per_query).await;
            if outcome.failures > 0 {
                warn!(
                    baseline = %config.key,
                    question_id = %question.id,
                    failures = outcome.failures,
                    "Some self-consistency samples failed"
                );
            }
            self.metrics.record_query(outcome.total_latency_ms, outcome.tokens);
            return Ok(Answer {
                text: outcome.answer,
                latency_ms: outcome.total_latency_ms,
                tokens: outcome.tokens,
                samples: outcome.samples,
                ..Default::default()
            });
        }

        let result = self.backend.query(&question.question, config).await?;
        if let Some(ref message) = result.server_error {
            warn!(
                baseline = %config.key,
                question_id = %question.id,
                error = %message,
                "Pipeline reported an error"
            );
        }
        self.metrics.record_query(result.total_latency_ms, result.tokens);
        Ok(answer_from(result))
    }
}

fn answer_from(result: QueryResult) -> Answer {
    let claims = result.claim_counts();
    info!(
        stages = result.stage_latencies.len(),
        claims = claims.total(),
        "Answer received"
    );
    Answer {
        text: result.answer,
        latency_ms: result.total_latency_ms,
        tokens: result.tokens,
        stage_latencies: result.stage_latencies,
        claims,
        samples: Vec::new(),
    }
}
