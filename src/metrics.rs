use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct Metrics {
    pub runs_total: AtomicU64,
    pub queries_total: AtomicU64,
    pub queries_failed: AtomicU64,
    pub queries_timed_out: AtomicU64,
    pub tokens_total: AtomicU64,
    pub latency_sum_ms: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub runs_total: u64,
    pub queries_total: u64,
    pub queries_failed: u64,
    pub queries_timed_out: u64,
    pub tokens_total: u64,
    pub latency_sum_ms: u64,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            runs_total: AtomicU64::new(0),
            queries_total: AtomicU64::new(0),
            queries_failed: AtomicU64::new(0),
            queries_timed_out: AtomicU64::new(0),
            tokens_total: AtomicU64::new(0),
            latency_sum_ms: AtomicU64::new(0),
        })
    }

    pub fn start_run(&self) {
        self.runs_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_query(&self, latency_ms: f64, tokens: u64) {
        self.queries_total.fetch_add(1, Ordering::Relaxed);
        self.tokens_total.fetch_add(tokens, Ordering::Relaxed);
        self.latency_sum_ms
            .fetch_add(latency_ms.max(0.0).round() as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self, timed_out: bool) {
        self.queries_total.fetch_add(1, Ordering::Relaxed);
        self.queries_failed.fetch_add(1, Ordering::Relaxed);
        if timed_out {
            self.queries_timed_out.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_total: self.runs_total.load(Ordering::Relaxed),
            queries_total: self.queries_total.load(Ordering::Relaxed),
            queries_failed: self.queries_failed.load(Ordering::Relaxed),
            queries_timed_out: self.queries_timed_out.load(Ordering::Relaxed),
            tokens_total: self.tokens_total.load(Ordering::Relaxed),
            latency_sum_ms: self.latency_sum_ms.load(Ordering::Relaxed),
        }
    }

    pub fn log_summary(&self) {
        let s = self.snapshot();
        tracing::info!(
            runs = s.runs_total,
            queries = s.queries_total,
            failed = s.queries_failed,
            timed_out = s.queries_timed_out,
            tokens = s.tokens_total,
            latency_sum_ms = s.latency_sum_ms,
            "Evaluation metrics"
        );
    }
}
