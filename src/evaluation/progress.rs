use std::time::Instant;
use tracing::{info, warn};

/// Tracks one configuration's pass over the dataset.
pub struct RunProgress {
    baseline: String,
    started_at: Instant,
    total_questions: usize,
    answered: usize,
    correct: usize,
    failed: usize,
}

impl RunProgress {
    pub fn new(baseline: impl Into<String>, total_questions: usize) -> Self {
        Self {
            baseline: baseline.into(),
            started_at: Instant::now(),
            total_questions,
            answered: 0,
            correct: 0,
            failed: 0,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    pub fn progress_percent(&self) -> f64 {
        if self.total_questions == 0 {
            return 100.0;
        }
        (self.answered as f64 / self.total_questions as f64 * 100.0).clamp(0.0, 100.0)
    }

    pub fn accuracy_percent(&self) -> f64 {
        if self.answered == 0 {
            return 0.0;
        }
        self.correct as f64 / self.answered as f64 * 100.0
    }

    pub fn start(&mut self) {
        self.started_at = Instant::now();
        info!(
            baseline = %self.baseline,
            questions = self.total_questions,
            "Starting baseline run"
        );
    }

    pub fn begin_question(&self, index: usize, question: &str) {
        let preview: String = question.chars().take(50).collect();
        info!(
            baseline = %self.baseline,
            progress = %format!("{:.0}%", self.progress_percent()),
            "[{}/{}] {}...",
            index + 1,
            self.total_questions,
            preview
        );
    }

    pub fn record_answer(&mut self, correct: bool) {
        self.answered += 1;
        if correct {
            self.correct += 1;
        }
    }

    pub fn record_failure(&mut self, question_id: &str, error: &str) {
        self.answered += 1;
        self.failed += 1;
        warn!(
            baseline = %self.baseline,
            question_id = %question_id,
            error = %error,
            "Query failed, recording as incorrect"
        );
    }

    pub fn complete(&self) {
        info!(
            baseline = %self.baseline,
            accuracy = %format!("{:.1}%", self.accuracy_percent()),
            answered = self.answered,
            failed = self.failed,
            elapsed_ms = %self.elapsed_ms(),
            "Baseline run completed"
        );
    }
}
