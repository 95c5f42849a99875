use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::oracle::semantic_match;
use crate::dataset::Question;
use crate::pipeline::{ClaimCounts, Stage};

/// One scored answer. `correct` depends only on the produced and expected
/// answer text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalResult {
    pub question_id: String,
    pub question: String,
    pub expected: String,
    pub response: String,
    pub baseline: String,
    pub correct: bool,
    pub latency_ms: f64,
    #[serde(default)]
    pub tokens: u64,
    #[serde(default)]
    pub stage_latencies: BTreeMap<Stage, f64>,
    #[serde(default)]
    pub claims: ClaimCounts,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What a query produced before scoring.
#[derive(Debug, Clone, Default)]
pub struct Answer {
    pub text: String,
    pub latency_ms: f64,
    pub tokens: u64,
    pub stage_latencies: BTreeMap<Stage, f64>,
    pub claims: ClaimCounts,
    pub samples: Vec<String>,
}

impl EvalResult {
    pub fn scored(question: &Question, baseline: &str, answer: Answer) -> Self {
        let correct = semantic_match(&answer.text, &question.expected);
        Self {
            question_id: question.id.clone(),
            question: question.question.clone(),
            expected: question.expected.clone(),
            response: answer.text,
            baseline: baseline.to_string(),
            correct,
            latency_ms: answer.latency_ms,
            tokens: answer.tokens,
            stage_latencies: answer.stage_latencies,
            claims: answer.claims,
            samples: answer.samples,
            error: None,
        }
    }

    /// A query that never produced an answer: zero latency, incorrect.
    pub fn failed(question: &Question, baseline: &str, error: impl std::fmt::Display) -> Self {
        let error = error.to_string();
        Self {
            question_id: question.id.clone(),
            question: question.question.clone(),
            expected: question.expected.clone(),
            response: format!("ERROR: {}", error),
            baseline: baseline.to_string(),
            correct: false,
            latency_ms: 0.0,
            tokens: 0,
            stage_latencies: BTreeMap::new(),
            claims: ClaimCounts::default(),
            samples: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    /// Copy with the response cut to `max_chars` characters.
    pub fn truncated(&self, max_chars: usize) -> Self {
        let mut copy = self.clone();
        if copy.response.chars().count() > max_chars {
            copy.response = copy.response.chars().take(max_chars).collect();
        }
        copy
    }
}
