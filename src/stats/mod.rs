//! Paired comparison statistics over per-question outcomes.
//!
//! Every function here is pure and synchronous. Vectors passed to the
//! paired procedures must be aligned by question index.

pub mod ablation;
pub mod bootstrap;
pub mod distributions;
pub mod mcnemar;
pub mod ttest;

use thiserror::Error;

pub use ablation::{ablation_deltas, SIGNIFICANCE_LEVEL};
pub use bootstrap::{bootstrap_ci, percentile, BootstrapSettings};
pub use mcnemar::mcnemar_test;
pub use ttest::paired_t_test;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    #[error("paired inputs differ in length: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },
    #[error("confidence level must be in (0, 1), got {0}")]
    InvalidConfidence(f64),
    #[error("reference configuration '{0}' has no results")]
    MissingReference(String),
}

pub(crate) fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Fraction of `true` entries; 0 for an empty vector.
pub fn accuracy(correct: &[bool]) -> f64 {
    if correct.is_empty() {
        return 0.0;
    }
    correct.iter().filter(|&&c| c).count() as f64 / correct.len() as f64
}

pub fn as_outcomes(correct: &[bool]) -> Vec<f64> {
    correct.iter().map(|&c| if c { 1.0 } else { 0.0 }).collect()
}
