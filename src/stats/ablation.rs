use serde::{Deserialize, Serialize};

use super::mcnemar::mcnemar_test;
use super::{accuracy, StatsError};

pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Contribution {
    Significant,
    NotSignificant,
}

impl Contribution {
    pub fn from_p_value(p_value: f64) -> Self {
        if p_value < SIGNIFICANCE_LEVEL {
            Self::Significant
        } else {
            Self::NotSignificant
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Significant => "Significant",
            Self::NotSignificant => "Not significant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AblationRow {
    pub name: String,
    /// `accuracy(reference) - accuracy(name)`, as a fraction.
    pub accuracy_delta: f64,
    pub p_value: f64,
    pub contribution: Contribution,
}

/// Compares every configuration against `reference` on the same questions.
///
/// `outcomes` pairs configuration names with correctness vectors aligned by
/// question index. Rows keep the input order and skip the reference itself.
pub fn ablation_deltas(
    reference: &str,
    outcomes: &[(String, Vec<bool>)],
) -> Result<Vec<AblationRow>, StatsError> {
    let full = outcomes
        .iter()
        .find(|(name, _)| name == reference)
        .map(|(_, correct)| correct)
        .ok_or_else(|| StatsError::MissingReference(reference.to_string()))?;
    let full_accuracy = accuracy(full);

    outcomes
        .iter()
        .filter(|(name, _)| name != reference)
        .map(|(name, correct)| {
            let test = mcnemar_test(correct, full)?;
            Ok(AblationRow {
                name: name.clone(),
                accuracy_delta: full_accuracy - accuracy(correct),
                p_value: test.p_value,
                contribution: Contribution::from_p_value(test.p_value),
            })
        })
        .collect()
}
