use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{mean, StatsError};

pub const DEFAULT_BOOTSTRAP_SAMPLES: usize = 1000;
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

#[derive(Debug, Clone, Copy)]
pub struct BootstrapSettings {
    pub samples: usize,
    pub confidence: f64,
}

impl BootstrapSettings {
    pub fn new(samples: usize, confidence: f64) -> Result<Self, StatsError> {
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(StatsError::InvalidConfidence(confidence));
        }
        Ok(Self {
            samples,
            confidence,
        })
    }
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            samples: DEFAULT_BOOTSTRAP_SAMPLES,
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Percentile bootstrap interval for the mean of `data`.
///
/// The point estimate is the mean of the original sample; the bounds are
/// the `(1-c)/2` and `1-(1-c)/2` percentiles of the resampled means. An
/// empty sample yields `(0, 0, 0)`.
pub fn bootstrap_ci<R: Rng + ?Sized>(
    data: &[f64],
    settings: BootstrapSettings,
    rng: &mut R,
) -> ConfidenceInterval {
    if data.is_empty() {
        return ConfidenceInterval {
            mean: 0.0,
            lower: 0.0,
            upper: 0.0,
        };
    }

    let point = mean(data);
    if settings.samples == 0 {
        return ConfidenceInterval {
            mean: point,
            lower: point,
            upper: point,
        };
    }

    let n = data.len();
    let mut means: Vec<f64> = (0..settings.samples)
        .map(|_| {
            let total: f64 = (0..n).map(|_| data[rng.gen_range(0..n)]).sum();
            total / n as f64
        })
        .collect();
    means.sort_by(f64::total_cmp);

    let alpha = (1.0 - settings.confidence) / 2.0;
    ConfidenceInterval {
        mean: point,
        lower: percentile_sorted(&means, alpha * 100.0),
        upper: percentile_sorted(&means, (1.0 - alpha) * 100.0),
    }
}

/// Linear-interpolation percentile of sorted data, `p` in `[0, 100]`.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

pub fn percentile(data: &[f64], p: f64) -> f64 {
    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile_sorted(&sorted, p)
}
