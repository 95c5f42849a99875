use serde::{Deserialize, Serialize};

use super::distributions::student_t_two_sided;
use super::{mean, StatsError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TTestResult {
    pub statistic: f64,
    pub p_value: f64,
    pub dof: usize,
    pub mean_difference: f64,
}

/// Paired two-sided t-test on `treatment - baseline`.
pub fn paired_t_test(baseline: &[f64], treatment: &[f64]) -> Result<TTestResult, StatsError> {
    if baseline.len() != treatment.len() {
        return Err(StatsError::LengthMismatch {
            left: baseline.len(),
            right: treatment.len(),
        });
    }
    let n = baseline.len();
    if n < 2 {
        return Err(StatsError::InsufficientData { needed: 2, got: n });
    }

    let diffs: Vec<f64> = treatment.iter().zip(baseline).map(|(t, b)| t - b).collect();
    let mean_difference = mean(&diffs);
    let variance = diffs
        .iter()
        .map(|d| (d - mean_difference).powi(2))
        .sum::<f64>()
        / (n - 1) as f64;
    let dof = n - 1;

    if variance == 0.0 {
        let (statistic, p_value) = if mean_difference == 0.0 {
            (0.0, 1.0)
        } else {
            (f64::INFINITY.copysign(mean_difference), 0.0)
        };
        return Ok(TTestResult {
            statistic,
            p_value,
            dof,
            mean_difference,
        });
    }

    let statistic = mean_difference / (variance / n as f64).sqrt();
    Ok(TTestResult {
        statistic,
        p_value: student_t_two_sided(statistic, dof as f64),
        dof,
        mean_difference,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_statistic() {
        let baseline = [1.0, 2.0, 3.0, 4.0, 5.0];
        let treatment = [2.0, 3.0, 5.0, 5.0, 7.0];
        let r = paired_t_test(&baseline, &treatment).unwrap();
        // diffs 1,1,2,1,2: mean 1.4, sd sqrt(0.3)
        let expected = 1.4 / (0.3f64 / 5.0).sqrt();
        assert!((r.statistic - expected).abs() < 1e-12);
        assert_eq!(r.dof, 4);
        assert!(r.p_value > 0.001 && r.p_value < 0.01);
    }

    #[test]
    fn test_sign_follows_direction() {
        let a = [10.0, 12.0, 9.0, 11.0];
        let b = [8.0, 11.0, 9.5, 7.0];
        let forward = paired_t_test(&a, &b).unwrap();
        let backward = paired_t_test(&b, &a).unwrap();
        assert!(forward.statistic < 0.0);
        assert_eq!(forward.statistic, -backward.statistic);
        assert!((forward.p_value - backward.p_value).abs() < 1e-15);
    }

    #[test]
    fn test_identical_inputs() {
        let x = [3.0, 1.0, 4.0];
        let r = paired_t_test(&x, &x).unwrap();
        assert_eq!(r.statistic, 0.0);
        assert_eq!(r.p_value, 1.0);
    }

    #[test]
    fn test_constant_shift() {
        let r = paired_t_test(&[1.0, 2.0, 3.0], &[2.0, 3.0, 4.0]).unwrap();
        assert_eq!(r.statistic, f64::INFINITY);
        assert_eq!(r.p_value, 0.0);
    }

    #[test]
    fn test_length_mismatch() {
        let err = paired_t_test(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert_eq!(err, StatsError::LengthMismatch { left: 2, right: 1 });
    }

    #[test]
    fn test_insufficient_data() {
        let err = paired_t_test(&[1.0], &[2.0]).unwrap_err();
        assert_eq!(err, StatsError::InsufficientData { needed: 2, got: 1 });
    }
}
