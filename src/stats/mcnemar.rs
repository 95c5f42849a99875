use serde::{Deserialize, Serialize};

use super::distributions::chi_square_sf;
use super::StatsError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct McNemarResult {
    pub statistic: f64,
    pub p_value: f64,
    /// Baseline correct, treatment wrong.
    pub b: usize,
    /// Baseline wrong, treatment correct.
    pub c: usize,
}

/// McNemar's test with continuity correction over paired binary outcomes.
///
/// Only discordant pairs count. With none, the statistic is 0 and the
/// p-value 1. Otherwise `chi2 = (|b - c| - 1)^2 / (b + c)` on one degree of
/// freedom.
pub fn mcnemar_test(
    baseline_correct: &[bool],
    treatment_correct: &[bool],
) -> Result<McNemarResult, StatsError> {
    if baseline_correct.len() != treatment_correct.len() {
        return Err(StatsError::LengthMismatch {
            left: baseline_correct.len(),
            right: treatment_correct.len(),
        });
    }

    let (mut b, mut c) = (0usize, 0usize);
    for (&base, &treat) in baseline_correct.iter().zip(treatment_correct) {
        match (base, treat) {
            (true, false) => b += 1,
            (false, true) => c += 1,
            _ => {}
        }
    }

    if b + c == 0 {
        return Ok(McNemarResult {
            statistic: 0.0,
            p_value: 1.0,
            b,
            c,
        });
    }

    let diff = (b as f64 - c as f64).abs() - 1.0;
    let statistic = diff * diff / (b + c) as f64;
    Ok(McNemarResult {
        statistic,
        p_value: chi_square_sf(statistic, 1.0),
        b,
        c,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_vectors() {
        for x in [vec![], vec![true], vec![false, false], vec![true, false, true, true]] {
            let r = mcnemar_test(&x, &x).unwrap();
            assert_eq!(r.statistic, 0.0);
            assert_eq!(r.p_value, 1.0);
        }
    }

    #[test]
    fn test_length_mismatch() {
        let err = mcnemar_test(&[true, false], &[true]).unwrap_err();
        assert_eq!(err, StatsError::LengthMismatch { left: 2, right: 1 });
    }

    #[test]
    fn test_concordant_pairs_ignored() {
        let base = [true, true, false, false, true];
        let treat = [true, true, false, false, false];
        let r = mcnemar_test(&base, &treat).unwrap();
        assert_eq!((r.b, r.c), (1, 0));
        // (|1 - 0| - 1)^2 / 1
        assert_eq!(r.statistic, 0.0);
        assert_eq!(r.p_value, 1.0);
    }

    #[test]
    fn test_continuity_correction_applied() {
        // b = 10, c = 2
        let mut base = vec![true; 10];
        base.extend(vec![false; 2]);
        let mut treat = vec![false; 10];
        treat.extend(vec![true; 2]);

        let r = mcnemar_test(&base, &treat).unwrap();
        assert_eq!((r.b, r.c), (10, 2));
        assert!((r.statistic - 49.0 / 12.0).abs() < 1e-12);
        assert!(r.p_value > 0.04 && r.p_value < 0.05);
    }

    #[test]
    fn test_symmetric_in_direction() {
        let base = [true, true, true, false, true, true];
        let treat = [false, false, false, true, true, false];
        let forward = mcnemar_test(&base, &treat).unwrap();
        let backward = mcnemar_test(&treat, &base).unwrap();
        assert_eq!(forward.statistic, backward.statistic);
        assert_eq!(forward.p_value, backward.p_value);
        assert_eq!((forward.b, forward.c), (backward.c, backward.b));
    }

    #[test]
    fn test_strong_effect_is_significant() {
        let base = vec![false; 30];
        let treat = vec![true; 30];
        let r = mcnemar_test(&base, &treat).unwrap();
        assert!((r.statistic - 29.0 * 29.0 / 30.0).abs() < 1e-12);
        assert!(r.p_value < 1e-6);
    }
}
