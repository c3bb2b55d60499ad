//! Statistical primitives: Pearson correlation, paired and Welch t-tests.
//!
//! Every division is guarded. Undefined results come back as a named
//! outcome, never as NaN.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::Statistics;

/// Minimum paired observations for a t-test.
pub const MIN_OBSERVATIONS: usize = 2;

/// Result of a t-test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TestOutcome {
    Computed {
        statistic: f64,
        p_value: f64,
        degrees_of_freedom: f64,
        mean_difference: f64,
    },
    /// Fewer than two observations; the test is undefined.
    InsufficientData { observations: usize },
    /// The standard error is zero; the statistic is unbounded.
    ZeroVariance { mean_difference: f64 },
}

impl TestOutcome {
    pub fn p_value(&self) -> Option<f64> {
        match self {
            Self::Computed { p_value, .. } => Some(*p_value),
            _ => None,
        }
    }

    pub fn statistic(&self) -> Option<f64> {
        match self {
            Self::Computed { statistic, .. } => Some(*statistic),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Computed { .. }         => "computed",
            Self::InsufficientData { .. } => "insufficient_data",
            Self::ZeroVariance { .. }     => "zero_variance",
        }
    }
}

/// Pearson correlation of paired samples.
/// `None` when fewer than two pairs or either side has zero variance.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    // Rounding can push |r| a hair past 1.
    Some((cov / denom).clamp(-1.0, 1.0))
}

/// Paired two-sided t-test of `a` against `b` (a − b), over pairs.
pub fn paired_t_test(pairs: &[(f64, f64)]) -> TestOutcome {
    let diffs: Vec<f64> = pairs.iter().map(|(a, b)| a - b).collect();
    one_sample_t_test(&diffs)
}

/// Two-sided one-sample t-test of `values` against a zero mean.
pub fn one_sample_t_test(values: &[f64]) -> TestOutcome {
    let n = values.len();
    if n < MIN_OBSERVATIONS {
        return TestOutcome::InsufficientData { observations: n };
    }
    let mean = values.iter().mean();
    let sd = values.iter().std_dev();
    let std_err = sd / (n as f64).sqrt();
    if std_err == 0.0 || !std_err.is_finite() {
        return TestOutcome::ZeroVariance { mean_difference: mean };
    }

    let statistic = mean / std_err;
    let df = (n - 1) as f64;
    TestOutcome::Computed {
        statistic,
        p_value: two_sided_p(statistic, df),
        degrees_of_freedom: df,
        mean_difference: mean,
    }
}

/// Welch's unequal-variance two-sided t-test of `a` against `b`.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> TestOutcome {
    let observations = a.len().min(b.len());
    if observations < MIN_OBSERVATIONS {
        return TestOutcome::InsufficientData { observations };
    }
    let (n_a, n_b) = (a.len() as f64, b.len() as f64);
    let mean_diff = a.iter().mean() - b.iter().mean();
    let se_a = a.iter().variance() / n_a;
    let se_b = b.iter().variance() / n_b;
    let se2 = se_a + se_b;
    if se2 == 0.0 || !se2.is_finite() {
        return TestOutcome::ZeroVariance { mean_difference: mean_diff };
    }

    let statistic = mean_diff / se2.sqrt();
    // Welch–Satterthwaite; the denominator is positive whenever se2 is.
    let df_denom = se_a * se_a / (n_a - 1.0) + se_b * se_b / (n_b - 1.0);
    let df = se2 * se2 / df_denom;
    TestOutcome::Computed {
        statistic,
        p_value: two_sided_p(statistic, df),
        degrees_of_freedom: df,
        mean_difference: mean_diff,
    }
}

fn two_sided_p(statistic: f64, df: f64) -> f64 {
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * dist.sf(statistic.abs())).clamp(0.0, 1.0),
        Err(e) => {
            log::warn!("Student t with df={df} unavailable: {e}");
            f64::NAN
        }
    }
}
