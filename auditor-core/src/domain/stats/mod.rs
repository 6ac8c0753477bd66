// auditor-core/src/domain/stats/mod.rs

// Statistical toolkit used by checks and by the hypothesis router.
// Everything here is pure: slices in, numbers out.

pub mod correlation;
pub mod descriptive;
pub mod inference;
pub mod linalg;
pub mod normality;
pub mod sampling;
pub mod special;
pub mod stationarity;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StatsError {
    #[error("{test} needs at least {needed} observations, got {got}")]
    InsufficientData {
        test: &'static str,
        needed: usize,
        got: usize,
    },
    #[error("{0}: sample has zero spread")]
    ZeroVariance(&'static str),
    #[error("singular design matrix in least squares")]
    SingularMatrix,
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
}

/// Result of a classical hypothesis test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestOutcome {
    pub statistic: f64,
    pub p_value: f64,
}

impl TestOutcome {
    pub fn new(statistic: f64, p_value: f64) -> Self {
        Self {
            statistic,
            p_value: p_value.clamp(0.0, 1.0),
        }
    }

    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

pub use correlation::{Correlation, cramers_v, pearson, spearman};
pub use descriptive::{
    excess_kurtosis, mean, median, median_absolute_deviation, quantile, rank_average, round_to,
    skewness, std_dev, variance,
};
pub use inference::{
    bartlett, chi2_contingency, kruskal_wallis, ks_normal_fit, ks_two_sample, levene_median,
    mann_kendall, mann_whitney_u, welch_t_test, wilcoxon_signed_rank,
};
pub use normality::{anderson_darling, dagostino_k2, lilliefors, shapiro_wilk};
pub use sampling::{SAMPLING_SEED, seeded_sample};
pub use stationarity::{AdfResult, adf_test};
