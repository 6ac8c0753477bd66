// auditor-core/src/domain/hypothesis/router.rs

use serde::Serialize;
use tracing::debug;

use super::gate::{GateEvaluation, normality_gate};
use super::{ALPHA, MIN_GROUP_SIZE};
use crate::domain::model::Severity;
use crate::domain::stats::{
    AdfResult, StatsError, TestOutcome, adf_test, bartlett, ks_normal_fit, levene_median,
    mann_whitney_u, mean, variance, welch_t_test, wilcoxon_signed_rank,
};

/// Relative mean difference (in %) above which a significant shift is HIGH.
pub const MEAN_SHIFT_HIGH_PCT: f64 = 20.0;

/// Variance ratio above which a significant change is HIGH.
pub const VARIANCE_RATIO_HIGH: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Parametric,
    NonParametric,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parametric => "parametric",
            Self::NonParametric => "non_parametric",
        }
    }
}

/// Result of a gated two-group comparison, with its severity already decided.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShiftDecision {
    pub route: Route,
    pub gates: [GateEvaluation; 2],
    pub test_name: &'static str,
    pub outcome: TestOutcome,
    /// Relative mean difference in % for means, max/min variance ratio for variances.
    pub effect: f64,
    pub summary_a: f64,
    pub summary_b: f64,
    pub severity: Severity,
}

impl ShiftDecision {
    pub fn is_significant(&self) -> bool {
        self.outcome.is_significant(ALPHA)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairedComparison {
    pub pairs: usize,
    pub outcome: TestOutcome,
    pub severity: Severity,
}

/// First half / second half split; the second half takes the odd element.
pub fn split_halves(values: &[f64]) -> (&[f64], &[f64]) {
    values.split_at(values.len() / 2)
}

/// `|mean_a - mean_b| / mean_a` in percent, 0 when `mean_a` is 0.
/// Signed: a negative baseline gives a negative difference, which never reaches the HIGH tier.
fn relative_difference_pct(mean_a: f64, mean_b: f64) -> f64 {
    if mean_a == 0.0 {
        0.0
    } else {
        (mean_a - mean_b).abs() / mean_a * 100.0
    }
}

/// `max(var) / min(var)`: 1 when both are zero, infinite when only one is.
fn variance_ratio(var_a: f64, var_b: f64) -> f64 {
    let (lo, hi) = if var_a <= var_b {
        (var_a, var_b)
    } else {
        (var_b, var_a)
    };
    if hi <= 0.0 {
        1.0
    } else if lo <= 0.0 {
        f64::INFINITY
    } else {
        hi / lo
    }
}

fn tiered(significant: bool, large_effect: bool) -> Severity {
    match (significant, large_effect) {
        (true, true) => Severity::High,
        (true, false) => Severity::Medium,
        (false, _) => Severity::Pass,
    }
}

/// Stateless decision procedure: gate both groups, pick a route, run the test.
///
/// Each call walks `gate evaluated -> route chosen -> result emitted` and
/// keeps nothing between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct HypothesisRouter;

impl HypothesisRouter {
    pub fn new() -> Self {
        Self
    }

    fn require_groups(test: &'static str, a: &[f64], b: &[f64]) -> Result<(), StatsError> {
        let got = a.len().min(b.len());
        if got < MIN_GROUP_SIZE {
            return Err(StatsError::InsufficientData {
                test,
                needed: MIN_GROUP_SIZE,
                got,
            });
        }
        Ok(())
    }

    /// Parametric only when both groups pass the gate.
    pub fn route(&self, a: &[f64], b: &[f64]) -> (Route, [GateEvaluation; 2]) {
        let gates = [normality_gate(a), normality_gate(b)];
        let route = if gates.iter().all(|g| g.is_normal) {
            Route::Parametric
        } else {
            Route::NonParametric
        };
        debug!(route = route.as_str(), n_a = a.len(), n_b = b.len(), "Normality gate evaluated");
        (route, gates)
    }

    /// Welch's t-test or Mann-Whitney U, then the mean-shift severity table.
    pub fn compare_means(&self, a: &[f64], b: &[f64]) -> Result<ShiftDecision, StatsError> {
        Self::require_groups("mean comparison", a, b)?;
        let (route, gates) = self.route(a, b);
        let (test_name, outcome) = match route {
            Route::Parametric => ("Welch t-test", welch_t_test(a, b)?),
            Route::NonParametric => ("Mann-Whitney U", mann_whitney_u(a, b)?),
        };
        let (mean_a, mean_b) = (mean(a), mean(b));
        let effect = relative_difference_pct(mean_a, mean_b);
        let significant = outcome.is_significant(ALPHA);
        Ok(ShiftDecision {
            route,
            gates,
            test_name,
            outcome,
            effect,
            summary_a: mean_a,
            summary_b: mean_b,
            severity: tiered(significant, effect > MEAN_SHIFT_HIGH_PCT),
        })
    }

    /// Bartlett or median-centred Levene, then the variance-shift severity table.
    pub fn compare_variances(&self, a: &[f64], b: &[f64]) -> Result<ShiftDecision, StatsError> {
        Self::require_groups("variance comparison", a, b)?;
        let (route, gates) = self.route(a, b);
        let (test_name, outcome) = match route {
            Route::Parametric => ("Bartlett", bartlett(&[a, b])?),
            Route::NonParametric => ("Levene (median)", levene_median(&[a, b])?),
        };
        let (var_a, var_b) = (variance(a), variance(b));
        let effect = variance_ratio(var_a, var_b);
        let significant = outcome.is_significant(ALPHA);
        Ok(ShiftDecision {
            route,
            gates,
            test_name,
            outcome,
            effect,
            summary_a: var_a,
            summary_b: var_b,
            severity: tiered(significant, effect > VARIANCE_RATIO_HIGH),
        })
    }

    /// Wilcoxon signed-rank on length-matched halves. Always non-parametric, no gate.
    pub fn paired(&self, a: &[f64], b: &[f64]) -> Result<PairedComparison, StatsError> {
        Self::require_groups("paired comparison", a, b)?;
        let pairs = a.len().min(b.len());
        let outcome = wilcoxon_signed_rank(&a[..pairs], &b[..pairs])?;
        let severity = if outcome.is_significant(ALPHA) {
            Severity::Medium
        } else {
            Severity::Pass
        };
        Ok(PairedComparison {
            pairs,
            outcome,
            severity,
        })
    }

    /// KS against a normal fitted on the sample.
    pub fn goodness_of_fit(&self, values: &[f64]) -> Result<TestOutcome, StatsError> {
        if values.len() < MIN_GROUP_SIZE {
            return Err(StatsError::InsufficientData {
                test: "KS goodness-of-fit",
                needed: MIN_GROUP_SIZE,
                got: values.len(),
            });
        }
        ks_normal_fit(values)
    }

    /// Augmented Dickey-Fuller; independent of the gate.
    pub fn stationarity(&self, values: &[f64]) -> Result<AdfResult, StatsError> {
        adf_test(values)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::stats::special::normal_ppf;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;

    fn shuffled_normal(n: usize, loc: f64, scale: f64, seed: u64) -> Vec<f64> {
        let mut v: Vec<f64> = (1..=n)
            .map(|i| loc + scale * normal_ppf((i as f64 - 0.5) / n as f64))
            .collect();
        v.shuffle(&mut StdRng::seed_from_u64(seed));
        v
    }

    #[test]
    fn test_step_change_takes_non_parametric_route_and_is_high() {
        let a = vec![50.0; 50];
        let b = vec![100.0; 50];
        let d = HypothesisRouter::new().compare_means(&a, &b).unwrap();
        assert_eq!(d.route, Route::NonParametric);
        assert_eq!(d.test_name, "Mann-Whitney U");
        assert!(d.is_significant());
        assert!((d.effect - 100.0).abs() < 1e-9);
        assert_eq!(d.severity, Severity::High);
    }

    #[test]
    fn test_negative_baseline_shift_stays_medium() {
        let a = vec![-100.0; 50];
        let b = vec![-50.0; 50];
        let d = HypothesisRouter::new().compare_means(&a, &b).unwrap();
        assert!(d.is_significant());
        assert!((d.effect + 50.0).abs() < 1e-9);
        assert_eq!(d.severity, Severity::Medium);
    }

    #[test]
    fn test_normal_halves_take_parametric_route() {
        let a = shuffled_normal(100, 10.0, 1.0, 1);
        let b = shuffled_normal(100, 10.0, 1.0, 2);
        let router = HypothesisRouter::new();
        let d = router.compare_means(&a, &b).unwrap();
        assert_eq!(d.route, Route::Parametric);
        assert_eq!(d.severity, Severity::Pass);

        let v = router.compare_variances(&a, &b).unwrap();
        assert_eq!(v.test_name, "Bartlett");
        assert_eq!(v.severity, Severity::Pass);
    }

    #[test]
    fn test_small_significant_shift_is_medium() {
        let a = shuffled_normal(100, 100.0, 1.0, 3);
        let b = shuffled_normal(100, 102.0, 1.0, 4);
        let d = HypothesisRouter::new().compare_means(&a, &b).unwrap();
        assert!(d.is_significant());
        assert_eq!(d.severity, Severity::Medium);
    }

    #[test]
    fn test_variance_blow_up_is_high() {
        let a = shuffled_normal(100, 0.0, 1.0, 5);
        let b = shuffled_normal(100, 0.0, 4.0, 6);
        let v = HypothesisRouter::new().compare_variances(&a, &b).unwrap();
        assert!(v.is_significant());
        assert!(v.effect > VARIANCE_RATIO_HIGH);
        assert_eq!(v.severity, Severity::High);
    }

    #[test]
    fn test_insufficient_groups_are_reported() {
        let err = HypothesisRouter::new()
            .compare_means(&[1.0; 10], &[2.0; 30])
            .unwrap_err();
        assert!(matches!(err, StatsError::InsufficientData { got: 10, .. }));
    }

    #[test]
    fn test_paired_skips_the_gate() {
        let a: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let b: Vec<f64> = (0..31).map(|i| i as f64 + 5.0).collect();
        let p = HypothesisRouter::new().paired(&a, &b).unwrap();
        assert_eq!(p.pairs, 30);
        assert_eq!(p.severity, Severity::Medium);
    }

    #[test]
    fn test_effect_sizes() {
        assert_eq!(relative_difference_pct(0.0, 5.0), 0.0);
        assert!((relative_difference_pct(50.0, 100.0) - 100.0).abs() < 1e-12);
        assert!((relative_difference_pct(-50.0, -100.0) + 100.0).abs() < 1e-12);
        assert_eq!(variance_ratio(0.0, 0.0), 1.0);
        assert!(variance_ratio(0.0, 2.0).is_infinite());
        assert!((variance_ratio(8.0, 2.0) - 4.0).abs() < 1e-12);
    }
}
