// auditor-core/src/domain/checks/numeric.rs

// Outliers, shape and drift checks for numeric columns.

use serde_json::json;

use super::{Check, CheckContext, CheckError, fraction, numeric_cells, percent};
use crate::domain::hypothesis::ALPHA;
use crate::domain::hypothesis::gate::GATE_SAMPLE_LIMIT;
use crate::domain::model::{DiagnosticRecord, RawColumn, Severity, TypedColumn, format_number};
use crate::domain::stats::descriptive::quantile_sorted;
use crate::domain::stats::{
    StatsError, dagostino_k2, excess_kurtosis, mann_kendall, mean, median,
    median_absolute_deviation, round_to, seeded_sample, shapiro_wilk, skewness, std_dev, variance,
};

pub const OUTLIER_IQR_TIERS: &[(Severity, f64)] = &[
    (Severity::Critical, 0.10),
    (Severity::High, 0.05),
    (Severity::Medium, 0.02),
    (Severity::Low, 0.005),
];

pub const OUTLIER_Z_TIERS: &[(Severity, f64)] = &[
    (Severity::Critical, 0.05),
    (Severity::High, 0.02),
    (Severity::Medium, 0.01),
];

pub const SKEW_TIERS: &[(Severity, f64)] = &[
    (Severity::High, 3.0),
    (Severity::Medium, 2.0),
    (Severity::Low, 1.0),
];

pub const ZERO_TIERS: &[(Severity, f64)] = &[(Severity::High, 0.30), (Severity::Medium, 0.10)];

pub const TREND_TIERS: &[(Severity, f64)] = &[
    (Severity::Critical, 3.0),
    (Severity::High, 2.5),
    (Severity::Medium, 2.0),
];

const TREND_WINDOWS: usize = 5;

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    v
}

fn split(cells: &[(usize, f64)]) -> Vec<f64> {
    cells.iter().map(|(_, x)| *x).collect()
}

/// Outlier record shared by the three outlier detectors.
fn outlier_record(
    check: &dyn Check,
    column: &str,
    ctx: &CheckContext<'_>,
    defaults: &[(Severity, f64)],
    cells: &[(usize, f64)],
    is_outlier: impl Fn(f64) -> bool,
    label: &str,
) -> DiagnosticRecord {
    let flagged: Vec<(usize, f64)> = cells.iter().copied().filter(|(_, x)| is_outlier(*x)).collect();
    let pct = fraction(flagged.len(), cells.len());
    let tiers = ctx.tiers(check.id(), defaults);
    let severity = tiers.classify(pct);
    DiagnosticRecord::new(check.id(), column, severity)
        .with_value(round_to(pct, 4))
        .with_threshold(tiers.threshold_for(severity))
        .with_message(format!("{} {} outliers ({})", flagged.len(), label, percent(pct)))
        .with_affected(flagged.len(), pct)
        .with_samples(flagged.iter().take(5).map(|(_, x)| format_number(*x)))
        .with_flagged_rows(flagged.iter().map(|(i, _)| *i))
}

pub struct OutlierIqr;

impl Check for OutlierIqr {
    fn id(&self) -> &'static str {
        "OUTLIER_IQR"
    }

    fn title(&self) -> &'static str {
        "Outliers (interquartile range)"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let cells = numeric_cells(typed);
        if cells.len() < 10 {
            return Ok(DiagnosticRecord::pass(
                self.id(),
                &raw.name,
                "Insufficient data for IQR outlier detection",
            ));
        }
        let sorted = sorted_copy(&split(&cells));
        let (q1, q3) = (quantile_sorted(&sorted, 0.25), quantile_sorted(&sorted, 0.75));
        let iqr = q3 - q1;
        if iqr == 0.0 {
            return Ok(DiagnosticRecord::pass(
                self.id(),
                &raw.name,
                "IQR is 0, outliers cannot be computed",
            ));
        }
        let (lower, upper) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
        let record = outlier_record(
            self,
            &raw.name,
            ctx,
            OUTLIER_IQR_TIERS,
            &cells,
            |x| x < lower || x > upper,
            "IQR",
        );
        let message = format!("{}, valid range [{:.2}, {:.2}]", record.message, lower, upper);
        Ok(record
            .with_message(message)
            .with_meta("Q1", round_to(q1, 4))
            .with_meta("Q3", round_to(q3, 4))
            .with_meta("IQR", round_to(iqr, 4)))
    }
}

pub struct OutlierZscore;

impl Check for OutlierZscore {
    fn id(&self) -> &'static str {
        "OUTLIER_ZSCORE"
    }

    fn title(&self) -> &'static str {
        "Outliers (z-score)"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let cells = numeric_cells(typed);
        if cells.len() < 10 {
            return Ok(DiagnosticRecord::pass(
                self.id(),
                &raw.name,
                "Insufficient data for z-score outlier detection",
            ));
        }
        let values = split(&cells);
        let (m, s) = (mean(&values), std_dev(&values));
        if s == 0.0 {
            return Ok(DiagnosticRecord::pass(self.id(), &raw.name, "Standard deviation is 0"));
        }
        Ok(outlier_record(
            self,
            &raw.name,
            ctx,
            OUTLIER_Z_TIERS,
            &cells,
            |x| ((x - m) / s).abs() > 3.0,
            "z-score",
        ))
    }
}

pub struct OutlierModifiedZ;

impl Check for OutlierModifiedZ {
    fn id(&self) -> &'static str {
        "OUTLIER_MODIFIED_Z"
    }

    fn title(&self) -> &'static str {
        "Outliers (modified z-score, MAD)"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let cells = numeric_cells(typed);
        if cells.len() < 10 {
            return Ok(DiagnosticRecord::pass(self.id(), &raw.name, "Insufficient data"));
        }
        let values = split(&cells);
        let med = median(&values);
        let mad = median_absolute_deviation(&values);
        if mad == 0.0 {
            return Ok(DiagnosticRecord::pass(
                self.id(),
                &raw.name,
                "MAD is 0, modified z-score cannot be computed",
            ));
        }
        Ok(outlier_record(
            self,
            &raw.name,
            ctx,
            OUTLIER_Z_TIERS,
            &cells,
            |x| (0.6745 * (x - med) / mad).abs() > 3.5,
            "modified z-score",
        ))
    }
}

pub struct DistributionSkew;

impl Check for DistributionSkew {
    fn id(&self) -> &'static str {
        "DISTRIBUTION_SKEW"
    }

    fn title(&self) -> &'static str {
        "Strongly asymmetric distribution"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let values = typed.numeric_values();
        if values.len() < 20 {
            return Ok(DiagnosticRecord::pass(
                self.id(),
                &raw.name,
                "Insufficient data to assess skewness",
            ));
        }
        let skew = skewness(&values);
        let tiers = ctx.tiers(self.id(), SKEW_TIERS);
        let severity = tiers.classify(skew.abs());
        let direction = if skew > 0.0 {
            "positive (right tail)"
        } else {
            "negative (left tail)"
        };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(skew, 4))
            .with_threshold(tiers.threshold_for(severity))
            .with_message(format!("Skewness {}: {:.2}", direction, skew))
            .with_meta("skewness", round_to(skew, 4))
            .with_meta("direction", direction))
    }
}

pub struct DistributionKurtosis;

impl Check for DistributionKurtosis {
    fn id(&self) -> &'static str {
        "DISTRIBUTION_KURTOSIS"
    }

    fn title(&self) -> &'static str {
        "Heavy or light tails"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let values = typed.numeric_values();
        if values.len() < 20 {
            return Ok(DiagnosticRecord::pass(
                self.id(),
                &raw.name,
                "Insufficient data to assess kurtosis",
            ));
        }
        let kurt = excess_kurtosis(&values);
        let severity = match kurt.abs() {
            k if k > 10.0 => Severity::High,
            k if k > 5.0 => Severity::Medium,
            k if k > 3.0 => Severity::Low,
            _ => Severity::Pass,
        };
        let tails = if kurt > 0.0 { "heavy" } else { "light" };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(kurt, 4))
            .with_threshold(3.0)
            .with_message(format!("Excess kurtosis {:.2} ({} tails)", kurt, tails))
            .with_meta("kurtosis", round_to(kurt, 4)))
    }
}

pub struct NegativeValues;

impl Check for NegativeValues {
    fn id(&self) -> &'static str {
        "NEGATIVE_VALUES"
    }

    fn title(&self) -> &'static str {
        "Negative values"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let cells = numeric_cells(typed);
        if cells.is_empty() {
            return Ok(DiagnosticRecord::pass(self.id(), &raw.name, "No numeric data"));
        }
        let negatives: Vec<(usize, f64)> = cells.iter().copied().filter(|(_, x)| *x < 0.0).collect();
        let pct = fraction(negatives.len(), cells.len());
        let severity = if negatives.is_empty() {
            Severity::Pass
        } else if pct > 0.20 {
            Severity::Medium
        } else {
            Severity::Info
        };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(pct, 4))
            .with_message(format!("{} negative values ({})", negatives.len(), percent(pct)))
            .with_affected(negatives.len(), pct)
            .with_samples(negatives.iter().take(5).map(|(_, x)| format_number(*x)))
            .with_flagged_rows(negatives.iter().map(|(i, _)| *i)))
    }
}

pub struct ZeroValues;

impl Check for ZeroValues {
    fn id(&self) -> &'static str {
        "ZERO_VALUES"
    }

    fn title(&self) -> &'static str {
        "Share of zeros"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let values = typed.numeric_values();
        if values.is_empty() {
            return Ok(DiagnosticRecord::pass(self.id(), &raw.name, "No numeric data"));
        }
        let zeros = values.iter().filter(|x| **x == 0.0).count();
        let pct = fraction(zeros, values.len());
        let tiers = ctx.tiers(self.id(), ZERO_TIERS);
        let severity = tiers.classify(pct);
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(pct, 4))
            .with_threshold(tiers.threshold_for(severity))
            .with_message(format!("{} zero values ({})", zeros, percent(pct)))
            .with_affected(zeros, pct))
    }
}

/// Distance of the last of five windows from the global mean, in standard deviations.
pub struct TrendChange;

impl Check for TrendChange {
    fn id(&self) -> &'static str {
        "TREND_CHANGE"
    }

    fn title(&self) -> &'static str {
        "Recent values drift from the history"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let values = typed.numeric_values();
        if values.len() < 50 {
            return Ok(DiagnosticRecord::pass(
                self.id(),
                &raw.name,
                "Insufficient data for trend analysis",
            ));
        }
        let (global_mean, global_std) = (mean(&values), std_dev(&values));
        if global_std == 0.0 {
            return Ok(DiagnosticRecord::pass(
                self.id(),
                &raw.name,
                "Standard deviation is 0, no variability",
            ));
        }
        let window = values.len() / TREND_WINDOWS;
        let last = &values[(TREND_WINDOWS - 1) * window..TREND_WINDOWS * window];
        let delta = (mean(last) - global_mean).abs() / global_std;
        let tiers = ctx.tiers(self.id(), TREND_TIERS);
        let severity = tiers.classify(delta);

        let mk = match mann_kendall(&values, ALPHA) {
            Ok(mk) => json!({
                "trend": mk.trend.as_str(),
                "p_value": round_to(mk.p_value, 4),
                "tau": round_to(mk.tau, 4),
            }),
            Err(_) => json!({ "trend": "unavailable" }),
        };

        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(delta, 4))
            .with_threshold(tiers.threshold_for(severity))
            .with_message(format!("Last window is {:.1}σ away from the global mean", delta))
            .with_affected(last.len(), fraction(last.len(), values.len()))
            .with_meta("delta_std", round_to(delta, 4))
            .with_meta("mann_kendall", mk))
    }
}

pub struct ValueRange;

impl Check for ValueRange {
    fn id(&self) -> &'static str {
        "VALUE_RANGE"
    }

    fn title(&self) -> &'static str {
        "Values outside the 0.1–99.9 percentile range"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let cells = numeric_cells(typed);
        if cells.len() < 10 {
            return Ok(DiagnosticRecord::pass(self.id(), &raw.name, "Insufficient data"));
        }
        let sorted = sorted_copy(&split(&cells));
        let (low, high) = (quantile_sorted(&sorted, 0.001), quantile_sorted(&sorted, 0.999));
        let outside: Vec<(usize, f64)> = cells
            .iter()
            .copied()
            .filter(|(_, x)| *x < low || *x > high)
            .collect();
        let pct = fraction(outside.len(), cells.len());
        let severity = if outside.is_empty() {
            Severity::Pass
        } else {
            Severity::Info
        };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(pct, 4))
            .with_message(format!(
                "{} values outside [{:.2}, {:.2}]",
                outside.len(),
                low,
                high
            ))
            .with_affected(outside.len(), pct)
            .with_samples(outside.iter().take(5).map(|(_, x)| format_number(*x)))
            .with_meta("p0.1", round_to(low, 4))
            .with_meta("p99.9", round_to(high, 4)))
    }
}

pub struct VarianceSuddenChange;

impl Check for VarianceSuddenChange {
    fn id(&self) -> &'static str {
        "VARIANCE_SUDDEN_CHANGE"
    }

    fn title(&self) -> &'static str {
        "Abrupt variance change between halves"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let values = typed.numeric_values();
        if values.len() < 100 {
            return Ok(DiagnosticRecord::pass(
                self.id(),
                &raw.name,
                "Insufficient data for variance analysis",
            ));
        }
        let (first, second) = values.split_at(values.len() / 2);
        let (v1, v2) = (variance(first), variance(second));
        let ratio = if v1 == 0.0 && v2 == 0.0 {
            1.0
        } else if v1 == 0.0 || v2 == 0.0 {
            f64::INFINITY
        } else {
            v1.max(v2) / v1.min(v2)
        };
        let severity = match ratio {
            r if r > 5.0 => Severity::High,
            r if r > 3.0 => Severity::Medium,
            r if r > 2.0 => Severity::Low,
            _ => Severity::Pass,
        };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(ratio, 4))
            .with_threshold(2.0)
            .with_message(format!("Variance ratio between halves: {:.2}x", ratio))
            .with_meta("var_first_half", round_to(v1, 4))
            .with_meta("var_second_half", round_to(v2, 4)))
    }
}

/// Shapiro-Wilk below 5000 values, D'Agostino K² on a seeded sample above.
pub struct NormalityTest;

impl Check for NormalityTest {
    fn id(&self) -> &'static str {
        "NORMALITY_TEST"
    }

    fn title(&self) -> &'static str {
        "Normality (Shapiro-Wilk / D'Agostino)"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let values = typed.numeric_values();
        if values.len() < 20 {
            return Ok(DiagnosticRecord::pass(
                self.id(),
                &raw.name,
                "Insufficient data for a normality test",
            )
            .with_threshold(ALPHA));
        }
        let (test_name, outcome) = if values.len() < GATE_SAMPLE_LIMIT {
            ("Shapiro-Wilk", shapiro_wilk(&values))
        } else {
            let sample = seeded_sample(&values, GATE_SAMPLE_LIMIT);
            ("D'Agostino-K2", dagostino_k2(&sample))
        };
        let outcome = match outcome {
            Ok(o) => o,
            Err(StatsError::ZeroVariance(_)) => {
                return Ok(
                    DiagnosticRecord::pass(self.id(), &raw.name, "No spread, normality not tested")
                        .with_threshold(ALPHA),
                );
            }
            Err(e) => return Err(e.into()),
        };
        let is_normal = outcome.p_value > ALPHA;
        let severity = if is_normal {
            Severity::Pass
        } else {
            Severity::Info
        };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(outcome.p_value, 6))
            .with_threshold(ALPHA)
            .with_message(format!(
                "{}: p={:.4} ({})",
                test_name,
                outcome.p_value,
                if is_normal { "normal" } else { "not normal" }
            ))
            .with_meta("test", test_name)
            .with_meta("statistic", round_to(outcome.statistic, 6))
            .with_meta("p_value", round_to(outcome.p_value, 6)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::checks::test_support::{numbers, run_strings};
    use crate::domain::stats::special::normal_ppf;

    fn normal_column(n: usize, loc: f64, scale: f64) -> Vec<f64> {
        (1..=n)
            .map(|i| loc + scale * normal_ppf((i as f64 - 0.5) / n as f64))
            .collect()
    }

    #[test]
    fn test_iqr_flags_extreme_values() {
        let mut values: Vec<f64> = (0..98).map(|i| (i % 10) as f64).collect();
        values.push(500.0);
        values.push(-400.0);
        let r = run_strings(&OutlierIqr, &numbers(&values));
        assert_eq!(r.affected_count, 2);
        assert_eq!(r.severity, Severity::Medium);
        assert_eq!(r.flagged_rows(), vec![98, 99]);
        assert_eq!(r.sample_values, vec!["500", "-400"]);
        assert!(r.metadata.contains_key("IQR"));
    }

    #[test]
    fn test_outliers_need_spread_and_size() {
        let r = run_strings(&OutlierIqr, &numbers(&[1.0, 2.0, 3.0]));
        assert!(r.passed);
        let r = run_strings(&OutlierZscore, &numbers(&[4.0; 12]));
        assert!(r.passed);
        assert_eq!(r.message, "Standard deviation is 0");
    }

    #[test]
    fn test_zscore_and_modified_z() {
        let mut values = normal_column(200, 0.0, 1.0);
        values[10] = 40.0;
        let r = run_strings(&OutlierZscore, &numbers(&values));
        assert!(r.flagged_rows().contains(&10));
        let r = run_strings(&OutlierModifiedZ, &numbers(&values));
        assert!(r.flagged_rows().contains(&10));
    }

    #[test]
    fn test_skew_tiers_on_absolute_value() {
        let skewed: Vec<f64> = (1..=300)
            .map(|i| (-(1.0 - (i as f64 - 0.5) / 300.0).ln()).powi(3))
            .collect();
        let r = run_strings(&DistributionSkew, &numbers(&skewed));
        assert!(r.value > 3.0);
        assert_eq!(r.severity, Severity::High);

        let mirrored: Vec<f64> = skewed.iter().map(|x| -x).collect();
        let r = run_strings(&DistributionSkew, &numbers(&mirrored));
        assert!(r.value < -3.0);
        assert_eq!(r.severity, Severity::High);
    }

    #[test]
    fn test_negative_and_zero_values() {
        let mut values = vec![1.0; 10];
        values[0] = -1.0;
        let r = run_strings(&NegativeValues, &numbers(&values));
        assert_eq!(r.severity, Severity::Info);
        assert_eq!(r.flagged_rows(), vec![0]);

        let mut values = vec![1.0; 10];
        values[..4].fill(0.0);
        let r = run_strings(&ZeroValues, &numbers(&values));
        assert_eq!(r.severity, Severity::High);
        assert_eq!(r.threshold, 0.30);
    }

    #[test]
    fn test_trend_change_on_late_jump() {
        // 109 values: five windows of 21, the last one (rows 84..105) jumps by 5
        let mut values: Vec<f64> = (0..109).map(|i| 10.0 + (i % 5) as f64 * 0.1).collect();
        for v in &mut values[84..105] {
            *v += 5.0;
        }
        let r = run_strings(&TrendChange, &numbers(&values));
        assert_eq!(r.severity, Severity::Medium);
        assert!(r.value >= 2.0);
        assert_eq!(r.affected_count, 21);
        assert_eq!(r.metadata["mann_kendall"]["trend"], "increasing");
    }

    #[test]
    fn test_variance_sudden_change() {
        let mut values = normal_column(100, 0.0, 1.0);
        values.extend(normal_column(100, 0.0, 3.0));
        let r = run_strings(&VarianceSuddenChange, &numbers(&values));
        assert_eq!(r.severity, Severity::High);
        assert!((r.value - 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_normality_test() {
        let r = run_strings(&NormalityTest, &numbers(&normal_column(200, 5.0, 2.0)));
        assert!(r.passed);
        assert_eq!(r.metadata["test"], "Shapiro-Wilk");

        let skewed: Vec<f64> = (1..=200)
            .map(|i| -(1.0 - (i as f64 - 0.5) / 200.0).ln())
            .collect();
        let r = run_strings(&NormalityTest, &numbers(&skewed));
        assert_eq!(r.severity, Severity::Info);
        assert!(!r.passed);
    }
}
