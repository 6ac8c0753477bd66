// auditor-core/src/domain/checks/hypothesis.rs

// Inferential checks. The two-group comparisons go through the HypothesisRouter,
// the cross-column ones look at the other columns of the dataset.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use super::{Check, CheckContext, CheckError};
use crate::domain::hypothesis::{ALPHA, HypothesisRouter, MIN_GROUP_SIZE, split_halves};
use crate::domain::model::{DiagnosticRecord, RawColumn, Severity, TypedColumn};
use crate::domain::stats::{
    StatsError, anderson_darling, chi2_contingency, kruskal_wallis, lilliefors, round_to,
};

/// Cramér's V above which a significant association is MEDIUM.
pub const STRONG_ASSOCIATION: f64 = 0.3;

pub(crate) const NULL_KEY: &str = "__NULL__";
const MAX_CHI2_PAIRS: usize = 5;
const MAX_KRUSKAL_GROUPINGS: usize = 3;
const MIN_KRUSKAL_GROUP: usize = 5;

fn not_enough(check: &dyn Check, column: &str, what: &str) -> DiagnosticRecord {
    DiagnosticRecord::pass(check.id(), column, format!("Insufficient data for {}", what))
        .with_threshold(ALPHA)
}

fn no_spread(check: &dyn Check, column: &str) -> DiagnosticRecord {
    DiagnosticRecord::pass(check.id(), column, "No spread, test not applicable").with_threshold(ALPHA)
}

fn verdict(is_normal: bool) -> &'static str {
    if is_normal { "normal" } else { "not normal" }
}

/// Row-aligned contingency counts of two key sequences.
pub(crate) fn contingency_table(left: &[String], right: &[String]) -> Vec<Vec<f64>> {
    let mut rows: BTreeMap<&str, usize> = BTreeMap::new();
    let mut cols: BTreeMap<&str, usize> = BTreeMap::new();
    for (l, r) in left.iter().zip(right) {
        let next = rows.len();
        rows.entry(l.as_str()).or_insert(next);
        let next = cols.len();
        cols.entry(r.as_str()).or_insert(next);
    }
    let mut table = vec![vec![0.0; cols.len()]; rows.len()];
    for (l, r) in left.iter().zip(right) {
        table[rows[l.as_str()]][cols[r.as_str()]] += 1.0;
    }
    table
}

/// Grouping keys of a column, nulls mapped to a sentinel.
pub(crate) fn keys_with_null(typed: &TypedColumn) -> Vec<String> {
    (0..typed.len())
        .map(|i| typed.key_at(i).unwrap_or_else(|| NULL_KEY.to_string()))
        .collect()
}

pub struct NormalityAnderson;

impl Check for NormalityAnderson {
    fn id(&self) -> &'static str {
        "NORMALITY_ANDERSON"
    }

    fn title(&self) -> &'static str {
        "Normality (Anderson-Darling)"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let values = typed.numeric_values();
        if values.len() < MIN_GROUP_SIZE {
            return Ok(not_enough(self, &raw.name, "Anderson-Darling"));
        }
        let outcome = match anderson_darling(&values) {
            Ok(o) => o,
            Err(StatsError::ZeroVariance(_)) => return Ok(no_spread(self, &raw.name)),
            Err(e) => return Err(e.into()),
        };
        let is_normal = outcome.p_value >= ALPHA;
        let severity = if is_normal { Severity::Pass } else { Severity::Info };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(outcome.statistic, 6))
            .with_threshold(ALPHA)
            .with_message(format!(
                "Anderson-Darling: stat={:.4}, p={:.4} ({})",
                outcome.statistic,
                outcome.p_value,
                verdict(is_normal)
            ))
            .with_meta("statistic", round_to(outcome.statistic, 6))
            .with_meta("p_value", round_to(outcome.p_value, 6))
            .with_meta("critical_values", outcome.critical_values.map(|c| round_to(c, 4)).to_vec())
            .with_meta("is_normal", is_normal))
    }
}

pub struct NormalityLilliefors;

impl Check for NormalityLilliefors {
    fn id(&self) -> &'static str {
        "NORMALITY_LILLIEFORS"
    }

    fn title(&self) -> &'static str {
        "Normality (Lilliefors)"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let values = typed.numeric_values();
        if values.len() < MIN_GROUP_SIZE {
            return Ok(not_enough(self, &raw.name, "Lilliefors"));
        }
        let outcome = match lilliefors(&values) {
            Ok(o) => o,
            Err(StatsError::ZeroVariance(_)) => return Ok(no_spread(self, &raw.name)),
            Err(e) => return Err(e.into()),
        };
        let is_normal = outcome.p_value > ALPHA;
        let severity = if is_normal { Severity::Pass } else { Severity::Info };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(outcome.p_value, 6))
            .with_threshold(ALPHA)
            .with_message(format!("Lilliefors: p={:.4} ({})", outcome.p_value, verdict(is_normal)))
            .with_meta("statistic", round_to(outcome.statistic, 6))
            .with_meta("p_value", round_to(outcome.p_value, 6))
            .with_meta("is_normal", is_normal))
    }
}

/// First half against second half, Welch or Mann-Whitney depending on the gate.
pub struct MeanShift;

impl Check for MeanShift {
    fn id(&self) -> &'static str {
        "MEAN_SHIFT"
    }

    fn title(&self) -> &'static str {
        "Mean shift between halves"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let values = typed.numeric_values();
        if values.len() < 2 * MIN_GROUP_SIZE {
            return Ok(not_enough(self, &raw.name, "a mean comparison"));
        }
        let (first, second) = split_halves(&values);
        let d = HypothesisRouter::new().compare_means(first, second)?;
        Ok(DiagnosticRecord::new(self.id(), &raw.name, d.severity)
            .with_passed(!d.is_significant())
            .with_value(round_to(d.outcome.p_value, 6))
            .with_threshold(ALPHA)
            .with_message(format!(
                "{}: p={:.4}, first half mean={:.2}, second half mean={:.2} ({:.1}% difference)",
                d.test_name, d.outcome.p_value, d.summary_a, d.summary_b, d.effect
            ))
            .with_meta("test", d.test_name)
            .with_meta("route", d.route.as_str())
            .with_meta("statistic", round_to(d.outcome.statistic, 6))
            .with_meta("p_value", round_to(d.outcome.p_value, 6))
            .with_meta("mean_first_half", round_to(d.summary_a, 4))
            .with_meta("mean_second_half", round_to(d.summary_b, 4))
            .with_meta("diff_pct", round_to(d.effect, 2))
            .with_meta("normality_gate", serde_json::to_value(d.gates).unwrap_or(Value::Null)))
    }
}

pub struct WilcoxonPaired;

impl Check for WilcoxonPaired {
    fn id(&self) -> &'static str {
        "WILCOXON_PAIRED"
    }

    fn title(&self) -> &'static str {
        "Paired halves (Wilcoxon signed-rank)"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let values = typed.numeric_values();
        if values.len() < 2 * MIN_GROUP_SIZE {
            return Ok(not_enough(self, &raw.name, "a paired Wilcoxon test"));
        }
        let (first, second) = split_halves(&values);
        let pairs = first.len().min(second.len());
        if first[..pairs] == second[..pairs] {
            return Ok(DiagnosticRecord::pass(
                self.id(),
                &raw.name,
                "No difference between paired segments",
            )
            .with_value(1.0)
            .with_threshold(ALPHA));
        }
        let p = HypothesisRouter::new().paired(first, second)?;
        let significant = p.outcome.is_significant(ALPHA);
        Ok(DiagnosticRecord::new(self.id(), &raw.name, p.severity)
            .with_value(round_to(p.outcome.p_value, 6))
            .with_threshold(ALPHA)
            .with_message(format!(
                "Wilcoxon signed-rank: p={:.4} ({})",
                p.outcome.p_value,
                if significant {
                    "paired segments differ"
                } else {
                    "no significant difference"
                }
            ))
            .with_meta("test", "Wilcoxon signed-rank")
            .with_meta("statistic", round_to(p.outcome.statistic, 6))
            .with_meta("p_value", round_to(p.outcome.p_value, 6))
            .with_meta("n_pairs", p.pairs))
    }
}

/// Bartlett or Levene depending on the gate.
pub struct VarianceShift;

impl Check for VarianceShift {
    fn id(&self) -> &'static str {
        "VARIANCE_SHIFT"
    }

    fn title(&self) -> &'static str {
        "Variance shift between halves"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let values = typed.numeric_values();
        if values.len() < 2 * MIN_GROUP_SIZE {
            return Ok(not_enough(self, &raw.name, "a variance comparison"));
        }
        let (first, second) = split_halves(&values);
        let d = HypothesisRouter::new().compare_variances(first, second)?;
        let ratio = if d.effect.is_finite() {
            json!(round_to(d.effect, 4))
        } else {
            json!("inf")
        };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, d.severity)
            .with_passed(!d.is_significant())
            .with_value(round_to(d.outcome.p_value, 6))
            .with_threshold(ALPHA)
            .with_message(format!(
                "{}: p={:.4}, first half var={:.2}, second half var={:.2} (ratio {:.2})",
                d.test_name, d.outcome.p_value, d.summary_a, d.summary_b, d.effect
            ))
            .with_meta("test", d.test_name)
            .with_meta("route", d.route.as_str())
            .with_meta("statistic", round_to(d.outcome.statistic, 6))
            .with_meta("p_value", round_to(d.outcome.p_value, 6))
            .with_meta("var_first_half", round_to(d.summary_a, 4))
            .with_meta("var_second_half", round_to(d.summary_b, 4))
            .with_meta("var_ratio", ratio)
            .with_meta("normality_gate", serde_json::to_value(d.gates).unwrap_or(Value::Null)))
    }
}

pub struct KsGoodnessFit;

impl Check for KsGoodnessFit {
    fn id(&self) -> &'static str {
        "KS_GOODNESS_FIT"
    }

    fn title(&self) -> &'static str {
        "Fit to a normal distribution (Kolmogorov-Smirnov)"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let values = typed.numeric_values();
        if values.len() < MIN_GROUP_SIZE {
            return Ok(not_enough(self, &raw.name, "KS goodness-of-fit"));
        }
        let outcome = match HypothesisRouter::new().goodness_of_fit(&values) {
            Ok(o) => o,
            Err(StatsError::ZeroVariance(_)) => return Ok(no_spread(self, &raw.name)),
            Err(e) => return Err(e.into()),
        };
        let fits = outcome.p_value > ALPHA;
        let severity = if fits { Severity::Pass } else { Severity::Info };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(outcome.p_value, 6))
            .with_threshold(ALPHA)
            .with_message(format!(
                "KS goodness-of-fit (normal): p={:.4} ({})",
                outcome.p_value,
                if fits { "fits" } else { "does not fit" }
            ))
            .with_meta("statistic", round_to(outcome.statistic, 6))
            .with_meta("p_value", round_to(outcome.p_value, 6))
            .with_meta("fits_normal", fits))
    }
}

/// Augmented Dickey-Fuller on the series in row order.
pub struct AdfStationarity;

impl Check for AdfStationarity {
    fn id(&self) -> &'static str {
        "ADF_STATIONARITY"
    }

    fn title(&self) -> &'static str {
        "Stationarity (Augmented Dickey-Fuller)"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let values = typed.numeric_values();
        if values.len() < 30 {
            return Ok(not_enough(self, &raw.name, "an ADF test"));
        }
        let adf = HypothesisRouter::new().stationarity(&values)?;
        let is_stationary = adf.is_stationary(ALPHA);
        let severity = match (is_stationary, adf.p_value > 0.10) {
            (true, _) => Severity::Pass,
            (false, true) => Severity::Medium,
            (false, false) => Severity::Low,
        };
        let critical: serde_json::Map<String, Value> = adf
            .critical_values
            .iter()
            .map(|(level, v)| (level.to_string(), json!(round_to(*v, 4))))
            .collect();
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(adf.p_value, 6))
            .with_threshold(ALPHA)
            .with_message(format!(
                "ADF: stat={:.4}, p={:.4} ({})",
                adf.statistic,
                adf.p_value,
                if is_stationary {
                    "stationary"
                } else {
                    "not stationary, possible trend or unit root"
                }
            ))
            .with_meta("adf_statistic", round_to(adf.statistic, 6))
            .with_meta("p_value", round_to(adf.p_value, 6))
            .with_meta("used_lag", adf.used_lag)
            .with_meta("nobs", adf.nobs)
            .with_meta("critical_values", Value::Object(critical))
            .with_meta("is_stationary", is_stationary))
    }
}

/// Does this numeric column differ across the groups of a categorical column?
pub struct KruskalWallis;

impl Check for KruskalWallis {
    fn id(&self) -> &'static str {
        "KRUSKAL_WALLIS"
    }

    fn title(&self) -> &'static str {
        "Differences across categorical groups (Kruskal-Wallis)"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        if typed.numeric_values().len() < MIN_GROUP_SIZE {
            return Ok(not_enough(self, &raw.name, "Kruskal-Wallis"));
        }
        let groupings: Vec<&TypedColumn> = ctx
            .dataset
            .typed_columns()
            .iter()
            .filter(|c| c.name != raw.name && !c.is_numeric())
            .filter(|c| (2..=20).contains(&c.distinct_count()))
            .collect();
        if groupings.is_empty() {
            return Ok(DiagnosticRecord::pass(
                self.id(),
                &raw.name,
                "No categorical column with 2-20 groups to compare against",
            )
            .with_threshold(ALPHA));
        }

        let mut results = Vec::new();
        let mut samples = Vec::new();
        let mut significant = 0usize;
        for grouping in groupings.into_iter().take(MAX_KRUSKAL_GROUPINGS) {
            let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
            for row in 0..typed.len() {
                if let (Some(key), Some(x)) = (grouping.key_at(row), typed.numeric_at(row)) {
                    groups.entry(key).or_default().push(x);
                }
            }
            let kept: Vec<&[f64]> = groups
                .values()
                .filter(|g| g.len() >= MIN_KRUSKAL_GROUP)
                .map(Vec::as_slice)
                .collect();
            if kept.len() < 2 {
                continue;
            }
            let outcome = kruskal_wallis(&kept)?;
            let is_significant = outcome.is_significant(ALPHA);
            significant += usize::from(is_significant);
            samples.push(format!(
                "{}: H={:.4}, p={:.6}, {}",
                grouping.name,
                outcome.statistic,
                outcome.p_value,
                if is_significant { "SIG" } else { "NS" }
            ));
            results.push(json!({
                "grouping_col": grouping.name,
                "statistic": round_to(outcome.statistic, 4),
                "p_value": round_to(outcome.p_value, 6),
                "n_groups": kept.len(),
                "significant": is_significant,
            }));
        }

        let severity = if significant > 0 { Severity::Info } else { Severity::Pass };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_passed(true)
            .with_value(significant as f64)
            .with_threshold(ALPHA)
            .with_message(format!(
                "Kruskal-Wallis: {} significant grouping(s) out of {} evaluated",
                significant,
                results.len()
            ))
            .with_samples(samples)
            .with_meta("results", results))
    }
}

/// Chi-square independence against the other low-cardinality text columns.
pub struct Chi2Independence;

impl Check for Chi2Independence {
    fn id(&self) -> &'static str {
        "CHI2_INDEPENDENCE"
    }

    fn title(&self) -> &'static str {
        "Association with other categorical columns (chi-square)"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let others: Vec<&TypedColumn> = ctx
            .dataset
            .typed_columns()
            .iter()
            .filter(|c| c.name != raw.name && !c.is_numeric())
            .filter(|c| (2..50).contains(&c.distinct_count()))
            .collect();
        if others.is_empty() {
            return Ok(DiagnosticRecord::pass(
                self.id(),
                &raw.name,
                "No other categorical column to test independence against",
            )
            .with_threshold(ALPHA));
        }

        let own = keys_with_null(typed);
        let mut associations = Vec::new();
        let mut samples = Vec::new();
        let (mut significant, mut strong) = (0usize, 0usize);
        for other in others.into_iter().take(MAX_CHI2_PAIRS) {
            let table = contingency_table(&own, &keys_with_null(other));
            if table.len() < 2 || table.first().map_or(0, Vec::len) < 2 {
                continue;
            }
            let outcome = chi2_contingency(&table)?;
            let n: f64 = table.iter().flatten().sum();
            let min_dim = (table.len().min(table[0].len()) - 1) as f64;
            let v = (outcome.statistic / (n * min_dim)).sqrt().min(1.0);
            let is_significant = outcome.p_value < ALPHA;
            if is_significant {
                significant += 1;
                strong += usize::from(v > STRONG_ASSOCIATION);
            }
            let pair = format!("{} × {}", raw.name, other.name);
            samples.push(format!("{}: V={:.4}, p={:.6}", pair, v, outcome.p_value));
            associations.push(json!({
                "column_pair": pair,
                "chi2": round_to(outcome.statistic, 4),
                "p_value": round_to(outcome.p_value, 6),
                "dof": outcome.dof,
                "cramers_v": round_to(v, 4),
                "significant": is_significant,
            }));
        }

        let severity = if strong > 0 {
            Severity::Medium
        } else if significant > 0 {
            Severity::Low
        } else {
            Severity::Pass
        };
        let mut message = format!(
            "{} significant association(s) out of {} pairs evaluated",
            significant,
            associations.len()
        );
        if strong > 0 {
            message.push_str(&format!(" ({} strong with V>{})", strong, STRONG_ASSOCIATION));
        }
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(significant as f64)
            .with_threshold(ALPHA)
            .with_message(message)
            .with_samples(samples)
            .with_meta("associations", associations))
    }
}
