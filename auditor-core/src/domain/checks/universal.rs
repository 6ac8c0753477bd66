// auditor-core/src/domain/checks/universal.rs

// Checks registered for every semantic type.

use std::collections::HashSet;

use super::{Check, CheckContext, CheckError, CheckScope, fraction, non_empty_cells, percent};
use crate::domain::model::{
    DATASET_SCOPE, DiagnosticRecord, RawColumn, Severity, TypedColumn, is_null_like,
};
use crate::domain::stats::round_to;

pub const NULL_RATE_TIERS: &[(Severity, f64)] = &[
    (Severity::Critical, 0.50),
    (Severity::High, 0.20),
    (Severity::Medium, 0.05),
    (Severity::Low, 0.01),
];

pub const DUPLICATE_TIERS: &[(Severity, f64)] = &[
    (Severity::Critical, 0.10),
    (Severity::High, 0.05),
    (Severity::Medium, 0.01),
];

const NEAR_CONSTANT_SHARE: f64 = 0.95;

pub struct NullRate;

impl Check for NullRate {
    fn id(&self) -> &'static str {
        "NULL_RATE"
    }

    fn title(&self) -> &'static str {
        "Missing or empty values"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let null_rows: Vec<usize> = raw
            .values
            .iter()
            .enumerate()
            .filter(|(i, v)| is_null_like(v) || typed.is_null(*i))
            .map(|(i, _)| i)
            .collect();
        let pct = fraction(null_rows.len(), raw.len());
        let tiers = ctx.tiers(self.id(), NULL_RATE_TIERS);
        let severity = tiers.classify(pct);

        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(pct, 4))
            .with_threshold(tiers.threshold_for(severity))
            .with_message(format!("{} null or null-like values", percent(pct)))
            .with_affected(null_rows.len(), pct)
            .with_samples(null_rows.iter().take(5).map(|&i| raw.values[i].clone()))
            .with_flagged_rows(null_rows))
    }
}

/// Fully duplicated raw rows (first occurrence kept). Dataset-wide.
pub struct DuplicateRows;

impl Check for DuplicateRows {
    fn id(&self) -> &'static str {
        "DUPLICATE_ROWS"
    }

    fn title(&self) -> &'static str {
        "Duplicated rows"
    }

    fn scope(&self) -> CheckScope {
        CheckScope::Dataset
    }

    fn run(
        &self,
        _raw: &RawColumn,
        _typed: &TypedColumn,
        ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let columns = ctx.dataset.raw_columns();
        let n = ctx.dataset.n_rows();
        let mut seen: HashSet<Vec<&str>> = HashSet::with_capacity(n);
        let dup_count = (0..n)
            .filter(|&row| {
                let key: Vec<&str> = columns.iter().map(|c| c.values[row].as_str()).collect();
                !seen.insert(key)
            })
            .count();
        let pct = fraction(dup_count, n);
        let tiers = ctx.tiers(self.id(), DUPLICATE_TIERS);
        let severity = tiers.classify(pct);

        Ok(DiagnosticRecord::new(self.id(), DATASET_SCOPE, severity)
            .with_value(round_to(pct, 4))
            .with_threshold(tiers.threshold_for(severity))
            .with_message(format!("{} duplicated rows ({})", dup_count, percent(pct)))
            .with_affected(dup_count, pct))
    }
}

pub struct WhitespaceIssues;

impl Check for WhitespaceIssues {
    fn id(&self) -> &'static str {
        "WHITESPACE_ISSUES"
    }

    fn title(&self) -> &'static str {
        "Leading or trailing whitespace"
    }

    fn run(
        &self,
        raw: &RawColumn,
        _typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let non_empty = non_empty_cells(raw);
        let affected: Vec<usize> = non_empty
            .iter()
            .filter(|(i, trimmed)| raw.values[*i].len() != trimmed.len())
            .map(|(i, _)| *i)
            .collect();
        let pct = fraction(affected.len(), non_empty.len());
        let severity = if pct > 0.10 {
            Severity::Medium
        } else if pct > 0.01 {
            Severity::Low
        } else if !affected.is_empty() {
            Severity::Info
        } else {
            Severity::Pass
        };

        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(pct, 4))
            .with_threshold(0.01)
            .with_message(format!(
                "{} values with leading/trailing whitespace ({})",
                affected.len(),
                percent(pct)
            ))
            .with_affected(affected.len(), pct)
            .with_samples(affected.iter().take(5).map(|&i| format!("{:?}", raw.values[i])))
            .with_flagged_rows(affected))
    }
}

pub struct ConstantColumn;

impl Check for ConstantColumn {
    fn id(&self) -> &'static str {
        "CONSTANT_COLUMN"
    }

    fn title(&self) -> &'static str {
        "Single-valued column"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let counts = typed.value_counts();
        let non_null: usize = counts.iter().map(|(_, c)| c).sum();

        match counts.as_slice() {
            [(only, _)] => Ok(DiagnosticRecord::new(self.id(), &raw.name, Severity::Low)
                .with_value(1.0)
                .with_threshold(1.0)
                .with_message(format!("Constant column: every value is '{}'", only))
                .with_affected(non_null, 1.0)
                .with_samples([only])),
            _ => Ok(DiagnosticRecord::new(self.id(), &raw.name, Severity::Pass)
                .with_value(counts.len() as f64)
                .with_threshold(1.0)
                .with_message(format!("Column has {} distinct values", counts.len()))),
        }
    }
}

pub struct NearConstant;

impl Check for NearConstant {
    fn id(&self) -> &'static str {
        "NEAR_CONSTANT"
    }

    fn title(&self) -> &'static str {
        "One value dominates the column"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let counts = typed.value_counts();
        let non_null: usize = counts.iter().map(|(_, c)| c).sum();
        let Some((top_value, top_count)) = counts.first() else {
            return Ok(DiagnosticRecord::pass(self.id(), &raw.name, "Empty column")
                .with_threshold(NEAR_CONSTANT_SHARE));
        };
        let top_pct = fraction(*top_count, non_null);

        if top_pct >= NEAR_CONSTANT_SHARE {
            return Ok(DiagnosticRecord::new(self.id(), &raw.name, Severity::Low)
                .with_value(round_to(top_pct, 4))
                .with_threshold(NEAR_CONSTANT_SHARE)
                .with_message(format!(
                    "Value '{}' accounts for {} of the rows",
                    top_value,
                    percent(top_pct)
                ))
                .with_affected(*top_count, top_pct)
                .with_samples([top_value]));
        }
        Ok(DiagnosticRecord::pass(
            self.id(),
            &raw.name,
            format!("Most frequent value accounts for {}", percent(top_pct)),
        )
        .with_value(round_to(top_pct, 4))
        .with_threshold(NEAR_CONSTANT_SHARE))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::checks::test_support::{run_on, run_strings, run_values};
    use crate::domain::model::{ColumnTypes, Dataset};

    #[test]
    fn test_null_rate_counts_null_like_tokens() {
        let mut values = vec!["1", "2", "unknown", "N/A", " - "];
        values.extend(["3"; 5]);
        let r = run_values(&NullRate, &values);
        // 3 of 10
        assert_eq!(r.value, 0.3);
        assert_eq!(r.severity, Severity::High);
        assert_eq!(r.threshold, 0.20);
        assert!(!r.passed);
        assert_eq!(r.flagged_rows(), vec![2, 3, 4]);
        assert_eq!(r.sample_values, vec!["unknown", "N/A", " - "]);
    }

    #[test]
    fn test_null_rate_passes_on_full_column() {
        let r = run_values(&NullRate, &["a", "b", "c"]);
        assert!(r.passed);
        assert_eq!(r.severity, Severity::Pass);
        assert!(r.flagged_rows().is_empty());
    }

    #[test]
    fn test_duplicate_rows_compare_whole_rows() {
        let ds = Dataset::from_raw(vec![
            RawColumn::from_strs("a", &["1", "1", "2", "1"]),
            RawColumn::from_strs("b", &["x", "x", "x", "y"]),
        ])
        .unwrap();
        let r = run_on(&DuplicateRows, &ds, &ColumnTypes::new());
        assert_eq!(r.column, DATASET_SCOPE);
        assert_eq!(r.affected_count, 1);
        assert_eq!(r.severity, Severity::Critical);
    }

    #[test]
    fn test_whitespace_tiers() {
        let mut values: Vec<String> = (0..100).map(|i| format!("v{}", i)).collect();
        values[3] = " padded".into();
        let r = run_strings(&WhitespaceIssues, &values);
        assert_eq!(r.severity, Severity::Info);
        assert!(!r.passed);
        assert_eq!(r.sample_values, vec!["\" padded\""]);

        values[4] = "tail ".into();
        values[5] = "\tboth\t".into();
        let r = run_strings(&WhitespaceIssues, &values);
        assert_eq!(r.severity, Severity::Low);
        assert_eq!(r.flagged_rows(), vec![3, 4, 5]);
    }

    #[test]
    fn test_constant_and_near_constant() {
        let r = run_values(&ConstantColumn, &["7", "7", "", "7"]);
        assert_eq!(r.severity, Severity::Low);
        assert_eq!(r.sample_values, vec!["7"]);
        assert_eq!(r.affected_count, 3);

        let r = run_values(&ConstantColumn, &["7", "8"]);
        assert!(r.passed);
        assert_eq!(r.value, 2.0);

        let mut values = vec!["a"; 19];
        values.push("b");
        let r = run_values(&NearConstant, &values);
        assert_eq!(r.severity, Severity::Low);
        assert_eq!(r.value, 0.95);

        let r = run_values(&NearConstant, &["a", "b", "a", "b"]);
        assert!(r.passed);
    }
}
