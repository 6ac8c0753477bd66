// auditor-core/src/domain/dataset_checks/null_patterns.rs

// Is missingness random? Co-occurring nulls, mostly-empty rows, and numeric
// values that differ depending on whether another column is missing.

use serde_json::{Value, json};

use super::DatasetAnalysis;
use crate::domain::checks::{CheckContext, CheckError, fraction, percent};
use crate::domain::model::{DATASET_SCOPE, DiagnosticRecord, Severity, TypedColumn};
use crate::domain::stats::{mann_whitney_u, pearson, round_to};

const MIN_NULL_SHARE: f64 = 0.01;
const NULL_CORRELATION: f64 = 0.5;
const ROW_NULL_SHARE: f64 = 0.5;
const MIN_ROW_PATTERN_COLUMNS: usize = 3;
const MCAR_ALPHA: f64 = 0.01;
const MCAR_MIN_ROWS: usize = 30;
const MCAR_MIN_GROUP: usize = 5;
const MCAR_MAX_NULL_COLUMNS: usize = 5;

pub struct NullPatterns;

fn null_indicator(column: &TypedColumn) -> Vec<f64> {
    (0..column.len())
        .map(|i| if column.is_null(i) { 1.0 } else { 0.0 })
        .collect()
}

impl NullPatterns {
    fn null_correlation(columns: &[TypedColumn]) -> Option<DiagnosticRecord> {
        let candidates: Vec<(&TypedColumn, Vec<f64>)> = columns
            .iter()
            .filter(|c| c.null_fraction() > MIN_NULL_SHARE)
            .map(|c| (c, null_indicator(c)))
            .collect();
        if candidates.len() < 2 {
            return None;
        }

        let mut pairs = Vec::new();
        for (i, (a, na)) in candidates.iter().enumerate() {
            for (b, nb) in &candidates[i + 1..] {
                // A column missing everywhere has no spread: nothing to correlate.
                let Ok(c) = pearson(na, nb) else {
                    continue;
                };
                if c.r.abs() > NULL_CORRELATION && c.p_value < 0.05 {
                    pairs.push((
                        format!("{} × {}", a.name, b.name),
                        round_to(c.r, 4),
                        round_to(c.p_value, 6),
                    ));
                }
            }
        }
        if pairs.is_empty() {
            return None;
        }
        let details: Vec<Value> = pairs
            .iter()
            .map(|(pair, r, p)| json!({ "pair": pair, "correlation": r, "p_value": p }))
            .collect();
        Some(
            DiagnosticRecord::new("NULL_CORRELATION", DATASET_SCOPE, Severity::Medium)
                .with_value(pairs.len() as f64)
                .with_threshold(NULL_CORRELATION)
                .with_message(format!(
                    "{} column pair(s) whose nulls co-occur (possible MAR/MNAR)",
                    pairs.len()
                ))
                .with_samples(pairs.iter().take(5).map(|(pair, r, _)| format!("{}: r={}", pair, r)))
                .with_meta("correlated_pairs", details),
        )
    }

    fn null_row_pattern(columns: &[TypedColumn], n_rows: usize) -> Option<DiagnosticRecord> {
        let n_cols = columns.len();
        if n_cols < MIN_ROW_PATTERN_COLUMNS || n_rows == 0 {
            return None;
        }
        let patterns: Vec<Vec<bool>> = (0..n_rows)
            .map(|row| columns.iter().map(|c| c.is_null(row)).collect())
            .collect();
        let mostly_null = patterns
            .iter()
            .filter(|p| p.iter().filter(|n| **n).count() as f64 > n_cols as f64 * ROW_NULL_SHARE)
            .count();
        if mostly_null == 0 {
            return None;
        }
        let pct = fraction(mostly_null, n_rows);
        let severity = if pct > 0.10 {
            Severity::High
        } else if pct > 0.05 {
            Severity::Medium
        } else {
            Severity::Low
        };

        // Most frequent null patterns, first seen first on ties.
        let mut counts: Vec<(&Vec<bool>, usize)> = Vec::new();
        for p in &patterns {
            match counts.iter().position(|(q, _)| *q == p) {
                Some(i) => counts[i].1 += 1,
                None => counts.push((p, 1)),
            }
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        let top: Vec<(Vec<&str>, usize)> = counts
            .iter()
            .take(3)
            .filter(|(p, _)| p.iter().any(|n| *n))
            .map(|(p, count)| {
                let names = columns
                    .iter()
                    .zip(p.iter())
                    .filter(|(_, n)| **n)
                    .map(|(c, _)| c.name.as_str())
                    .collect();
                (names, *count)
            })
            .collect();

        Some(
            DiagnosticRecord::new("NULL_ROW_PATTERN", DATASET_SCOPE, severity)
                .with_value(round_to(pct, 4))
                .with_threshold(0.05)
                .with_message(format!(
                    "{} rows with more than half of their columns null ({})",
                    mostly_null,
                    percent(pct)
                ))
                .with_affected(mostly_null, pct)
                .with_samples(top.iter().map(|(names, count)| {
                    let shown: Vec<&str> = names.iter().take(5).copied().collect();
                    format!("Pattern: [{}] ({} rows)", shown.join(", "), count)
                }))
                .with_meta(
                    "top_patterns",
                    top.iter()
                        .map(|(names, count)| json!({ "cols_null": names, "count": count }))
                        .collect::<Vec<Value>>(),
                ),
        )
    }

    /// Approximation of Little's test: Mann-Whitney of every other numeric column,
    /// split by the missingness of one column.
    fn mcar_violations(columns: &[TypedColumn], n_rows: usize) -> Option<DiagnosticRecord> {
        let numeric: Vec<&TypedColumn> = columns.iter().filter(|c| c.is_numeric()).collect();
        let with_nulls: Vec<&TypedColumn> = numeric
            .iter()
            .copied()
            .filter(|c| c.null_count() > 0)
            .take(MCAR_MAX_NULL_COLUMNS)
            .collect();
        if with_nulls.is_empty() || n_rows < MCAR_MIN_ROWS {
            return None;
        }

        let mut violations = Vec::new();
        for missing in &with_nulls {
            let n_null = missing.null_count();
            if n_null < MCAR_MIN_GROUP || missing.len() - n_null < MCAR_MIN_GROUP {
                continue;
            }
            for other in numeric.iter().filter(|c| c.name != missing.name) {
                let (mut when_null, mut when_present) = (Vec::new(), Vec::new());
                for row in 0..other.len().min(missing.len()) {
                    if let Some(x) = other.numeric_at(row) {
                        if missing.is_null(row) {
                            when_null.push(x);
                        } else {
                            when_present.push(x);
                        }
                    }
                }
                if when_null.len() < MCAR_MIN_GROUP || when_present.len() < MCAR_MIN_GROUP {
                    continue;
                }
                let Ok(outcome) = mann_whitney_u(&when_null, &when_present) else {
                    continue;
                };
                if outcome.p_value < MCAR_ALPHA {
                    violations.push((missing.name.as_str(), other.name.as_str(), round_to(outcome.p_value, 6)));
                }
            }
        }
        if violations.is_empty() {
            return None;
        }
        let severity = if violations.len() > 3 {
            Severity::High
        } else {
            Severity::Medium
        };
        Some(
            DiagnosticRecord::new("MCAR_VIOLATION", DATASET_SCOPE, severity)
                .with_value(violations.len() as f64)
                .with_threshold(MCAR_ALPHA)
                .with_message(format!(
                    "{} MCAR violation(s): nulls are not completely at random (possible MAR/MNAR)",
                    violations.len()
                ))
                .with_samples(violations.iter().take(5).map(|(null_col, tested, p)| {
                    format!("Nulls in {} shift {} (p={})", null_col, tested, p)
                }))
                .with_meta(
                    "violations",
                    violations
                        .iter()
                        .map(|(null_col, tested, p)| {
                            json!({ "null_col": null_col, "tested_col": tested, "p_value": p })
                        })
                        .collect::<Vec<Value>>(),
                ),
        )
    }
}

impl DatasetAnalysis for NullPatterns {
    fn id(&self) -> &'static str {
        "NULL_PATTERNS"
    }

    fn record_ids(&self) -> &'static [&'static str] {
        &["NULL_CORRELATION", "NULL_ROW_PATTERN", "MCAR_VIOLATION"]
    }

    fn run(&self, ctx: &CheckContext<'_>) -> Result<Vec<DiagnosticRecord>, CheckError> {
        let columns = ctx.dataset.typed_columns();
        let n_rows = ctx.dataset.n_rows();
        Ok([
            Self::null_correlation(columns),
            Self::null_row_pattern(columns, n_rows),
            Self::mcar_violations(columns, n_rows),
        ]
        .into_iter()
        .flatten()
        .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::model::{ColumnTypes, Dataset, RawColumn};

    fn run(columns: Vec<RawColumn>) -> Vec<DiagnosticRecord> {
        let ds = Dataset::from_raw(columns).unwrap();
        let types = ColumnTypes::new();
        NullPatterns.run(&CheckContext::new(&ds, &types)).unwrap()
    }

    #[test]
    fn test_nulls_missing_together() {
        let n = 100;
        // Rows 0..20 lose a, b and c at once.
        let col = |name: &str, offset: usize| {
            RawColumn::new(
                name,
                (0..n)
                    .map(|i| if i < 20 { String::new() } else { (i + offset).to_string() })
                    .collect(),
            )
        };
        let records = run(vec![
            col("a", 0),
            col("b", 3),
            col("c", 7),
            RawColumn::new("d", (0..n).map(|i| (i % 9).to_string()).collect()),
        ]);

        let corr = records.iter().find(|r| r.check_id == "NULL_CORRELATION").unwrap();
        assert_eq!(corr.severity, Severity::Medium);
        assert_eq!(corr.value, 3.0);

        let rows = records.iter().find(|r| r.check_id == "NULL_ROW_PATTERN").unwrap();
        assert_eq!(rows.severity, Severity::High);
        assert_eq!(rows.affected_count, 20);
        assert_eq!(rows.sample_values[0], "Pattern: [a, b, c] (20 rows)");
    }

    #[test]
    fn test_missingness_tied_to_values_breaks_mcar() {
        let n = 80;
        // `income` is missing exactly where `age` is high.
        let age: Vec<String> = (0..n).map(|i| (20 + i).to_string()).collect();
        let income: Vec<String> = (0..n)
            .map(|i| if i >= 60 { String::new() } else { (1000 + i * 3).to_string() })
            .collect();
        let records = run(vec![RawColumn::new("age", age), RawColumn::new("income", income)]);

        let mcar = records.iter().find(|r| r.check_id == "MCAR_VIOLATION").unwrap();
        assert_eq!(mcar.severity, Severity::Medium);
        assert!(mcar.sample_values[0].starts_with("Nulls in income shift age"));
    }

    #[test]
    fn test_complete_dataset_is_quiet() {
        let records = run(vec![
            RawColumn::from_strs("a", &["1", "2", "3", "4"]),
            RawColumn::from_strs("b", &["x", "y", "z", "w"]),
            RawColumn::from_strs("c", &["5", "6", "7", "8"]),
        ]);
        assert!(records.is_empty());
    }
}
