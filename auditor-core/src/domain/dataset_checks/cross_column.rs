// auditor-core/src/domain/dataset_checks/cross_column.rs

// Correlations, multicollinearity and associations between columns.

use serde_json::{Map, Value, json};

use super::{DatasetAnalysis, numeric_columns};
use crate::domain::checks::hypothesis::{contingency_table, keys_with_null};
use crate::domain::checks::{CheckContext, CheckError};
use crate::domain::hypothesis::ALPHA;
use crate::domain::model::{DATASET_SCOPE, DiagnosticRecord, SemanticType, Severity, TypedColumn};
use crate::domain::stats::linalg::ols;
use crate::domain::stats::{cramers_v, pearson, round_to, spearman};

pub const HIGH_CORRELATION: f64 = 0.85;
const VERY_HIGH_CORRELATION: f64 = 0.95;
const VIF_MEDIUM: f64 = 5.0;
const VIF_HIGH: f64 = 10.0;
const VIF_MIN_ROWS: usize = 10;
const VIF_MAX_COLUMNS: usize = 50;
const STRONG_CRAMERS_V: f64 = 0.5;
const STRONG_POINT_BISERIAL: f64 = 0.5;
const POINT_BISERIAL_MIN_ROWS: usize = 10;

const TRUE_TOKENS: &[&str] = &["true", "t", "yes", "y", "si", "sí", "1", "verdadero"];
const FALSE_TOKENS: &[&str] = &["false", "f", "no", "n", "0", "falso"];

pub struct CrossColumn;

/// Rows where both columns hold a number.
fn complete_pairs(a: &TypedColumn, b: &TypedColumn) -> (Vec<f64>, Vec<f64>) {
    (0..a.len().min(b.len()))
        .filter_map(|i| Some((a.numeric_at(i)?, b.numeric_at(i)?)))
        .unzip()
}

fn pair_label(a: &str, b: &str) -> String {
    format!("{} × {}", a, b)
}

impl CrossColumn {
    fn correlation_matrix(numeric: &[&TypedColumn]) -> Option<DiagnosticRecord> {
        if numeric.len() < 2 {
            return None;
        }
        let mut matrix: Map<String, Value> = numeric
            .iter()
            .map(|c| (c.name.clone(), Value::Object(Map::new())))
            .collect();
        let mut set = |a: &str, b: &str, r: Option<f64>| {
            if let Some(Value::Object(row)) = matrix.get_mut(a) {
                row.insert(b.to_string(), json!(r.map(|r| round_to(r, 4))));
            }
        };

        let mut high = Vec::new();
        for (i, a) in numeric.iter().enumerate() {
            set(&a.name, &a.name, Some(1.0));
            for b in &numeric[i + 1..] {
                let (x, y) = complete_pairs(a, b);
                let r = pearson(&x, &y).ok().map(|c| c.r);
                set(&a.name, &b.name, r);
                set(&b.name, &a.name, r);
                let Some(r) = r.filter(|r| r.abs() > HIGH_CORRELATION) else {
                    continue;
                };
                let rho = spearman(&x, &y).ok().map(|c| round_to(c.r, 4));
                high.push((pair_label(&a.name, &b.name), round_to(r, 4), rho));
            }
        }
        if high.is_empty() {
            return None;
        }

        let severity = if high.iter().any(|(_, r, _)| r.abs() > VERY_HIGH_CORRELATION) {
            Severity::High
        } else {
            Severity::Medium
        };
        let pairs: Vec<Value> = high
            .iter()
            .map(|(pair, r, rho)| json!({ "pair": pair, "pearson_r": r, "spearman_rho": rho }))
            .collect();
        Some(
            DiagnosticRecord::new("HIGH_CORRELATION", DATASET_SCOPE, severity)
                .with_value(high.len() as f64)
                .with_threshold(HIGH_CORRELATION)
                .with_message(format!(
                    "{} column pair(s) with |r| > {}",
                    high.len(),
                    HIGH_CORRELATION
                ))
                .with_samples(high.iter().take(5).map(|(pair, r, _)| format!("{}: r={}", pair, r)))
                .with_meta("pairs", pairs)
                .with_meta("pearson_matrix", matrix),
        )
    }

    /// Variance inflation factor of each numeric column regressed on all the others.
    fn vif(numeric: &[&TypedColumn]) -> Option<DiagnosticRecord> {
        if numeric.len() < 2 || numeric.len() > VIF_MAX_COLUMNS {
            return None;
        }
        let n_rows = numeric.iter().map(|c| c.len()).min().unwrap_or(0);
        let rows: Vec<Vec<f64>> = (0..n_rows)
            .filter_map(|i| numeric.iter().map(|c| c.numeric_at(i)).collect())
            .collect();
        if rows.len() < VIF_MIN_ROWS {
            return None;
        }

        let mut vifs: Vec<(&str, f64)> = Vec::new();
        for (i, column) in numeric.iter().enumerate() {
            let y: Vec<f64> = rows.iter().map(|r| r[i]).collect();
            let x: Vec<Vec<f64>> = rows
                .iter()
                .map(|r| {
                    let mut design = vec![1.0];
                    design.extend(r.iter().enumerate().filter(|(j, _)| *j != i).map(|(_, v)| *v));
                    design
                })
                .collect();
            // Columns the solver cannot separate are left out, like a failed fit.
            let Ok(fit) = ols(&x, &y) else {
                continue;
            };
            let vif = if fit.r_squared < 1.0 {
                1.0 / (1.0 - fit.r_squared)
            } else {
                f64::INFINITY
            };
            vifs.push((column.name.as_str(), round_to(vif, 2)));
        }

        let mut high: Vec<(&str, f64)> = vifs.iter().copied().filter(|(_, v)| *v > VIF_MEDIUM).collect();
        if high.is_empty() {
            return None;
        }
        high.sort_by(|a, b| b.1.total_cmp(&a.1));
        let worst = high[0].1;
        let severity = if worst > VIF_HIGH {
            Severity::High
        } else {
            Severity::Medium
        };
        let display = |v: f64| {
            if v.is_finite() {
                json!(v)
            } else {
                json!("inf")
            }
        };
        let values: Map<String, Value> = vifs
            .iter()
            .map(|(name, v)| (name.to_string(), display(*v)))
            .collect();
        Some(
            DiagnosticRecord::new("MULTICOLLINEARITY_VIF", DATASET_SCOPE, severity)
                .with_value(worst)
                .with_threshold(VIF_MEDIUM)
                .with_message(format!(
                    "{} column(s) with VIF > {} (multicollinearity)",
                    high.len(),
                    VIF_MEDIUM
                ))
                .with_samples(high.iter().take(5).map(|(name, v)| format!("{}: VIF={}", name, v)))
                .with_meta("vif_values", values),
        )
    }

    fn categorical_association(ctx: &CheckContext<'_>) -> Option<DiagnosticRecord> {
        let categorical: Vec<&TypedColumn> = ctx
            .column_types
            .columns_where(|t| matches!(t, SemanticType::Categorical | SemanticType::Boolean))
            .into_iter()
            .filter_map(|name| ctx.dataset.typed_column(name))
            .collect();
        if categorical.len() < 2 {
            return None;
        }
        let keys: Vec<Vec<String>> = categorical.iter().map(|c| keys_with_null(c)).collect();

        let mut strong = Vec::new();
        for i in 0..categorical.len() {
            for j in i + 1..categorical.len() {
                let table = contingency_table(&keys[i], &keys[j]);
                if table.len() < 2 || table.first().is_none_or(|row| row.len() < 2) {
                    continue;
                }
                let Ok((v, p)) = cramers_v(&table) else {
                    continue;
                };
                if v > STRONG_CRAMERS_V && p < ALPHA {
                    strong.push((
                        pair_label(&categorical[i].name, &categorical[j].name),
                        round_to(v, 4),
                        round_to(p, 6),
                    ));
                }
            }
        }
        if strong.is_empty() {
            return None;
        }
        let pairs: Vec<Value> = strong
            .iter()
            .map(|(pair, v, p)| json!({ "pair": pair, "cramers_v": v, "p_value": p }))
            .collect();
        Some(
            DiagnosticRecord::new("CATEGORICAL_ASSOCIATION", DATASET_SCOPE, Severity::Medium)
                .with_value(strong.len() as f64)
                .with_threshold(STRONG_CRAMERS_V)
                .with_message(format!(
                    "{} categorical pair(s) with Cramér's V > {}",
                    strong.len(),
                    STRONG_CRAMERS_V
                ))
                .with_samples(strong.iter().take(5).map(|(pair, v, _)| format!("{}: V={}", pair, v)))
                .with_meta("pairs", pairs),
        )
    }

    fn point_biserial(ctx: &CheckContext<'_>, numeric: &[&TypedColumn]) -> Option<DiagnosticRecord> {
        let booleans = ctx
            .column_types
            .columns_where(|t| t == SemanticType::Boolean);
        if numeric.is_empty() || booleans.is_empty() {
            return None;
        }

        let mut strong = Vec::new();
        for name in booleans {
            let Some(raw) = ctx.dataset.raw_column(name) else {
                continue;
            };
            let binary: Vec<Option<f64>> = raw.values.iter().map(|v| as_binary(v)).collect();
            for column in numeric {
                let (b, x): (Vec<f64>, Vec<f64>) = binary
                    .iter()
                    .enumerate()
                    .filter_map(|(i, b)| Some(((*b)?, column.numeric_at(i)?)))
                    .unzip();
                if b.len() < POINT_BISERIAL_MIN_ROWS || b.iter().all(|v| *v == b[0]) {
                    continue;
                }
                // Point-biserial r is Pearson's r against the 0/1 indicator.
                let Ok(c) = pearson(&b, &x) else {
                    continue;
                };
                if c.r.abs() > STRONG_POINT_BISERIAL && c.p_value < ALPHA {
                    strong.push((
                        pair_label(&column.name, name),
                        round_to(c.r, 4),
                        round_to(c.p_value, 6),
                    ));
                }
            }
        }
        if strong.is_empty() {
            return None;
        }
        let associations: Vec<Value> = strong
            .iter()
            .map(|(pair, r, p)| json!({ "pair": pair, "r_pb": r, "p_value": p }))
            .collect();
        Some(
            DiagnosticRecord::new("POINT_BISERIAL", DATASET_SCOPE, Severity::Info)
                .with_passed(true)
                .with_value(strong.len() as f64)
                .with_threshold(STRONG_POINT_BISERIAL)
                .with_message(format!(
                    "{} significant point-biserial association(s) (|r| > {})",
                    strong.len(),
                    STRONG_POINT_BISERIAL
                ))
                .with_samples(strong.iter().take(5).map(|(pair, r, _)| format!("{}: r_pb={}", pair, r)))
                .with_meta("associations", associations),
        )
    }
}

fn as_binary(value: &str) -> Option<f64> {
    let token = value.trim().to_lowercase();
    if TRUE_TOKENS.contains(&token.as_str()) {
        Some(1.0)
    } else if FALSE_TOKENS.contains(&token.as_str()) {
        Some(0.0)
    } else {
        None
    }
}

impl DatasetAnalysis for CrossColumn {
    fn id(&self) -> &'static str {
        "CROSS_COLUMN"
    }

    fn record_ids(&self) -> &'static [&'static str] {
        &["HIGH_CORRELATION", "MULTICOLLINEARITY_VIF", "CATEGORICAL_ASSOCIATION", "POINT_BISERIAL"]
    }

    fn run(&self, ctx: &CheckContext<'_>) -> Result<Vec<DiagnosticRecord>, CheckError> {
        let numeric = numeric_columns(ctx);
        Ok([
            Self::correlation_matrix(&numeric),
            Self::vif(&numeric),
            Self::categorical_association(ctx),
            Self::point_biserial(ctx, &numeric),
        ]
        .into_iter()
        .flatten()
        .collect())
    }
}
