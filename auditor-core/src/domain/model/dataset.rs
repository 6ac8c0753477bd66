// auditor-core/src/domain/model/dataset.rs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::domain::error::DomainError;

/// Tokens turned into missing cells when the typed view is built.
pub const MISSING_TOKENS: &[&str] = &["", "na", "n/a", "nan", "null", "none", "#n/a", "<na>"];

pub fn is_missing_token(value: &str) -> bool {
    let lowered = value.trim().to_lowercase();
    MISSING_TOKENS.contains(&lowered.as_str())
}

/// Placeholder strings that stand for "no value" in hand-filled data (compared trimmed, lowercased).
pub const NULL_LIKE_TOKENS: &[&str] = &[
    "",
    "null",
    "none",
    "nan",
    "na",
    "n/a",
    "n.a.",
    "-",
    "--",
    "---",
    "missing",
    "unknown",
    "undefined",
    "?",
    "nil",
    "#n/a",
    "<na>",
    "not available",
    "not applicable",
    "sin dato",
    "sin información",
    "desconocido",
];

pub fn is_null_like(value: &str) -> bool {
    let lowered = value.trim().to_lowercase();
    NULL_LIKE_TOKENS.contains(&lowered.as_str())
}

/// Renders a float the way it would have been typed in a file (`3` rather than `3.0`).
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

// --- RAW VIEW ---

/// A column exactly as read: every cell is its original string form, missing cells are `""`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawColumn {
    pub name: String,
    pub values: Vec<String>,
}

impl RawColumn {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn from_strs(name: impl Into<String>, values: &[&str]) -> Self {
        Self::new(name, values.iter().map(|v| v.to_string()).collect())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// --- TYPED VIEW ---

#[derive(Debug, Clone, PartialEq)]
pub enum TypedValues {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

/// Best-effort coerced column. `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedColumn {
    pub name: String,
    pub values: TypedValues,
}

impl TypedColumn {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values: TypedValues::Numeric(values),
        }
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            values: TypedValues::Text(values),
        }
    }

    pub fn len(&self) -> usize {
        match &self.values {
            TypedValues::Numeric(v) => v.len(),
            TypedValues::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.values, TypedValues::Numeric(_))
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.values {
            TypedValues::Numeric(v) => Some(v),
            TypedValues::Text(_) => None,
        }
    }

    pub fn is_null(&self, row: usize) -> bool {
        match &self.values {
            TypedValues::Numeric(v) => v.get(row).is_none_or(|c| c.is_none()),
            TypedValues::Text(v) => v.get(row).is_none_or(|c| c.is_none()),
        }
    }

    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_null(i)).count()
    }

    pub fn null_fraction(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.null_count() as f64 / self.len() as f64
        }
    }

    /// Numeric value of a row. Text cells count when they parse as a finite number.
    pub fn numeric_at(&self, row: usize) -> Option<f64> {
        match &self.values {
            TypedValues::Numeric(v) => v.get(row).copied().flatten().filter(|x| x.is_finite()),
            TypedValues::Text(v) => v
                .get(row)
                .and_then(|c| c.as_deref())
                .and_then(|s| s.trim().parse::<f64>().ok())
                .filter(|x| x.is_finite()),
        }
    }

    /// Non-null numeric values in row order.
    pub fn numeric_values(&self) -> Vec<f64> {
        (0..self.len()).filter_map(|i| self.numeric_at(i)).collect()
    }

    /// String key of a non-null cell, used for grouping and counting.
    pub fn key_at(&self, row: usize) -> Option<String> {
        match &self.values {
            TypedValues::Numeric(v) => v.get(row).copied().flatten().map(format_number),
            TypedValues::Text(v) => v.get(row).cloned().flatten(),
        }
    }

    pub fn non_null_keys(&self) -> Vec<String> {
        (0..self.len()).filter_map(|i| self.key_at(i)).collect()
    }

    pub fn distinct_count(&self) -> usize {
        let mut keys = self.non_null_keys();
        keys.sort_unstable();
        keys.dedup();
        keys.len()
    }

    /// Counts per distinct non-null value, most frequent first (ties by value).
    pub fn value_counts(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for key in self.non_null_keys() {
            *counts.entry(key).or_insert(0) += 1;
        }
        let mut out: Vec<(String, usize)> = counts.into_iter().collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        out
    }
}

/// Builds the typed view of a raw column.
///
/// Missing tokens become `None`. The column is numeric when every remaining cell
/// parses as a finite number and at least one does, otherwise it stays text.
pub fn coerce_column(raw: &RawColumn) -> TypedColumn {
    let cells: Vec<Option<&str>> = raw
        .values
        .iter()
        .map(|v| {
            if is_missing_token(v) {
                None
            } else {
                Some(v.trim())
            }
        })
        .collect();

    let parsed: Vec<Option<Option<f64>>> = cells
        .iter()
        .map(|c| c.map(|s| s.parse::<f64>().ok().filter(|x| x.is_finite())))
        .collect();

    let has_value = cells.iter().any(Option::is_some);
    let all_numeric = parsed.iter().all(|p| !matches!(p, Some(None)));

    if has_value && all_numeric {
        TypedColumn::numeric(raw.name.clone(), parsed.into_iter().map(Option::flatten).collect())
    } else {
        TypedColumn::text(
            raw.name.clone(),
            cells.into_iter().map(|c| c.map(str::to_string)).collect(),
        )
    }
}

// --- DATASET ---

/// Two column-aligned views of one table plus the optional designated date column.
#[derive(Debug, Clone)]
pub struct Dataset {
    raw: Vec<RawColumn>,
    typed: Vec<TypedColumn>,
    date_column: Option<String>,
    n_rows: usize,
}

impl Dataset {
    pub fn new(raw: Vec<RawColumn>, typed: Vec<TypedColumn>) -> Result<Self, DomainError> {
        if raw.len() != typed.len() {
            return Err(DomainError::ColumnMismatch(format!(
                "{} raw columns vs {} typed columns",
                raw.len(),
                typed.len()
            )));
        }
        let n_rows = raw.first().map(RawColumn::len).unwrap_or(0);
        for (r, t) in raw.iter().zip(typed.iter()) {
            if r.name != t.name {
                return Err(DomainError::ColumnMismatch(format!(
                    "column '{}' is paired with '{}'",
                    r.name, t.name
                )));
            }
            if r.len() != n_rows || t.len() != n_rows {
                return Err(DomainError::ColumnMismatch(format!(
                    "column '{}' has {} raw / {} typed rows, expected {}",
                    r.name,
                    r.len(),
                    t.len(),
                    n_rows
                )));
            }
        }
        Ok(Self {
            raw,
            typed,
            date_column: None,
            n_rows,
        })
    }

    /// Builds the typed view with [`coerce_column`].
    pub fn from_raw(raw: Vec<RawColumn>) -> Result<Self, DomainError> {
        let typed = raw.iter().map(coerce_column).collect();
        Self::new(raw, typed)
    }

    pub fn with_date_column(mut self, name: impl Into<String>) -> Self {
        self.date_column = Some(name.into());
        self
    }

    pub fn date_column(&self) -> Option<&str> {
        self.date_column.as_deref()
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.raw.len()
    }

    pub fn raw_columns(&self) -> &[RawColumn] {
        &self.raw
    }

    pub fn typed_columns(&self) -> &[TypedColumn] {
        &self.typed
    }

    pub fn columns(&self) -> impl Iterator<Item = (&RawColumn, &TypedColumn)> {
        self.raw.iter().zip(self.typed.iter())
    }

    pub fn raw_column(&self, name: &str) -> Option<&RawColumn> {
        self.raw.iter().find(|c| c.name == name)
    }

    pub fn typed_column(&self, name: &str) -> Option<&TypedColumn> {
        self.typed.iter().find(|c| c.name == name)
    }

    /// Typed-view null fraction per column.
    pub fn null_fractions(&self) -> BTreeMap<String, f64> {
        self.typed
            .iter()
            .map(|c| (c.name.clone(), c.null_fraction()))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_numeric_with_missing_tokens() {
        let raw = RawColumn::from_strs("amount", &["1.5", " 2 ", "", "N/A", "nan"]);
        let typed = coerce_column(&raw);
        assert!(typed.is_numeric());
        assert_eq!(typed.numeric_values(), vec![1.5, 2.0]);
        assert_eq!(typed.null_count(), 3);
    }

    #[test]
    fn test_coerce_falls_back_to_text() {
        let raw = RawColumn::from_strs("code", &["1", "2", "A3"]);
        let typed = coerce_column(&raw);
        assert!(!typed.is_numeric());
        assert_eq!(typed.key_at(2).as_deref(), Some("A3"));
        // Text cells that look numeric are still usable numerically
        assert_eq!(typed.numeric_values(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_all_missing_column_is_text() {
        let typed = coerce_column(&RawColumn::from_strs("x", &["", "null"]));
        assert!(!typed.is_numeric());
        assert_eq!(typed.null_fraction(), 1.0);
    }

    #[test]
    fn test_value_counts_order() {
        let typed = coerce_column(&RawColumn::from_strs("c", &["b", "a", "b", "c", "a", "b"]));
        let counts = typed.value_counts();
        assert_eq!(counts[0], ("b".to_string(), 3));
        assert_eq!(counts[1], ("a".to_string(), 2));
        assert_eq!(typed.distinct_count(), 3);
    }

    #[test]
    fn test_dataset_rejects_misaligned_views() {
        let raw = vec![RawColumn::from_strs("a", &["1", "2"])];
        let typed = vec![TypedColumn::numeric("b", vec![Some(1.0), Some(2.0)])];
        assert!(matches!(
            Dataset::new(raw, typed),
            Err(DomainError::ColumnMismatch(_))
        ));

        let raw = vec![
            RawColumn::from_strs("a", &["1", "2"]),
            RawColumn::from_strs("b", &["1"]),
        ];
        assert!(Dataset::from_raw(raw).is_err());
    }

    #[test]
    fn test_null_fractions() {
        let ds = Dataset::from_raw(vec![
            RawColumn::from_strs("a", &["1", "", "3", "4"]),
            RawColumn::from_strs("b", &["x", "y", "z", "w"]),
        ])
        .unwrap();
        let fractions = ds.null_fractions();
        assert_eq!(fractions["a"], 0.25);
        assert_eq!(fractions["b"], 0.0);
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(2.5), "2.5");
    }
}
