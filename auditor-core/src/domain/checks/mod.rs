// auditor-core/src/domain/checks/mod.rs

// Check bodies, grouped by the column family they target.
// A check is pure: (raw column, typed column, shared context) -> one record.

pub mod categorical;
pub mod context;
pub mod date;
pub mod distribution;
pub mod hypothesis;
pub mod id;
pub mod numeric;
pub mod text;
pub mod thresholds;
pub mod universal;

use miette::Diagnostic;
use thiserror::Error;

use crate::domain::model::{DiagnosticRecord, RawColumn, TypedColumn, is_missing_token};
use crate::domain::stats::StatsError;

pub use context::CheckContext;
pub use thresholds::{ThresholdOverrides, Tiers};

#[derive(Error, Debug, Diagnostic)]
pub enum CheckError {
    #[error("{0}")]
    #[diagnostic(code(auditor::check::statistics))]
    Statistics(#[from] StatsError),

    #[error("Column '{0}' not found in dataset")]
    #[diagnostic(code(auditor::check::missing_column))]
    MissingColumn(String),

    #[error("{0}")]
    #[diagnostic(code(auditor::check::computation))]
    Computation(String),

    #[error("Invalid input: {0}")]
    #[diagnostic(code(auditor::check::input))]
    InvalidInput(String),
}

impl CheckError {
    /// Variant name, reported in the synthetic record of a failed check.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Statistics(_) => "Statistics",
            Self::MissingColumn(_) => "MissingColumn",
            Self::Computation(_) => "Computation",
            Self::InvalidInput(_) => "InvalidInput",
        }
    }
}

/// Whether a check describes its column or the whole dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckScope {
    Column,
    /// Runs at most once per audit, whatever the number of columns registering it.
    Dataset,
}

pub trait Check: Send + Sync {
    /// Stable identifier, used by configuration and reports.
    fn id(&self) -> &'static str;

    /// Short human title.
    fn title(&self) -> &'static str;

    fn scope(&self) -> CheckScope {
        CheckScope::Column
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError>;
}

// --- Helpers partagés par les checks ---

pub(crate) fn fraction(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// `0.1234` -> `"12.3%"`.
pub(crate) fn percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Trimmed, non-empty raw cells with their row index.
pub(crate) fn non_empty_cells(raw: &RawColumn) -> Vec<(usize, &str)> {
    raw.values
        .iter()
        .enumerate()
        .map(|(i, v)| (i, v.trim()))
        .filter(|(_, v)| !v.is_empty())
        .collect()
}

/// Raw cells holding an actual value (neither empty nor a missing token), trimmed.
pub(crate) fn present_cells(raw: &RawColumn) -> Vec<(usize, &str)> {
    raw.values
        .iter()
        .enumerate()
        .filter(|(_, v)| !is_missing_token(v))
        .map(|(i, v)| (i, v.trim()))
        .collect()
}

/// Finite numeric values of the typed view with their row index.
pub(crate) fn numeric_cells(typed: &TypedColumn) -> Vec<(usize, f64)> {
    (0..typed.len())
        .filter_map(|i| typed.numeric_at(i).map(|x| (i, x)))
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::domain::model::{ColumnTypes, Dataset, coerce_column};

    /// Builds a one-column dataset and its column views.
    pub fn single(values: &[&str]) -> (Dataset, ColumnTypes) {
        let raw = RawColumn::from_strs("col", values);
        #[allow(clippy::unwrap_used)]
        let ds = Dataset::new(vec![raw.clone()], vec![coerce_column(&raw)]).unwrap();
        (ds, ColumnTypes::new())
    }

    pub fn numbers(values: &[f64]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    /// Runs one check on the first column of `ds`.
    #[allow(clippy::unwrap_used)]
    pub fn run_on(check: &dyn Check, ds: &Dataset, types: &ColumnTypes) -> DiagnosticRecord {
        let ctx = CheckContext::new(ds, types);
        let raw = &ds.raw_columns()[0];
        let typed = &ds.typed_columns()[0];
        check.run(raw, typed, &ctx).unwrap()
    }

    pub fn run_values(check: &dyn Check, values: &[&str]) -> DiagnosticRecord {
        let (ds, types) = single(values);
        run_on(check, &ds, &types)
    }

    pub fn run_strings(check: &dyn Check, values: &[String]) -> DiagnosticRecord {
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        run_values(check, &refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_error_kinds() {
        let err = CheckError::from(StatsError::SingularMatrix);
        assert_eq!(err.kind(), "Statistics");
        assert_eq!(CheckError::MissingColumn("x".into()).kind(), "MissingColumn");
        assert_eq!(err.to_string(), "singular design matrix in least squares");
    }

    #[test]
    fn test_cell_helpers() {
        let raw = RawColumn::from_strs("c", &[" a ", "", "NULL", "b"]);
        assert_eq!(non_empty_cells(&raw), vec![(0, "a"), (2, "NULL"), (3, "b")]);
        assert_eq!(present_cells(&raw), vec![(0, "a"), (3, "b")]);
        assert_eq!(percent(0.1234), "12.3%");
        assert_eq!(fraction(1, 0), 0.0);
    }
}
