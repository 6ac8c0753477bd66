// auditor-core/src/domain/dataset_checks/mod.rs

// Analyses that look at the dataset as a whole (several columns at once).
// They run after every per-column check, each one as a single fault-isolated unit.

pub mod cross_column;
pub mod null_patterns;
pub mod pii;
pub mod temporal_completeness;
pub mod timeseries;

use chrono::NaiveDateTime;

use crate::domain::checks::{CheckContext, CheckError};
use crate::domain::classifier::parse_date;
use crate::domain::model::{DiagnosticRecord, RawColumn, TypedColumn};

pub use cross_column::CrossColumn;
pub use null_patterns::NullPatterns;
pub use pii::{PiiDetection, PiiScanner};
pub use temporal_completeness::TemporalCompleteness;
pub use timeseries::Timeseries;

/// A group of dataset-level diagnostics sharing one failure boundary.
pub trait DatasetAnalysis: Send + Sync {
    /// Group identifier: used to disable the analysis and to tag its failure record.
    fn id(&self) -> &'static str;

    /// Check ids this analysis may put on its records.
    fn record_ids(&self) -> &'static [&'static str];

    /// Zero or more records, on `__dataset__` or on the column a finding is about.
    fn run(&self, ctx: &CheckContext<'_>) -> Result<Vec<DiagnosticRecord>, CheckError>;
}

/// Built-in analyses in execution order.
pub fn standard_analyses() -> Vec<Box<dyn DatasetAnalysis>> {
    vec![
        Box::new(CrossColumn),
        Box::new(NullPatterns),
        Box::new(Timeseries),
        Box::new(PiiDetection::default()),
        Box::new(TemporalCompleteness),
    ]
}

// --- Helpers partagés ---

/// Typed columns classified as numeric, in classification order.
pub(crate) fn numeric_columns<'a>(ctx: &CheckContext<'a>) -> Vec<&'a TypedColumn> {
    ctx.column_types
        .iter()
        .filter(|(_, t)| t.is_numeric())
        .filter_map(|(name, _)| ctx.dataset.typed_column(name))
        .collect()
}

/// Designated date column when it exists, else the first DATE/DATETIME column.
pub(crate) fn resolve_date_column<'a>(ctx: &CheckContext<'a>) -> Option<&'a RawColumn> {
    if let Some(column) = ctx.date_column().and_then(|name| ctx.dataset.raw_column(name)) {
        return Some(column);
    }
    ctx.column_types
        .iter()
        .find(|(_, t)| t.is_temporal())
        .and_then(|(name, _)| ctx.dataset.raw_column(name))
}

/// Parsed date of every row, `None` where the cell is not a date.
pub(crate) fn row_dates(raw: &RawColumn) -> Vec<Option<NaiveDateTime>> {
    raw.values
        .iter()
        .map(|v| parse_date(v).map(|m| m.value))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::classifier::SemanticTypeClassifier;
    use crate::domain::model::Dataset;

    #[test]
    fn test_date_column_falls_back_to_first_temporal_column() {
        let ds = Dataset::from_raw(vec![
            RawColumn::from_strs("amount", &["1", "2", "3", "4"]),
            RawColumn::from_strs("day", &["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04"]),
        ])
        .unwrap();
        let types = SemanticTypeClassifier::new().classify_dataset(&ds);
        let ctx = CheckContext::new(&ds, &types);
        assert_eq!(resolve_date_column(&ctx).map(|c| c.name.as_str()), Some("day"));

        let ds = ds.with_date_column("missing");
        let ctx = CheckContext::new(&ds, &types);
        assert_eq!(resolve_date_column(&ctx).map(|c| c.name.as_str()), Some("day"));
    }

    #[test]
    fn test_standard_analyses_order() {
        let ids: Vec<_> = standard_analyses().iter().map(|a| a.id()).collect();
        assert_eq!(
            ids,
            [
                "CROSS_COLUMN",
                "NULL_PATTERNS",
                "TIMESERIES",
                "PII_DETECTION",
                "TEMPORAL_COMPLETENESS"
            ]
        );
    }
}
