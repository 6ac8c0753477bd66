// auditor-core/src/application/flagged.rs

use serde::Serialize;

use crate::domain::model::{Dataset, DiagnosticRecord, Severity};

/// One offending cell reported by a failed check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedRow {
    /// 1-based, as shown to a spreadsheet user.
    pub row_number: usize,
    pub column: String,
    pub check_id: String,
    pub severity: Severity,
    /// Raw cell content.
    pub value: String,
    pub detail: String,
}

/// Rows named by failed column-scoped records, most severe first, then by row.
pub fn collect_flagged_rows(dataset: &Dataset, records: &[DiagnosticRecord]) -> Vec<FlaggedRow> {
    let mut rows: Vec<FlaggedRow> = records
        .iter()
        .filter(|r| !r.passed && !r.is_dataset_scope())
        .flat_map(|record| {
            let raw = dataset.raw_column(&record.column);
            record.flagged_rows().into_iter().map(move |row| FlaggedRow {
                row_number: row + 1,
                column: record.column.clone(),
                check_id: record.check_id.clone(),
                severity: record.severity,
                value: raw
                    .and_then(|c| c.values.get(row))
                    .cloned()
                    .unwrap_or_default(),
                detail: record.message.clone(),
            })
        })
        .collect();
    rows.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.row_number.cmp(&b.row_number)));
    rows
}
