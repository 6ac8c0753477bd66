// auditor-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, PartialEq)]
pub enum DomainError {
    #[error("Invalid severity '{0}'")]
    #[diagnostic(
        code(auditor::domain::severity),
        help("Expected one of: CRITICAL, HIGH, MEDIUM, LOW, INFO, PASS.")
    )]
    InvalidSeverity(String),

    #[error("Unknown semantic type '{0}'")]
    #[diagnostic(code(auditor::domain::semantic_type))]
    UnknownSemanticType(String),

    #[error("Invalid threshold for check '{check_id}': {reason}")]
    #[diagnostic(
        code(auditor::domain::threshold),
        help("Thresholds are finite numbers keyed by severity name.")
    )]
    InvalidThreshold { check_id: String, reason: String },

    #[error("Invalid scoring deduction for '{severity}': {value}")]
    #[diagnostic(
        code(auditor::domain::scoring),
        help("Deductions must be finite numbers >= 0.")
    )]
    InvalidDeduction { severity: String, value: f64 },

    #[error("Invalid weight for column '{column}': {value}")]
    #[diagnostic(
        code(auditor::domain::weight),
        help("Column weights must be finite numbers >= 0.")
    )]
    InvalidWeight { column: String, value: f64 },

    #[error("Raw and typed views are not aligned: {0}")]
    #[diagnostic(
        code(auditor::domain::column_mismatch),
        help("Both views must list the same columns, in the same order, with the same row count.")
    )]
    ColumnMismatch(String),
}
