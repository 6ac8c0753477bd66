// auditor-core/src/domain/model/mod.rs

pub mod dataset;
pub mod diagnostic;
pub mod semantic_type;
pub mod severity;

pub use dataset::{
    Dataset, MISSING_TOKENS, NULL_LIKE_TOKENS, RawColumn, TypedColumn, TypedValues, coerce_column,
    format_number, is_missing_token, is_null_like,
};
pub use diagnostic::{DATASET_SCOPE, DiagnosticRecord, FLAGGED_INDICES_KEY};
pub use semantic_type::{ColumnTypes, SemanticType};
pub use severity::Severity;
