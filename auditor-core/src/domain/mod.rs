// auditor-core/src/domain/mod.rs

pub mod catalog;
pub mod checks;
pub mod classifier;
pub mod dataset_checks;
pub mod error;
pub mod hypothesis;
pub mod model;
pub mod patterns;
pub mod scoring;
pub mod stats;

// Re-exports pratiques pour simplifier les imports ailleurs
pub use catalog::CheckCatalog;
pub use classifier::SemanticTypeClassifier;
pub use error::DomainError;
pub use hypothesis::HypothesisRouter;
pub use model::{ColumnTypes, Dataset, DiagnosticRecord, RawColumn, SemanticType, Severity, TypedColumn};
pub use scoring::{ColumnScore, Grade, ScoreReport, ScoringAggregator};
