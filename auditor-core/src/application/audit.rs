// auditor-core/src/application/audit.rs

use std::path::Path;

use serde::Serialize;
use tracing::{info, instrument};

use crate::application::executor::CheckExecutor;
use crate::application::flagged::{FlaggedRow, collect_flagged_rows};
use crate::domain::classifier::SemanticTypeClassifier;
use crate::domain::model::{ColumnTypes, Dataset, DiagnosticRecord};
use crate::domain::scoring::{ScoreReport, ScoringAggregator};
use crate::error::AuditError;
use crate::infrastructure::config::{RunConfiguration, load_run_config};

/// Everything one audit produces.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub column_types: ColumnTypes,
    pub records: Vec<DiagnosticRecord>,
    pub score: ScoreReport,
    pub flagged_rows: Vec<FlaggedRow>,
}

impl AuditReport {
    pub fn records_for<'a>(&'a self, check_id: &'a str) -> impl Iterator<Item = &'a DiagnosticRecord> {
        self.records.iter().filter(move |r| r.check_id == check_id)
    }
}

/// Classify, execute, score. The configuration is already validated.
#[instrument(skip_all, fields(rows = dataset.n_rows(), columns = dataset.n_columns()))]
pub fn run_audit(dataset: &Dataset, config: &RunConfiguration) -> AuditReport {
    run_with(CheckExecutor::new(config.clone()), dataset)
}

/// Loads and validates the configuration file, then audits.
/// A configuration error stops here, before any check runs.
#[instrument(skip_all, fields(config = %config_path.display()))]
pub fn audit_with_config_file(dataset: &Dataset, config_path: &Path) -> Result<AuditReport, AuditError> {
    let config = load_run_config(config_path)?;
    Ok(run_audit(dataset, &config))
}

/// Same as [`run_audit`] with a prepared executor (custom catalog, pinned date).
pub fn run_with(executor: CheckExecutor<'_>, dataset: &Dataset) -> AuditReport {
    let column_types = SemanticTypeClassifier::new().classify_dataset(dataset);
    let records = executor.execute(dataset, &column_types);

    let config = executor.config();
    let aggregator = ScoringAggregator::new(&config.deductions, &config.column_weights);
    let score = aggregator.score(&records, &dataset.null_fractions());
    let flagged_rows = collect_flagged_rows(dataset, &records);

    info!(
        score = score.dataset_score,
        grade = %score.dataset_grade,
        issues = score.total_issues,
        "Audit finished"
    );
    AuditReport {
        column_types,
        records,
        score,
        flagged_rows,
    }
}
