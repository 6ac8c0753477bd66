// auditor-core/src/application/executor.rs

// Runs the catalog over every column, then the dataset-level analyses.
// A failing check never stops the run: its error becomes an INFO record.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use tracing::{debug, info, instrument, warn};

use crate::domain::catalog::CheckCatalog;
use crate::domain::checks::{Check, CheckContext, CheckError, CheckScope};
use crate::domain::dataset_checks::{DatasetAnalysis, standard_analyses};
use crate::domain::model::{
    ColumnTypes, DATASET_SCOPE, Dataset, DiagnosticRecord, RawColumn, SemanticType, Severity,
    TypedColumn,
};
use crate::infrastructure::config::RunConfiguration;

const MAX_ERROR_MESSAGE: usize = 200;

/// State of a single `execute` call. Never outlives the run.
#[derive(Debug, Default)]
struct RunState {
    /// Dataset-scope checks already executed in this run.
    executed_dataset_checks: HashSet<&'static str>,
}

impl RunState {
    /// True the first time `check_id` is seen.
    fn claim(&mut self, check_id: &'static str) -> bool {
        self.executed_dataset_checks.insert(check_id)
    }
}

pub struct CheckExecutor<'c> {
    catalog: &'c CheckCatalog,
    analyses: Vec<Box<dyn DatasetAnalysis>>,
    config: RunConfiguration,
    now: Option<NaiveDateTime>,
}

impl CheckExecutor<'static> {
    /// Standard catalog and analyses.
    pub fn new(config: RunConfiguration) -> Self {
        CheckExecutor::with_catalog(CheckCatalog::standard(), config)
    }
}

impl<'c> CheckExecutor<'c> {
    pub fn with_catalog(catalog: &'c CheckCatalog, config: RunConfiguration) -> Self {
        Self {
            catalog,
            analyses: standard_analyses(),
            config,
            now: None,
        }
    }

    /// Replaces the dataset-level analyses (empty to skip them).
    pub fn with_analyses(mut self, analyses: Vec<Box<dyn DatasetAnalysis>>) -> Self {
        self.analyses = analyses;
        self
    }

    /// Pins the reference date of date checks.
    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = Some(now);
        self
    }

    pub fn config(&self) -> &RunConfiguration {
        &self.config
    }

    /// Records of every column (input order, catalog order within a column),
    /// followed by the records of the dataset-level analyses.
    #[instrument(skip_all, fields(rows = dataset.n_rows(), columns = dataset.n_columns()))]
    pub fn execute(&self, dataset: &Dataset, column_types: &ColumnTypes) -> Vec<DiagnosticRecord> {
        let mut ctx = CheckContext::new(dataset, column_types).with_thresholds(&self.config.thresholds);
        if let Some(now) = self.now {
            ctx = ctx.with_now(now);
        }
        let mut state = RunState::default();
        let mut records = Vec::new();

        for (raw, typed) in dataset.columns() {
            let semantic_type = column_types.get(&raw.name).unwrap_or(SemanticType::Mixed);
            debug!(column = %raw.name, semantic_type = %semantic_type, "Auditing column");
            for check in self.catalog.checks_for(semantic_type) {
                if self.config.is_disabled(check.id()) {
                    continue;
                }
                if check.scope() == CheckScope::Dataset && !state.claim(check.id()) {
                    continue;
                }
                let record = self.run_isolated(check.as_ref(), raw, typed, &ctx);
                records.push(self.apply_override(record));
            }
        }

        for analysis in &self.analyses {
            if self.config.is_disabled(analysis.id()) {
                continue;
            }
            match analysis.run(&ctx) {
                Ok(found) => {
                    debug!(analysis = analysis.id(), records = found.len(), "Dataset analysis done");
                    records.extend(found.into_iter().map(|r| self.apply_override(r)));
                }
                Err(err) => {
                    warn!(
                        check_id = analysis.id(),
                        column = DATASET_SCOPE,
                        kind = err.kind(),
                        message = %truncate(&err.to_string()),
                        "Dataset analysis failed"
                    );
                    records.push(error_record(analysis.id(), DATASET_SCOPE, &err));
                }
            }
        }

        let failed = records.iter().filter(|r| !r.passed).count();
        info!(records = records.len(), failed, "Audit checks complete");
        records
    }

    fn run_isolated(
        &self,
        check: &dyn Check,
        raw: &RawColumn,
        typed: &TypedColumn,
        ctx: &CheckContext<'_>,
    ) -> DiagnosticRecord {
        match check.run(raw, typed, ctx) {
            Ok(record) => record,
            Err(err) => {
                warn!(
                    check_id = check.id(),
                    column = %raw.name,
                    kind = err.kind(),
                    message = %truncate(&err.to_string()),
                    "Check failed, recorded as INFO"
                );
                let column = match check.scope() {
                    CheckScope::Column => raw.name.as_str(),
                    CheckScope::Dataset => DATASET_SCOPE,
                };
                error_record(check.id(), column, &err)
            }
        }
    }

    /// Configured severity of a failed record. Passing records are never touched.
    fn apply_override(&self, mut record: DiagnosticRecord) -> DiagnosticRecord {
        if record.passed {
            return record;
        }
        if let Some(severity) = self.config.severity_override(&record.check_id) {
            record.severity = severity;
        }
        record
    }
}

fn truncate(message: &str) -> String {
    message.chars().take(MAX_ERROR_MESSAGE).collect()
}

fn error_record(check_id: &str, column: &str, err: &CheckError) -> DiagnosticRecord {
    DiagnosticRecord::new(check_id, column, Severity::Info)
        .with_passed(true)
        .with_message(format!(
            "Error executing check: {}: {}",
            err.kind(),
            truncate(&err.to_string())
        ))
        .with_meta("error", true)
        .with_meta("error_type", err.kind())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::checks::universal::{DuplicateRows, NullRate};
    use crate::domain::model::Dataset;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Exploding;

    impl Check for Exploding {
        fn id(&self) -> &'static str {
            "EXPLODING"
        }
        fn title(&self) -> &'static str {
            "Always fails"
        }
        fn run(&self, _: &RawColumn, _: &TypedColumn, _: &CheckContext<'_>) -> Result<DiagnosticRecord, CheckError> {
            Err(CheckError::Computation("x".repeat(500)))
        }
    }

    /// Counts its runs; dataset scope.
    struct CountingDatasetCheck(Arc<AtomicUsize>);

    impl Check for CountingDatasetCheck {
        fn id(&self) -> &'static str {
            "COUNTING"
        }
        fn title(&self) -> &'static str {
            "Counting"
        }
        fn scope(&self) -> CheckScope {
            CheckScope::Dataset
        }
        fn run(&self, _: &RawColumn, _: &TypedColumn, _: &CheckContext<'_>) -> Result<DiagnosticRecord, CheckError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(DiagnosticRecord::pass(self.id(), DATASET_SCOPE, "ok"))
        }
    }

    struct BrokenAnalysis;

    impl DatasetAnalysis for BrokenAnalysis {
        fn id(&self) -> &'static str {
            "BROKEN"
        }
        fn record_ids(&self) -> &'static [&'static str] {
            &[]
        }
        fn run(&self, _: &CheckContext<'_>) -> Result<Vec<DiagnosticRecord>, CheckError> {
            Err(CheckError::InvalidInput("no rows".into()))
        }
    }

    fn two_columns() -> (Dataset, ColumnTypes) {
        let ds = Dataset::from_raw(vec![
            RawColumn::from_strs("a", &["1", "", "3", "3"]),
            RawColumn::from_strs("b", &["x", "y", "", "y"]),
        ])
        .unwrap();
        let types: ColumnTypes = [
            ("a".to_string(), SemanticType::NumericContinuous),
            ("b".to_string(), SemanticType::Categorical),
        ]
        .into_iter()
        .collect();
        (ds, types)
    }

    #[test]
    fn test_failing_check_becomes_info_record() {
        let (ds, types) = two_columns();
        let catalog = CheckCatalog::new(vec![Arc::new(Exploding), Arc::new(NullRate)]);
        let records = CheckExecutor::with_catalog(&catalog, RunConfiguration::default())
            .with_analyses(vec![])
            .execute(&ds, &types);

        assert_eq!(records.len(), 4);
        let failed = &records[0];
        assert_eq!(failed.check_id, "EXPLODING");
        assert_eq!(failed.column, "a");
        assert_eq!(failed.severity, Severity::Info);
        assert!(failed.passed);
        assert_eq!(failed.metadata["error"], true);
        assert_eq!(failed.metadata["error_type"], "Computation");
        assert!(failed.message.starts_with("Error executing check: Computation: "));
        assert_eq!(failed.message.len(), "Error executing check: Computation: ".len() + 200);
        assert_eq!(records[1].check_id, "NULL_RATE");
    }

    #[test]
    fn test_dataset_check_runs_once_per_run() {
        let (ds, types) = two_columns();
        let runs = Arc::new(AtomicUsize::new(0));
        let catalog = CheckCatalog::new(vec![Arc::new(CountingDatasetCheck(runs.clone()))]);
        let executor = CheckExecutor::with_catalog(&catalog, RunConfiguration::default()).with_analyses(vec![]);

        assert_eq!(executor.execute(&ds, &types).len(), 1);
        // A second run on the same executor starts from fresh state.
        assert_eq!(executor.execute(&ds, &types).len(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_disabled_checks_and_analyses_are_skipped() {
        let (ds, types) = two_columns();
        let catalog = CheckCatalog::new(vec![Arc::new(NullRate), Arc::new(DuplicateRows)]);
        let config = RunConfiguration {
            disabled_checks: ["NULL_RATE".to_string(), "BROKEN".to_string()].into(),
            ..RunConfiguration::default()
        };
        let records = CheckExecutor::with_catalog(&catalog, config)
            .with_analyses(vec![Box::new(BrokenAnalysis)])
            .execute(&ds, &types);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].check_id, "DUPLICATE_ROWS");
        assert_eq!(records[0].column, DATASET_SCOPE);
    }

    #[test]
    fn test_failing_analysis_is_isolated() {
        let (ds, types) = two_columns();
        let catalog = CheckCatalog::new(vec![Arc::new(NullRate)]);
        let records = CheckExecutor::with_catalog(&catalog, RunConfiguration::default())
            .with_analyses(vec![Box::new(BrokenAnalysis)])
            .execute(&ds, &types);

        assert_eq!(records.len(), 3);
        let last = records.last().unwrap();
        assert_eq!(last.check_id, "BROKEN");
        assert_eq!(last.column, DATASET_SCOPE);
        assert_eq!(last.severity, Severity::Info);
        assert_eq!(last.metadata["error_type"], "InvalidInput");
    }

    #[test]
    fn test_override_applies_to_failed_records_only() {
        let (ds, types) = two_columns();
        let catalog = CheckCatalog::new(vec![Arc::new(NullRate), Arc::new(DuplicateRows)]);
        let config = RunConfiguration {
            severity_overrides: [
                ("NULL_RATE".to_string(), Severity::Low),
                ("DUPLICATE_ROWS".to_string(), Severity::Critical),
            ]
            .into(),
            ..RunConfiguration::default()
        };
        let records = CheckExecutor::with_catalog(&catalog, config)
            .with_analyses(vec![])
            .execute(&ds, &types);

        // 25% nulls in both columns: failed, downgraded to LOW.
        let nulls: Vec<_> = records.iter().filter(|r| r.check_id == "NULL_RATE").collect();
        assert_eq!(nulls.len(), 2);
        assert!(nulls.iter().all(|r| !r.passed && r.severity == Severity::Low));
        // No duplicated rows: stays PASS despite the override.
        let dups = records.iter().find(|r| r.check_id == "DUPLICATE_ROWS").unwrap();
        assert!(dups.passed);
        assert_eq!(dups.severity, Severity::Pass);
    }

    #[test]
    fn test_unclassified_column_gets_universal_checks() {
        let (ds, _) = two_columns();
        let catalog = CheckCatalog::new(vec![Arc::new(NullRate)])
            .with_family(SemanticType::NumericContinuous, vec![Arc::new(Exploding)]);
        let records = CheckExecutor::with_catalog(&catalog, RunConfiguration::default())
            .with_analyses(vec![])
            .execute(&ds, &ColumnTypes::new());
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.check_id == "NULL_RATE"));
    }
}
