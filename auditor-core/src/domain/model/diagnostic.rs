// auditor-core/src/domain/model/diagnostic.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::severity::Severity;

/// Reserved column name for dataset-wide findings.
pub const DATASET_SCOPE: &str = "__dataset__";

/// Metadata key under which checks expose 0-based row indices of offending rows.
pub const FLAGGED_INDICES_KEY: &str = "flagged_indices";

const MAX_FLAGGED_INDICES: usize = 100;

/// Outcome of one check invocation. Flat and serializable for report renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub check_id: String,
    pub column: String,
    pub passed: bool,
    pub severity: Severity,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
    #[serde(default)]
    pub affected_count: usize,
    #[serde(default)]
    pub affected_pct: f64,
    #[serde(default)]
    pub sample_values: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl DiagnosticRecord {
    /// `passed` follows the severity (only PASS passes) until told otherwise.
    pub fn new(check_id: impl Into<String>, column: impl Into<String>, severity: Severity) -> Self {
        Self {
            check_id: check_id.into(),
            column: column.into(),
            passed: severity.is_pass(),
            severity,
            value: 0.0,
            threshold: 0.0,
            message: String::new(),
            affected_count: 0,
            affected_pct: 0.0,
            sample_values: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Passing record for a check whose preconditions were not met.
    pub fn pass(
        check_id: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(check_id, column, Severity::Pass).with_message(message)
    }

    pub fn is_dataset_scope(&self) -> bool {
        self.column == DATASET_SCOPE
    }

    pub fn with_passed(mut self, passed: bool) -> Self {
        self.passed = passed;
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_affected(mut self, count: usize, pct: f64) -> Self {
        self.affected_count = count;
        self.affected_pct = pct;
        self
    }

    pub fn with_samples<I, S>(mut self, samples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.sample_values = samples.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Stores the first offending row indices for flagged-row collection.
    pub fn with_flagged_rows<I: IntoIterator<Item = usize>>(self, rows: I) -> Self {
        let rows: Vec<usize> = rows.into_iter().take(MAX_FLAGGED_INDICES).collect();
        if rows.is_empty() {
            return self;
        }
        self.with_meta(FLAGGED_INDICES_KEY, rows)
    }

    pub fn flagged_rows(&self) -> Vec<usize> {
        self.metadata
            .get(FLAGGED_INDICES_KEY)
            .and_then(Value::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(Value::as_u64)
                    .map(|v| v as usize)
                    .collect()
            })
            .unwrap_or_default()
    }
}
