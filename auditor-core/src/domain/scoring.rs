// auditor-core/src/domain/scoring.rs

// Health score per column and for the whole dataset.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::model::{DATASET_SCOPE, DiagnosticRecord, Severity};
use crate::domain::stats::round_to;

const PERFECT: f64 = 100.0;

/// Letter grade of a 0-100 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 90.0 => Self::A,
            s if s >= 75.0 => Self::B,
            s if s >= 60.0 => Self::C,
            s if s >= 40.0 => Self::D,
            _ => Self::F,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnScore {
    pub column: String,
    pub score: f64,
    pub grade: Grade,
    pub checks_run: usize,
    pub checks_failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreReport {
    /// One entry per column seen in the records, in first-seen order.
    /// Includes `__dataset__` when dataset-level records exist.
    pub columns: Vec<ColumnScore>,
    pub dataset_score: f64,
    pub dataset_grade: Grade,
    /// Failed records per severity (PASS excluded).
    pub issues_by_severity: BTreeMap<Severity, usize>,
    pub total_issues: usize,
}

impl ScoreReport {
    pub fn column(&self, name: &str) -> Option<&ColumnScore> {
        self.columns.iter().find(|c| c.column == name)
    }
}

/// Turns diagnostic records into scores. Stateless once configured.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringAggregator {
    deductions: BTreeMap<Severity, f64>,
    column_weights: BTreeMap<String, f64>,
}

impl Default for ScoringAggregator {
    fn default() -> Self {
        Self {
            deductions: Severity::ALL
                .iter()
                .map(|s| (*s, s.default_deduction()))
                .collect(),
            column_weights: BTreeMap::new(),
        }
    }
}

impl ScoringAggregator {
    /// Configured deductions replace the defaults of their severity only.
    pub fn new(deductions: &BTreeMap<Severity, f64>, column_weights: &BTreeMap<String, f64>) -> Self {
        let mut aggregator = Self::default();
        aggregator.deductions.extend(deductions.iter().map(|(s, d)| (*s, *d)));
        aggregator.column_weights = column_weights.clone();
        aggregator
    }

    pub fn deduction(&self, severity: Severity) -> f64 {
        self.deductions.get(&severity).copied().unwrap_or(0.0)
    }

    /// 100 minus the deduction of every failed record, floored at 0.
    pub fn column_score<'a, I>(&self, records: I) -> f64
    where
        I: IntoIterator<Item = &'a DiagnosticRecord>,
    {
        let lost: f64 = records
            .into_iter()
            .filter(|r| !r.passed)
            .map(|r| self.deduction(r.severity))
            .sum();
        (PERFECT - lost).clamp(0.0, PERFECT)
    }

    /// Explicit weight when configured, else `1 / (1 + null_fraction)`.
    pub fn weight(&self, column: &str, null_fraction: f64) -> f64 {
        self.column_weights
            .get(column)
            .copied()
            .unwrap_or_else(|| 1.0 / (1.0 + null_fraction))
    }

    pub fn score(&self, records: &[DiagnosticRecord], null_fractions: &BTreeMap<String, f64>) -> ScoreReport {
        let mut grouped: Vec<(&str, Vec<&DiagnosticRecord>)> = Vec::new();
        for record in records {
            match grouped.iter().position(|(c, _)| *c == record.column) {
                Some(i) => grouped[i].1.push(record),
                None => grouped.push((record.column.as_str(), vec![record])),
            }
        }

        let columns: Vec<ColumnScore> = grouped
            .iter()
            .map(|(column, recs)| {
                let score = round_to(self.column_score(recs.iter().copied()), 1);
                ColumnScore {
                    column: column.to_string(),
                    score,
                    grade: Grade::from_score(score),
                    checks_run: recs.len(),
                    checks_failed: recs.iter().filter(|r| !r.passed).count(),
                }
            })
            .collect();

        let (weighted, total_weight) = columns
            .iter()
            .filter(|c| c.column != DATASET_SCOPE)
            .map(|c| {
                let w = self.weight(&c.column, null_fractions.get(&c.column).copied().unwrap_or(0.0));
                (c.score * w, w)
            })
            .fold((0.0, 0.0), |(s, t), (x, w)| (s + x, t + w));
        let dataset_score = if total_weight > 0.0 {
            round_to((weighted / total_weight).clamp(0.0, PERFECT), 1)
        } else {
            0.0
        };

        let mut issues_by_severity: BTreeMap<Severity, usize> = Severity::ALL
            .iter()
            .filter(|s| !s.is_pass())
            .map(|s| (*s, 0))
            .collect();
        for record in records.iter().filter(|r| !r.passed && !r.severity.is_pass()) {
            *issues_by_severity.entry(record.severity).or_insert(0) += 1;
        }
        let total_issues = issues_by_severity.values().sum();

        ScoreReport {
            columns,
            dataset_score,
            dataset_grade: Grade::from_score(dataset_score),
            issues_by_severity,
            total_issues,
        }
    }
}
