// auditor-core/src/domain/checks/id.rs

use std::collections::HashMap;

use serde_json::{Map, Value, json};

use super::{Check, CheckContext, CheckError, fraction, non_empty_cells, percent};
use crate::domain::model::{DiagnosticRecord, RawColumn, Severity, TypedColumn, is_missing_token};
use crate::domain::stats::round_to;

const FORMAT_SAMPLE: usize = 1000;

/// Character-class shape of a value: letters become `A`, digits `9`, the rest is kept.
pub fn id_shape(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_alphabetic() {
                'A'
            } else if c.is_numeric() {
                '9'
            } else {
                c
            }
        })
        .collect()
}

pub struct IdDuplicates;

impl Check for IdDuplicates {
    fn id(&self) -> &'static str {
        "ID_DUPLICATES"
    }

    fn title(&self) -> &'static str {
        "Duplicated identifiers"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let keys: Vec<(usize, String)> = (0..typed.len())
            .filter_map(|i| typed.key_at(i).map(|k| (i, k)))
            .collect();
        if keys.is_empty() {
            return Ok(DiagnosticRecord::pass(self.id(), &raw.name, "No data").with_threshold(0.001));
        }
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for (_, k) in &keys {
            *counts.entry(k.as_str()).or_insert(0) += 1;
        }
        // every occurrence of a repeated id is affected
        let duplicated: Vec<usize> = keys
            .iter()
            .filter(|(_, k)| counts[k.as_str()] > 1)
            .map(|(i, _)| *i)
            .collect();
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let repeats: Vec<&str> = keys
            .iter()
            .filter(|(_, k)| {
                let n = seen.entry(k.as_str()).or_insert(0);
                *n += 1;
                *n > 1
            })
            .map(|(_, k)| k.as_str())
            .take(5)
            .collect();

        let pct = fraction(duplicated.len(), keys.len());
        let severity = if pct >= 0.01 {
            Severity::Critical
        } else if !duplicated.is_empty() {
            Severity::High
        } else {
            Severity::Pass
        };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(pct, 4))
            .with_threshold(0.001)
            .with_message(format!("{} duplicated IDs ({})", duplicated.len(), percent(pct)))
            .with_affected(duplicated.len(), pct)
            .with_samples(repeats)
            .with_flagged_rows(duplicated))
    }
}

/// Agreement of identifiers on one character-class shape.
pub struct IdFormatConsistency;

impl Check for IdFormatConsistency {
    fn id(&self) -> &'static str {
        "ID_FORMAT_CONSISTENCY"
    }

    fn title(&self) -> &'static str {
        "Inconsistent identifier formats"
    }

    fn run(
        &self,
        raw: &RawColumn,
        _typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let cells = non_empty_cells(raw);
        if cells.len() < 10 {
            return Ok(DiagnosticRecord::pass(self.id(), &raw.name, "Insufficient data"));
        }
        let sample: Vec<(&str, String)> = cells
            .into_iter()
            .take(FORMAT_SAMPLE)
            .map(|(_, v)| (v, id_shape(v)))
            .collect();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for (_, shape) in &sample {
            *counts.entry(shape.as_str()).or_insert(0) += 1;
        }
        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let n_patterns = ranked.len();
        let (dominant, dominant_count) = ranked[0];
        let dominant_pct = fraction(dominant_count, sample.len());
        let severity = if dominant_pct < 0.80 && n_patterns > 3 {
            Severity::High
        } else if dominant_pct < 0.90 {
            Severity::Medium
        } else if n_patterns > 2 {
            Severity::Low
        } else {
            Severity::Pass
        };

        let minority_samples: Vec<&str> = match ranked.get(1) {
            Some((minority, _)) => sample
                .iter()
                .filter(|(_, shape)| shape.as_str() == *minority)
                .map(|(v, _)| *v)
                .take(3)
                .collect(),
            None => Vec::new(),
        };
        let top: Map<String, Value> = ranked
            .iter()
            .take(5)
            .map(|(p, c)| (p.to_string(), json!(round_to(fraction(*c, sample.len()), 4))))
            .collect();

        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(dominant_pct, 4))
            .with_threshold(0.90)
            .with_message(format!(
                "{} format patterns detected (dominant: {})",
                n_patterns,
                percent(dominant_pct)
            ))
            .with_samples(minority_samples)
            .with_meta("n_patterns", n_patterns)
            .with_meta("dominant_pattern", dominant)
            .with_meta("dominant_pct", round_to(dominant_pct, 4))
            .with_meta("top_patterns", Value::Object(top)))
    }
}

pub struct IdNull;

impl Check for IdNull {
    fn id(&self) -> &'static str {
        "ID_NULL"
    }

    fn title(&self) -> &'static str {
        "Missing identifiers"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let nulls: Vec<usize> = raw
            .values
            .iter()
            .enumerate()
            .filter(|(i, v)| is_missing_token(v) || typed.is_null(*i))
            .map(|(i, _)| i)
            .collect();
        let pct = fraction(nulls.len(), raw.len());
        let severity = if nulls.is_empty() {
            Severity::Pass
        } else {
            Severity::Critical
        };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(pct, 4))
            .with_message(format!("{} null IDs ({})", nulls.len(), percent(pct)))
            .with_affected(nulls.len(), pct)
            .with_flagged_rows(nulls))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::checks::test_support::{run_strings, run_values};

    #[test]
    fn test_id_shape() {
        assert_eq!(id_shape("CUST-0042"), "AAAA-9999");
        assert_eq!(id_shape("ab_1"), "AA_9");
    }

    #[test]
    fn test_duplicates_keep_every_occurrence() {
        let r = run_values(&IdDuplicates, &["a1", "a2", "a1", "a3", ""]);
        assert_eq!(r.affected_count, 2);
        assert_eq!(r.severity, Severity::Critical);
        assert_eq!(r.flagged_rows(), vec![0, 2]);
        assert_eq!(r.sample_values, vec!["a1"]);
    }

    #[test]
    fn test_single_duplicate_in_large_column_is_high() {
        let mut ids: Vec<String> = (0..500).map(|i| format!("ID-{:05}", i)).collect();
        ids.push("ID-00007".into());
        let r = run_strings(&IdDuplicates, &ids);
        assert_eq!(r.severity, Severity::High);
    }

    #[test]
    fn test_format_consistency() {
        let mut ids: Vec<String> = (0..17).map(|i| format!("CUST-{:04}", i)).collect();
        ids.extend(["c42", "X-1", "999999"].map(String::from));
        let r = run_strings(&IdFormatConsistency, &ids);
        assert_eq!(r.metadata["n_patterns"], 4);
        assert_eq!(r.metadata["dominant_pattern"], "AAAA-9999");
        assert_eq!(r.severity, Severity::Medium);

        let uniform: Vec<String> = (0..20).map(|i| format!("CUST-{:04}", i)).collect();
        assert!(run_strings(&IdFormatConsistency, &uniform).passed);
    }

    #[test]
    fn test_any_null_id_is_critical() {
        let r = run_values(&IdNull, &["1", "2", "null", "4"]);
        assert_eq!(r.severity, Severity::Critical);
        assert_eq!(r.flagged_rows(), vec![2]);
    }
}
