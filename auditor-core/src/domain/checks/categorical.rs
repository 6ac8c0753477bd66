// auditor-core/src/domain/checks/categorical.rs

// Checks for CATEGORICAL and BOOLEAN columns.

use std::collections::HashMap;

use rapidfuzz::fuzz;
use serde_json::{Map, Value, json};

use super::{Check, CheckContext, CheckError, fraction, non_empty_cells, percent};
use crate::domain::model::{DiagnosticRecord, RawColumn, Severity, TypedColumn};
use crate::domain::patterns;
use crate::domain::stats::round_to;

const RARE_SHARE: f64 = 0.005;
const TYPO_SIMILARITY: f64 = 0.85;
const TYPO_MAX_CATEGORIES: usize = 200;

fn no_data(check: &dyn Check, column: &str, threshold: f64) -> DiagnosticRecord {
    DiagnosticRecord::pass(check.id(), column, "No data").with_threshold(threshold)
}

/// Normalised Indel similarity of the lowercased strings, in [0, 1].
pub fn typo_similarity(a: &str, b: &str) -> f64 {
    fuzz::ratio(a.to_lowercase().chars(), b.to_lowercase().chars())
}

pub struct RareCategories;

impl Check for RareCategories {
    fn id(&self) -> &'static str {
        "RARE_CATEGORIES"
    }

    fn title(&self) -> &'static str {
        "Rare categories (under 0.5%)"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let counts = typed.value_counts();
        let total: usize = counts.iter().map(|(_, c)| c).sum();
        if total == 0 {
            return Ok(no_data(self, &raw.name, RARE_SHARE));
        }
        let rare: Vec<&(String, usize)> = counts
            .iter()
            .filter(|(_, c)| fraction(*c, total) < RARE_SHARE)
            .collect();
        let severity = match rare.len() {
            0 => Severity::Pass,
            n if n > 10 => Severity::Medium,
            _ => Severity::Low,
        };
        let rare_rows: usize = rare.iter().map(|(_, c)| c).sum();
        let pct = fraction(rare_rows, total);
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(rare.len() as f64)
            .with_threshold(RARE_SHARE)
            .with_message(format!("{} rare categories (frequency < 0.5%)", rare.len()))
            .with_affected(rare_rows, pct)
            .with_samples(rare.iter().take(5).map(|(v, _)| v)))
    }
}

/// Monitoring summary, never a finding.
pub struct CardinalityChange;

impl Check for CardinalityChange {
    fn id(&self) -> &'static str {
        "CARDINALITY_CHANGE"
    }

    fn title(&self) -> &'static str {
        "Cardinality summary"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let n = typed.len() - typed.null_count();
        let n_unique = typed.distinct_count();
        let ratio = fraction(n_unique, n);
        Ok(DiagnosticRecord::new(self.id(), &raw.name, Severity::Info)
            .with_passed(true)
            .with_value(n_unique as f64)
            .with_message(format!(
                "{} distinct categories (ratio: {:.2}%)",
                n_unique,
                ratio * 100.0
            ))
            .with_meta("n_unique", n_unique)
            .with_meta("cardinality_ratio", round_to(ratio, 4)))
    }
}

/// Same category written with different capitalisation.
pub struct CaseInconsistency;

impl Check for CaseInconsistency {
    fn id(&self) -> &'static str {
        "CASE_INCONSISTENCY"
    }

    fn title(&self) -> &'static str {
        "Inconsistent capitalisation"
    }

    fn run(
        &self,
        raw: &RawColumn,
        _typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let cells = non_empty_cells(raw);
        if cells.is_empty() {
            return Ok(no_data(self, &raw.name, 0.0));
        }
        // lowercase key -> distinct spellings, both in first-seen order
        let mut groups: Vec<(String, Vec<&str>)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for (_, value) in cells {
            let key = value.to_lowercase();
            match index.get(&key) {
                Some(&g) => {
                    if !groups[g].1.contains(&value) {
                        groups[g].1.push(value);
                    }
                }
                None => {
                    index.insert(key.clone(), groups.len());
                    groups.push((key, vec![value]));
                }
            }
        }
        let inconsistent: Vec<&(String, Vec<&str>)> =
            groups.iter().filter(|(_, v)| v.len() > 1).collect();
        let severity = match inconsistent.len() {
            0 => Severity::Pass,
            n if n > 5 => Severity::Medium,
            _ => Severity::Low,
        };
        let details: Map<String, Value> = inconsistent
            .iter()
            .take(5)
            .map(|(k, v)| (k.clone(), json!(v)))
            .collect();
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(inconsistent.len() as f64)
            .with_message(format!(
                "{} group(s) with inconsistent capitalisation",
                inconsistent.len()
            ))
            .with_samples(inconsistent.iter().take(3).map(|(_, v)| v.join(" / ")))
            .with_meta("inconsistent_groups", Value::Object(details)))
    }
}

pub struct EncodingAnomaly;

impl Check for EncodingAnomaly {
    fn id(&self) -> &'static str {
        "ENCODING_ANOMALY"
    }

    fn title(&self) -> &'static str {
        "Control characters or broken encoding"
    }

    fn run(
        &self,
        raw: &RawColumn,
        _typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let cells = non_empty_cells(raw);
        let anomaly = patterns::encoding_anomaly();
        let hits: Vec<(usize, &str)> = cells
            .iter()
            .copied()
            .filter(|(_, v)| anomaly.is_match(v))
            .collect();
        let pct = fraction(hits.len(), cells.len());
        let severity = if pct > 0.05 {
            Severity::High
        } else if !hits.is_empty() {
            Severity::Medium
        } else {
            Severity::Pass
        };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(pct, 4))
            .with_message(format!(
                "{} values with control characters or broken encoding ({})",
                hits.len(),
                percent(pct)
            ))
            .with_affected(hits.len(), pct)
            .with_samples(hits.iter().take(5).map(|(_, v)| format!("{:?}", v)))
            .with_flagged_rows(hits.iter().map(|(i, _)| *i)))
    }
}

pub struct ClassImbalance;

impl Check for ClassImbalance {
    fn id(&self) -> &'static str {
        "CLASS_IMBALANCE"
    }

    fn title(&self) -> &'static str {
        "One category dominates"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let counts = typed.value_counts();
        let total: usize = counts.iter().map(|(_, c)| c).sum();
        let Some((top_value, top_count)) = counts.first() else {
            return Ok(no_data(self, &raw.name, 0.90));
        };
        let top = fraction(*top_count, total);
        let severity = if top >= 0.95 {
            Severity::High
        } else if top >= 0.90 {
            Severity::Medium
        } else {
            Severity::Pass
        };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(top, 4))
            .with_threshold(0.90)
            .with_message(format!("Dominant category '{}' covers {}", top_value, percent(top)))
            .with_meta("dominant_category", top_value.as_str())
            .with_meta("dominant_pct", round_to(top, 4)))
    }
}

/// Pairs of repeated categories that are almost, but not exactly, the same word.
pub struct TypoCandidates;

impl Check for TypoCandidates {
    fn id(&self) -> &'static str {
        "TYPO_CANDIDATES"
    }

    fn title(&self) -> &'static str {
        "Probable typos between categories"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let counts = typed.value_counts();
        if counts.is_empty() {
            return Ok(no_data(self, &raw.name, TYPO_SIMILARITY));
        }
        let categories: Vec<&str> = counts
            .iter()
            .filter(|(_, c)| *c > 1)
            .take(TYPO_MAX_CATEGORIES)
            .map(|(v, _)| v.as_str())
            .collect();

        let mut pairs: Vec<(&str, &str, f64)> = Vec::new();
        for (i, a) in categories.iter().enumerate() {
            for b in &categories[i + 1..] {
                if a.to_lowercase() == b.to_lowercase() {
                    continue;
                }
                let similarity = typo_similarity(a, b);
                if similarity >= TYPO_SIMILARITY {
                    pairs.push((*a, *b, round_to(similarity, 2)));
                }
            }
        }

        let severity = match pairs.len() {
            0 => Severity::Pass,
            n if n > 5 => Severity::Medium,
            _ => Severity::Low,
        };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(pairs.len() as f64)
            .with_threshold(TYPO_SIMILARITY)
            .with_message(format!("{} pair(s) of categories look like typos", pairs.len()))
            .with_samples(
                pairs
                    .iter()
                    .take(5)
                    .map(|(a, b, s)| format!("'{}' ↔ '{}' (sim={})", a, b, s)),
            )
            .with_meta(
                "pairs",
                pairs.iter().take(10).map(|(a, b, s)| json!([a, b, s])).collect::<Vec<_>>(),
            ))
    }
}
