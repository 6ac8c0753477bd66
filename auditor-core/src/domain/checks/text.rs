// auditor-core/src/domain/checks/text.rs

// Free-text checks (HIGH_CARDINALITY, EMAIL, PHONE columns).

use regex::Regex;

use super::{Check, CheckContext, CheckError, fraction, non_empty_cells, percent};
use crate::domain::model::{DiagnosticRecord, RawColumn, Severity, TypedColumn, is_null_like};
use crate::domain::patterns;
use crate::domain::stats::descriptive::quantile_sorted;
use crate::domain::stats::{mean, median, round_to};

const MIN_TEXT_VALUES: usize = 10;
const TRUNCATION_MIN_LENGTH: usize = 5;

/// Share of values that do not match `pattern`: >20% HIGH, >5% MEDIUM, any LOW.
fn format_check(
    check: &dyn Check,
    raw: &RawColumn,
    pattern: &Regex,
    noun: &str,
) -> DiagnosticRecord {
    let values: Vec<(usize, &str)> = non_empty_cells(raw)
        .into_iter()
        .filter(|(_, v)| !is_null_like(v))
        .collect();
    if values.is_empty() {
        return DiagnosticRecord::pass(check.id(), &raw.name, "No data");
    }
    let invalid: Vec<(usize, &str)> = values
        .iter()
        .copied()
        .filter(|(_, v)| !pattern.is_match(v))
        .collect();
    let pct = fraction(invalid.len(), values.len());
    let severity = if pct > 0.20 {
        Severity::High
    } else if pct > 0.05 {
        Severity::Medium
    } else if !invalid.is_empty() {
        Severity::Low
    } else {
        Severity::Pass
    };
    DiagnosticRecord::new(check.id(), &raw.name, severity)
        .with_value(round_to(pct, 4))
        .with_threshold(0.05)
        .with_message(format!(
            "{} {} with an invalid format ({})",
            invalid.len(),
            noun,
            percent(pct)
        ))
        .with_affected(invalid.len(), pct)
        .with_samples(invalid.iter().take(5).map(|(_, v)| *v))
        .with_flagged_rows(invalid.iter().map(|(i, _)| *i))
}

pub struct EmailFormat;

impl Check for EmailFormat {
    fn id(&self) -> &'static str {
        "EMAIL_FORMAT"
    }

    fn title(&self) -> &'static str {
        "Malformed email addresses"
    }

    fn run(
        &self,
        raw: &RawColumn,
        _typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        Ok(format_check(self, raw, patterns::email(), "emails"))
    }
}

pub struct PhoneFormat;

impl Check for PhoneFormat {
    fn id(&self) -> &'static str {
        "PHONE_FORMAT"
    }

    fn title(&self) -> &'static str {
        "Malformed phone numbers"
    }

    fn run(
        &self,
        raw: &RawColumn,
        _typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        Ok(format_check(self, raw, patterns::phone(), "phone numbers"))
    }
}

/// Tukey fences on string lengths. With no spread, anything off the median length counts.
pub struct LengthOutliers;

impl Check for LengthOutliers {
    fn id(&self) -> &'static str {
        "LENGTH_OUTLIERS"
    }

    fn title(&self) -> &'static str {
        "Unusual value lengths"
    }

    fn run(
        &self,
        raw: &RawColumn,
        _typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let cells = non_empty_cells(raw);
        if cells.len() < MIN_TEXT_VALUES {
            return Ok(DiagnosticRecord::pass(self.id(), &raw.name, "Insufficient data"));
        }
        let lengths: Vec<f64> = cells.iter().map(|(_, v)| v.chars().count() as f64).collect();
        let mut sorted = lengths.clone();
        sorted.sort_by(f64::total_cmp);
        let (q1, q3) = (quantile_sorted(&sorted, 0.25), quantile_sorted(&sorted, 0.75));
        let iqr = q3 - q1;
        let median_len = median(&lengths);
        let is_outlier = |len: f64| {
            if iqr == 0.0 {
                len != median_len
            } else {
                len < q1 - 1.5 * iqr || len > q3 + 1.5 * iqr
            }
        };
        let outliers: Vec<(usize, &str)> = cells
            .iter()
            .zip(&lengths)
            .filter(|(_, len)| is_outlier(**len))
            .map(|(cell, _)| *cell)
            .collect();
        let pct = fraction(outliers.len(), cells.len());
        let severity = if pct > 0.10 {
            Severity::Medium
        } else if pct > 0.02 {
            Severity::Low
        } else if !outliers.is_empty() {
            Severity::Info
        } else {
            Severity::Pass
        };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_passed(matches!(severity, Severity::Pass | Severity::Info))
            .with_value(round_to(pct, 4))
            .with_threshold(0.02)
            .with_message(format!(
                "{} values with an unusual length ({})",
                outliers.len(),
                percent(pct)
            ))
            .with_affected(outliers.len(), pct)
            .with_samples(outliers.iter().take(5).map(|(_, v)| *v))
            .with_flagged_rows(outliers.iter().map(|(i, _)| *i))
            .with_meta("median_length", median_len)
            .with_meta("mean_length", round_to(mean(&lengths), 1)))
    }
}

/// Placeholder strings standing in for a missing value. Truly empty cells are NULL_RATE's.
pub struct NullLikeStrings;

impl Check for NullLikeStrings {
    fn id(&self) -> &'static str {
        "NULL_LIKE_STRINGS"
    }

    fn title(&self) -> &'static str {
        "Placeholder strings for missing values"
    }

    fn run(
        &self,
        raw: &RawColumn,
        _typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let cells = non_empty_cells(raw);
        if cells.is_empty() {
            return Ok(DiagnosticRecord::pass(self.id(), &raw.name, "No data"));
        }
        let hits: Vec<(usize, &str)> = cells
            .iter()
            .copied()
            .filter(|(_, v)| is_null_like(v))
            .collect();
        let pct = fraction(hits.len(), cells.len());
        let severity = if pct > 0.10 {
            Severity::High
        } else if pct > 0.02 {
            Severity::Medium
        } else if !hits.is_empty() {
            Severity::Low
        } else {
            Severity::Pass
        };
        let mut samples: Vec<&str> = Vec::new();
        for (_, v) in &hits {
            if samples.len() == 5 {
                break;
            }
            if !samples.contains(v) {
                samples.push(*v);
            }
        }
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(pct, 4))
            .with_threshold(0.02)
            .with_message(format!("{} null-like strings ({})", hits.len(), percent(pct)))
            .with_affected(hits.len(), pct)
            .with_samples(samples)
            .with_flagged_rows(hits.iter().map(|(i, _)| *i)))
    }
}

/// Values ending in "..." or cut at the column's maximum length in the middle of a word.
pub struct TruncationSigns;

impl Check for TruncationSigns {
    fn id(&self) -> &'static str {
        "TRUNCATION_SIGNS"
    }

    fn title(&self) -> &'static str {
        "Possibly truncated values"
    }

    fn run(
        &self,
        raw: &RawColumn,
        _typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let cells: Vec<(usize, &str, usize)> = non_empty_cells(raw)
            .into_iter()
            .map(|(i, v)| (i, v, v.chars().count()))
            .filter(|(_, _, len)| *len > TRUNCATION_MIN_LENGTH)
            .collect();
        if cells.len() < MIN_TEXT_VALUES {
            return Ok(DiagnosticRecord::pass(self.id(), &raw.name, "Insufficient data"));
        }
        let max_len = cells.iter().map(|(_, _, len)| *len).max().unwrap_or(0);
        let trailing = patterns::trailing_letters();
        let truncated: Vec<(usize, &str)> = cells
            .iter()
            .filter(|(_, v, len)| v.ends_with("...") || (*len == max_len && trailing.is_match(v)))
            .map(|(i, v, _)| (*i, *v))
            .collect();
        let pct = fraction(truncated.len(), cells.len());
        let severity = if pct > 0.05 {
            Severity::Medium
        } else if !truncated.is_empty() {
            Severity::Low
        } else {
            Severity::Pass
        };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(pct, 4))
            .with_threshold(0.05)
            .with_message(format!(
                "{} values look truncated ({})",
                truncated.len(),
                percent(pct)
            ))
            .with_affected(truncated.len(), pct)
            .with_samples(truncated.iter().take(5).map(|(_, v)| *v))
            .with_flagged_rows(truncated.iter().map(|(i, _)| *i)))
    }
}
