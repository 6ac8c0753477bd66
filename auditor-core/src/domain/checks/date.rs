// auditor-core/src/domain/checks/date.rs

// Checks for DATE and DATETIME columns. Dates are always re-read from the raw
// view: the typed view may have turned `20240131` into a number.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Map, Value, json};

use super::{Check, CheckContext, CheckError, fraction, non_empty_cells, percent, present_cells};
use crate::domain::classifier::parse_date;
use crate::domain::hypothesis::ALPHA;
use crate::domain::model::{DiagnosticRecord, RawColumn, Severity, TypedColumn};
use crate::domain::stats::{ks_two_sample, median, round_to};

const FORMAT_SAMPLE: usize = 500;
const DRIFT_MIN_ROWS: usize = 100;
const DRIFT_MAX_COLUMNS: usize = 5;
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parseable cells with their row index.
fn parsed_dates(raw: &RawColumn) -> Vec<(usize, NaiveDateTime)> {
    raw.values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| parse_date(v).map(|m| (i, m.value)))
        .collect()
}

fn display(dates: &[(usize, NaiveDateTime)]) -> Vec<String> {
    dates
        .iter()
        .take(5)
        .map(|(_, d)| d.format(DISPLAY_FORMAT).to_string())
        .collect()
}

fn no_dates(check: &dyn Check, column: &str) -> DiagnosticRecord {
    DiagnosticRecord::pass(check.id(), column, "No valid dates")
}

/// `90061` -> `"1 days 01:01:01"`.
fn describe_span(seconds: f64) -> String {
    let total = seconds.round() as i64;
    let (days, rest) = (total / 86_400, total % 86_400);
    format!(
        "{} days {:02}:{:02}:{:02}",
        days,
        rest / 3600,
        (rest % 3600) / 60,
        rest % 60
    )
}

pub struct DateNullRate;

impl Check for DateNullRate {
    fn id(&self) -> &'static str {
        "DATE_NULL_RATE"
    }

    fn title(&self) -> &'static str {
        "Missing or unparseable dates"
    }

    fn run(
        &self,
        raw: &RawColumn,
        _typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let n = raw.len();
        let nulls = n - parsed_dates(raw).len();
        let pct = fraction(nulls, n);
        let severity = match pct {
            p if p >= 0.50 => Severity::Critical,
            p if p >= 0.20 => Severity::High,
            p if p >= 0.05 => Severity::Medium,
            p if p > 0.0 => Severity::Low,
            _ => Severity::Pass,
        };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(pct, 4))
            .with_threshold(0.05)
            .with_message(format!("{} null or unparseable dates ({})", nulls, percent(pct)))
            .with_affected(nulls, pct))
    }
}

pub struct DateFormatMix;

impl Check for DateFormatMix {
    fn id(&self) -> &'static str {
        "DATE_FORMAT_MIX"
    }

    fn title(&self) -> &'static str {
        "Several date formats in one column"
    }

    fn run(
        &self,
        raw: &RawColumn,
        _typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        // format -> (count, first value seen), in first-seen order
        let mut formats: Vec<(&'static str, usize, &str)> = Vec::new();
        for (_, value) in non_empty_cells(raw).into_iter().take(FORMAT_SAMPLE) {
            let Some(m) = parse_date(value) else {
                continue;
            };
            match formats.iter_mut().find(|(f, _, _)| *f == m.format) {
                Some(entry) => entry.1 += 1,
                None => formats.push((m.format, 1, value)),
            }
        }
        let n_formats = formats.len();
        let severity = match n_formats {
            n if n >= 4 => Severity::Critical,
            n if n >= 2 => Severity::High,
            _ => Severity::Pass,
        };

        let samples: Vec<&str> = formats.iter().take(5).map(|(_, _, v)| *v).collect();
        let mut by_count = formats.clone();
        by_count.sort_by(|a, b| b.1.cmp(&a.1));
        let found: Map<String, Value> = by_count
            .iter()
            .take(5)
            .map(|(f, c, _)| (f.to_string(), json!(c)))
            .collect();

        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(n_formats as f64)
            .with_threshold(2.0)
            .with_message(format!("{} date format(s) detected", n_formats))
            .with_samples(samples)
            .with_meta("formats_found", Value::Object(found)))
    }
}

pub struct DateFuture;

impl Check for DateFuture {
    fn id(&self) -> &'static str {
        "DATE_FUTURE"
    }

    fn title(&self) -> &'static str {
        "Dates in the future"
    }

    fn run(
        &self,
        raw: &RawColumn,
        _typed: &TypedColumn,
        ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let dates = parsed_dates(raw);
        if dates.is_empty() {
            return Ok(no_dates(self, &raw.name));
        }
        let now = ctx.now();
        let future: Vec<(usize, NaiveDateTime)> =
            dates.iter().copied().filter(|(_, d)| *d > now).collect();
        let pct = fraction(future.len(), dates.len());
        let severity = if pct > 0.10 {
            Severity::High
        } else if !future.is_empty() {
            Severity::Medium
        } else {
            Severity::Pass
        };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(pct, 4))
            .with_message(format!("{} future dates ({})", future.len(), percent(pct)))
            .with_affected(future.len(), pct)
            .with_samples(display(&future))
            .with_flagged_rows(future.iter().map(|(i, _)| *i)))
    }
}

pub struct DateAncient;

impl Check for DateAncient {
    fn id(&self) -> &'static str {
        "DATE_ANCIENT"
    }

    fn title(&self) -> &'static str {
        "Dates before 1900"
    }

    fn run(
        &self,
        raw: &RawColumn,
        _typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let dates = parsed_dates(raw);
        if dates.is_empty() {
            return Ok(no_dates(self, &raw.name));
        }
        let cutoff = NaiveDate::from_ymd_opt(1900, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| CheckError::Computation("invalid cutoff date".into()))?;
        let ancient: Vec<(usize, NaiveDateTime)> =
            dates.iter().copied().filter(|(_, d)| *d < cutoff).collect();
        let pct = fraction(ancient.len(), dates.len());
        let severity = if ancient.is_empty() {
            Severity::Pass
        } else {
            Severity::High
        };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(pct, 4))
            .with_message(format!("{} dates before 1900 ({})", ancient.len(), percent(pct)))
            .with_affected(ancient.len(), pct)
            .with_samples(display(&ancient))
            .with_flagged_rows(ancient.iter().map(|(i, _)| *i)))
    }
}

/// Steps between sorted dates larger than three times the median step.
pub struct DateSequenceGaps;

impl Check for DateSequenceGaps {
    fn id(&self) -> &'static str {
        "DATE_SEQUENCE_GAPS"
    }

    fn title(&self) -> &'static str {
        "Unexpected gaps in the date sequence"
    }

    fn run(
        &self,
        raw: &RawColumn,
        _typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let mut dates: Vec<NaiveDateTime> = parsed_dates(raw).into_iter().map(|(_, d)| d).collect();
        if dates.len() < 10 {
            return Ok(DiagnosticRecord::pass(self.id(), &raw.name, "Insufficient data"));
        }
        dates.sort();
        let steps: Vec<f64> = dates
            .windows(2)
            .map(|w| (w[1] - w[0]).num_seconds() as f64)
            .collect();
        let median_step = median(&steps);
        if median_step == 0.0 {
            return Ok(DiagnosticRecord::pass(
                self.id(),
                &raw.name,
                "Median step between dates is 0",
            ));
        }
        let gaps = steps.iter().filter(|s| **s > 3.0 * median_step).count();
        let severity = match gaps {
            g if g > 10 => Severity::High,
            g if g > 3 => Severity::Medium,
            g if g > 0 => Severity::Low,
            _ => Severity::Pass,
        };
        let median_label = describe_span(median_step);
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(gaps as f64)
            .with_threshold(3.0)
            .with_message(format!(
                "{} significant gaps (>3x the median step of {})",
                gaps, median_label
            ))
            .with_affected(gaps, fraction(gaps, steps.len()))
            .with_meta("median_diff", median_label)
            .with_meta("gaps_found", gaps))
    }
}

pub struct DateDuplicates;

impl Check for DateDuplicates {
    fn id(&self) -> &'static str {
        "DATE_DUPLICATES"
    }

    fn title(&self) -> &'static str {
        "Repeated dates"
    }

    fn run(
        &self,
        raw: &RawColumn,
        _typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let dates = parsed_dates(raw);
        if dates.is_empty() {
            return Ok(no_dates(self, &raw.name));
        }
        let mut counts: HashMap<NaiveDateTime, usize> = HashMap::new();
        for (_, d) in &dates {
            *counts.entry(*d).or_insert(0) += 1;
        }
        // every occurrence of a repeated date counts
        let repeated: Vec<(usize, NaiveDateTime)> =
            dates.iter().copied().filter(|(_, d)| counts[d] > 1).collect();
        let pct = fraction(repeated.len(), dates.len());
        let severity = if pct > 0.50 {
            Severity::Medium
        } else if pct > 0.10 {
            Severity::Low
        } else if !repeated.is_empty() {
            Severity::Info
        } else {
            Severity::Pass
        };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_passed(matches!(severity, Severity::Pass | Severity::Info))
            .with_value(round_to(pct, 4))
            .with_threshold(0.10)
            .with_message(format!("{} repeated dates ({})", repeated.len(), percent(pct)))
            .with_affected(repeated.len(), pct)
            .with_samples(display(&repeated)))
    }
}

pub struct DateMonotonicity;

impl Check for DateMonotonicity {
    fn id(&self) -> &'static str {
        "DATE_MONOTONICITY"
    }

    fn title(&self) -> &'static str {
        "Date ordering"
    }

    fn run(
        &self,
        raw: &RawColumn,
        _typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let dates: Vec<NaiveDateTime> = parsed_dates(raw).into_iter().map(|(_, d)| d).collect();
        if dates.len() < 3 {
            return Ok(DiagnosticRecord::pass(self.id(), &raw.name, "Insufficient data"));
        }
        let increasing = dates.windows(2).all(|w| w[0] <= w[1]);
        let decreasing = dates.windows(2).all(|w| w[0] >= w[1]);
        if increasing || decreasing {
            let direction = if increasing { "increasing" } else { "decreasing" };
            return Ok(DiagnosticRecord::pass(
                self.id(),
                &raw.name,
                format!("Dates are monotonically {}", direction),
            )
            .with_value(1.0));
        }
        Ok(DiagnosticRecord::new(self.id(), &raw.name, Severity::Info)
            .with_passed(true)
            .with_message("Dates are not monotonically ordered"))
    }
}

pub struct DateInvalidParsed;

impl Check for DateInvalidParsed {
    fn id(&self) -> &'static str {
        "DATE_INVALID_PARSED"
    }

    fn title(&self) -> &'static str {
        "Values that are not dates"
    }

    fn run(
        &self,
        raw: &RawColumn,
        _typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let present = present_cells(raw);
        let invalid: Vec<(usize, &str)> = present
            .iter()
            .copied()
            .filter(|(_, v)| parse_date(v).is_none())
            .collect();
        let pct = fraction(invalid.len(), present.len());
        let severity = if pct > 0.20 {
            Severity::High
        } else if pct > 0.05 {
            Severity::Medium
        } else if !invalid.is_empty() {
            Severity::Low
        } else {
            Severity::Pass
        };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(pct, 4))
            .with_threshold(0.05)
            .with_message(format!(
                "{} values cannot be parsed as dates ({})",
                invalid.len(),
                percent(pct)
            ))
            .with_affected(invalid.len(), pct)
            .with_samples(invalid.iter().take(5).map(|(_, v)| *v))
            .with_flagged_rows(invalid.iter().map(|(i, _)| *i)))
    }
}

/// First quarter against last quarter of each numeric column, rows ordered by this date column.
pub struct TemporalDrift;

impl TemporalDrift {
    /// KS outcome for one numeric column, `None` when too few rows align.
    fn drift_of(
        dates: &[(usize, NaiveDateTime)],
        numeric: &TypedColumn,
    ) -> Result<Option<(f64, f64)>, CheckError> {
        let mut aligned: Vec<(NaiveDateTime, f64)> = dates
            .iter()
            .filter_map(|(i, d)| numeric.numeric_at(*i).map(|x| (*d, x)))
            .collect();
        if aligned.len() < DRIFT_MIN_ROWS {
            return Ok(None);
        }
        aligned.sort_by(|a, b| a.0.cmp(&b.0));
        let n = aligned.len();
        let first: Vec<f64> = aligned[..n / 4].iter().map(|(_, x)| *x).collect();
        let last: Vec<f64> = aligned[3 * n / 4..].iter().map(|(_, x)| *x).collect();
        let outcome = ks_two_sample(&first, &last)?;
        Ok(Some((outcome.statistic, outcome.p_value)))
    }
}

impl Check for TemporalDrift {
    fn id(&self) -> &'static str {
        "TEMPORAL_DRIFT"
    }

    fn title(&self) -> &'static str {
        "Distribution drift over time"
    }

    fn run(
        &self,
        raw: &RawColumn,
        _typed: &TypedColumn,
        ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let dates = parsed_dates(raw);
        let mut per_column: Map<String, Value> = Map::new();
        let mut worst: Option<(String, f64)> = None;
        let numeric_columns = ctx
            .dataset
            .typed_columns()
            .iter()
            .filter(|c| c.name != raw.name && c.is_numeric())
            .take(DRIFT_MAX_COLUMNS);
        for column in numeric_columns {
            let Some((statistic, p_value)) = Self::drift_of(&dates, column)? else {
                continue;
            };
            per_column.insert(
                column.name.clone(),
                json!({ "ks_statistic": round_to(statistic, 6), "p_value": round_to(p_value, 6) }),
            );
            if worst.as_ref().is_none_or(|(_, p)| p_value < *p) {
                worst = Some((column.name.clone(), p_value));
            }
        }

        let Some((worst_column, p_value)) = worst else {
            return Ok(DiagnosticRecord::pass(
                self.id(),
                &raw.name,
                "Insufficient data for temporal drift analysis",
            )
            .with_threshold(ALPHA));
        };
        let drifting = per_column
            .values()
            .filter(|v| v["p_value"].as_f64().is_some_and(|p| p < ALPHA))
            .count();
        let severity = if p_value < 0.001 {
            Severity::High
        } else if p_value < ALPHA {
            Severity::Medium
        } else {
            Severity::Pass
        };
        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(p_value, 6))
            .with_threshold(ALPHA)
            .with_message(format!(
                "KS first vs last quarter: {} of {} numeric column(s) drift (lowest p={:.4} on '{}')",
                drifting,
                per_column.len(),
                p_value,
                worst_column
            ))
            .with_affected(drifting, fraction(drifting, per_column.len()))
            .with_meta("columns", per_column))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::checks::test_support::{run_on, run_strings, run_values, single};
    use crate::domain::model::{ColumnTypes, Dataset};
    use chrono::Duration;

    fn daily(n: usize) -> Vec<String> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| (start + Duration::days(i as i64)).format("%Y-%m-%d").to_string())
            .collect()
    }

    #[test]
    fn test_null_rate_counts_unparseable() {
        let r = run_values(&DateNullRate, &["2024-01-01", "", "garbage", "2024-01-02"]);
        assert_eq!(r.severity, Severity::Critical);
        assert_eq!(r.affected_count, 2);
    }

    #[test]
    fn test_format_mix() {
        let r = run_values(
            &DateFormatMix,
            &["2024-01-01", "02/01/2024", "2024-01-03", "04.01.2024", "2024/01/05"],
        );
        assert_eq!(r.value, 4.0);
        assert_eq!(r.severity, Severity::Critical);
        assert_eq!(r.metadata["formats_found"]["%Y-%m-%d"], 2);
        assert_eq!(r.sample_values[0], "2024-01-01");

        let r = run_strings(&DateFormatMix, &daily(20));
        assert!(r.passed);
    }

    #[test]
    fn test_future_dates_against_pinned_now() {
        let (ds, types) = single(&["2024-01-01", "2031-06-01", "2024-02-01", "2024-03-01"]);
        let now = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let ctx = CheckContext::new(&ds, &types).with_now(now);
        let r = DateFuture
            .run(&ds.raw_columns()[0], &ds.typed_columns()[0], &ctx)
            .unwrap();
        assert_eq!(r.severity, Severity::High);
        assert_eq!(r.flagged_rows(), vec![1]);
        assert_eq!(r.sample_values, vec!["2031-06-01 00:00:00"]);
    }

    #[test]
    fn test_ancient_dates() {
        let r = run_values(&DateAncient, &["1850-01-01", "2020-01-01"]);
        assert_eq!(r.severity, Severity::High);
        assert_eq!(r.flagged_rows(), vec![0]);
    }

    #[test]
    fn test_sequence_gaps() {
        let mut dates = daily(30);
        dates.push("2024-06-01".into());
        let r = run_strings(&DateSequenceGaps, &dates);
        assert_eq!(r.severity, Severity::Low);
        assert_eq!(r.metadata["median_diff"], "1 days 00:00:00");
        assert!(run_strings(&DateSequenceGaps, &daily(30)).passed);
    }

    #[test]
    fn test_duplicates_and_monotonicity() {
        let mut dates = daily(20);
        dates.push("2024-01-01".into());
        let r = run_strings(&DateDuplicates, &dates);
        assert_eq!(r.severity, Severity::Info);
        assert!(r.passed);
        assert_eq!(r.affected_count, 2);

        let r = run_strings(&DateMonotonicity, &dates);
        assert_eq!(r.severity, Severity::Info);
        assert!(r.passed);
        let r = run_strings(&DateMonotonicity, &daily(20));
        assert_eq!(r.value, 1.0);
    }

    #[test]
    fn test_invalid_parsed_ignores_missing_tokens() {
        let r = run_values(&DateInvalidParsed, &["2024-01-01", "NULL", "", "soon", "2024-01-02"]);
        assert_eq!(r.affected_count, 1);
        assert_eq!(r.severity, Severity::High);
        assert_eq!(r.sample_values, vec!["soon"]);
    }

    #[test]
    fn test_temporal_drift_on_level_change() {
        let dates = daily(200);
        let values: Vec<String> = (0..200)
            .map(|i| (if i < 100 { i % 10 } else { 100 + i % 10 }).to_string())
            .collect();
        let ds = Dataset::from_raw(vec![
            RawColumn::new("day", dates),
            RawColumn::new("amount", values),
        ])
        .unwrap();
        let r = run_on(&TemporalDrift, &ds, &ColumnTypes::new());
        assert_eq!(r.severity, Severity::High);
        assert!(r.metadata["columns"]["amount"]["p_value"].as_f64().unwrap() < 0.001);
    }

    #[test]
    fn test_temporal_drift_without_numeric_partner() {
        let r = run_strings(&TemporalDrift, &daily(200));
        assert!(r.passed);
    }

    #[test]
    fn test_describe_span() {
        assert_eq!(describe_span(90_061.0), "1 days 01:01:01");
    }
}
