// auditor-core/src/domain/dataset_checks/temporal_completeness.rs

// Null rate per calendar period of the date column: windows where capture degraded.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

use super::{DatasetAnalysis, resolve_date_column, row_dates};
use crate::domain::checks::{CheckContext, CheckError, fraction, percent};
use crate::domain::model::{DATASET_SCOPE, DiagnosticRecord, Severity, TypedColumn};
use crate::domain::stats::{mean, round_to};

const MIN_DATED_ROWS: usize = 10;
const MIN_PERIODS: usize = 3;
const DEGRADED_FACTOR: f64 = 2.0;
const CONCENTRATION_FACTOR: f64 = 3.0;
const MAX_CONCENTRATED_SHARE: f64 = 0.3;
const MAX_COLUMNS: usize = 20;

/// Calendar bucket, chosen from the span of the dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Week,
    Month,
}

impl Period {
    pub fn for_span(days: i64) -> Self {
        if days > 365 {
            Self::Month
        } else if days > 30 {
            Self::Week
        } else {
            Self::Day
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    /// Last day of the period holding `date` (weeks end on Sunday).
    pub fn end_of(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Day => date,
            Self::Week => date + Duration::days(6 - i64::from(date.weekday().num_days_from_monday())),
            Self::Month => {
                let (y, m) = if date.month() == 12 {
                    (date.year() + 1, 1)
                } else {
                    (date.year(), date.month() + 1)
                };
                NaiveDate::from_ymd_opt(y, m, 1)
                    .and_then(|first| first.pred_opt())
                    .unwrap_or(date)
            }
        }
    }
}

pub struct TemporalCompleteness;

/// Per period: (null cells, total cells).
type Buckets = BTreeMap<NaiveDate, (usize, usize)>;

fn bucket_nulls(rows: &[(usize, NaiveDate)], columns: &[&TypedColumn]) -> Buckets {
    let mut buckets = Buckets::new();
    for (row, period) in rows {
        let entry = buckets.entry(*period).or_insert((0, 0));
        for column in columns {
            entry.0 += usize::from(column.is_null(*row));
            entry.1 += 1;
        }
    }
    buckets
}

fn rates(buckets: &Buckets) -> Vec<(NaiveDate, f64)> {
    buckets
        .iter()
        .map(|(period, (nulls, cells))| (*period, fraction(*nulls, *cells)))
        .collect()
}

impl DatasetAnalysis for TemporalCompleteness {
    fn id(&self) -> &'static str {
        "TEMPORAL_COMPLETENESS"
    }

    fn record_ids(&self) -> &'static [&'static str] {
        &["TEMPORAL_COMPLETENESS", "TEMPORAL_NULL_CONCENTRATION"]
    }

    fn run(&self, ctx: &CheckContext<'_>) -> Result<Vec<DiagnosticRecord>, CheckError> {
        let mut records = Vec::new();
        let Some(date_column) = resolve_date_column(ctx) else {
            return Ok(records);
        };
        let dated: Vec<(usize, NaiveDate)> = row_dates(date_column)
            .into_iter()
            .enumerate()
            .filter_map(|(i, d)| d.map(|d| (i, d.date())))
            .collect();
        if dated.len() < MIN_DATED_ROWS {
            return Ok(records);
        }
        let (Some(first), Some(last)) = (
            dated.iter().map(|(_, d)| *d).min(),
            dated.iter().map(|(_, d)| *d).max(),
        ) else {
            return Ok(records);
        };
        let period = Period::for_span((last - first).num_days());
        let rows: Vec<(usize, NaiveDate)> = dated.iter().map(|(i, d)| (*i, period.end_of(*d))).collect();

        let columns: Vec<&TypedColumn> = ctx
            .dataset
            .typed_columns()
            .iter()
            .filter(|c| c.name != date_column.name && ctx.column_types.get(&c.name).is_some())
            .collect();
        if columns.is_empty() {
            return Ok(records);
        }

        let overall = rates(&bucket_nulls(&rows, &columns));
        if overall.len() < MIN_PERIODS {
            return Ok(records);
        }
        let average = mean(&overall.iter().map(|(_, r)| *r).collect::<Vec<_>>());
        if average > 0.0 {
            let degraded: Vec<(NaiveDate, f64)> = overall
                .iter()
                .copied()
                .filter(|(_, r)| *r > average * DEGRADED_FACTOR)
                .collect();
            if let Some((worst_period, worst_rate)) =
                degraded.iter().copied().max_by(|a, b| a.1.total_cmp(&b.1))
            {
                let severity = if worst_rate > 0.5 {
                    Severity::High
                } else {
                    Severity::Medium
                };
                records.push(
                    DiagnosticRecord::new(self.id(), DATASET_SCOPE, severity)
                        .with_value(round_to(worst_rate, 4))
                        .with_threshold(round_to(average * DEGRADED_FACTOR, 4))
                        .with_message(format!(
                            "Completeness degraded over time: {} {}(s) with a null rate above twice the average; worst period {} ({} nulls vs {} average)",
                            degraded.len(),
                            period.label(),
                            worst_period,
                            percent(worst_rate),
                            percent(average)
                        ))
                        .with_affected(degraded.len(), fraction(degraded.len(), overall.len()))
                        .with_meta(
                            "degraded_periods",
                            degraded.iter().take(10).map(|(p, _)| p.to_string()).collect::<Vec<_>>(),
                        )
                        .with_meta("avg_null_rate", round_to(average, 4))
                        .with_meta("worst_period", worst_period.to_string())
                        .with_meta("worst_null_rate", round_to(worst_rate, 4))
                        .with_meta("frequency", period.label()),
                );
            }
        }

        for column in columns.iter().take(MAX_COLUMNS) {
            let column_rate = column.null_fraction();
            if !(0.01..=0.95).contains(&column_rate) {
                continue;
            }
            let by_period = rates(&bucket_nulls(&rows, &[*column]));
            if by_period.len() < MIN_PERIODS {
                continue;
            }
            let high: Vec<(NaiveDate, f64)> = by_period
                .iter()
                .copied()
                .filter(|(_, r)| *r > column_rate * CONCENTRATION_FACTOR)
                .collect();
            if high.is_empty() || high.len() as f64 > by_period.len() as f64 * MAX_CONCENTRATED_SHARE {
                continue;
            }
            let peak = high.iter().map(|(_, r)| *r).fold(0.0, f64::max);
            records.push(
                DiagnosticRecord::new("TEMPORAL_NULL_CONCENTRATION", &column.name, Severity::Medium)
                    .with_value(round_to(peak, 4))
                    .with_threshold(round_to(column_rate * CONCENTRATION_FACTOR, 4))
                    .with_message(format!(
                        "Nulls concentrated in time: {} {}(s) above 3x the column null rate ({})",
                        high.len(),
                        period.label(),
                        percent(column_rate)
                    ))
                    .with_affected(high.len(), fraction(high.len(), by_period.len()))
                    .with_meta(
                        "high_null_periods",
                        high.iter().take(5).map(|(p, _)| p.to_string()).collect::<Vec<_>>(),
                    )
                    .with_meta("avg_null_rate", round_to(column_rate, 4)),
            );
        }
        Ok(records)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::classifier::SemanticTypeClassifier;
    use crate::domain::model::{Dataset, RawColumn};

    #[test]
    fn test_period_boundaries() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 14).unwrap(); // a Wednesday
        assert_eq!(Period::Day.end_of(d), d);
        assert_eq!(Period::Week.end_of(d), NaiveDate::from_ymd_opt(2024, 2, 18).unwrap());
        assert_eq!(Period::Month.end_of(d), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        let dec = NaiveDate::from_ymd_opt(2023, 12, 5).unwrap();
        assert_eq!(Period::Month.end_of(dec), NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert_eq!(Period::for_span(10), Period::Day);
        assert_eq!(Period::for_span(90), Period::Week);
        assert_eq!(Period::for_span(800), Period::Month);
    }

    #[test]
    fn test_one_bad_week_is_reported() {
        // 10 weeks of daily rows; `amount` is missing for the whole 5th week.
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(); // a Monday
        let n = 70;
        let days: Vec<String> = (0..n)
            .map(|i| (start + Duration::days(i)).format("%Y-%m-%d").to_string())
            .collect();
        let amount: Vec<String> = (0..n)
            .map(|i| if (28..35).contains(&i) { String::new() } else { (i * 3).to_string() })
            .collect();
        let ds = Dataset::from_raw(vec![
            RawColumn::new("day", days),
            RawColumn::new("amount", amount),
        ])
        .unwrap();
        let types = SemanticTypeClassifier::new().classify_dataset(&ds);
        let records = TemporalCompleteness
            .run(&CheckContext::new(&ds, &types))
            .unwrap();

        let overall = records.iter().find(|r| r.check_id == "TEMPORAL_COMPLETENESS").unwrap();
        assert_eq!(overall.severity, Severity::High);
        assert_eq!(overall.metadata["frequency"], "week");
        assert_eq!(overall.metadata["worst_period"], "2024-02-04");

        let concentrated = records
            .iter()
            .find(|r| r.check_id == "TEMPORAL_NULL_CONCENTRATION")
            .unwrap();
        assert_eq!(concentrated.column, "amount");
        assert_eq!(concentrated.affected_count, 1);
    }
}
