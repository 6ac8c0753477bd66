// auditor-core/src/domain/dataset_checks/timeseries.rs

// Numeric columns read as series ordered by the date column:
// autocorrelation, seasonality and a CUSUM changepoint.

use chrono::NaiveDateTime;
use serde_json::json;

use super::{DatasetAnalysis, numeric_columns, resolve_date_column, row_dates};
use crate::domain::checks::{CheckContext, CheckError};
use crate::domain::model::{DiagnosticRecord, Severity};
use crate::domain::stats::{mean, median, round_to};

const MIN_POINTS: usize = 20;
const ACF_MIN_POINTS: usize = 30;
const ACF_MAX_LAGS: usize = 20;
const ACF_MEDIUM_LAGS: usize = 5;
const SEASONALITY_MIN_POINTS: usize = 24;
const SEASONAL_STRENGTH: f64 = 0.6;
const CUSUM_MIN_POINTS: usize = 30;
const CUSUM_EDGE: f64 = 0.1;

pub struct Timeseries;

fn population_std(values: &[f64]) -> f64 {
    let m = mean(values);
    (values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

/// Sample autocorrelation up to `nlags`, `None` for a flat series.
pub fn acf(values: &[f64], nlags: usize) -> Option<Vec<f64>> {
    let n = values.len();
    let m = mean(values);
    let centred: Vec<f64> = values.iter().map(|x| x - m).collect();
    let c0: f64 = centred.iter().map(|x| x * x).sum();
    if c0 <= 0.0 {
        return None;
    }
    Some(
        (0..=nlags.min(n.saturating_sub(1)))
            .map(|k| centred[..n - k].iter().zip(&centred[k..]).map(|(a, b)| a * b).sum::<f64>() / c0)
            .collect(),
    )
}

/// Seasonal period implied by the sampling step of the dates.
pub fn detect_period(dates: &[NaiveDateTime]) -> Option<usize> {
    if dates.len() < 4 {
        return None;
    }
    let steps: Vec<f64> = dates
        .windows(2)
        .map(|w| (w[1] - w[0]).num_seconds() as f64)
        .collect();
    let step = median(&steps);
    const HOUR: f64 = 3600.0;
    const DAY: f64 = 86_400.0;
    if step <= 2.0 * HOUR {
        Some(24)
    } else if step <= 2.0 * DAY {
        Some(7)
    } else if step <= 35.0 * DAY {
        Some(12)
    } else if step <= 100.0 * DAY {
        Some(4)
    } else {
        None
    }
}

/// Strength of the seasonal component of a classical additive decomposition,
/// `1 - var(residual) / var(seasonal + residual)`, clamped to [0, 1].
pub fn seasonal_strength(values: &[f64], period: usize) -> Option<f64> {
    let n = values.len();
    if period < 2 || n < 2 * period {
        return None;
    }
    let half = period / 2;
    // Centred moving average; even periods use the 2xP filter.
    let trend_at = |i: usize| -> f64 {
        if period % 2 == 0 {
            let inner: f64 = values[i + 1 - half..i + half].iter().sum();
            (inner + 0.5 * (values[i - half] + values[i + half])) / period as f64
        } else {
            values[i - half..=i + half].iter().sum::<f64>() / period as f64
        }
    };
    let detrended: Vec<(usize, f64)> = (half..n - half).map(|i| (i, values[i] - trend_at(i))).collect();

    let mut sums = vec![(0.0, 0usize); period];
    for (i, d) in &detrended {
        sums[i % period].0 += d;
        sums[i % period].1 += 1;
    }
    let phase: Vec<f64> = sums
        .iter()
        .map(|(s, c)| if *c > 0 { s / *c as f64 } else { 0.0 })
        .collect();
    let level = mean(&phase);

    let d: Vec<f64> = detrended.iter().map(|(_, d)| *d).collect();
    let resid: Vec<f64> = detrended
        .iter()
        .map(|(i, d)| d - (phase[i % period] - level))
        .collect();
    let var_d = population_std(&d).powi(2);
    if var_d <= 0.0 {
        return None;
    }
    Some((1.0 - population_std(&resid).powi(2) / var_d).clamp(0.0, 1.0))
}

impl Timeseries {
    fn autocorrelation(values: &[f64], column: &str) -> Option<DiagnosticRecord> {
        let n = values.len();
        if n < ACF_MIN_POINTS {
            return None;
        }
        let coefficients = acf(values, ACF_MAX_LAGS.min(n / 2 - 1))?;
        let bound = 1.96 / (n as f64).sqrt();
        let significant: Vec<usize> = (1..coefficients.len())
            .filter(|&k| coefficients[k].abs() > bound)
            .collect();
        let severity = match significant.len() {
            0 => return None,
            k if k > ACF_MEDIUM_LAGS => Severity::Medium,
            _ => Severity::Info,
        };
        Some(
            DiagnosticRecord::new("AUTOCORRELATION", column, severity)
                .with_value(significant.len() as f64)
                .with_threshold(round_to(bound, 6))
                .with_message(format!(
                    "{} lag(s) with significant autocorrelation (largest significant lag: {})",
                    significant.len(),
                    significant.last().copied().unwrap_or(0)
                ))
                .with_samples(
                    significant
                        .iter()
                        .take(5)
                        .map(|&k| format!("Lag {}: ACF={:.3}", k, coefficients[k])),
                )
                .with_meta("significant_lags", significant.iter().take(20).copied().collect::<Vec<_>>())
                .with_meta(
                    "acf_values",
                    coefficients.iter().map(|v| round_to(*v, 4)).collect::<Vec<_>>(),
                ),
        )
    }

    fn seasonality(series: &[(NaiveDateTime, f64)], column: &str) -> Option<DiagnosticRecord> {
        // One point per timestamp, first one kept.
        let mut unique: Vec<(NaiveDateTime, f64)> = Vec::with_capacity(series.len());
        for point in series {
            if unique.last().is_none_or(|last| last.0 != point.0) {
                unique.push(*point);
            }
        }
        if unique.len() < SEASONALITY_MIN_POINTS {
            return None;
        }
        let dates: Vec<NaiveDateTime> = unique.iter().map(|(d, _)| *d).collect();
        let values: Vec<f64> = unique.iter().map(|(_, v)| *v).collect();
        let period = detect_period(&dates)?;
        let strength = seasonal_strength(&values, period)?;
        if strength <= SEASONAL_STRENGTH {
            return None;
        }
        Some(
            DiagnosticRecord::new("SEASONALITY", column, Severity::Info)
                .with_passed(true)
                .with_value(round_to(strength, 4))
                .with_threshold(SEASONAL_STRENGTH)
                .with_message(format!(
                    "Seasonality detected: strength={:.2}, period={}",
                    strength, period
                ))
                .with_meta("seasonal_strength", round_to(strength, 4))
                .with_meta("detected_period", period),
        )
    }

    fn changepoint(values: &[f64], column: &str) -> Option<DiagnosticRecord> {
        let n = values.len();
        if n < CUSUM_MIN_POINTS {
            return None;
        }
        let m = mean(values);
        let sd = population_std(values);
        if sd <= 0.0 {
            return None;
        }
        let mut cusum = 0.0;
        let mut peak = (0usize, 0.0f64);
        for (i, x) in values.iter().enumerate() {
            cusum += x - m;
            if cusum.abs() > peak.1 {
                peak = (i, cusum.abs());
            }
        }
        let (at, max_cusum) = peak;
        let bound = 2.0 * sd * (n as f64).sqrt();
        if max_cusum <= bound {
            return None;
        }

        let position = at as f64 / n as f64;
        let severity = if !(CUSUM_EDGE..=1.0 - CUSUM_EDGE).contains(&position) {
            Severity::Low
        } else {
            Severity::Medium
        };
        let before = if at > 0 { mean(&values[..=at]) } else { m };
        let after = if at < n - 1 { mean(&values[at + 1..]) } else { m };
        let ratio = max_cusum / bound;
        Some(
            DiagnosticRecord::new("CHANGEPOINT_CUSUM", column, severity)
                .with_value(round_to(ratio, 4))
                .with_threshold(1.0)
                .with_message(format!(
                    "Changepoint at position {}/{} ({:.0}%): mean before={:.2}, after={:.2}",
                    at,
                    n,
                    position * 100.0,
                    before,
                    after
                ))
                .with_meta(
                    "changepoint",
                    json!({
                        "index": at,
                        "pct": round_to(position, 4),
                        "cusum_ratio": round_to(ratio, 4),
                        "mean_before": round_to(before, 4),
                        "mean_after": round_to(after, 4),
                    }),
                ),
        )
    }
}

impl DatasetAnalysis for Timeseries {
    fn id(&self) -> &'static str {
        "TIMESERIES"
    }

    fn record_ids(&self) -> &'static [&'static str] {
        &["AUTOCORRELATION", "SEASONALITY", "CHANGEPOINT_CUSUM"]
    }

    fn run(&self, ctx: &CheckContext<'_>) -> Result<Vec<DiagnosticRecord>, CheckError> {
        let Some(date_column) = resolve_date_column(ctx) else {
            return Ok(Vec::new());
        };
        let dates = row_dates(date_column);
        if dates.iter().all(Option::is_none) {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for column in numeric_columns(ctx) {
            if column.name == date_column.name {
                continue;
            }
            let mut series: Vec<(NaiveDateTime, f64)> = dates
                .iter()
                .enumerate()
                .filter_map(|(i, d)| Some(((*d)?, column.numeric_at(i)?)))
                .collect();
            if series.len() < MIN_POINTS {
                continue;
            }
            series.sort_by(|a, b| a.0.cmp(&b.0));
            let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();

            records.extend(Self::autocorrelation(&values, &column.name));
            records.extend(Self::seasonality(&series, &column.name));
            records.extend(Self::changepoint(&values, &column.name));
        }
        Ok(records)
    }
}
