// auditor-core/src/domain/checks/distribution.rs

use serde_json::{Map, Value, json};

use super::{Check, CheckContext, CheckError};
use crate::domain::model::{DiagnosticRecord, RawColumn, Severity, TypedColumn};
use crate::domain::stats::round_to;
use crate::domain::stats::special::chi2_sf;

const MIN_VALUES: usize = 100;

/// Nigrini (2012) conformity bands on the mean absolute deviation of first-digit shares.
const MAD_NONCONFORMITY: f64 = 0.015;
const MAD_MARGINAL: f64 = 0.012;
const MAD_ACCEPTABLE: f64 = 0.006;

fn benford_share(digit: u32) -> f64 {
    (1.0 + 1.0 / f64::from(digit)).log10()
}

/// Leading significant digit (1-9) of a non-zero finite value.
pub fn first_digit(value: f64) -> Option<u32> {
    if value == 0.0 || !value.is_finite() {
        return None;
    }
    format!("{:e}", value.abs())
        .chars()
        .next()
        .and_then(|c| c.to_digit(10))
        .filter(|d| (1..=9).contains(d))
}

/// First-digit law on the non-zero values of a numeric column.
pub struct BenfordLaw;

impl Check for BenfordLaw {
    fn id(&self) -> &'static str {
        "BENFORD_LAW"
    }

    fn title(&self) -> &'static str {
        "First-digit distribution (Benford's law)"
    }

    fn run(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
        _ctx: &CheckContext<'_>,
    ) -> Result<DiagnosticRecord, CheckError> {
        let digits: Vec<u32> = typed
            .numeric_values()
            .into_iter()
            .filter_map(first_digit)
            .collect();
        if digits.len() < MIN_VALUES {
            return Ok(DiagnosticRecord::pass(
                self.id(),
                &raw.name,
                "Insufficient data for Benford's law (at least 100 non-zero values needed)",
            ));
        }

        let n = digits.len() as f64;
        let mut observed = [0.0f64; 9];
        for d in &digits {
            observed[(*d - 1) as usize] += 1.0;
        }

        let mut chi2 = 0.0;
        let mut mad = 0.0;
        let mut distribution = Map::new();
        for digit in 1..=9u32 {
            let expected_pct = benford_share(digit);
            let observed_pct = observed[(digit - 1) as usize] / n;
            let expected = expected_pct * n;
            chi2 += (observed[(digit - 1) as usize] - expected).powi(2) / expected;
            mad += (observed_pct - expected_pct).abs();
            distribution.insert(
                digit.to_string(),
                json!({
                    "observed_pct": round_to(observed_pct, 4),
                    "expected_pct": round_to(expected_pct, 4),
                    "deviation": round_to(observed_pct - expected_pct, 4),
                }),
            );
        }
        mad /= 9.0;
        let p_value = chi2_sf(chi2, 8.0);

        let (severity, conformity) = if mad > MAD_NONCONFORMITY {
            (Severity::Medium, "nonconformity")
        } else if mad > MAD_MARGINAL {
            (Severity::Low, "marginally acceptable conformity")
        } else if mad > MAD_ACCEPTABLE {
            (Severity::Pass, "acceptable conformity")
        } else {
            (Severity::Pass, "close conformity")
        };

        Ok(DiagnosticRecord::new(self.id(), &raw.name, severity)
            .with_value(round_to(mad, 6))
            .with_threshold(MAD_NONCONFORMITY)
            .with_message(format!(
                "Benford's law: MAD={:.4} ({}), χ²={:.2}, p={:.4}",
                mad, conformity, chi2, p_value
            ))
            .with_meta("chi2", round_to(chi2, 4))
            .with_meta("p_value", round_to(p_value, 6))
            .with_meta("mad", round_to(mad, 6))
            .with_meta("conformity", conformity)
            .with_meta("digit_distribution", Value::Object(distribution))
            .with_meta("n_values_tested", digits.len()))
    }
}
