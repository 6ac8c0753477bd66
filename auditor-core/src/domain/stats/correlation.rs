// auditor-core/src/domain/stats/correlation.rs

use super::StatsError;
use super::descriptive::{mean, rank_average};
use super::inference::chi2_contingency;
use super::special::student_t_two_sided;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlation {
    pub r: f64,
    pub p_value: f64,
    pub n: usize,
}

/// Pearson correlation with a two-sided t-based p-value.
pub fn pearson(x: &[f64], y: &[f64]) -> Result<Correlation, StatsError> {
    let n = x.len().min(y.len());
    if n < 3 {
        return Err(StatsError::InsufficientData {
            test: "Pearson correlation",
            needed: 3,
            got: n,
        });
    }
    let (x, y) = (&x[..n], &y[..n]);
    let (mx, my) = (mean(x), mean(y));
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return Err(StatsError::ZeroVariance("Pearson correlation"));
    }
    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    let df = (n - 2) as f64;
    let p_value = if r.abs() >= 1.0 {
        0.0
    } else {
        student_t_two_sided(r * (df / (1.0 - r * r)).sqrt(), df)
    };
    Ok(Correlation { r, p_value, n })
}

/// Spearman rank correlation (Pearson on average ranks).
pub fn spearman(x: &[f64], y: &[f64]) -> Result<Correlation, StatsError> {
    let n = x.len().min(y.len());
    pearson(&rank_average(&x[..n]), &rank_average(&y[..n]))
}

/// Cramér's V association strength for a contingency table, with its chi-square p-value.
pub fn cramers_v(table: &[Vec<f64>]) -> Result<(f64, f64), StatsError> {
    let outcome = chi2_contingency(table)?;
    let n: f64 = table.iter().flatten().sum();
    let min_dim = table.len().min(table.first().map(Vec::len).unwrap_or(0)) - 1;
    if n <= 0.0 || min_dim == 0 {
        return Ok((0.0, outcome.p_value));
    }
    let v = (outcome.statistic / (n * min_dim as f64)).sqrt();
    Ok((v.min(1.0), outcome.p_value))
}
