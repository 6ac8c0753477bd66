// auditor-core/src/domain/stats/linalg.rs

use super::StatsError;

/// Ordinary least squares fit.
#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    /// Sum of squared residuals.
    pub ssr: f64,
    pub nobs: usize,
    pub r_squared: f64,
}

impl OlsFit {
    pub fn t_value(&self, i: usize) -> f64 {
        self.coefficients[i] / self.std_errors[i]
    }

    /// Akaike information criterion under Gaussian errors.
    pub fn aic(&self) -> f64 {
        let n = self.nobs as f64;
        let llf = -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0);
        -2.0 * llf + 2.0 * self.coefficients.len() as f64
    }
}

/// Inverts a symmetric positive matrix by Gauss-Jordan elimination with partial pivoting.
fn invert(mut m: Vec<Vec<f64>>) -> Result<Vec<Vec<f64>>, StatsError> {
    let k = m.len();
    let scale = m
        .iter()
        .enumerate()
        .map(|(i, row)| row[i].abs())
        .fold(0.0f64, f64::max)
        .max(1.0);
    let mut inv: Vec<Vec<f64>> = (0..k)
        .map(|i| (0..k).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..k {
        let pivot = (col..k)
            .max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))
            .unwrap_or(col);
        if m[pivot][col].abs() < 1e-12 * scale {
            return Err(StatsError::SingularMatrix);
        }
        m.swap(col, pivot);
        inv.swap(col, pivot);

        let p = m[col][col];
        for j in 0..k {
            m[col][j] /= p;
            inv[col][j] /= p;
        }
        for row in 0..k {
            if row == col {
                continue;
            }
            let factor = m[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..k {
                m[row][j] -= factor * m[col][j];
                inv[row][j] -= factor * inv[col][j];
            }
        }
    }
    Ok(inv)
}

/// Least squares of `y` on the design matrix `x` (one row per observation).
/// Add a column of ones to `x` for an intercept.
pub fn ols(x: &[Vec<f64>], y: &[f64]) -> Result<OlsFit, StatsError> {
    let n = y.len();
    let k = x.first().map(Vec::len).unwrap_or(0);
    if k == 0 || n <= k || x.len() != n {
        return Err(StatsError::InsufficientData {
            test: "least squares",
            needed: k + 1,
            got: n,
        });
    }
    if x.iter().flatten().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(StatsError::NonFinite("least squares"));
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, yi) in x.iter().zip(y.iter()) {
        for i in 0..k {
            xty[i] += row[i] * yi;
            for j in i..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            xtx[i][j] = xtx[j][i];
        }
    }

    let inv = invert(xtx)?;
    let coefficients: Vec<f64> = (0..k)
        .map(|i| (0..k).map(|j| inv[i][j] * xty[j]).sum())
        .collect();

    let y_mean = y.iter().sum::<f64>() / n as f64;
    let mut ssr = 0.0;
    let mut sst = 0.0;
    for (row, yi) in x.iter().zip(y.iter()) {
        let fitted: f64 = row.iter().zip(coefficients.iter()).map(|(a, b)| a * b).sum();
        ssr += (yi - fitted).powi(2);
        sst += (yi - y_mean).powi(2);
    }
    let sigma2 = ssr / (n - k) as f64;
    let std_errors = (0..k).map(|i| (sigma2 * inv[i][i]).max(0.0).sqrt()).collect();
    let r_squared = if sst > 0.0 { 1.0 - ssr / sst } else { 0.0 };

    Ok(OlsFit {
        coefficients,
        std_errors,
        ssr,
        nobs: n,
        r_squared,
    })
}
