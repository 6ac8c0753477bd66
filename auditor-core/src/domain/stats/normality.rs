// auditor-core/src/domain/stats/normality.rs

use std::cmp::Ordering;
use std::f64::consts::PI;

use super::descriptive::{biased_kurtosis, biased_skewness, mean, std_dev};
use super::special::{chi2_sf, normal_cdf, normal_ppf, normal_sf};
use super::{StatsError, TestOutcome};

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    v
}

fn poly(coef: &[f64], x: f64) -> f64 {
    coef.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

// --- SHAPIRO-WILK (Royston 1995) ---

const SW_C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.071190, 4.434685, -2.706056];
const SW_C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const SW_C3: [f64; 4] = [0.5440, -0.39978, 0.025054, -6.714e-4];
const SW_C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const SW_C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const SW_C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const SW_G: [f64; 2] = [-2.273, 0.459];

fn shapiro_coefficients(n: usize) -> Vec<f64> {
    if n == 3 {
        let a = 0.5f64.sqrt();
        return vec![-a, 0.0, a];
    }
    let nf = n as f64;
    let m: Vec<f64> = (1..=n)
        .map(|i| normal_ppf((i as f64 - 0.375) / (nf + 0.25)))
        .collect();
    let summ2: f64 = m.iter().map(|v| v * v).sum();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / nf.sqrt();

    let mut a = vec![0.0; n];
    let a_n = m[n - 1] / ssumm2 + poly(&SW_C1, rsn);

    if n > 5 {
        let a_n1 = m[n - 2] / ssumm2 + poly(&SW_C2, rsn);
        let fac = ((summ2 - 2.0 * m[n - 1].powi(2) - 2.0 * m[n - 2].powi(2))
            / (1.0 - 2.0 * a_n.powi(2) - 2.0 * a_n1.powi(2)))
        .sqrt();
        for i in 2..n - 2 {
            a[i] = m[i] / fac;
        }
        a[1] = -a_n1;
        a[n - 2] = a_n1;
    } else {
        let fac = ((summ2 - 2.0 * m[n - 1].powi(2)) / (1.0 - 2.0 * a_n.powi(2))).sqrt();
        for i in 1..n - 1 {
            a[i] = m[i] / fac;
        }
    }
    a[0] = -a_n;
    a[n - 1] = a_n;
    a
}

/// Shapiro-Wilk W test, valid for 3 ≤ n ≤ 5000.
pub fn shapiro_wilk(values: &[f64]) -> Result<TestOutcome, StatsError> {
    let n = values.len();
    if n < 3 {
        return Err(StatsError::InsufficientData {
            test: "Shapiro-Wilk",
            needed: 3,
            got: n,
        });
    }
    let x = sorted(values);
    if x[n - 1] - x[0] <= 0.0 {
        return Err(StatsError::ZeroVariance("Shapiro-Wilk"));
    }

    let a = shapiro_coefficients(n);
    let m = mean(&x);
    let ssq: f64 = x.iter().map(|v| (v - m).powi(2)).sum();
    let num: f64 = a.iter().zip(x.iter()).map(|(ai, xi)| ai * xi).sum();
    let w = ((num * num) / ssq).min(1.0);

    let p_value = if n == 3 {
        let stqr = PI / 3.0;
        (6.0 / PI * (w.sqrt().asin() - stqr)).max(0.0)
    } else {
        let nf = n as f64;
        let y = (1.0 - w).ln();
        if n <= 11 {
            let gamma = poly(&SW_G, nf);
            if y >= gamma {
                0.0
            } else {
                let w1 = -(gamma - y).ln();
                let mu = poly(&SW_C3, nf);
                let sigma = poly(&SW_C4, nf).exp();
                normal_sf((w1 - mu) / sigma)
            }
        } else {
            let ln_n = nf.ln();
            let mu = poly(&SW_C5, ln_n);
            let sigma = poly(&SW_C6, ln_n).exp();
            normal_sf((y - mu) / sigma)
        }
    };

    Ok(TestOutcome::new(w, p_value))
}

// --- D'AGOSTINO-PEARSON K² ---

fn skew_z(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let b2 = biased_skewness(values);
    let y = b2 * (((n + 1.0) * (n + 3.0)) / (6.0 * (n - 2.0))).sqrt();
    let beta2 = 3.0 * (n * n + 27.0 * n - 70.0) * (n + 1.0) * (n + 3.0)
        / ((n - 2.0) * (n + 5.0) * (n + 7.0) * (n + 9.0));
    let w2 = -1.0 + (2.0 * (beta2 - 1.0)).sqrt();
    let delta = 1.0 / (0.5 * w2.ln()).sqrt();
    let alpha = (2.0 / (w2 - 1.0)).sqrt();
    delta * (y / alpha + ((y / alpha).powi(2) + 1.0).sqrt()).ln()
}

fn kurtosis_z(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let b2 = biased_kurtosis(values);
    let e = 3.0 * (n - 1.0) / (n + 1.0);
    let varb2 =
        24.0 * n * (n - 2.0) * (n - 3.0) / ((n + 1.0).powi(2) * (n + 3.0) * (n + 5.0));
    let x = (b2 - e) / varb2.sqrt();
    let sqrtbeta1 = 6.0 * (n * n - 5.0 * n + 2.0) / ((n + 7.0) * (n + 9.0))
        * (6.0 * (n + 3.0) * (n + 5.0) / (n * (n - 2.0) * (n - 3.0))).sqrt();
    let a = 6.0
        + 8.0 / sqrtbeta1 * (2.0 / sqrtbeta1 + (1.0 + 4.0 / (sqrtbeta1 * sqrtbeta1)).sqrt());
    let term1 = 1.0 - 2.0 / (9.0 * a);
    let denom = 1.0 + x * (2.0 / (a - 4.0)).sqrt();
    let term2 = if denom == 0.0 {
        f64::INFINITY
    } else {
        denom.signum() * ((1.0 - 2.0 / a) / denom.abs()).cbrt()
    };
    (term1 - term2) / (2.0 / (9.0 * a)).sqrt()
}

/// D'Agostino-Pearson omnibus test (skewness and kurtosis combined), n ≥ 8.
pub fn dagostino_k2(values: &[f64]) -> Result<TestOutcome, StatsError> {
    let n = values.len();
    if n < 8 {
        return Err(StatsError::InsufficientData {
            test: "D'Agostino K2",
            needed: 8,
            got: n,
        });
    }
    if std_dev(values) <= 0.0 {
        return Err(StatsError::ZeroVariance("D'Agostino K2"));
    }
    let k2 = skew_z(values).powi(2) + kurtosis_z(values).powi(2);
    if !k2.is_finite() {
        return Ok(TestOutcome::new(f64::INFINITY, 0.0));
    }
    Ok(TestOutcome::new(k2, chi2_sf(k2, 2.0)))
}

// --- ANDERSON-DARLING ---

#[derive(Debug, Clone, PartialEq)]
pub struct AndersonOutcome {
    pub statistic: f64,
    pub p_value: f64,
    /// Critical values at the 15%, 10%, 5%, 2.5% and 1% levels.
    pub critical_values: [f64; 5],
}

pub const ANDERSON_LEVELS: [f64; 5] = [15.0, 10.0, 5.0, 2.5, 1.0];

/// Anderson-Darling test against a normal with estimated mean and deviation.
pub fn anderson_darling(values: &[f64]) -> Result<AndersonOutcome, StatsError> {
    let n = values.len();
    if n < 8 {
        return Err(StatsError::InsufficientData {
            test: "Anderson-Darling",
            needed: 8,
            got: n,
        });
    }
    let x = sorted(values);
    let m = mean(&x);
    let s = std_dev(&x);
    if s <= 0.0 {
        return Err(StatsError::ZeroVariance("Anderson-Darling"));
    }
    let nf = n as f64;
    let z: Vec<f64> = x.iter().map(|v| (v - m) / s).collect();
    let mut acc = 0.0;
    for i in 0..n {
        let lower = normal_cdf(z[i]).max(f64::MIN_POSITIVE).ln();
        let upper = normal_sf(z[n - 1 - i]).max(f64::MIN_POSITIVE).ln();
        acc += (2.0 * (i as f64) + 1.0) * (lower + upper);
    }
    let a2 = -nf - acc / nf;
    let adjusted = a2 * (1.0 + 0.75 / nf + 2.25 / (nf * nf));

    // D'Agostino & Stephens (1986), case 3
    let p_value = if adjusted >= 0.6 {
        (1.2937 - 5.709 * adjusted + 0.0186 * adjusted * adjusted).exp()
    } else if adjusted >= 0.34 {
        (0.9177 - 4.279 * adjusted - 1.38 * adjusted * adjusted).exp()
    } else if adjusted >= 0.2 {
        1.0 - (-8.318 + 42.796 * adjusted - 59.938 * adjusted * adjusted).exp()
    } else {
        1.0 - (-13.436 + 101.14 * adjusted - 223.73 * adjusted * adjusted).exp()
    };

    let scale = 1.0 + 4.0 / nf - 25.0 / (nf * nf);
    let base = [0.576, 0.656, 0.787, 0.918, 1.092];
    let critical_values = base.map(|c| c / scale);

    Ok(AndersonOutcome {
        statistic: a2,
        p_value: p_value.clamp(0.0, 1.0),
        critical_values,
    })
}

// --- KOLMOGOROV-SMIRNOV / LILLIEFORS ---

/// Largest distance between the empirical CDF and N(mean, sd).
pub(crate) fn ks_distance_normal(values: &[f64], mean: f64, sd: f64) -> f64 {
    let x = sorted(values);
    let n = x.len() as f64;
    let mut d = 0.0f64;
    for (i, v) in x.iter().enumerate() {
        let cdf = normal_cdf((v - mean) / sd);
        let d_plus = (i as f64 + 1.0) / n - cdf;
        let d_minus = cdf - i as f64 / n;
        d = d.max(d_plus).max(d_minus);
    }
    d
}

/// Lilliefors test: KS against a normal whose parameters are estimated from the sample.
///
/// P-values use the Dallal-Wilkinson approximation, which is accurate below 0.1
/// and coarse above it.
pub fn lilliefors(values: &[f64]) -> Result<TestOutcome, StatsError> {
    let n = values.len();
    if n < 4 {
        return Err(StatsError::InsufficientData {
            test: "Lilliefors",
            needed: 4,
            got: n,
        });
    }
    let s = std_dev(values);
    if s <= 0.0 {
        return Err(StatsError::ZeroVariance("Lilliefors"));
    }
    let d = ks_distance_normal(values, mean(values), s);

    let (mut d_adj, mut nf) = (d, n as f64);
    if nf > 100.0 {
        d_adj *= (nf / 100.0).powf(0.49);
        nf = 100.0;
    }
    let p = (-7.01256 * d_adj * d_adj * (nf + 2.78019)
        + 2.99587 * d_adj * (nf + 2.78019).sqrt()
        - 0.122119
        + 0.974598 / nf.sqrt()
        + 1.67997 / nf)
        .exp();
    Ok(TestOutcome::new(d, p))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn normal_scores(n: usize) -> Vec<f64> {
        (1..=n)
            .map(|i| normal_ppf((i as f64 - 0.5) / n as f64) * 2.0 + 10.0)
            .collect()
    }

    // Exponential quantiles: long right tail
    fn skewed(n: usize) -> Vec<f64> {
        (1..=n)
            .map(|i| -(1.0 - (i as f64 - 0.5) / n as f64).ln())
            .collect()
    }

    #[test]
    fn test_shapiro_accepts_normal_scores() {
        let res = shapiro_wilk(&normal_scores(100)).unwrap();
        assert!(res.statistic > 0.98);
        assert!(res.p_value > 0.5);
    }

    #[test]
    fn test_shapiro_rejects_exponential_growth() {
        let res = shapiro_wilk(&skewed(60)).unwrap();
        assert!(res.p_value < 0.01);
    }

    #[test]
    fn test_shapiro_small_samples() {
        let res = shapiro_wilk(&[1.0, 2.0, 3.0]).unwrap();
        assert!((res.statistic - 1.0).abs() < 1e-9);
        assert!(shapiro_wilk(&[1.0, 2.0]).is_err());
        assert!(matches!(
            shapiro_wilk(&[4.0; 10]),
            Err(StatsError::ZeroVariance(_))
        ));
        let res = shapiro_wilk(&[1.0, 2.0, 3.5, 3.9, 5.0, 7.2, 7.5, 9.1]).unwrap();
        assert!(res.p_value > 0.05);
    }

    #[test]
    fn test_dagostino_on_large_samples() {
        assert!(dagostino_k2(&normal_scores(6000)).unwrap().p_value > 0.5);
        assert!(dagostino_k2(&skewed(6000)).unwrap().p_value < 1e-6);
    }

    #[test]
    fn test_anderson_darling() {
        let normal = anderson_darling(&normal_scores(200)).unwrap();
        assert!(normal.p_value > 0.2);
        assert!(normal.statistic < normal.critical_values[2]);
        let skew = anderson_darling(&skewed(200)).unwrap();
        assert!(skew.p_value < 0.01);
    }

    #[test]
    fn test_lilliefors() {
        assert!(lilliefors(&normal_scores(150)).unwrap().p_value > 0.05);
        assert!(lilliefors(&skewed(150)).unwrap().p_value < 0.05);
    }
}
