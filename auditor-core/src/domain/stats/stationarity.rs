// auditor-core/src/domain/stats/stationarity.rs

// Augmented Dickey-Fuller test, constant-only regression, lag order picked by AIC.
// P-values follow MacKinnon's (1994) response surface for one variable.

use super::linalg::{OlsFit, ols};
use super::special::normal_cdf;
use super::StatsError;

#[derive(Debug, Clone, PartialEq)]
pub struct AdfResult {
    pub statistic: f64,
    pub p_value: f64,
    pub used_lag: usize,
    pub nobs: usize,
    /// Critical values at 1%, 5% and 10%.
    pub critical_values: [(&'static str, f64); 3],
    pub ic_best: f64,
}

impl AdfResult {
    /// Stationary when the unit-root hypothesis is rejected at `alpha`.
    pub fn is_stationary(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALLP: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGEP: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];
const CRIT_2010: [(&str, [f64; 4]); 3] = [
    ("1%", [-3.43035, -6.5393, -16.786, -79.433]),
    ("5%", [-2.86154, -2.8903, -4.234, -40.040]),
    ("10%", [-2.56677, -1.5384, -2.809, 0.0]),
];

fn poly(coef: &[f64], x: f64) -> f64 {
    coef.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// MacKinnon approximate p-value for a Dickey-Fuller statistic (constant, N = 1).
pub fn mackinnon_p(stat: f64) -> f64 {
    if stat > TAU_MAX {
        return 1.0;
    }
    if stat < TAU_MIN {
        return 0.0;
    }
    let coef: &[f64] = if stat <= TAU_STAR {
        &TAU_SMALLP
    } else {
        &TAU_LARGEP
    };
    normal_cdf(poly(coef, stat))
}

fn mackinnon_crit(nobs: usize) -> [(&'static str, f64); 3] {
    let n = nobs as f64;
    CRIT_2010.map(|(label, c)| (label, c[0] + c[1] / n + c[2] / (n * n) + c[3] / (n * n * n)))
}

/// Design for `lags` lagged differences over the last `nobs` observations:
/// columns are [level_{t-1}, Δ_{t-1}, …, Δ_{t-lags}, 1].
fn design(x: &[f64], diff: &[f64], lags: usize, nobs: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    let start = diff.len() - nobs;
    let mut rows = Vec::with_capacity(nobs);
    let mut target = Vec::with_capacity(nobs);
    for t in start..diff.len() {
        let mut row = Vec::with_capacity(lags + 2);
        row.push(x[t]);
        for l in 1..=lags {
            row.push(diff[t - l]);
        }
        row.push(1.0);
        rows.push(row);
        target.push(diff[t]);
    }
    (rows, target)
}

/// Runs the ADF test. Needs at least 10 observations.
pub fn adf_test(x: &[f64]) -> Result<AdfResult, StatsError> {
    let n = x.len();
    if n < 10 {
        return Err(StatsError::InsufficientData {
            test: "Augmented Dickey-Fuller",
            needed: 10,
            got: n,
        });
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(StatsError::NonFinite("Augmented Dickey-Fuller"));
    }
    let first = x[0];
    if x.iter().all(|v| *v == first) {
        return Err(StatsError::ZeroVariance("Augmented Dickey-Fuller"));
    }

    // maxlag = ceil(12 (n/100)^(1/4)), bounded so the regression keeps enough rows
    let max_lag = ((12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize).min(n / 2 - 2);
    let diff: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();

    // Every candidate is fitted on the same sample so AIC values compare.
    let nobs_search = diff.len() - max_lag;
    let mut best: Option<(f64, usize)> = None;
    for lags in 0..=max_lag {
        let (rows, target) = design(x, &diff, lags, nobs_search);
        let aic = match ols(&rows, &target) {
            Ok(fit) => fit.aic(),
            Err(StatsError::SingularMatrix) => continue,
            Err(e) => return Err(e),
        };
        if best.is_none_or(|(b, _)| aic < b) {
            best = Some((aic, lags));
        }
    }
    let (ic_best, used_lag) = best.ok_or(StatsError::SingularMatrix)?;

    let nobs = diff.len() - used_lag;
    let (rows, target) = design(x, &diff, used_lag, nobs);
    let fit: OlsFit = ols(&rows, &target)?;
    let statistic = fit.t_value(0);

    Ok(AdfResult {
        statistic,
        p_value: mackinnon_p(statistic),
        used_lag,
        nobs,
        critical_values: mackinnon_crit(nobs),
        ic_best,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_mackinnon_reference_points() {
        // 5% critical value for large samples maps to p ≈ 0.05
        assert!((mackinnon_p(-2.8615) - 0.05).abs() < 0.005);
        assert_eq!(mackinnon_p(3.0), 1.0);
        assert_eq!(mackinnon_p(-20.0), 0.0);
    }

    #[test]
    fn test_adf_white_noise_is_stationary() {
        let mut rng = StdRng::seed_from_u64(7);
        let x: Vec<f64> = (0..300).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let res = adf_test(&x).unwrap();
        assert!(res.statistic < res.critical_values[1].1);
        assert!(res.is_stationary(0.05));
        assert_eq!(res.critical_values[1].0, "5%");
    }

    #[test]
    fn test_adf_drifting_walk_is_not_stationary() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut level = 0.0;
        let x: Vec<f64> = (0..300)
            .map(|_| {
                level += rng.gen_range(0.0..1.0);
                level
            })
            .collect();
        let res = adf_test(&x).unwrap();
        assert!(!res.is_stationary(0.05));
    }

    #[test]
    fn test_adf_zero_mean_gaussian_walk_mostly_keeps_unit_root() {
        use super::super::special::normal_ppf;
        let mut kept = 0;
        for seed in 0..20u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut level = 0.0;
            let x: Vec<f64> = (0..300)
                .map(|_| {
                    level += normal_ppf(rng.gen_range(1e-12..1.0));
                    level
                })
                .collect();
            if !adf_test(&x).unwrap().is_stationary(0.05) {
                kept += 1;
            }
        }
        // size ≈ 5%: a handful of false rejections at most
        assert!(kept >= 15, "{} of 20", kept);
    }

    #[test]
    fn test_adf_rejects_short_or_constant() {
        assert!(adf_test(&[1.0; 5]).is_err());
        assert!(matches!(
            adf_test(&[2.0; 40]),
            Err(StatsError::ZeroVariance(_))
        ));
    }
}
