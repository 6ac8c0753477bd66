// auditor-core/src/domain/stats/inference.rs

// Two-sample, k-sample and goodness-of-fit tests used by the checks.

use super::descriptive::{mean, median, rank_average, std_dev, tie_term, variance};
use super::normality::ks_distance_normal;
use super::special::{chi2_sf, f_sf, kolmogorov_sf, normal_sf, student_t_two_sided};
use super::{StatsError, TestOutcome};

fn require(test: &'static str, needed: usize, got: usize) -> Result<(), StatsError> {
    if got < needed {
        return Err(StatsError::InsufficientData { test, needed, got });
    }
    Ok(())
}

/// Outcome when the test statistic divides by a zero spread: the groups either
/// differ (certain rejection) or are identical (no evidence).
fn degenerate(differ: bool) -> TestOutcome {
    if differ {
        TestOutcome::new(f64::INFINITY, 0.0)
    } else {
        TestOutcome::new(0.0, 1.0)
    }
}

/// Welch's unequal-variance t-test, two-sided.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Result<TestOutcome, StatsError> {
    require("Welch t-test", 2, a.len().min(b.len()))?;
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (m1, m2) = (mean(a), mean(b));
    let (v1, v2) = (variance(a) / n1, variance(b) / n2);
    let se2 = v1 + v2;
    if se2 <= 0.0 {
        return Ok(degenerate(m1 != m2));
    }
    let t = (m1 - m2) / se2.sqrt();
    let df = se2 * se2 / (v1 * v1 / (n1 - 1.0) + v2 * v2 / (n2 - 1.0));
    Ok(TestOutcome::new(t, student_t_two_sided(t, df)))
}

/// Mann-Whitney U, two-sided, normal approximation with tie and continuity corrections.
/// The statistic is U for the first sample.
pub fn mann_whitney_u(a: &[f64], b: &[f64]) -> Result<TestOutcome, StatsError> {
    require("Mann-Whitney U", 1, a.len().min(b.len()))?;
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let combined: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
    let ranks = rank_average(&combined);
    let r1: f64 = ranks[..a.len()].iter().sum();
    let u1 = r1 - n1 * (n1 + 1.0) / 2.0;
    let u2 = n1 * n2 - u1;
    let n = n1 + n2;

    let mu = n1 * n2 / 2.0;
    let sigma2 = n1 * n2 / 12.0 * ((n + 1.0) - tie_term(&combined) / (n * (n - 1.0)));
    if sigma2 <= 0.0 {
        return Ok(TestOutcome::new(u1, 1.0));
    }
    let z = (u1.max(u2) - mu - 0.5) / sigma2.sqrt();
    Ok(TestOutcome::new(u1, 2.0 * normal_sf(z)))
}

/// Bartlett's test for equal variances across groups.
pub fn bartlett(groups: &[&[f64]]) -> Result<TestOutcome, StatsError> {
    require("Bartlett", 2, groups.len())?;
    let min_len = groups.iter().map(|g| g.len()).min().unwrap_or(0);
    require("Bartlett", 2, min_len)?;

    let k = groups.len() as f64;
    let sizes: Vec<f64> = groups.iter().map(|g| g.len() as f64).collect();
    let vars: Vec<f64> = groups.iter().map(|g| variance(g)).collect();
    if vars.iter().any(|v| *v <= 0.0) {
        let first = vars[0];
        return Ok(degenerate(vars.iter().any(|v| *v != first)));
    }
    let n_total: f64 = sizes.iter().sum();
    let pooled = sizes
        .iter()
        .zip(vars.iter())
        .map(|(n, v)| (n - 1.0) * v)
        .sum::<f64>()
        / (n_total - k);
    let numer = (n_total - k) * pooled.ln()
        - sizes
            .iter()
            .zip(vars.iter())
            .map(|(n, v)| (n - 1.0) * v.ln())
            .sum::<f64>();
    let denom = 1.0
        + (sizes.iter().map(|n| 1.0 / (n - 1.0)).sum::<f64>() - 1.0 / (n_total - k))
            / (3.0 * (k - 1.0));
    let t = numer / denom;
    Ok(TestOutcome::new(t, chi2_sf(t, k - 1.0)))
}

/// Levene's test centred on group medians (Brown-Forsythe variant).
pub fn levene_median(groups: &[&[f64]]) -> Result<TestOutcome, StatsError> {
    require("Levene", 2, groups.len())?;
    let min_len = groups.iter().map(|g| g.len()).min().unwrap_or(0);
    require("Levene", 2, min_len)?;

    let k = groups.len() as f64;
    let deviations: Vec<Vec<f64>> = groups
        .iter()
        .map(|g| {
            let med = median(g);
            g.iter().map(|x| (x - med).abs()).collect()
        })
        .collect();
    let n_total: f64 = deviations.iter().map(|d| d.len() as f64).sum();
    let group_means: Vec<f64> = deviations.iter().map(|d| mean(d)).collect();
    let grand_mean = deviations.iter().flatten().sum::<f64>() / n_total;

    let between: f64 = deviations
        .iter()
        .zip(group_means.iter())
        .map(|(d, m)| d.len() as f64 * (m - grand_mean).powi(2))
        .sum();
    let within: f64 = deviations
        .iter()
        .zip(group_means.iter())
        .map(|(d, m)| d.iter().map(|z| (z - m).powi(2)).sum::<f64>())
        .sum();
    if within <= 0.0 {
        return Ok(degenerate(between > 0.0));
    }
    let w = (n_total - k) / (k - 1.0) * between / within;
    Ok(TestOutcome::new(w, f_sf(w, k - 1.0, n_total - k)))
}

/// Wilcoxon signed-rank test on paired samples, two-sided. Zero differences are dropped.
///
/// Exact null distribution up to 50 pairs without ties, normal approximation otherwise.
pub fn wilcoxon_signed_rank(a: &[f64], b: &[f64]) -> Result<TestOutcome, StatsError> {
    let diffs: Vec<f64> = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| x - y)
        .filter(|d| *d != 0.0)
        .collect();
    let n = diffs.len();
    if n == 0 {
        return Ok(TestOutcome::new(0.0, 1.0));
    }
    let abs: Vec<f64> = diffs.iter().map(|d| d.abs()).collect();
    let ranks = rank_average(&abs);
    let r_plus: f64 = diffs
        .iter()
        .zip(ranks.iter())
        .filter(|(d, _)| **d > 0.0)
        .map(|(_, r)| r)
        .sum();
    let nf = n as f64;
    let r_minus = nf * (nf + 1.0) / 2.0 - r_plus;
    let t = r_plus.min(r_minus);
    let ties = tie_term(&abs);

    if n <= 50 && ties == 0.0 {
        // Exact: number of subsets of {1..n} per rank sum
        let max_sum = n * (n + 1) / 2;
        let mut counts = vec![0.0f64; max_sum + 1];
        counts[0] = 1.0;
        for rank in 1..=n {
            for s in (rank..=max_sum).rev() {
                counts[s] += counts[s - rank];
            }
        }
        let total = 2f64.powi(n as i32);
        let cdf: f64 = counts[..=(t as usize)].iter().sum::<f64>() / total;
        return Ok(TestOutcome::new(t, 2.0 * cdf));
    }

    let mn = nf * (nf + 1.0) / 4.0;
    let se2 = nf * (nf + 1.0) * (2.0 * nf + 1.0) / 24.0 - ties / 48.0;
    if se2 <= 0.0 {
        return Ok(TestOutcome::new(t, 1.0));
    }
    let z = (t - mn) / se2.sqrt();
    Ok(TestOutcome::new(t, 2.0 * normal_sf(z.abs())))
}

/// One-sample KS against a normal fitted with the sample mean and deviation.
pub fn ks_normal_fit(values: &[f64]) -> Result<TestOutcome, StatsError> {
    require("KS goodness-of-fit", 2, values.len())?;
    let s = std_dev(values);
    if s <= 0.0 {
        return Err(StatsError::ZeroVariance("KS goodness-of-fit"));
    }
    let d = ks_distance_normal(values, mean(values), s);
    let en = (values.len() as f64).sqrt();
    Ok(TestOutcome::new(d, kolmogorov_sf((en + 0.12 + 0.11 / en) * d)))
}

/// Two-sample Kolmogorov-Smirnov test (asymptotic p-value).
pub fn ks_two_sample(a: &[f64], b: &[f64]) -> Result<TestOutcome, StatsError> {
    require("KS two-sample", 1, a.len().min(b.len()))?;
    let mut x = a.to_vec();
    let mut y = b.to_vec();
    x.sort_by(f64::total_cmp);
    y.sort_by(f64::total_cmp);
    let (n1, n2) = (x.len(), y.len());

    let (mut i, mut j) = (0usize, 0usize);
    let mut d = 0.0f64;
    while i < n1 && j < n2 {
        let v = x[i].min(y[j]);
        while i < n1 && x[i] <= v {
            i += 1;
        }
        while j < n2 && y[j] <= v {
            j += 1;
        }
        d = d.max((i as f64 / n1 as f64 - j as f64 / n2 as f64).abs());
    }

    let en = ((n1 * n2) as f64 / (n1 + n2) as f64).sqrt();
    Ok(TestOutcome::new(d, kolmogorov_sf((en + 0.12 + 0.11 / en) * d)))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContingencyOutcome {
    pub statistic: f64,
    pub p_value: f64,
    pub dof: usize,
}

/// Chi-square test of independence on an r×c table of counts.
/// Yates' continuity correction is applied when there is one degree of freedom.
pub fn chi2_contingency(table: &[Vec<f64>]) -> Result<ContingencyOutcome, StatsError> {
    let rows = table.len();
    let cols = table.first().map(Vec::len).unwrap_or(0);
    require("Chi-square contingency", 2, rows.min(cols))?;

    let row_totals: Vec<f64> = table.iter().map(|r| r.iter().sum()).collect();
    let col_totals: Vec<f64> = (0..cols)
        .map(|c| table.iter().map(|r| r.get(c).copied().unwrap_or(0.0)).sum())
        .collect();
    let total: f64 = row_totals.iter().sum();
    if total <= 0.0 {
        return Err(StatsError::ZeroVariance("Chi-square contingency"));
    }

    let dof = (rows - 1) * (cols - 1);
    let mut chi2 = 0.0;
    for (r, row) in table.iter().enumerate() {
        for (c, observed) in row.iter().enumerate() {
            let expected = row_totals[r] * col_totals[c] / total;
            if expected <= 0.0 {
                continue;
            }
            let mut diff = (observed - expected).abs();
            if dof == 1 {
                diff = (diff - 0.5).max(0.0);
            }
            chi2 += diff * diff / expected;
        }
    }
    Ok(ContingencyOutcome {
        statistic: chi2,
        p_value: chi2_sf(chi2, dof as f64).clamp(0.0, 1.0),
        dof,
    })
}

/// Kruskal-Wallis H test with tie correction.
pub fn kruskal_wallis(groups: &[&[f64]]) -> Result<TestOutcome, StatsError> {
    require("Kruskal-Wallis", 2, groups.len())?;
    let combined: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
    let n = combined.len() as f64;
    require("Kruskal-Wallis", 2, combined.len())?;
    let ranks = rank_average(&combined);

    let mut offset = 0;
    let mut sum_term = 0.0;
    for g in groups {
        if g.is_empty() {
            continue;
        }
        let r: f64 = ranks[offset..offset + g.len()].iter().sum();
        sum_term += r * r / g.len() as f64;
        offset += g.len();
    }
    let h = 12.0 / (n * (n + 1.0)) * sum_term - 3.0 * (n + 1.0);
    let correction = 1.0 - tie_term(&combined) / (n * n * n - n);
    if correction <= 0.0 {
        return Ok(TestOutcome::new(0.0, 1.0));
    }
    let h = h / correction;
    Ok(TestOutcome::new(h, chi2_sf(h, groups.len() as f64 - 1.0)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Increasing,
    Decreasing,
    NoTrend,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::NoTrend => "no trend",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MannKendall {
    pub trend: Trend,
    pub p_value: f64,
    pub tau: f64,
    pub z: f64,
}

const MANN_KENDALL_MAX_POINTS: usize = 2000;

/// Mann-Kendall monotonic trend test. Long series are thinned with a fixed stride.
pub fn mann_kendall(values: &[f64], alpha: f64) -> Result<MannKendall, StatsError> {
    require("Mann-Kendall", 3, values.len())?;
    let stride = values.len().div_ceil(MANN_KENDALL_MAX_POINTS);
    let x: Vec<f64> = values.iter().step_by(stride).copied().collect();
    let n = x.len() as f64;

    let mut s = 0.0;
    for i in 0..x.len() {
        for j in i + 1..x.len() {
            s += (x[j] - x[i]).signum() * f64::from(x[j] != x[i]);
        }
    }
    let ties: f64 = {
        let mut sorted = x.clone();
        sorted.sort_by(f64::total_cmp);
        let mut total = 0.0;
        let mut i = 0;
        while i < sorted.len() {
            let mut j = i;
            while j + 1 < sorted.len() && sorted[j + 1] == sorted[i] {
                j += 1;
            }
            let t = (j - i + 1) as f64;
            total += t * (t - 1.0) * (2.0 * t + 5.0);
            i = j + 1;
        }
        total
    };
    let var_s = (n * (n - 1.0) * (2.0 * n + 5.0) - ties) / 18.0;
    let z = if var_s <= 0.0 {
        0.0
    } else if s > 0.0 {
        (s - 1.0) / var_s.sqrt()
    } else if s < 0.0 {
        (s + 1.0) / var_s.sqrt()
    } else {
        0.0
    };
    let p_value = (2.0 * normal_sf(z.abs())).clamp(0.0, 1.0);
    let trend = if p_value < alpha && z > 0.0 {
        Trend::Increasing
    } else if p_value < alpha && z < 0.0 {
        Trend::Decreasing
    } else {
        Trend::NoTrend
    };
    Ok(MannKendall {
        trend,
        p_value,
        tau: s / (n * (n - 1.0) / 2.0),
        z,
    })
}
