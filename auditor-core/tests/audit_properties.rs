// auditor-core/tests/audit_properties.rs

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use auditor_core::application::{CheckExecutor, collect_flagged_rows};
use auditor_core::domain::checks::universal::{ConstantColumn, NearConstant, NullRate, WhitespaceIssues};
use auditor_core::domain::checks::{Check, CheckContext, CheckError};
use auditor_core::domain::model::{DATASET_SCOPE, RawColumn, TypedColumn};
use auditor_core::domain::stats::special::normal_ppf;
use auditor_core::infrastructure::error::InfrastructureError;
use auditor_core::{
    AuditError, CheckCatalog, Dataset, DiagnosticRecord, RunConfiguration, ScoringAggregator, SemanticType,
    SemanticTypeClassifier, Severity, audit_with_config_file, load_run_config, parse_run_config, run_audit,
};

// --- Jeux de données synthétiques ---

fn as_strings(values: &[f64]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Exact normal quantiles in random order: i.i.d.-looking noise without sampling luck.
fn normal_noise(n: usize, seed: u64) -> Vec<f64> {
    let mut v: Vec<f64> = (1..=n)
        .map(|i| 100.0 + 5.0 * normal_ppf((i as f64 - 0.5) / n as f64))
        .collect();
    v.shuffle(&mut StdRng::seed_from_u64(seed));
    v
}

fn random_walk(n: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut level = 0.0;
    (0..n)
        .map(|_| {
            level += rng.gen_range(0.0..1.0);
            level
        })
        .collect()
}

/// Box-Muller draw from N(0, 1).
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.gen_range(0.0..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn gaussian_noise(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| 100.0 + 5.0 * gaussian(&mut rng)).collect()
}

/// Cumulative sum of N(0, 1) steps: zero drift, unit root.
fn gaussian_walk(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut level = 0.0;
    (0..n)
        .map(|_| {
            level += gaussian(&mut rng);
            level
        })
        .collect()
}

fn step_change() -> Vec<f64> {
    let mut v = vec![50.0; 50];
    v.extend(vec![100.0; 50]);
    v
}

fn record<'a>(records: &'a [DiagnosticRecord], check_id: &str, column: &str) -> Result<&'a DiagnosticRecord> {
    records
        .iter()
        .find(|r| r.check_id == check_id && r.column == column)
        .with_context(|| format!("no {} record for {}", check_id, column))
}

// --- Classification ---

#[test]
fn classifier_is_deterministic() -> Result<()> {
    let ids: Vec<String> = (0..300).map(|i| format!("CUST-{:05}", i)).collect();
    let mut rng = StdRng::seed_from_u64(7);
    let cities: Vec<String> = (0..300)
        .map(|_| ["Lyon", "Paris", "Nantes"][rng.gen_range(0..3)].to_string())
        .collect();
    let ds = Dataset::from_raw(vec![
        RawColumn::new("id", ids),
        RawColumn::new("city", cities),
        RawColumn::new("amount", as_strings(&normal_noise(300, 1))),
    ])?;

    let classifier = SemanticTypeClassifier::new();
    let first = classifier.classify_dataset(&ds);
    for _ in 0..5 {
        assert_eq!(classifier.classify_dataset(&ds), first);
    }
    assert_eq!(first.len(), 3);
    assert_eq!(first.get("id"), Some(SemanticType::IdCandidate));
    assert_eq!(first.get("city"), Some(SemanticType::Categorical));
    assert_eq!(first.get("amount"), Some(SemanticType::NumericContinuous));
    Ok(())
}

// --- Routage d'hypothèses ---

#[test]
fn step_change_fails_mean_shift_with_high_severity() -> Result<()> {
    let ds = Dataset::from_raw(vec![RawColumn::new("level", as_strings(&step_change()))])?;
    let report = run_audit(&ds, &RunConfiguration::default());

    let shift = record(&report.records, "MEAN_SHIFT", "level")?;
    assert!(!shift.passed);
    assert_eq!(shift.severity, Severity::High);
    assert_eq!(shift.metadata["diff_pct"], 100.0);
    Ok(())
}

#[test]
fn normal_noise_takes_parametric_route_and_is_stationary() -> Result<()> {
    // Each half is a full set of quantiles, so both pass the normality gate.
    let mut noise = normal_noise(120, 3);
    noise.extend(normal_noise(120, 4));
    let ds = Dataset::from_raw(vec![RawColumn::new("noise", as_strings(&noise))])?;
    let report = run_audit(&ds, &RunConfiguration::default());

    let shift = record(&report.records, "MEAN_SHIFT", "noise")?;
    assert_eq!(shift.metadata["route"], "parametric");
    assert_eq!(shift.metadata["test"], "Welch t-test");

    let adf = record(&report.records, "ADF_STATIONARITY", "noise")?;
    assert!(adf.passed, "{}", adf.message);
    Ok(())
}

#[test]
fn random_walk_is_not_stationary() -> Result<()> {
    let ds = Dataset::from_raw(vec![RawColumn::new("walk", as_strings(&random_walk(240)))])?;
    let report = run_audit(&ds, &RunConfiguration::default());

    let adf = record(&report.records, "ADF_STATIONARITY", "walk")?;
    assert!(!adf.passed);
    assert_ne!(adf.severity, Severity::Pass);
    Ok(())
}

#[test]
fn sampled_gaussian_noise_is_stationary_and_mostly_parametric() -> Result<()> {
    let seeds = 0..10u64;
    let mut parametric = 0;
    for seed in seeds.clone() {
        let ds = Dataset::from_raw(vec![RawColumn::new("noise", as_strings(&gaussian_noise(300, seed)))])?;
        let report = run_audit(&ds, &RunConfiguration::default());

        let adf = record(&report.records, "ADF_STATIONARITY", "noise")?;
        assert!(adf.passed, "seed {}: {}", seed, adf.message);

        let shift = record(&report.records, "MEAN_SHIFT", "noise")?;
        let route = shift.metadata["route"].as_str().context("route is recorded")?;
        assert!(route == "parametric" || route == "nonparametric", "seed {}: {}", seed, route);
        if route == "parametric" {
            parametric += 1;
        }
    }
    // Normality gates reject a few honest samples at the 5% level.
    assert!(parametric >= 6, "{} of {} seeds took the parametric route", parametric, seeds.count());
    Ok(())
}

#[test]
fn sampled_gaussian_walk_is_mostly_flagged_non_stationary() -> Result<()> {
    let mut flagged = 0;
    for seed in 0..10u64 {
        let ds = Dataset::from_raw(vec![RawColumn::new("walk", as_strings(&gaussian_walk(300, seed)))])?;
        let report = run_audit(&ds, &RunConfiguration::default());
        let adf = record(&report.records, "ADF_STATIONARITY", "walk")?;
        if !adf.passed {
            assert_ne!(adf.severity, Severity::Pass);
            flagged += 1;
        }
    }
    // A unit root is falsely rejected about 5% of the time.
    assert!(flagged >= 7, "only {} of 10 walks flagged", flagged);
    Ok(())
}

// --- Scoring ---

#[test]
fn column_score_is_monotone_and_clamped() {
    let aggregator = ScoringAggregator::default();
    let mut records = Vec::new();
    let mut previous = 100.0;
    for severity in [Severity::Info, Severity::Low, Severity::Medium, Severity::High, Severity::Critical].repeat(3) {
        records.push(DiagnosticRecord::new("X", "a", severity));
        let score = aggregator.column_score(&records);
        assert!(score <= previous);
        assert!((0.0..=100.0).contains(&score));
        previous = score;
    }
    assert_eq!(previous, 0.0);
}

#[test]
fn equal_column_scores_give_the_same_dataset_score() {
    let records = vec![
        DiagnosticRecord::new("NULL_RATE", "dense", Severity::High),
        DiagnosticRecord::new("NULL_RATE", "sparse", Severity::High),
    ];
    let nulls = BTreeMap::from([("dense".to_string(), 0.0), ("sparse".to_string(), 0.6)]);
    let report = ScoringAggregator::default().score(&records, &nulls);
    assert_eq!(report.dataset_score, 90.0);
    assert_eq!(report.issues_by_severity[&Severity::High], 2);
}

#[test]
fn audit_scores_stay_in_range() -> Result<()> {
    let mut noisy: Vec<String> = as_strings(&normal_noise(200, 9));
    for i in (0..200).step_by(4) {
        noisy[i] = String::new();
    }
    noisy[10] = "  42 ".to_string();
    let ds = Dataset::from_raw(vec![
        RawColumn::new("noisy", noisy),
        RawColumn::new("steady", as_strings(&step_change().repeat(2))),
    ])?;
    let report = run_audit(&ds, &RunConfiguration::default());

    assert!((0.0..=100.0).contains(&report.score.dataset_score));
    for column in &report.score.columns {
        assert!((0.0..=100.0).contains(&column.score), "{}", column.column);
    }
    assert!(report.score.column("noisy").is_some());
    // NULL_RATE names its rows; they surface as 1-based flagged rows.
    assert!(report.flagged_rows.iter().any(|r| r.check_id == "NULL_RATE" && r.row_number == 1));
    assert_eq!(report.flagged_rows, collect_flagged_rows(&ds, &report.records));
    Ok(())
}

// --- Isolation des erreurs ---

struct Panicky;

impl Check for Panicky {
    fn id(&self) -> &'static str {
        "PANICKY"
    }

    fn title(&self) -> &'static str {
        "Always errors"
    }

    fn run(&self, _: &RawColumn, _: &TypedColumn, _: &CheckContext<'_>) -> Result<DiagnosticRecord, CheckError> {
        Err(CheckError::Computation("division by zero".into()))
    }
}

#[test]
fn one_failing_check_never_aborts_the_run() -> Result<()> {
    let catalog = CheckCatalog::new(vec![
        Arc::new(NullRate),
        Arc::new(Panicky),
        Arc::new(WhitespaceIssues),
        Arc::new(ConstantColumn),
        Arc::new(NearConstant),
    ]);
    let ds = Dataset::from_raw(vec![RawColumn::from_strs("a", &["x", "y", "", "z"])])?;
    let types = SemanticTypeClassifier::new().classify_dataset(&ds);

    let records = CheckExecutor::with_catalog(&catalog, RunConfiguration::default())
        .with_analyses(vec![])
        .execute(&ds, &types);

    assert_eq!(records.len(), 5);
    let info: Vec<&DiagnosticRecord> = records.iter().filter(|r| r.check_id == "PANICKY").collect();
    assert_eq!(info.len(), 1);
    assert_eq!(info[0].severity, Severity::Info);
    assert!(info[0].message.contains("Computation"));
    assert!(info[0].message.contains("division by zero"));
    Ok(())
}

#[test]
fn duplicate_rows_run_once_for_the_whole_dataset() -> Result<()> {
    let ds = Dataset::from_raw(vec![
        RawColumn::from_strs("a", &["1", "1", "2"]),
        RawColumn::from_strs("b", &["x", "x", "y"]),
        RawColumn::from_strs("c", &["p", "p", "q"]),
    ])?;
    let report = run_audit(&ds, &RunConfiguration::default());
    let dups: Vec<_> = report.records_for("DUPLICATE_ROWS").collect();
    assert_eq!(dups.len(), 1);
    assert_eq!(dups[0].column, DATASET_SCOPE);
    assert!(!dups[0].passed);
    Ok(())
}

// --- Configuration ---

#[test]
fn invalid_severity_override_is_rejected_before_any_check() -> Result<()> {
    let yaml = "severity_overrides:\n  MEAN_SHIFT: SUPER_CRITICAL\n";
    let err = parse_run_config(yaml).err().context("config should be rejected")?;
    assert!(matches!(err, InfrastructureError::ConfigValidation(_)));

    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(yaml.as_bytes())?;
    assert!(load_run_config(file.path()).is_err());
    Ok(())
}

#[test]
fn config_file_is_validated_before_the_audit() -> Result<()> {
    let ds = Dataset::from_raw(vec![RawColumn::new("level", as_strings(&step_change()))])?;

    let mut bad = tempfile::NamedTempFile::new()?;
    bad.write_all(b"severity_overrides:\n  MEAN_SHIFT: SUPER_CRITICAL\n")?;
    let err = audit_with_config_file(&ds, bad.path()).err().context("bad config should stop the audit")?;
    assert!(matches!(err, AuditError::Infrastructure(InfrastructureError::ConfigValidation(_))));

    let mut good = tempfile::NamedTempFile::new()?;
    good.write_all(b"severity_overrides:\n  MEAN_SHIFT: LOW\n")?;
    let report = audit_with_config_file(&ds, good.path())?;
    assert_eq!(record(&report.records, "MEAN_SHIFT", "level")?.severity, Severity::Low);
    Ok(())
}

#[test]
fn configuration_drives_the_run() -> Result<()> {
    let config = parse_run_config(
        r#"
disabled_checks: [BENFORD_LAW, TIMESERIES, NULL_PATTERNS]
severity_overrides:
  MEAN_SHIFT: LOW
scoring:
  LOW: 7
"#,
    )?;
    let ds = Dataset::from_raw(vec![RawColumn::new("level", as_strings(&step_change()))])?;
    let report = run_audit(&ds, &config);

    assert_eq!(report.records_for("BENFORD_LAW").count(), 0);
    assert_eq!(report.records_for("AUTOCORRELATION").count(), 0);
    let shift = record(&report.records, "MEAN_SHIFT", "level")?;
    assert_eq!(shift.severity, Severity::Low);
    Ok(())
}
