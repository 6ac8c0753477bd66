// auditor-core/src/infrastructure/config/mod.rs

// YAML audit configuration: deserialization, eager validation and
// conversion into the immutable `RunConfiguration` handed to the executor.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use validator::{Validate, ValidationError};

use crate::domain::catalog::CheckCatalog;
use crate::domain::checks::ThresholdOverrides;
use crate::domain::dataset_checks::standard_analyses;
use crate::domain::error::DomainError;
use crate::domain::model::Severity;
use crate::infrastructure::error::InfrastructureError;

// --- 1. DOCUMENT YAML (DTO) ---

/// Audit configuration as written by the user. Every section is optional.
///
/// ```yaml
/// thresholds:
///   NULL_RATE: { HIGH: 0.3, MEDIUM: 0.1 }
/// disabled_checks: [BENFORD_LAW, PII_DETECTION]
/// severity_overrides:
///   OUTLIER_IQR: LOW
/// scoring: { CRITICAL: 30 }
/// column_weights: { amount: 2.0 }
/// ```
#[derive(Debug, Serialize, Deserialize, Validate, Clone, Default, PartialEq)]
pub struct AuditConfig {
    #[serde(default)]
    #[validate(custom(function = "validate_thresholds"))]
    pub thresholds: BTreeMap<String, BTreeMap<String, f64>>,

    #[serde(default)]
    pub disabled_checks: Vec<String>,

    #[serde(default)]
    #[validate(custom(function = "validate_severity_overrides"))]
    pub severity_overrides: BTreeMap<String, String>,

    #[serde(default)]
    #[validate(custom(function = "validate_scoring"))]
    pub scoring: BTreeMap<String, f64>,

    #[serde(default)]
    #[validate(custom(function = "validate_column_weights"))]
    pub column_weights: BTreeMap<String, f64>,
}

// --- 2. CONFIGURATION TYPÉE (immuable) ---

/// Validated configuration of one audit run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfiguration {
    pub thresholds: ThresholdOverrides,
    pub disabled_checks: BTreeSet<String>,
    pub severity_overrides: BTreeMap<String, Severity>,
    /// Score deduction per severity, defaults filled in.
    pub deductions: BTreeMap<Severity, f64>,
    pub column_weights: BTreeMap<String, f64>,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            thresholds: ThresholdOverrides::new(),
            disabled_checks: BTreeSet::new(),
            severity_overrides: BTreeMap::new(),
            deductions: Severity::ALL
                .iter()
                .map(|s| (*s, s.default_deduction()))
                .collect(),
            column_weights: BTreeMap::new(),
        }
    }
}

impl RunConfiguration {
    pub fn is_disabled(&self, check_id: &str) -> bool {
        self.disabled_checks.contains(check_id)
    }

    pub fn severity_override(&self, check_id: &str) -> Option<Severity> {
        self.severity_overrides.get(check_id).copied()
    }
}

impl TryFrom<AuditConfig> for RunConfiguration {
    type Error = InfrastructureError;

    fn try_from(config: AuditConfig) -> Result<Self, Self::Error> {
        config.validate()?;
        warn_unknown_check_ids(&config);

        let mut thresholds = ThresholdOverrides::new();
        for (check_id, tiers) in config.thresholds {
            let mut parsed = BTreeMap::new();
            for (severity, value) in tiers {
                parsed.insert(Severity::from_str(&severity)?, value);
            }
            thresholds.insert(check_id, parsed);
        }

        let severity_overrides = config
            .severity_overrides
            .into_iter()
            .map(|(check_id, severity)| Ok((check_id, Severity::from_str(&severity)?)))
            .collect::<Result<BTreeMap<_, _>, DomainError>>()?;

        let mut run = RunConfiguration {
            thresholds,
            disabled_checks: config.disabled_checks.into_iter().collect(),
            severity_overrides,
            column_weights: config.column_weights,
            ..RunConfiguration::default()
        };
        for (severity, deduction) in config.scoring {
            run.deductions.insert(Severity::from_str(&severity)?, deduction);
        }
        Ok(run)
    }
}

// --- 3. LOADERS ---

#[instrument(skip(path), fields(path = %path.display()))]
pub fn load_run_config(path: &Path) -> Result<RunConfiguration, InfrastructureError> {
    if !path.exists() {
        return Err(InfrastructureError::ConfigNotFound(path.display().to_string()));
    }
    info!("Loading audit configuration");
    let content = fs::read_to_string(path)?;
    parse_run_config(&content)
}

/// Parses and validates a YAML document. An empty document is the default configuration.
pub fn parse_run_config(content: &str) -> Result<RunConfiguration, InfrastructureError> {
    if content.trim().is_empty() {
        debug!("Empty audit configuration, using defaults");
        return Ok(RunConfiguration::default());
    }
    let config: AuditConfig = serde_yaml::from_str(content)?;
    RunConfiguration::try_from(config)
}

// --- 4. VALIDATEURS ---

// Each rejection is the typed domain error, carried as the validator message.
fn invalid(err: DomainError) -> ValidationError {
    let code = match &err {
        DomainError::InvalidSeverity(_) => "severity",
        DomainError::InvalidThreshold { .. } => "threshold",
        DomainError::InvalidDeduction { .. } => "deduction",
        DomainError::InvalidWeight { .. } => "weight",
        _ => "config",
    };
    ValidationError::new(code).with_message(Cow::Owned(err.to_string()))
}

fn check_severity_name(name: &str) -> Result<Severity, ValidationError> {
    Severity::from_str(name).map_err(invalid)
}

fn validate_thresholds(
    thresholds: &BTreeMap<String, BTreeMap<String, f64>>,
) -> Result<(), ValidationError> {
    for (check_id, tiers) in thresholds {
        for (severity, value) in tiers {
            check_severity_name(severity)?;
            if !value.is_finite() {
                return Err(invalid(DomainError::InvalidThreshold {
                    check_id: check_id.clone(),
                    reason: format!("{} is not a finite number ({})", severity, value),
                }));
            }
        }
    }
    Ok(())
}

fn validate_severity_overrides(overrides: &BTreeMap<String, String>) -> Result<(), ValidationError> {
    overrides
        .values()
        .try_for_each(|s| check_severity_name(s).map(|_| ()))
}

fn validate_scoring(scoring: &BTreeMap<String, f64>) -> Result<(), ValidationError> {
    for (severity, deduction) in scoring {
        check_severity_name(severity)?;
        if !deduction.is_finite() || *deduction < 0.0 {
            return Err(invalid(DomainError::InvalidDeduction {
                severity: severity.clone(),
                value: *deduction,
            }));
        }
    }
    Ok(())
}

fn validate_column_weights(weights: &BTreeMap<String, f64>) -> Result<(), ValidationError> {
    match weights.iter().find(|(_, w)| !w.is_finite() || **w < 0.0) {
        Some((column, weight)) => Err(invalid(DomainError::InvalidWeight {
            column: column.clone(),
            value: *weight,
        })),
        None => Ok(()),
    }
}

/// Ids the run can act on: catalog checks, analysis groups and the ids they emit.
fn known_check_ids() -> BTreeSet<&'static str> {
    let mut ids: BTreeSet<&'static str> = CheckCatalog::standard().all_check_ids().into_iter().collect();
    for analysis in standard_analyses() {
        ids.insert(analysis.id());
        ids.extend(analysis.record_ids().iter().copied());
    }
    ids
}

// Not fatal: a misspelled id simply has no effect.
fn warn_unknown_check_ids(config: &AuditConfig) {
    let known = known_check_ids();
    let referenced = config
        .thresholds
        .keys()
        .chain(config.severity_overrides.keys())
        .chain(config.disabled_checks.iter());
    for check_id in referenced {
        if !known.contains(check_id.as_str()) {
            warn!(check_id = %check_id, "Configuration references an unknown check id");
        }
    }
}
