// auditor-core/src/domain/checks/thresholds.rs

use std::collections::BTreeMap;

use crate::domain::model::Severity;

/// Per-check threshold overrides: `check_id -> {severity -> number}`.
pub type ThresholdOverrides = BTreeMap<String, BTreeMap<Severity, f64>>;

/// Severity tiers of one check, after merging configured overrides into the defaults.
///
/// Tiers are evaluated CRITICAL -> LOW; the first one whose threshold the value
/// reaches (`>=`) wins, otherwise the result is PASS.
#[derive(Debug, Clone, PartialEq)]
pub struct Tiers(BTreeMap<Severity, f64>);

impl Tiers {
    pub fn new(defaults: &[(Severity, f64)]) -> Self {
        Self(defaults.iter().copied().collect())
    }

    /// Overrides replace the matching default and may add tiers the check did not define.
    pub fn merged(defaults: &[(Severity, f64)], overrides: Option<&BTreeMap<Severity, f64>>) -> Self {
        let mut tiers = Self::new(defaults);
        if let Some(extra) = overrides {
            for (sev, value) in extra {
                tiers.0.insert(*sev, *value);
            }
        }
        tiers
    }

    pub fn classify(&self, value: f64) -> Severity {
        Severity::TIERED
            .iter()
            .copied()
            .find(|sev| self.0.get(sev).is_some_and(|t| value >= *t))
            .unwrap_or(Severity::Pass)
    }

    /// Threshold that produced `severity`, 0 when the tier does not exist.
    pub fn threshold_for(&self, severity: Severity) -> f64 {
        self.0.get(&severity).copied().unwrap_or(0.0)
    }
}
