// auditor-core/src/domain/checks/context.rs

use chrono::{Local, NaiveDateTime};

use super::thresholds::{ThresholdOverrides, Tiers};
use crate::domain::model::{ColumnTypes, Dataset, Severity};

static NO_OVERRIDES: ThresholdOverrides = ThresholdOverrides::new();

/// Read-only view shared by every check of one run.
#[derive(Debug, Clone)]
pub struct CheckContext<'a> {
    pub dataset: &'a Dataset,
    pub column_types: &'a ColumnTypes,
    thresholds: &'a ThresholdOverrides,
    now: NaiveDateTime,
}

impl<'a> CheckContext<'a> {
    pub fn new(dataset: &'a Dataset, column_types: &'a ColumnTypes) -> Self {
        Self {
            dataset,
            column_types,
            thresholds: &NO_OVERRIDES,
            now: Local::now().naive_local(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: &'a ThresholdOverrides) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Pins "now" for checks comparing dates against the present.
    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = now;
        self
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn date_column(&self) -> Option<&'a str> {
        self.dataset.date_column()
    }

    /// Default tiers of `check_id` with the configured overrides applied.
    pub fn tiers(&self, check_id: &str, defaults: &[(Severity, f64)]) -> Tiers {
        Tiers::merged(defaults, self.thresholds.get(check_id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::model::RawColumn;
    use std::collections::BTreeMap;

    #[test]
    fn test_tiers_pick_up_overrides_for_the_right_check() {
        let ds = Dataset::from_raw(vec![RawColumn::from_strs("a", &["1"])]).unwrap();
        let types = ColumnTypes::new();
        let overrides: ThresholdOverrides =
            BTreeMap::from([("NULL_RATE".to_string(), BTreeMap::from([(Severity::High, 0.9)]))]);
        let ctx = CheckContext::new(&ds, &types).with_thresholds(&overrides);

        let defaults = [(Severity::High, 0.2)];
        assert_eq!(ctx.tiers("NULL_RATE", &defaults).classify(0.5), Severity::Pass);
        assert_eq!(ctx.tiers("ZERO_VALUES", &defaults).classify(0.5), Severity::High);
    }
}
