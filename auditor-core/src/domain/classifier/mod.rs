// auditor-core/src/domain/classifier/mod.rs

pub mod dates;
pub mod rules;

use tracing::debug;

use crate::domain::model::{ColumnTypes, Dataset, RawColumn, SemanticType, TypedColumn};
pub use dates::{DateMatch, GENERAL_FORMAT, parse_date};
pub use rules::{ClassificationRule, ColumnProfile, RULES};

/// Infers one [`SemanticType`] per column from its raw and typed views.
///
/// Pure and stateless: the rules are evaluated in priority order and the first
/// one that decides wins. Sampling uses a fixed seed, so repeated calls agree.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemanticTypeClassifier;

impl SemanticTypeClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, raw: &RawColumn, typed: &TypedColumn) -> SemanticType {
        self.classify_with_rule(raw, typed).0
    }

    /// Same as [`classify`](Self::classify) but also names the rule that decided.
    pub fn classify_with_rule(
        &self,
        raw: &RawColumn,
        typed: &TypedColumn,
    ) -> (SemanticType, &'static str) {
        let profile = ColumnProfile::build(raw, typed);
        RULES
            .iter()
            .find_map(|rule| (rule.decide)(&profile).map(|t| (t, rule.name)))
            // The cardinality rule always decides; this is only reachable with an edited table.
            .unwrap_or((SemanticType::Mixed, "fallback"))
    }

    pub fn classify_dataset(&self, dataset: &Dataset) -> ColumnTypes {
        dataset
            .columns()
            .map(|(raw, typed)| {
                let (semantic_type, rule) = self.classify_with_rule(raw, typed);
                debug!(column = %raw.name, %semantic_type, rule, "Column classified");
                (raw.name.clone(), semantic_type)
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::model::coerce_column;

    fn classify(values: &[&str]) -> SemanticType {
        let raw = RawColumn::from_strs("c", values);
        let typed = coerce_column(&raw);
        SemanticTypeClassifier::new().classify(&raw, &typed)
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(classify(&[]), SemanticType::Empty);
        assert_eq!(classify(&["x", "x", "", "x"]), SemanticType::Constant);
        // three raw spellings: not a two-valued column
        assert_ne!(classify(&["true", "false", "TRUE"]), SemanticType::Boolean);
        assert_eq!(classify(&["yes", "no", "yes", "no"]), SemanticType::Boolean);
        // 0/1 columns are numeric once coerced, but the boolean rule runs first
        assert_eq!(classify(&["0", "1", "1", "0"]), SemanticType::Boolean);
    }

    #[test]
    fn test_two_values_outside_vocabulary_are_not_boolean() {
        let values: Vec<&str> = (0..40).map(|i| if i % 2 == 0 { "red" } else { "blue" }).collect();
        assert_eq!(classify(&values), SemanticType::Categorical);
    }

    #[test]
    fn test_text_families() {
        let dates: Vec<String> = (1..=28).map(|d| format!("2024-02-{:02}", d)).collect();
        let refs: Vec<&str> = dates.iter().map(String::as_str).collect();
        assert_eq!(classify(&refs), SemanticType::Date);

        let emails: Vec<String> = (0..30).map(|i| format!("user{}@example.com", i)).collect();
        let refs: Vec<&str> = emails.iter().map(String::as_str).collect();
        assert_eq!(classify(&refs), SemanticType::Email);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let values: Vec<String> = (0..1000)
            .map(|i| {
                if i % 5 == 0 {
                    format!("note {}", i)
                } else {
                    format!("2024-01-{:02}", i % 28 + 1)
                }
            })
            .collect();
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        let first = classify(&refs);
        for _ in 0..5 {
            assert_eq!(classify(&refs), first);
        }
    }

    #[test]
    fn test_classify_dataset_keeps_column_order() {
        let ds = Dataset::from_raw(vec![
            RawColumn::from_strs("b", &["1.5", "2.5", "3.5"]),
            RawColumn::from_strs("a", &["", "", ""]),
        ])
        .unwrap();
        let types = SemanticTypeClassifier::new().classify_dataset(&ds);
        let order: Vec<&str> = types.iter().map(|(c, _)| c).collect();
        assert_eq!(order, vec!["b", "a"]);
        assert_eq!(types.get("a"), Some(SemanticType::Empty));
        assert_eq!(types.get("b"), Some(SemanticType::NumericContinuous));
    }
}
