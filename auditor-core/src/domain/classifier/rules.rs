// auditor-core/src/domain/classifier/rules.rs

use std::collections::HashSet;

use super::dates::parse_date;
use crate::domain::model::{RawColumn, SemanticType, TypedColumn, is_null_like};
use crate::domain::patterns;
use crate::domain::stats::seeded_sample;

pub const EMPTY_THRESHOLD: f64 = 0.95;
pub const DISCRETE_RATIO: f64 = 0.05;
pub const SAMPLE_SIZE: usize = 200;
pub const PATTERN_THRESHOLD: f64 = 0.80;
pub const ID_PATTERN_THRESHOLD: f64 = 0.70;
pub const HIGH_CARDINALITY_RATIO: f64 = 0.85;
pub const CATEGORICAL_RATIO: f64 = 0.15;

/// Tokens that make a two-valued column boolean (compared lowercased).
pub const BOOLEAN_TOKENS: &[&str] = &[
    "true",
    "false",
    "t",
    "f",
    "yes",
    "no",
    "y",
    "n",
    "si",
    "sí",
    "1",
    "0",
    "verdadero",
    "falso",
];

/// Everything the rules look at, computed once per column.
#[derive(Debug, Clone)]
pub struct ColumnProfile<'a> {
    pub n_rows: usize,
    /// Trimmed cells that are not null-like, in row order.
    pub non_null: Vec<&'a str>,
    pub n_unique: usize,
    pub typed_is_numeric: bool,
    /// Deterministic sample of `non_null`, at most [`SAMPLE_SIZE`] values.
    pub sample: Vec<&'a str>,
}

impl<'a> ColumnProfile<'a> {
    pub fn build(raw: &'a RawColumn, typed: &TypedColumn) -> Self {
        let non_null: Vec<&'a str> = raw
            .values
            .iter()
            .filter(|v| !is_null_like(v))
            .map(|v| v.trim())
            .collect();
        let n_unique = non_null.iter().collect::<HashSet<_>>().len();
        let sample = seeded_sample(&non_null, SAMPLE_SIZE);
        Self {
            n_rows: raw.len(),
            non_null,
            n_unique,
            typed_is_numeric: typed.is_numeric(),
            sample,
        }
    }

    pub fn null_fraction(&self) -> f64 {
        if self.n_rows == 0 {
            return 1.0;
        }
        1.0 - self.non_null.len() as f64 / self.n_rows as f64
    }

    /// distinct / non-null, 0 for an all-null column.
    pub fn unique_ratio(&self) -> f64 {
        if self.non_null.is_empty() {
            0.0
        } else {
            self.n_unique as f64 / self.non_null.len() as f64
        }
    }

    /// Share of the sample accepted by `pred`.
    pub fn sample_rate(&self, pred: impl Fn(&str) -> bool) -> f64 {
        if self.sample.is_empty() {
            return 0.0;
        }
        self.sample.iter().filter(|v| pred(v)).count() as f64 / self.sample.len() as f64
    }
}

/// One row of the decision table: returns a label when the rule applies.
#[derive(Clone, Copy)]
pub struct ClassificationRule {
    pub name: &'static str,
    pub decide: fn(&ColumnProfile<'_>) -> Option<SemanticType>,
}

impl std::fmt::Debug for ClassificationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationRule")
            .field("name", &self.name)
            .finish()
    }
}

/// Decision table, highest priority first. The last rule always decides.
pub const RULES: &[ClassificationRule] = &[
    ClassificationRule {
        name: "empty",
        decide: empty,
    },
    ClassificationRule {
        name: "constant",
        decide: constant,
    },
    ClassificationRule {
        name: "boolean",
        decide: boolean,
    },
    ClassificationRule {
        name: "numeric",
        decide: numeric,
    },
    ClassificationRule {
        name: "date",
        decide: date,
    },
    ClassificationRule {
        name: "email",
        decide: email,
    },
    ClassificationRule {
        name: "phone",
        decide: phone,
    },
    ClassificationRule {
        name: "cardinality",
        decide: cardinality,
    },
];

pub fn empty(p: &ColumnProfile<'_>) -> Option<SemanticType> {
    (p.n_rows == 0 || p.null_fraction() >= EMPTY_THRESHOLD).then_some(SemanticType::Empty)
}

pub fn constant(p: &ColumnProfile<'_>) -> Option<SemanticType> {
    (p.n_unique == 1).then_some(SemanticType::Constant)
}

pub fn boolean(p: &ColumnProfile<'_>) -> Option<SemanticType> {
    if p.n_unique != 2 {
        return None;
    }
    let lowered: HashSet<String> = p.non_null.iter().map(|v| v.to_lowercase()).collect();
    lowered
        .iter()
        .all(|v| BOOLEAN_TOKENS.contains(&v.as_str()))
        .then_some(SemanticType::Boolean)
}

pub fn numeric(p: &ColumnProfile<'_>) -> Option<SemanticType> {
    if !p.typed_is_numeric {
        return None;
    }
    if p.unique_ratio() < DISCRETE_RATIO {
        Some(SemanticType::NumericDiscrete)
    } else {
        Some(SemanticType::NumericContinuous)
    }
}

pub fn date(p: &ColumnProfile<'_>) -> Option<SemanticType> {
    if p.sample.is_empty() {
        return None;
    }
    let matches: Vec<_> = p.sample.iter().filter_map(|v| parse_date(v)).collect();
    let rate = matches.len() as f64 / p.sample.len() as f64;
    if rate <= PATTERN_THRESHOLD {
        return None;
    }
    if matches.iter().any(|m| m.has_time) {
        Some(SemanticType::Datetime)
    } else {
        Some(SemanticType::Date)
    }
}

pub fn email(p: &ColumnProfile<'_>) -> Option<SemanticType> {
    let re = patterns::email();
    (p.sample_rate(|v| re.is_match(v)) > PATTERN_THRESHOLD).then_some(SemanticType::Email)
}

pub fn phone(p: &ColumnProfile<'_>) -> Option<SemanticType> {
    let re = patterns::phone();
    (p.sample_rate(|v| re.is_match(v)) > PATTERN_THRESHOLD).then_some(SemanticType::Phone)
}

pub fn looks_like_id(p: &ColumnProfile<'_>) -> bool {
    patterns::id_shapes()
        .iter()
        .any(|re| p.sample_rate(|v| re.is_match(v)) > ID_PATTERN_THRESHOLD)
}

pub fn cardinality(p: &ColumnProfile<'_>) -> Option<SemanticType> {
    let ratio = p.unique_ratio();
    let label = if ratio > HIGH_CARDINALITY_RATIO {
        if looks_like_id(p) {
            SemanticType::IdCandidate
        } else {
            SemanticType::HighCardinality
        }
    } else if ratio < CATEGORICAL_RATIO {
        SemanticType::Categorical
    } else {
        SemanticType::HighCardinality
    };
    Some(label)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::model::coerce_column;

    fn profile_of(values: &[&str]) -> (RawColumn, TypedColumn) {
        let raw = RawColumn::from_strs("c", values);
        let typed = coerce_column(&raw);
        (raw, typed)
    }

    #[test]
    fn test_empty_rule_uses_null_like_tokens() {
        let mut values = vec![" NULL ", "n/a", "", "NaN", "Unknown", "-"];
        values.extend(std::iter::repeat_n("", 94));
        let (raw, typed) = profile_of(&values);
        let p = ColumnProfile::build(&raw, &typed);
        assert_eq!(empty(&p), Some(SemanticType::Empty));

        let (raw, typed) = profile_of(&["a", "b", ""]);
        let p = ColumnProfile::build(&raw, &typed);
        assert_eq!(empty(&p), None);
    }

    #[test]
    fn test_boolean_rule_needs_vocabulary() {
        let (raw, typed) = profile_of(&["Sí", "no", "sí", "NO"]);
        let p = ColumnProfile::build(&raw, &typed);
        // four raw spellings, two distinct once lowered: not exactly two raw uniques
        assert_eq!(boolean(&p), None);

        let (raw, typed) = profile_of(&["Sí", "No", "Sí", "No"]);
        let p = ColumnProfile::build(&raw, &typed);
        assert_eq!(boolean(&p), Some(SemanticType::Boolean));

        let (raw, typed) = profile_of(&["red", "blue", "red"]);
        let p = ColumnProfile::build(&raw, &typed);
        assert_eq!(boolean(&p), None);
    }

    #[test]
    fn test_numeric_rule_discrete_vs_continuous() {
        let values: Vec<String> = (0..100).map(|i| (i % 3).to_string()).collect();
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        let (raw, typed) = profile_of(&refs);
        let p = ColumnProfile::build(&raw, &typed);
        assert_eq!(numeric(&p), Some(SemanticType::NumericDiscrete));

        let values: Vec<String> = (0..100).map(|i| format!("{}.5", i)).collect();
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        let (raw, typed) = profile_of(&refs);
        let p = ColumnProfile::build(&raw, &typed);
        assert_eq!(numeric(&p), Some(SemanticType::NumericContinuous));
    }

    #[test]
    fn test_date_rule_distinguishes_datetime() {
        let (raw, typed) = profile_of(&["2024-01-01", "2024-01-02", "2024-01-03"]);
        let p = ColumnProfile::build(&raw, &typed);
        assert_eq!(date(&p), Some(SemanticType::Date));

        let (raw, typed) = profile_of(&["2024-01-01 10:00:00", "2024-01-02", "2024-01-03"]);
        let p = ColumnProfile::build(&raw, &typed);
        assert_eq!(date(&p), Some(SemanticType::Datetime));

        let (raw, typed) = profile_of(&["2024-01-01", "soon", "later", "never"]);
        let p = ColumnProfile::build(&raw, &typed);
        assert_eq!(date(&p), None);
    }

    #[test]
    fn test_email_and_phone_rules() {
        let (raw, typed) = profile_of(&["a@x.com", "b@y.org", "c@z.net"]);
        let p = ColumnProfile::build(&raw, &typed);
        assert_eq!(email(&p), Some(SemanticType::Email));
        assert_eq!(phone(&p), None);

        let (raw, typed) = profile_of(&["+1 555-0100", "(55) 1234 5678", "555.123.4567"]);
        let p = ColumnProfile::build(&raw, &typed);
        assert_eq!(phone(&p), Some(SemanticType::Phone));
    }

    #[test]
    fn test_cardinality_rule() {
        let ids: Vec<String> = (0..50).map(|i| format!("CUST-{:04}", i)).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let (raw, typed) = profile_of(&refs);
        let p = ColumnProfile::build(&raw, &typed);
        assert_eq!(cardinality(&p), Some(SemanticType::IdCandidate));

        let words: Vec<String> = (0..50).map(|i| format!("free text number {}", i)).collect();
        let refs: Vec<&str> = words.iter().map(String::as_str).collect();
        let (raw, typed) = profile_of(&refs);
        let p = ColumnProfile::build(&raw, &typed);
        assert_eq!(cardinality(&p), Some(SemanticType::HighCardinality));

        let cats: Vec<&str> = (0..100).map(|i| ["north", "south", "east"][i % 3]).collect();
        let (raw, typed) = profile_of(&cats);
        let p = ColumnProfile::build(&raw, &typed);
        assert_eq!(cardinality(&p), Some(SemanticType::Categorical));
    }
}
