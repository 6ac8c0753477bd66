// auditor-core/src/domain/model/semantic_type.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::DomainError;

/// Logical role of a column, inferred once per run by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SemanticType {
    NumericContinuous,
    NumericDiscrete,
    Categorical,
    Boolean,
    Date,
    Datetime,
    Email,
    Phone,
    IdCandidate,
    HighCardinality,
    Mixed,
    Empty,
    Constant,
}

impl SemanticType {
    pub const ALL: [SemanticType; 13] = [
        Self::NumericContinuous,
        Self::NumericDiscrete,
        Self::Categorical,
        Self::Boolean,
        Self::Date,
        Self::Datetime,
        Self::Email,
        Self::Phone,
        Self::IdCandidate,
        Self::HighCardinality,
        Self::Mixed,
        Self::Empty,
        Self::Constant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NumericContinuous => "NUMERIC_CONTINUOUS",
            Self::NumericDiscrete => "NUMERIC_DISCRETE",
            Self::Categorical => "CATEGORICAL",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Datetime => "DATETIME",
            Self::Email => "EMAIL",
            Self::Phone => "PHONE",
            Self::IdCandidate => "ID_CANDIDATE",
            Self::HighCardinality => "HIGH_CARDINALITY",
            Self::Mixed => "MIXED",
            Self::Empty => "EMPTY",
            Self::Constant => "CONSTANT",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::NumericContinuous | Self::NumericDiscrete)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::Datetime)
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SemanticType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| DomainError::UnknownSemanticType(s.to_string()))
    }
}

/// Inferred type of every column, in the dataset's column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnTypes(Vec<(String, SemanticType)>);

impl ColumnTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a type once; a second assignment for the same column is ignored.
    pub fn insert(&mut self, column: impl Into<String>, semantic_type: SemanticType) {
        let column = column.into();
        if self.get(&column).is_none() {
            self.0.push((column, semantic_type));
        }
    }

    pub fn get(&self, column: &str) -> Option<SemanticType> {
        self.0.iter().find(|(c, _)| c == column).map(|(_, t)| *t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SemanticType)> {
        self.0.iter().map(|(c, t)| (c.as_str(), *t))
    }

    /// Columns of the given family, in order.
    pub fn columns_where(&self, pred: impl Fn(SemanticType) -> bool) -> Vec<&str> {
        self.iter().filter(|(_, t)| pred(*t)).map(|(c, _)| c).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, SemanticType)> for ColumnTypes {
    fn from_iter<I: IntoIterator<Item = (String, SemanticType)>>(iter: I) -> Self {
        let mut types = Self::new();
        for (c, t) in iter {
            types.insert(c, t);
        }
        types
    }
}
