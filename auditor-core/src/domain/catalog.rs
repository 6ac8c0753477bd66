// auditor-core/src/domain/catalog.rs

// Dispatch table: semantic type -> ordered list of checks.
// Built once from static lists; no lookup by name at run time.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, OnceLock};

use crate::domain::checks::{
    Check, categorical as cat, date, distribution, hypothesis as hyp, id, numeric as num, text,
    universal as uni,
};
use crate::domain::model::SemanticType;

static STANDARD: OnceLock<CheckCatalog> = OnceLock::new();

pub struct CheckCatalog {
    universal: Vec<Arc<dyn Check>>,
    families: BTreeMap<SemanticType, Vec<Arc<dyn Check>>>,
}

impl std::fmt::Debug for CheckCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckCatalog")
            .field("checks", &self.all_check_ids())
            .finish()
    }
}

// --- Familles de checks ---

fn universal_checks() -> Vec<Arc<dyn Check>> {
    vec![
        Arc::new(uni::NullRate),
        Arc::new(uni::DuplicateRows),
        Arc::new(uni::WhitespaceIssues),
        Arc::new(uni::ConstantColumn),
        Arc::new(uni::NearConstant),
    ]
}

fn numeric_checks() -> Vec<Arc<dyn Check>> {
    vec![
        Arc::new(num::OutlierIqr),
        Arc::new(num::OutlierZscore),
        Arc::new(num::OutlierModifiedZ),
        Arc::new(num::DistributionSkew),
        Arc::new(num::DistributionKurtosis),
        Arc::new(num::NegativeValues),
        Arc::new(num::ZeroValues),
        Arc::new(num::TrendChange),
        Arc::new(num::ValueRange),
        Arc::new(num::VarianceSuddenChange),
        Arc::new(num::NormalityTest),
        // Hypothesis tests routed through the normality gate.
        Arc::new(hyp::NormalityAnderson),
        Arc::new(hyp::NormalityLilliefors),
        Arc::new(hyp::MeanShift),
        Arc::new(hyp::WilcoxonPaired),
        Arc::new(hyp::VarianceShift),
        Arc::new(hyp::KsGoodnessFit),
        Arc::new(hyp::AdfStationarity),
        Arc::new(hyp::KruskalWallis),
        Arc::new(distribution::BenfordLaw),
    ]
}

fn date_checks() -> Vec<Arc<dyn Check>> {
    vec![
        Arc::new(date::DateNullRate),
        Arc::new(date::DateFormatMix),
        Arc::new(date::DateFuture),
        Arc::new(date::DateAncient),
        Arc::new(date::DateSequenceGaps),
        Arc::new(date::DateDuplicates),
        Arc::new(date::DateMonotonicity),
        Arc::new(date::DateInvalidParsed),
        Arc::new(date::TemporalDrift),
    ]
}

fn categorical_checks() -> Vec<Arc<dyn Check>> {
    vec![
        Arc::new(cat::RareCategories),
        Arc::new(cat::CardinalityChange),
        Arc::new(cat::CaseInconsistency),
        Arc::new(cat::EncodingAnomaly),
        Arc::new(cat::ClassImbalance),
        Arc::new(cat::TypoCandidates),
        Arc::new(hyp::Chi2Independence),
    ]
}

fn text_checks() -> Vec<Arc<dyn Check>> {
    vec![
        Arc::new(text::LengthOutliers),
        Arc::new(text::NullLikeStrings),
        Arc::new(text::TruncationSigns),
    ]
}

fn id_checks() -> Vec<Arc<dyn Check>> {
    vec![
        Arc::new(id::IdDuplicates),
        Arc::new(id::IdFormatConsistency),
        Arc::new(id::IdNull),
    ]
}

impl CheckCatalog {
    /// A catalog where every type gets `universal` only.
    pub fn new(universal: Vec<Arc<dyn Check>>) -> Self {
        Self {
            universal,
            families: BTreeMap::new(),
        }
    }

    /// Registers the type-specific checks of `semantic_type`, run after the universal ones.
    pub fn with_family(mut self, semantic_type: SemanticType, checks: Vec<Arc<dyn Check>>) -> Self {
        let mut list = self.universal.clone();
        list.extend(checks);
        self.families.insert(semantic_type, list);
        self
    }

    /// The process-wide catalog holding every built-in check.
    pub fn standard() -> &'static CheckCatalog {
        STANDARD.get_or_init(Self::build_standard)
    }

    fn build_standard() -> Self {
        let mut email = text_checks();
        email.push(Arc::new(text::EmailFormat));
        let mut phone = text_checks();
        phone.push(Arc::new(text::PhoneFormat));

        Self::new(universal_checks())
            .with_family(SemanticType::NumericContinuous, numeric_checks())
            .with_family(SemanticType::NumericDiscrete, numeric_checks())
            .with_family(SemanticType::Date, date_checks())
            .with_family(SemanticType::Datetime, date_checks())
            .with_family(SemanticType::Categorical, categorical_checks())
            .with_family(SemanticType::Boolean, categorical_checks())
            .with_family(SemanticType::HighCardinality, text_checks())
            .with_family(SemanticType::Email, email)
            .with_family(SemanticType::Phone, phone)
            .with_family(SemanticType::IdCandidate, id_checks())
    }

    /// Ordered checks for a column of `semantic_type`.
    /// MIXED, EMPTY and CONSTANT fall back to the universal list.
    pub fn checks_for(&self, semantic_type: SemanticType) -> &[Arc<dyn Check>] {
        self.families
            .get(&semantic_type)
            .map(Vec::as_slice)
            .unwrap_or(self.universal.as_slice())
    }

    fn all_checks(&self) -> impl Iterator<Item = &Arc<dyn Check>> {
        self.universal
            .iter()
            .chain(self.families.values().flatten())
    }

    /// Every registered id once, in first-seen order.
    pub fn all_check_ids(&self) -> Vec<&'static str> {
        let mut seen = HashSet::new();
        self.all_checks()
            .map(|c| c.id())
            .filter(|id| seen.insert(*id))
            .collect()
    }

    pub fn contains(&self, check_id: &str) -> bool {
        self.all_checks().any(|c| c.id() == check_id)
    }

    pub fn title(&self, check_id: &str) -> Option<&'static str> {
        self.all_checks()
            .find(|c| c.id() == check_id)
            .map(|c| c.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(catalog: &CheckCatalog, t: SemanticType) -> Vec<&'static str> {
        catalog.checks_for(t).iter().map(|c| c.id()).collect()
    }

    #[test]
    fn test_special_types_fall_back_to_universal() {
        let catalog = CheckCatalog::standard();
        let expected = vec![
            "NULL_RATE",
            "DUPLICATE_ROWS",
            "WHITESPACE_ISSUES",
            "CONSTANT_COLUMN",
            "NEAR_CONSTANT",
        ];
        for t in [SemanticType::Mixed, SemanticType::Empty, SemanticType::Constant] {
            assert_eq!(ids(catalog, t), expected);
        }
    }

    #[test]
    fn test_numeric_list_keeps_declared_order() {
        let numeric = ids(CheckCatalog::standard(), SemanticType::NumericContinuous);
        assert_eq!(numeric[0], "NULL_RATE");
        assert_eq!(numeric[5], "OUTLIER_IQR");
        assert!(numeric.contains(&"MEAN_SHIFT"));
        assert_eq!(numeric.last(), Some(&"BENFORD_LAW"));
        assert_eq!(numeric, ids(CheckCatalog::standard(), SemanticType::NumericDiscrete));
    }

    #[test]
    fn test_text_families_differ_by_format_check() {
        let catalog = CheckCatalog::standard();
        let email = ids(catalog, SemanticType::Email);
        let phone = ids(catalog, SemanticType::Phone);
        assert!(email.contains(&"EMAIL_FORMAT") && !email.contains(&"PHONE_FORMAT"));
        assert!(phone.contains(&"PHONE_FORMAT") && !phone.contains(&"EMAIL_FORMAT"));
        assert!(ids(catalog, SemanticType::Boolean).contains(&"CHI2_INDEPENDENCE"));
    }

    #[test]
    fn test_all_check_ids_are_unique() {
        let all = CheckCatalog::standard().all_check_ids();
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
        assert_eq!(all.len(), 49);
        assert_eq!(all[0], "NULL_RATE");
    }

    #[test]
    fn test_title_lookup() {
        let catalog = CheckCatalog::standard();
        assert_eq!(catalog.title("NULL_RATE"), Some("Missing or empty values"));
        assert_eq!(catalog.title("NOPE"), None);
        assert!(catalog.contains("ID_NULL"));
    }
}
