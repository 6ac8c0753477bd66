// auditor-core/src/domain/hypothesis/gate.rs

use serde::Serialize;

use super::ALPHA;
use crate::domain::stats::{dagostino_k2, seeded_sample, shapiro_wilk};

/// Largest sample handed to Shapiro-Wilk; bigger inputs go through D'Agostino K².
pub const GATE_SAMPLE_LIMIT: usize = 5000;

const GATE_MIN_N: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalityTest {
    ShapiroWilk,
    DagostinoK2,
    /// Too few values, or the test could not be computed.
    NotRun,
}

impl NormalityTest {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShapiroWilk => "Shapiro-Wilk",
            Self::DagostinoK2 => "D'Agostino K2",
            Self::NotRun => "not run",
        }
    }
}

/// Verdict of the normality gate on one group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GateEvaluation {
    pub test: NormalityTest,
    pub n: usize,
    pub p_value: Option<f64>,
    pub is_normal: bool,
}

impl GateEvaluation {
    fn not_normal(n: usize) -> Self {
        Self {
            test: NormalityTest::NotRun,
            n,
            p_value: None,
            is_normal: false,
        }
    }
}

/// Normal iff p > α. Short, constant or otherwise untestable samples are not normal.
pub fn normality_gate(values: &[f64]) -> GateEvaluation {
    let n = values.len();
    if n < GATE_MIN_N {
        return GateEvaluation::not_normal(n);
    }

    let (test, outcome) = if n < GATE_SAMPLE_LIMIT {
        (NormalityTest::ShapiroWilk, shapiro_wilk(values))
    } else {
        let sample = seeded_sample(values, GATE_SAMPLE_LIMIT);
        (NormalityTest::DagostinoK2, dagostino_k2(&sample))
    };

    match outcome {
        Ok(o) => GateEvaluation {
            test,
            n,
            p_value: Some(o.p_value),
            is_normal: o.p_value > ALPHA,
        },
        Err(_) => GateEvaluation::not_normal(n),
    }
}
