// auditor-core/src/domain/hypothesis/mod.rs

// Adaptive test selection: a normality gate decides between a parametric
// and a non-parametric test for the same diagnostic question.

pub mod gate;
pub mod router;

/// Significance level used by every routed test.
pub const ALPHA: f64 = 0.05;

/// Below this many values per group no test is attempted.
pub const MIN_GROUP_SIZE: usize = 20;

pub use gate::{GateEvaluation, NormalityTest, normality_gate};
pub use router::{HypothesisRouter, PairedComparison, Route, ShiftDecision, split_halves};
