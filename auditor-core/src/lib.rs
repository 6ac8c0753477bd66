// auditor-core/src/lib.rs

// 1. Mandatory documentation for production code
#![allow(missing_docs)] // Doc coverage is uneven on purpose for now

// 2. Memory safety
#![deny(unsafe_code)]
// 3. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 4. Performance
#![warn(clippy::perf)]

// --- MODULES HEXAGONAUX ---

// 1. Domain (cœur du métier)
// Typage sémantique, statistiques, checks, routage d'hypothèses, scoring.
// Ne dépend de RIEN d'autre (ni infra, ni app).
pub mod domain;

// 2. Infrastructure (Adapters)
// Chargement et validation de la configuration YAML.
pub mod infrastructure;

// 3. Application (Use Cases)
// Orchestration d'un audit : exécution isolée des checks, scoring, lignes signalées.
pub mod application;

// --- GESTION DES ERREURS GLOBALE ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
// use auditor_core::{AuditError, audit_with_config_file};
pub use application::{AuditReport, CheckExecutor, audit_with_config_file, run_audit};
pub use domain::{
    CheckCatalog, Dataset, DiagnosticRecord, ScoreReport, ScoringAggregator, SemanticType,
    SemanticTypeClassifier, Severity,
};
pub use error::AuditError;
pub use infrastructure::config::{RunConfiguration, load_run_config, parse_run_config};
