// auditor-core/src/application/mod.rs

pub mod audit;
pub mod executor;
pub mod flagged;

// --- RE-EXPORTS (FACADE PATTERN) ---
// `use auditor_core::application::{run_audit, CheckExecutor};`

pub use audit::{AuditReport, audit_with_config_file, run_audit, run_with};
pub use executor::CheckExecutor;
pub use flagged::{FlaggedRow, collect_flagged_rows};
