// auditor-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

use crate::domain::error::DomainError;

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(auditor::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- CONFIG / YAML ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(auditor::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    Yaml(#[from] serde_yaml::Error),

    #[error("Audit configuration not found at '{0}'")]
    #[diagnostic(code(auditor::infra::config_missing))]
    ConfigNotFound(String),

    #[error("Invalid audit configuration: {0}")]
    #[diagnostic(
        code(auditor::infra::config_validation),
        help("Severity names are CRITICAL, HIGH, MEDIUM, LOW, INFO or PASS; numbers must be finite, deductions and weights >= 0.")
    )]
    ConfigValidation(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Domain(#[from] DomainError),
}

impl From<validator::ValidationErrors> for InfrastructureError {
    fn from(err: validator::ValidationErrors) -> Self {
        InfrastructureError::ConfigValidation(err.to_string())
    }
}
