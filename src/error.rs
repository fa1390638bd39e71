//! Errors surfaced to callers of the engine
//!
//! Compilation failures, timeouts and runtime errors are not errors here:
//! they are ordinary `TestResult` outcomes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Concurrency cap reached; the caller should retry later
    #[error("execution capacity exhausted ({limit} executions already in flight)")]
    ResourceExhausted { limit: usize },

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Results were produced but the persistence collaborator rejected them
    #[error("failed to persist results: {0:#}")]
    Persistence(anyhow::Error),

    #[error("internal execution error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ExecutionError {
    /// Admission and configuration errors are raised before any work starts
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ExecutionError::ResourceExhausted { .. } | ExecutionError::UnsupportedLanguage(_)
        )
    }
}
