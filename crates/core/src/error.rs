//! Engine Error Taxonomy
//!
//! Centralized error handling for the orchestration core. Synchronous
//! variants (Validation, Conflict, NotFound) surface directly to the caller
//! of `run`; the remaining variants drive asynchronous cleanup and are
//! observable through target status and the event bus.

use crate::job::JobId;
use crate::target::TargetId;

/// Result type for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Main error enum of the orchestration core
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// An open job already exists for this target or its owner
    #[error("Conflict: job {job} already running for target {target}")]
    Conflict { job: JobId, target: TargetId },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Launch error: {0}")]
    Launch(String),

    #[error("Simulation timed out after {0} seconds")]
    Timeout(u64),

    /// The analyzer faulted; distinct from "exited without data"
    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Simulation produced no usable result")]
    NoResult,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_async_failure_variants_render_their_cause() {
        assert_eq!(
            EngineError::Timeout(3600).to_string(),
            "Simulation timed out after 3600 seconds"
        );
        assert_eq!(
            EngineError::NoResult.to_string(),
            "Simulation produced no usable result"
        );
        assert!(
            EngineError::Analysis("malformed csv".to_string())
                .to_string()
                .contains("malformed csv")
        );
    }
}
