//! Result Analyzer and Report Generator Ports
//!
//! Per-kind collaborators invoked on the success path. The analyzer parses
//! the raw artifacts into a structured result; the report generator renders
//! a durable report next to them, best-effort.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use simrun_core::SimulationTarget;

/// Result analyzer port
///
/// "No data" is `Ok(None)`, never an error; `Err` is reserved for genuine
/// I/O faults while reading the artifacts.
#[async_trait]
pub trait ResultAnalyzer: Send + Sync {
    async fn analyze(&self, output_dir: &Path) -> Result<Option<Value>, AnalyzerError>;
}

/// Report generator port, invoked after the result is persisted. Failures
/// are logged by the caller and never revert a completed run.
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn generate(&self, target: &SimulationTarget) -> Result<PathBuf, ReportError>;
}

/// Analyzer error
#[derive(thiserror::Error, Debug)]
pub enum AnalyzerError {
    #[error("I/O error reading artifacts: {0}")]
    Io(#[from] std::io::Error),

    #[error("Analysis failed: {0}")]
    Analysis(String),
}

/// Report generator error
#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    #[error("I/O error writing report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Report generation failed: {0}")]
    Generation(String),
}
