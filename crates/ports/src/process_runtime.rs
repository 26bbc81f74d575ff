//! Process Runtime Port
//!
//! Defines the interface to the external, resource-isolated process runtime
//! (a container engine in production). All lookups go through the
//! deterministic process name so no handle needs to survive a restart of the
//! orchestrating process.

use std::time::Duration;

use async_trait::async_trait;
use simrun_core::ResourceLimits;

/// Everything needed to start one isolated simulation process
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Deterministic process name (`<kind>Simulation_<target_uid>`)
    pub name: String,
    pub image: String,
    /// Full invocation command, parameters already serialized in
    pub command: Vec<String>,
    /// Host path -> container path bind mounts
    pub volumes: Vec<(String, String)>,
    pub limits: ResourceLimits,
}

/// Process runtime port
#[async_trait]
pub trait ProcessRuntime: Send + Sync {
    /// Start the process detached, with auto-removal on exit. Returns the
    /// runtime-assigned handle (container id).
    async fn start(&self, spec: &LaunchSpec) -> Result<String, RuntimeError>;

    /// Whether a process with the given name is currently running
    async fn is_alive(&self, name: &str) -> Result<bool, RuntimeError>;

    /// PID of the named process
    async fn pid(&self, name: &str) -> Result<i64, RuntimeError>;

    /// Graceful stop with a bounded wait before the runtime force-kills
    async fn stop(&self, name: &str, timeout: Duration) -> Result<(), RuntimeError>;

    /// Forcibly remove the named process, running or not
    async fn force_remove(&self, name: &str) -> Result<(), RuntimeError>;
}

/// Process runtime error
#[derive(thiserror::Error, Debug)]
pub enum RuntimeError {
    #[error("Process not found: {0}")]
    NotFound(String),

    #[error("Failed to start process '{name}': {reason}")]
    StartFailed { name: String, reason: String },

    #[error("Runtime error: {0}")]
    Runtime(String),
}
