//! Engine bootstrap
//!
//! Composition root turning a loaded [`EngineConfig`] into a fully wired
//! [`SimulationEngine`]: options mapping, artifact root, and Docker runtime
//! selection by configured daemon host.

use std::sync::Arc;
use std::time::Duration;

use simrun_engine::engine::{EngineOptions, SimulationEngine};
use simrun_engine::ArtifactLayout;
use simrun_ports::{EventPublisher, JobStore, ProcessRuntime, RuntimeError, TargetStore};

use crate::config::EngineConfig;
use crate::docker::DockerProcessRuntime;

/// Engine tuning derived from configuration
pub fn engine_options(config: &EngineConfig) -> EngineOptions {
    EngineOptions {
        max_concurrent_jobs: config.max_concurrent_jobs,
        stop_grace: Duration::from_secs(config.stop_grace_secs),
    }
}

/// Wire an engine over an explicit process runtime
pub fn build_engine(
    config: &EngineConfig,
    targets: Arc<dyn TargetStore>,
    jobs: Arc<dyn JobStore>,
    runtime: Arc<dyn ProcessRuntime>,
    events: Arc<dyn EventPublisher>,
) -> SimulationEngine {
    SimulationEngine::new(
        targets,
        jobs,
        runtime,
        events,
        ArtifactLayout::new(&config.artifact_root),
        engine_options(config),
    )
}

/// Wire an engine over the Docker runtime selected by the configuration
pub fn build_docker_engine(
    config: &EngineConfig,
    targets: Arc<dyn TargetStore>,
    jobs: Arc<dyn JobStore>,
    events: Arc<dyn EventPublisher>,
) -> Result<SimulationEngine, RuntimeError> {
    let runtime = match config.docker.host.as_deref() {
        Some(host) => DockerProcessRuntime::connect_with_host(host)?,
        None => DockerProcessRuntime::connect()?,
    };
    Ok(build_engine(config, targets, jobs, Arc::new(runtime), events))
}
