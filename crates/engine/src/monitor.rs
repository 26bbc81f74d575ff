//! Job Monitor
//!
//! The only long-lived logic per launched job: a polling loop that watches
//! process liveness and artifact readiness and drives the attempt to one of
//! its terminal states (Completed, Failed, TimedOut). Exactly one monitor
//! exists per job, guaranteed by the single-flight invariant.

use std::sync::Arc;

use simrun_core::{EngineError, SimulationJob, SimulationTarget, TargetStatus};
use simrun_ports::{EventPublisher, ProcessRuntime, SimulationEvent, TargetStore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::artifacts::ArtifactLayout;
use crate::handoff::ResultHandoff;
use crate::registry::RegisteredKind;
use crate::terminator::Terminator;

/// Background supervisor for one launched job
pub struct JobMonitor {
    targets: Arc<dyn TargetStore>,
    runtime: Arc<dyn ProcessRuntime>,
    events: Arc<dyn EventPublisher>,
    artifacts: ArtifactLayout,
    handoff: ResultHandoff,
    terminator: Arc<Terminator>,
}

impl JobMonitor {
    pub fn new(
        targets: Arc<dyn TargetStore>,
        runtime: Arc<dyn ProcessRuntime>,
        events: Arc<dyn EventPublisher>,
        artifacts: ArtifactLayout,
        handoff: ResultHandoff,
        terminator: Arc<Terminator>,
    ) -> Self {
        Self {
            targets,
            runtime,
            events,
            artifacts,
            handoff,
            terminator,
        }
    }

    /// Supervise one attempt until it reaches a terminal state.
    ///
    /// Loop order per iteration: deadline, process liveness, artifact
    /// readiness, then sleep with a cancellation point, then the cooperative
    /// check for an externally forced SimulationFailed.
    pub async fn supervise(
        &self,
        kind: &RegisteredKind,
        job: SimulationJob,
        target: SimulationTarget,
        cancel: CancellationToken,
    ) {
        let name = kind.spec.container_name(&target.uid);
        let output_dir = self.artifacts.output_dir(&target.owner, &target.uid);
        let started = tokio::time::Instant::now();

        info!(
            target_uid = %target.uid,
            job_uid = %job.uid,
            timeout_secs = kind.spec.timeout.as_secs(),
            "monitoring simulation"
        );

        loop {
            if started.elapsed() >= kind.spec.timeout {
                let err = EngineError::Timeout(kind.spec.timeout.as_secs());
                warn!(target_uid = %target.uid, error = %err, "simulation timed out");
                let _ = self
                    .events
                    .publish(SimulationEvent::TimedOut {
                        target: target.uid.clone(),
                    })
                    .await;
                self.terminator.terminate(&kind.spec, &target.uid).await;
                return;
            }

            let alive = match self.runtime.is_alive(&name).await {
                Ok(alive) => alive,
                Err(e) => {
                    // supervision cannot continue without liveness signal
                    error!(container = %name, error = %e, "liveness query failed, aborting attempt");
                    let _ = self
                        .events
                        .publish(SimulationEvent::Failed {
                            target: target.uid.clone(),
                            reason: format!("runtime error: {}", e),
                        })
                        .await;
                    self.terminator.terminate(&kind.spec, &target.uid).await;
                    return;
                }
            };

            let produced = self.artifacts.artifact_present(&output_dir).await;

            if produced && !alive {
                self.handoff
                    .finalize(kind, &job, &target.uid, &output_dir)
                    .await;
                return;
            }

            if !alive && !produced {
                warn!(target_uid = %target.uid, "process stopped without producing output");
                let _ = self
                    .events
                    .publish(SimulationEvent::Failed {
                        target: target.uid.clone(),
                        reason: "process stopped without producing output".to_string(),
                    })
                    .await;
                self.terminator.terminate(&kind.spec, &target.uid).await;
                return;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(target_uid = %target.uid, "simulation cancelled");
                    let _ = self
                        .events
                        .publish(SimulationEvent::Cancelled {
                            target: target.uid.clone(),
                        })
                        .await;
                    self.terminator.terminate(&kind.spec, &target.uid).await;
                    return;
                }
                _ = tokio::time::sleep(kind.spec.poll_interval) => {}
            }

            // cooperative cancellation: an administrative actor may have
            // forced the status through the store while we slept
            match self.targets.get(&target.uid).await {
                Ok(current) if current.status == TargetStatus::SimulationFailed => {
                    info!(target_uid = %target.uid, "target externally failed, stopping monitor");
                    let _ = self
                        .events
                        .publish(SimulationEvent::Cancelled {
                            target: target.uid.clone(),
                        })
                        .await;
                    return;
                }
                Ok(_) => {}
                Err(e) => debug!(target_uid = %target.uid, error = %e, "status refresh failed"),
            }
        }
    }
}
