//! Container Launcher
//!
//! Creates the open job row, flips the target to Processing, prepares the
//! output directory and starts the external container detached. The request
//! that triggered the launch has already returned by the time this runs.

use std::sync::Arc;

use simrun_core::kind::OUTPUT_MOUNT;
use simrun_core::{
    EngineError, EngineResult, SimulationJob, SimulationKind, SimulationTarget, TargetStatus,
};
use simrun_ports::{JobStore, JobStoreError, LaunchSpec, ProcessRuntime, TargetStore};
use tracing::{debug, info, warn};

use crate::artifacts::ArtifactLayout;

/// Starts one isolated simulation process and records it
pub struct Launcher {
    targets: Arc<dyn TargetStore>,
    jobs: Arc<dyn JobStore>,
    runtime: Arc<dyn ProcessRuntime>,
    artifacts: ArtifactLayout,
}

impl Launcher {
    pub fn new(
        targets: Arc<dyn TargetStore>,
        jobs: Arc<dyn JobStore>,
        runtime: Arc<dyn ProcessRuntime>,
        artifacts: ArtifactLayout,
    ) -> Self {
        Self {
            targets,
            jobs,
            runtime,
            artifacts,
        }
    }

    /// Launch the external computation for a validated target.
    ///
    /// The job row is created first so the store-level single-flight check
    /// runs before anything externally visible happens; losing the race
    /// surfaces as [`EngineError::Conflict`] with no cleanup required.
    /// A process that fails to start is rolled back here (job row deleted)
    /// and reported as [`EngineError::Launch`]; the caller is expected to run
    /// the terminator to revert the visible Processing status.
    pub async fn launch(
        &self,
        kind_spec: &SimulationKind,
        target: &SimulationTarget,
    ) -> EngineResult<SimulationJob> {
        let mut job = SimulationJob::open(target.uid.clone());

        match self.jobs.create_open(&job).await {
            Ok(()) => {}
            Err(JobStoreError::OpenJobExists(_)) => {
                // another launcher won the race after the guard's read
                let existing = self
                    .jobs
                    .find_open_by_target(&target.uid)
                    .await
                    .map_err(|e| EngineError::Store(e.to_string()))?;
                return Err(match existing {
                    Some(existing) => EngineError::Conflict {
                        job: existing.uid,
                        target: target.uid.clone(),
                    },
                    None => EngineError::Store("open job vanished during launch".to_string()),
                });
            }
            Err(e) => return Err(EngineError::Store(e.to_string())),
        }

        self.targets
            .set_status(&target.uid, TargetStatus::Processing)
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?;

        let output_dir = self
            .artifacts
            .ensure_output_dir(&target.owner, &target.uid)
            .await
            .map_err(|e| EngineError::Launch(format!("output dir: {}", e)))?;

        let spec = LaunchSpec {
            name: kind_spec.container_name(&target.uid),
            image: kind_spec.image.clone(),
            command: kind_spec.render_command(&target.parameter),
            volumes: vec![(
                output_dir.to_string_lossy().into_owned(),
                OUTPUT_MOUNT.to_string(),
            )],
            limits: kind_spec.limits,
        };

        if let Err(e) = self.runtime.start(&spec).await {
            warn!(target_uid = %target.uid, error = %e, "container failed to start");
            if let Err(del) = self.jobs.delete(&job.uid).await {
                warn!(job_uid = %job.uid, error = %del, "failed to roll back job row");
            }
            return Err(EngineError::Launch(e.to_string()));
        }

        // the container may legitimately have exited already; the handle is
        // then left unset
        match self.runtime.pid(&spec.name).await {
            Ok(pid) => {
                job.attach_process_handle(pid);
                if let Err(e) = self.jobs.set_process_handle(&job.uid, pid).await {
                    warn!(job_uid = %job.uid, error = %e, "failed to persist process handle");
                }
            }
            Err(e) => debug!(container = %spec.name, error = %e, "pid not available"),
        }

        info!(
            target_uid = %target.uid,
            job_uid = %job.uid,
            container = %spec.name,
            "simulation launched"
        );
        Ok(job)
    }
}
