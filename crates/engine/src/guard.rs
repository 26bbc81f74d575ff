//! Concurrency Guard
//!
//! Decides whether a new simulation attempt may start for a target. The
//! guard creates no job; its only side effect is the self-healing status
//! demotion when a completed target's artifact has gone missing.

use std::sync::Arc;

use simrun_core::{
    EngineError, EngineResult, SimulationJob, SimulationTarget, TargetId, TargetStatus,
};
use simrun_ports::{JobStore, TargetStore};
use tracing::{info, warn};

use crate::artifacts::ArtifactLayout;

/// Admission decision for a run request
#[derive(Debug)]
pub enum Admission {
    /// No conflict; a new job may be launched
    Proceed,
    /// This target already has an open job
    AlreadyRunningThisTarget { job: SimulationJob },
    /// Another target of the same owner has an open job
    AlreadyRunningOtherTarget {
        job: SimulationJob,
        other_target: TargetId,
    },
    /// A completed artifact already exists; nothing to do
    AlreadyCompleted { artifact_path: String },
}

/// Pre-launch admission check
pub struct ConcurrencyGuard {
    targets: Arc<dyn TargetStore>,
    jobs: Arc<dyn JobStore>,
    artifacts: ArtifactLayout,
}

impl ConcurrencyGuard {
    pub fn new(
        targets: Arc<dyn TargetStore>,
        jobs: Arc<dyn JobStore>,
        artifacts: ArtifactLayout,
    ) -> Self {
        Self {
            targets,
            jobs,
            artifacts,
        }
    }

    /// Check whether `target` may start a new simulation attempt
    pub async fn check(&self, target: &SimulationTarget) -> EngineResult<Admission> {
        // (a) open job for this target
        if let Some(job) = self
            .jobs
            .find_open_by_target(&target.uid)
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?
        {
            return Ok(Admission::AlreadyRunningThisTarget { job });
        }

        // (b) open job on a sibling target of the same owner
        let siblings: Vec<TargetId> = self
            .targets
            .find_by_owner(&target.owner)
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?
            .into_iter()
            .map(|t| t.uid)
            .filter(|uid| uid != &target.uid)
            .collect();

        if let Some(job) = self
            .jobs
            .find_open_by_targets(&siblings)
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?
        {
            let other_target = job.target_uid.clone();
            return Ok(Admission::AlreadyRunningOtherTarget { job, other_target });
        }

        // (c) completed target: re-use the artifact when it still exists,
        // demote and fall through when it does not
        if target.status == TargetStatus::Completed {
            if let Some(path) = target.artifact_path.as_deref() {
                if self.artifacts.artifact_present(path.as_ref()).await {
                    return Ok(Admission::AlreadyCompleted {
                        artifact_path: path.to_string(),
                    });
                }
            }

            warn!(
                target_uid = %target.uid,
                "completed target has no artifact on disk, demoting to SimulationFailed"
            );
            self.targets
                .set_status(&target.uid, TargetStatus::SimulationFailed)
                .await
                .map_err(|e| EngineError::Store(e.to_string()))?;
        }

        info!(target_uid = %target.uid, "admission granted");
        Ok(Admission::Proceed)
    }
}
