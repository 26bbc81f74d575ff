//! Result Handoff
//!
//! Success-path finalization: run the kind's analyzer over the output
//! directory, persist the structured result and terminal status, close the
//! job row and trigger best-effort report generation.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use simrun_core::{EngineError, SimulationJob, TargetId, TargetStatus};
use simrun_ports::{EventPublisher, JobStore, SimulationEvent, TargetStore};
use tracing::{error, info, warn};

use crate::registry::RegisteredKind;

/// Hands produced artifacts to the analyzer and report generator
pub struct ResultHandoff {
    targets: Arc<dyn TargetStore>,
    jobs: Arc<dyn JobStore>,
    events: Arc<dyn EventPublisher>,
}

impl ResultHandoff {
    pub fn new(
        targets: Arc<dyn TargetStore>,
        jobs: Arc<dyn JobStore>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            targets,
            jobs,
            events,
        }
    }

    /// Finalize an attempt whose process has exited leaving artifacts behind.
    ///
    /// Analyzer outcomes map to three distinct terminal states:
    /// - structured result: target Completed, job closed
    /// - no data: target SimulationFailed, job closed-but-unsuccessful
    /// - analyzer fault: target Error, job row deliberately left open so the
    ///   start time of the crashed analysis stays diagnosable
    pub async fn finalize(
        &self,
        kind: &RegisteredKind,
        job: &SimulationJob,
        target_uid: &TargetId,
        output_dir: &Path,
    ) {
        match kind.analyzer.analyze(output_dir).await {
            Ok(Some(result)) => {
                let artifact_path = output_dir.to_string_lossy().into_owned();

                if let Err(e) = self
                    .targets
                    .set_result(target_uid, result, artifact_path.clone())
                    .await
                {
                    error!(target_uid = %target_uid, error = %e, "failed to persist result");
                }
                if let Err(e) = self
                    .targets
                    .set_status(target_uid, TargetStatus::Completed)
                    .await
                {
                    error!(target_uid = %target_uid, error = %e, "failed to persist Completed status");
                }
                if let Err(e) = self.jobs.close(&job.uid, Utc::now()).await {
                    error!(job_uid = %job.uid, error = %e, "failed to close job row");
                }

                let _ = self
                    .events
                    .publish(SimulationEvent::Completed {
                        target: target_uid.clone(),
                        job: job.uid,
                        artifact_path,
                    })
                    .await;

                info!(target_uid = %target_uid, job_uid = %job.uid, "simulation completed");
                self.generate_report(kind, target_uid).await;
            }
            Ok(None) => {
                let err = EngineError::NoResult;
                warn!(target_uid = %target_uid, error = %err, "analyzer found no data in artifacts");
                if let Err(e) = self
                    .targets
                    .set_status(target_uid, TargetStatus::SimulationFailed)
                    .await
                {
                    error!(target_uid = %target_uid, error = %e, "failed to persist SimulationFailed");
                }
                if let Err(e) = self.jobs.close(&job.uid, Utc::now()).await {
                    error!(job_uid = %job.uid, error = %e, "failed to close job row");
                }
                let _ = self
                    .events
                    .publish(SimulationEvent::Failed {
                        target: target_uid.clone(),
                        reason: err.to_string(),
                    })
                    .await;
            }
            Err(e) => {
                let err = EngineError::Analysis(e.to_string());
                error!(target_uid = %target_uid, error = %err, "analyzer raised");
                // job row stays open: crashed-during-analysis is kept
                // distinguishable from exited-without-data
                if let Err(set) = self.targets.set_status(target_uid, TargetStatus::Error).await
                {
                    error!(target_uid = %target_uid, error = %set, "failed to persist Error status");
                }
                let _ = self
                    .events
                    .publish(SimulationEvent::Failed {
                        target: target_uid.clone(),
                        reason: err.to_string(),
                    })
                    .await;
            }
        }
    }

    /// Report generation is a best-effort side artifact; failure never
    /// reverts the Completed status.
    async fn generate_report(&self, kind: &RegisteredKind, target_uid: &TargetId) {
        let target = match self.targets.get(target_uid).await {
            Ok(target) => target,
            Err(e) => {
                warn!(target_uid = %target_uid, error = %e, "cannot reload target for report");
                return;
            }
        };

        match kind.reporter.generate(&target).await {
            Ok(path) => info!(target_uid = %target_uid, report = %path.display(), "report generated"),
            Err(e) => warn!(target_uid = %target_uid, error = %e, "report generation failed"),
        }
    }
}
