//! Terminator
//!
//! Forced cleanup of a target's simulation attempt: stop the container,
//! purge open job rows, mark the target failed. Idempotent, and it never
//! raises. Every internal error is logged and swallowed so the terminal
//! status write always happens.

use std::sync::Arc;
use std::time::Duration;

use simrun_core::{SimulationKind, TargetId, TargetStatus};
use simrun_ports::{JobStore, ProcessRuntime, RuntimeError, TargetStore};
use tracing::{debug, info, warn};

/// Forcibly ends a target's simulation attempt
pub struct Terminator {
    targets: Arc<dyn TargetStore>,
    jobs: Arc<dyn JobStore>,
    runtime: Arc<dyn ProcessRuntime>,
    stop_grace: Duration,
}

impl Terminator {
    pub fn new(
        targets: Arc<dyn TargetStore>,
        jobs: Arc<dyn JobStore>,
        runtime: Arc<dyn ProcessRuntime>,
        stop_grace: Duration,
    ) -> Self {
        Self {
            targets,
            jobs,
            runtime,
            stop_grace,
        }
    }

    /// Stop the container (graceful, then forced), delete open job rows and
    /// set the target to SimulationFailed. Closed job rows are untouched.
    pub async fn terminate(&self, kind_spec: &SimulationKind, target_uid: &TargetId) {
        let name = kind_spec.container_name(target_uid);

        match self.runtime.is_alive(&name).await {
            Ok(true) => {
                if let Err(stop_err) = self.runtime.stop(&name, self.stop_grace).await {
                    warn!(container = %name, error = %stop_err, "graceful stop failed, forcing removal");
                    if let Err(e) = self.runtime.force_remove(&name).await {
                        if !matches!(e, RuntimeError::NotFound(_)) {
                            warn!(container = %name, error = %e, "force removal failed");
                        }
                    }
                }
            }
            Ok(false) => {
                // container already gone or never started; remove leftovers
                match self.runtime.force_remove(&name).await {
                    Ok(()) | Err(RuntimeError::NotFound(_)) => {
                        debug!(container = %name, "nothing left to stop")
                    }
                    Err(e) => warn!(container = %name, error = %e, "force removal failed"),
                }
            }
            Err(e) => warn!(container = %name, error = %e, "liveness check failed during termination"),
        }

        match self.jobs.delete_open_for_target(target_uid).await {
            Ok(removed) if removed > 0 => {
                debug!(target_uid = %target_uid, removed, "purged open job rows")
            }
            Ok(_) => {}
            Err(e) => warn!(target_uid = %target_uid, error = %e, "failed to purge open job rows"),
        }

        if let Err(e) = self
            .targets
            .set_status(target_uid, TargetStatus::SimulationFailed)
            .await
        {
            warn!(target_uid = %target_uid, error = %e, "failed to mark target as failed");
        }

        info!(target_uid = %target_uid, "simulation attempt terminated");
    }
}
