//! Simulation Engine facade
//!
//! Wires guard, launcher, monitor, handoff and terminator together per
//! registered kind. A `run` request performs the synchronous admission
//! checks and returns immediately; launch and supervision happen on a
//! background task gated by a bounded semaphore.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use simrun_core::{EngineError, EngineResult, SimulationTarget, TargetId};
use simrun_ports::{
    EventPublisher, JobStore, ProcessRuntime, SimulationEvent, TargetStore, TargetStoreError,
};
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::artifacts::ArtifactLayout;
use crate::guard::{Admission, ConcurrencyGuard};
use crate::handoff::ResultHandoff;
use crate::launcher::Launcher;
use crate::monitor::JobMonitor;
use crate::registry::RegisteredKind;
use crate::terminator::Terminator;

/// Tuning knobs of the engine, independent of any kind
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Upper bound on concurrently supervised jobs; further launches queue
    pub max_concurrent_jobs: usize,
    /// Grace period for container stop before force removal
    pub stop_grace: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 8,
            stop_grace: Duration::from_secs(30),
        }
    }
}

/// Synchronous outcome of a run request
#[derive(Debug)]
pub enum RunResponse {
    /// Attempt accepted; target moves to Processing in the background
    Accepted { target: TargetId },
    /// A valid completed artifact already exists; no new job created
    AlreadyCompleted { artifact_path: String },
}

/// The generalized orchestration engine
pub struct SimulationEngine {
    targets: Arc<dyn TargetStore>,
    events: Arc<dyn EventPublisher>,
    guard: ConcurrencyGuard,
    launcher: Arc<Launcher>,
    monitor: Arc<JobMonitor>,
    terminator: Arc<Terminator>,
    kinds: HashMap<String, Arc<RegisteredKind>>,
    permits: Arc<Semaphore>,
    running: Arc<Mutex<HashMap<TargetId, CancellationToken>>>,
}

impl SimulationEngine {
    pub fn new(
        targets: Arc<dyn TargetStore>,
        jobs: Arc<dyn JobStore>,
        runtime: Arc<dyn ProcessRuntime>,
        events: Arc<dyn EventPublisher>,
        artifacts: ArtifactLayout,
        options: EngineOptions,
    ) -> Self {
        let guard = ConcurrencyGuard::new(targets.clone(), jobs.clone(), artifacts.clone());
        let launcher = Arc::new(Launcher::new(
            targets.clone(),
            jobs.clone(),
            runtime.clone(),
            artifacts.clone(),
        ));
        let terminator = Arc::new(Terminator::new(
            targets.clone(),
            jobs.clone(),
            runtime.clone(),
            options.stop_grace,
        ));
        let handoff = ResultHandoff::new(targets.clone(), jobs.clone(), events.clone());
        let monitor = Arc::new(JobMonitor::new(
            targets.clone(),
            runtime,
            events.clone(),
            artifacts,
            handoff,
            terminator.clone(),
        ));

        Self {
            targets,
            events,
            guard,
            launcher,
            monitor,
            terminator,
            kinds: HashMap::new(),
            permits: Arc::new(Semaphore::new(options.max_concurrent_jobs)),
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a simulation kind. Called during startup, before any run.
    pub fn register_kind(&mut self, kind: RegisteredKind) {
        self.kinds.insert(kind.spec.name.clone(), Arc::new(kind));
    }

    /// Request a simulation run for a target.
    ///
    /// Returns synchronously: `Accepted` means launch and supervision
    /// continue in the background and the outcome is observable via target
    /// status and the event bus. Validation, NotFound and Conflict surface
    /// here with no side effects beyond the guard's self-healing demotion.
    pub async fn run(&self, kind_name: &str, target_uid: &TargetId) -> EngineResult<RunResponse> {
        if target_uid.is_empty() {
            return Err(EngineError::Validation(
                "target uid must not be empty".to_string(),
            ));
        }

        let kind = self
            .kinds
            .get(kind_name)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("unknown simulation kind '{}'", kind_name)))?;

        let target = self.targets.get(target_uid).await.map_err(|e| match e {
            TargetStoreError::NotFound(uid) => {
                EngineError::NotFound(format!("target {} not found", uid))
            }
            other => EngineError::Store(other.to_string()),
        })?;

        if !target.has_parameter() {
            return Err(EngineError::Validation(
                "target has no simulation parameters".to_string(),
            ));
        }

        match self.guard.check(&target).await? {
            Admission::AlreadyRunningThisTarget { job } => Err(EngineError::Conflict {
                job: job.uid,
                target: target.uid,
            }),
            Admission::AlreadyRunningOtherTarget { job, other_target } => {
                Err(EngineError::Conflict {
                    job: job.uid,
                    target: other_target,
                })
            }
            Admission::AlreadyCompleted { artifact_path } => {
                Ok(RunResponse::AlreadyCompleted { artifact_path })
            }
            Admission::Proceed => {
                self.spawn_attempt(kind, target);
                Ok(RunResponse::Accepted {
                    target: target_uid.clone(),
                })
            }
        }
    }

    /// Cancel a running attempt. Returns false when no attempt is in flight
    /// for the target.
    pub async fn cancel(&self, target_uid: &TargetId) -> bool {
        let token = self.running.lock().await.get(target_uid).cloned();
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn spawn_attempt(&self, kind: Arc<RegisteredKind>, target: SimulationTarget) {
        let launcher = self.launcher.clone();
        let monitor = self.monitor.clone();
        let terminator = self.terminator.clone();
        let events = self.events.clone();
        let permits = self.permits.clone();
        let running = self.running.clone();

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            let target_uid = target.uid.clone();
            let token = CancellationToken::new();
            {
                let mut map = running.lock().await;
                if map.contains_key(&target_uid) {
                    debug!(target_uid = %target_uid, "attempt already registered, skipping");
                    return;
                }
                map.insert(target_uid.clone(), token.clone());
            }

            match launcher.launch(&kind.spec, &target).await {
                Ok(job) => {
                    let _ = events
                        .publish(SimulationEvent::Launched {
                            target: target_uid.clone(),
                            job: job.uid,
                        })
                        .await;
                    monitor.supervise(&kind, job, target, token).await;
                }
                Err(EngineError::Conflict { .. }) => {
                    // lost the check-then-create race; the winner's monitor
                    // owns the attempt
                    debug!(target_uid = %target_uid, "launch lost single-flight race");
                }
                Err(e) => {
                    error!(target_uid = %target_uid, error = %e, "launch failed");
                    let _ = events
                        .publish(SimulationEvent::Failed {
                            target: target_uid.clone(),
                            reason: e.to_string(),
                        })
                        .await;
                    terminator.terminate(&kind.spec, &target_uid).await;
                }
            }

            running.lock().await.remove(&target_uid);
        });
    }
}
