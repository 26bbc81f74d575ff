//! Engine Integration Tests
//!
//! End-to-end verification of the orchestration engine against in-memory
//! stores and a controllable fake process runtime: single-flight per target
//! and per owner, validation short-circuit, timeout closure, idempotent
//! re-run, success handoff and the diagnostic analyzer-fault state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use simrun_adapters::{InMemoryBus, InMemoryJobStore, InMemoryTargetStore};
use simrun_core::{
    EngineError, OwnerId, ResourceLimits, SimulationKind, SimulationTarget, TargetId, TargetStatus,
};
use simrun_engine::engine::{EngineOptions, RunResponse, SimulationEngine};
use simrun_engine::{ArtifactLayout, RegisteredKind};
use simrun_ports::{
    AnalyzerError, EventSubscriber, LaunchSpec, ProcessRuntime, ReportError, ReportGenerator,
    ResultAnalyzer, RuntimeError, SimulationEvent, TargetStore,
};
use tempfile::TempDir;
use tokio::sync::Mutex;

const KIND: &str = "Coverage";

// ---------------------------------------------------------------------------
// Fakes

/// Controllable process runtime: tests flip liveness instead of running
/// actual containers. `stop` removes the entry, matching the auto-remove
/// behavior of the real runtime.
#[derive(Default)]
struct FakeRuntime {
    procs: Mutex<HashMap<String, bool>>,
    fail_next_start: AtomicBool,
    stops: AtomicUsize,
}

impl FakeRuntime {
    /// Simulate the process exiting on its own (container reaped)
    async fn finish(&self, name: &str) {
        let mut procs = self.procs.lock().await;
        if let Some(alive) = procs.get_mut(name) {
            *alive = false;
        }
    }

    async fn exists(&self, name: &str) -> bool {
        self.procs.lock().await.contains_key(name)
    }
}

#[async_trait]
impl ProcessRuntime for FakeRuntime {
    async fn start(&self, spec: &LaunchSpec) -> Result<String, RuntimeError> {
        if self.fail_next_start.swap(false, Ordering::SeqCst) {
            return Err(RuntimeError::StartFailed {
                name: spec.name.clone(),
                reason: "image missing".to_string(),
            });
        }
        self.procs.lock().await.insert(spec.name.clone(), true);
        Ok(format!("cid-{}", spec.name))
    }

    async fn is_alive(&self, name: &str) -> Result<bool, RuntimeError> {
        Ok(*self.procs.lock().await.get(name).unwrap_or(&false))
    }

    async fn pid(&self, name: &str) -> Result<i64, RuntimeError> {
        match self.procs.lock().await.get(name) {
            Some(true) => Ok(4242),
            _ => Err(RuntimeError::NotFound(name.to_string())),
        }
    }

    async fn stop(&self, name: &str, _timeout: Duration) -> Result<(), RuntimeError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        match self.procs.lock().await.remove(name) {
            Some(_) => Ok(()),
            None => Err(RuntimeError::NotFound(name.to_string())),
        }
    }

    async fn force_remove(&self, name: &str) -> Result<(), RuntimeError> {
        match self.procs.lock().await.remove(name) {
            Some(_) => Ok(()),
            None => Err(RuntimeError::NotFound(name.to_string())),
        }
    }
}

#[derive(Clone, Copy)]
enum AnalyzerMode {
    Data,
    NoData,
    Fault,
}

struct FakeAnalyzer {
    mode: AnalyzerMode,
    calls: AtomicUsize,
}

#[async_trait]
impl ResultAnalyzer for FakeAnalyzer {
    async fn analyze(&self, _output_dir: &Path) -> Result<Option<Value>, AnalyzerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            AnalyzerMode::Data => Ok(Some(json!({"coverage": 0.93}))),
            AnalyzerMode::NoData => Ok(None),
            AnalyzerMode::Fault => Err(AnalyzerError::Analysis("malformed csv".to_string())),
        }
    }
}

struct FakeReporter {
    calls: AtomicUsize,
}

#[async_trait]
impl ReportGenerator for FakeReporter {
    async fn generate(&self, target: &SimulationTarget) -> Result<PathBuf, ReportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(PathBuf::from(format!("/reports/{}.pdf", target.uid)))
    }
}

// ---------------------------------------------------------------------------
// Harness

struct Harness {
    targets: Arc<InMemoryTargetStore>,
    jobs: Arc<InMemoryJobStore>,
    runtime: Arc<FakeRuntime>,
    bus: Arc<InMemoryBus>,
    analyzer: Arc<FakeAnalyzer>,
    reporter: Arc<FakeReporter>,
    engine: SimulationEngine,
    _tmp: TempDir,
    artifact_root: PathBuf,
}

fn kind_spec(timeout: Duration) -> SimulationKind {
    SimulationKind {
        name: KIND.to_string(),
        image: "simrun/coverage:latest".to_string(),
        command_template: vec![
            "python".to_string(),
            "/opt/run.py".to_string(),
            "{parameters}".to_string(),
        ],
        limits: ResourceLimits::default(),
        poll_interval: Duration::from_millis(10),
        timeout,
    }
}

fn harness_with(mode: AnalyzerMode, timeout: Duration) -> Harness {
    let tmp = TempDir::new().unwrap();
    let artifact_root = tmp.path().to_path_buf();

    let targets = Arc::new(InMemoryTargetStore::new());
    let jobs = Arc::new(InMemoryJobStore::new());
    let runtime = Arc::new(FakeRuntime::default());
    let bus = Arc::new(InMemoryBus::new(64));
    let analyzer = Arc::new(FakeAnalyzer {
        mode,
        calls: AtomicUsize::new(0),
    });
    let reporter = Arc::new(FakeReporter {
        calls: AtomicUsize::new(0),
    });

    let mut engine = SimulationEngine::new(
        targets.clone(),
        jobs.clone(),
        runtime.clone(),
        bus.clone(),
        ArtifactLayout::new(&artifact_root),
        EngineOptions {
            max_concurrent_jobs: 4,
            stop_grace: Duration::from_millis(50),
        },
    );
    engine.register_kind(RegisteredKind::new(
        kind_spec(timeout),
        analyzer.clone(),
        reporter.clone(),
    ));

    Harness {
        targets,
        jobs,
        runtime,
        bus,
        analyzer,
        reporter,
        engine,
        _tmp: tmp,
        artifact_root,
    }
}

fn harness(mode: AnalyzerMode) -> Harness {
    harness_with(mode, Duration::from_secs(5))
}

const WAIT_ATTEMPTS: usize = 500;
const WAIT_STEP: Duration = Duration::from_millis(10);

impl Harness {
    async fn seed_target(&self, uid: &str, owner: &str) -> TargetId {
        let target =
            SimulationTarget::new(TargetId::new(uid), OwnerId::new(owner), json!({"x": 1}));
        let uid = target.uid.clone();
        self.targets.insert(target).await;
        uid
    }

    fn container(&self, uid: &TargetId) -> String {
        format!("{}Simulation_{}", KIND, uid)
    }

    fn output_dir(&self, owner: &str, uid: &TargetId) -> PathBuf {
        self.artifact_root.join(owner).join(uid.as_str())
    }

    async fn write_artifact(&self, owner: &str, uid: &TargetId) {
        let dir = self.output_dir(owner, uid);
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("results.csv"), b"a,b\n1,2\n")
            .await
            .unwrap();
    }

    async fn status(&self, uid: &TargetId) -> TargetStatus {
        self.targets.get(uid).await.unwrap().status
    }

    /// Wait until the container for a target is registered with the runtime
    /// and its PID has been persisted, i.e. the launch fully completed.
    async fn wait_launched(&self, uid: &TargetId) {
        let name = self.container(uid);
        for _ in 0..WAIT_ATTEMPTS {
            if self.runtime.exists(&name).await {
                if let Some(job) = self.jobs.all().await.iter().find(|j| &j.target_uid == uid) {
                    if job.process_handle.is_some() {
                        return;
                    }
                }
            }
            tokio::time::sleep(WAIT_STEP).await;
        }
        panic!("launch never completed for {}", uid);
    }

    async fn wait_status(&self, uid: &TargetId, expected: TargetStatus) {
        for _ in 0..WAIT_ATTEMPTS {
            if self.status(uid).await == expected {
                return;
            }
            tokio::time::sleep(WAIT_STEP).await;
        }
        panic!(
            "target {} never reached {:?} (last: {:?})",
            uid,
            expected,
            self.status(uid).await
        );
    }

    async fn wait_open_count(&self, uid: &TargetId, expected: usize) {
        for _ in 0..WAIT_ATTEMPTS {
            if self.jobs.open_count(uid).await == expected {
                return;
            }
            tokio::time::sleep(WAIT_STEP).await;
        }
        panic!("target {} never had {} open jobs", uid, expected);
    }
}

// ---------------------------------------------------------------------------
// Tests

#[tokio::test]
async fn test_empty_parameter_short_circuits() {
    let h = harness(AnalyzerMode::Data);
    let target = SimulationTarget::new(TargetId::new("T1"), OwnerId::new("U1"), json!({}));
    h.targets.insert(target).await;

    let err = h.engine.run(KIND, &TargetId::new("T1")).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    // no job created, status untouched
    assert!(h.jobs.all().await.is_empty());
    assert_eq!(h.status(&TargetId::new("T1")).await, TargetStatus::None);
}

#[tokio::test]
async fn test_blank_uid_is_validation_error() {
    let h = harness(AnalyzerMode::Data);
    let err = h.engine.run(KIND, &TargetId::new("  ")).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn test_unknown_target_is_not_found() {
    let h = harness(AnalyzerMode::Data);
    let err = h.engine.run(KIND, &TargetId::new("ghost")).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn test_unknown_kind_is_not_found() {
    let h = harness(AnalyzerMode::Data);
    let uid = h.seed_target("T1", "U1").await;
    let err = h.engine.run("Unknown", &uid).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn test_run_to_completion_scenario() {
    // happy path: run, conflict on re-run, process exits leaving an artifact
    let h = harness(AnalyzerMode::Data);
    let uid = h.seed_target("T1", "U1").await;
    let mut events = h.bus.subscribe().await.unwrap();

    let response = h.engine.run(KIND, &uid).await.unwrap();
    assert!(matches!(response, RunResponse::Accepted { .. }));

    h.wait_launched(&uid).await;
    assert_eq!(h.jobs.open_count(&uid).await, 1);
    assert_eq!(h.status(&uid).await, TargetStatus::Processing);

    // second run conflicts with the open job
    let open_job = h.jobs.all().await.into_iter().find(|j| j.is_open()).unwrap();
    assert_eq!(open_job.process_handle, Some(4242));
    match h.engine.run(KIND, &uid).await.unwrap_err() {
        EngineError::Conflict { job, target } => {
            assert_eq!(job, open_job.uid);
            assert_eq!(target, uid);
        }
        other => panic!("expected conflict, got {:?}", other),
    }

    // process exits leaving one file behind
    h.write_artifact("U1", &uid).await;
    h.runtime.finish(&h.container(&uid)).await;

    h.wait_status(&uid, TargetStatus::Completed).await;

    // exactly one job, closed, result and artifact path persisted
    let all = h.jobs.all().await;
    assert_eq!(all.len(), 1);
    assert!(all[0].end_time.is_some());

    let target = h.targets.get(&uid).await.unwrap();
    assert_eq!(target.result, Some(json!({"coverage": 0.93})));
    assert_eq!(
        target.artifact_path.as_deref(),
        Some(h.output_dir("U1", &uid).to_string_lossy().as_ref())
    );

    assert_eq!(h.analyzer.calls.load(Ordering::SeqCst), 1);
    for _ in 0..WAIT_ATTEMPTS {
        if h.reporter.calls.load(Ordering::SeqCst) == 1 {
            break;
        }
        tokio::time::sleep(WAIT_STEP).await;
    }
    assert_eq!(h.reporter.calls.load(Ordering::SeqCst), 1);

    // Launched then Completed on the bus
    match events.recv().await.unwrap() {
        SimulationEvent::Launched { target, .. } => assert_eq!(target, uid),
        other => panic!("expected Launched, got {:?}", other),
    }
    match events.recv().await.unwrap() {
        SimulationEvent::Completed { target, .. } => assert_eq!(target, uid),
        other => panic!("expected Completed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_owner_exclusivity_across_targets() {
    // one open job per owner across all targets
    let h = harness(AnalyzerMode::Data);
    let first = h.seed_target("T1", "U1").await;
    let second = h.seed_target("T2", "U1").await;
    let other_owner = h.seed_target("T3", "U2").await;

    h.engine.run(KIND, &first).await.unwrap();
    h.wait_launched(&first).await;

    match h.engine.run(KIND, &second).await.unwrap_err() {
        EngineError::Conflict { target, .. } => assert_eq!(target, first),
        other => panic!("expected owner conflict, got {:?}", other),
    }
    assert_eq!(h.jobs.open_count(&second).await, 0);

    // a different owner is unaffected
    let response = h.engine.run(KIND, &other_owner).await.unwrap();
    assert!(matches!(response, RunResponse::Accepted { .. }));
    h.wait_launched(&other_owner).await;
}

#[tokio::test]
async fn test_timeout_closes_attempt() {
    // neither exit nor output within the deadline
    let h = harness_with(AnalyzerMode::Data, Duration::from_millis(150));
    let uid = h.seed_target("T1", "U1").await;

    h.engine.run(KIND, &uid).await.unwrap();
    h.wait_launched(&uid).await;

    h.wait_status(&uid, TargetStatus::SimulationFailed).await;
    h.wait_open_count(&uid, 0).await;

    assert!(h.runtime.stops.load(Ordering::SeqCst) >= 1);
    assert!(!h.runtime.exists(&h.container(&uid)).await);
}

#[tokio::test]
async fn test_completed_target_with_artifact_is_idempotent() {
    // a valid existing artifact short-circuits to success
    let h = harness(AnalyzerMode::Data);
    let uid = h.seed_target("T1", "U1").await;
    h.write_artifact("U1", &uid).await;

    let dir = h.output_dir("U1", &uid).to_string_lossy().into_owned();
    h.targets
        .set_result(&uid, json!({"coverage": 0.5}), dir.clone())
        .await
        .unwrap();
    h.targets
        .set_status(&uid, TargetStatus::Completed)
        .await
        .unwrap();

    match h.engine.run(KIND, &uid).await.unwrap() {
        RunResponse::AlreadyCompleted { artifact_path } => assert_eq!(artifact_path, dir),
        other => panic!("expected AlreadyCompleted, got {:?}", other),
    }
    assert!(h.jobs.all().await.is_empty());
}

#[tokio::test]
async fn test_completed_target_with_missing_artifact_reruns() {
    // a missing artifact demotes and launches a fresh attempt
    let h = harness(AnalyzerMode::Data);
    let uid = h.seed_target("T1", "U1").await;

    h.targets
        .set_status(&uid, TargetStatus::Completed)
        .await
        .unwrap();

    let response = h.engine.run(KIND, &uid).await.unwrap();
    assert!(matches!(response, RunResponse::Accepted { .. }));

    h.wait_launched(&uid).await;
    assert_eq!(h.jobs.open_count(&uid).await, 1);
    assert_eq!(h.status(&uid).await, TargetStatus::Processing);
}

#[tokio::test]
async fn test_exit_without_output_fails_attempt() {
    let h = harness(AnalyzerMode::Data);
    let uid = h.seed_target("T1", "U1").await;
    let mut events = h.bus.subscribe().await.unwrap();

    h.engine.run(KIND, &uid).await.unwrap();
    h.wait_launched(&uid).await;

    h.runtime.finish(&h.container(&uid)).await;

    h.wait_status(&uid, TargetStatus::SimulationFailed).await;
    assert_eq!(h.jobs.open_count(&uid).await, 0);
    assert_eq!(h.analyzer.calls.load(Ordering::SeqCst), 0);

    // Launched, then a Failed carrying the no-output reason
    match events.recv().await.unwrap() {
        SimulationEvent::Launched { .. } => {}
        other => panic!("expected Launched, got {:?}", other),
    }
    match events.recv().await.unwrap() {
        SimulationEvent::Failed { reason, .. } => {
            assert!(reason.contains("without producing output"))
        }
        other => panic!("expected Failed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_analyzer_no_data_closes_job_as_failed() {
    let h = harness(AnalyzerMode::NoData);
    let uid = h.seed_target("T1", "U1").await;
    let mut events = h.bus.subscribe().await.unwrap();

    h.engine.run(KIND, &uid).await.unwrap();
    h.wait_launched(&uid).await;

    h.write_artifact("U1", &uid).await;
    h.runtime.finish(&h.container(&uid)).await;

    h.wait_status(&uid, TargetStatus::SimulationFailed).await;

    // closed-but-unsuccessful, not deleted
    let all = h.jobs.all().await;
    assert_eq!(all.len(), 1);
    assert!(all[0].end_time.is_some());
    assert_eq!(h.reporter.calls.load(Ordering::SeqCst), 0);

    match events.recv().await.unwrap() {
        SimulationEvent::Launched { .. } => {}
        other => panic!("expected Launched, got {:?}", other),
    }
    match events.recv().await.unwrap() {
        SimulationEvent::Failed { reason, .. } => {
            assert!(reason.contains("no usable result"))
        }
        other => panic!("expected Failed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_analyzer_fault_keeps_job_open_for_diagnosis() {
    let h = harness(AnalyzerMode::Fault);
    let uid = h.seed_target("T1", "U1").await;
    let mut events = h.bus.subscribe().await.unwrap();

    h.engine.run(KIND, &uid).await.unwrap();
    h.wait_launched(&uid).await;

    h.write_artifact("U1", &uid).await;
    h.runtime.finish(&h.container(&uid)).await;

    h.wait_status(&uid, TargetStatus::Error).await;

    // the crashed-analysis row stays open, distinct from no-data
    let all = h.jobs.all().await;
    assert_eq!(all.len(), 1);
    assert!(all[0].end_time.is_none());

    match events.recv().await.unwrap() {
        SimulationEvent::Launched { .. } => {}
        other => panic!("expected Launched, got {:?}", other),
    }
    match events.recv().await.unwrap() {
        SimulationEvent::Failed { reason, .. } => {
            assert!(reason.contains("Analysis error"));
            assert!(reason.contains("malformed csv"));
        }
        other => panic!("expected Failed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_launch_rolls_back() {
    let h = harness(AnalyzerMode::Data);
    let uid = h.seed_target("T1", "U1").await;
    h.runtime.fail_next_start.store(true, Ordering::SeqCst);

    h.engine.run(KIND, &uid).await.unwrap();

    h.wait_status(&uid, TargetStatus::SimulationFailed).await;
    assert!(h.jobs.all().await.is_empty());

    // a later run succeeds again
    let response = h.engine.run(KIND, &uid).await.unwrap();
    assert!(matches!(response, RunResponse::Accepted { .. }));
    h.wait_launched(&uid).await;
}

#[tokio::test]
async fn test_cancel_stops_running_attempt() {
    let h = harness(AnalyzerMode::Data);
    let uid = h.seed_target("T1", "U1").await;

    h.engine.run(KIND, &uid).await.unwrap();
    h.wait_launched(&uid).await;

    assert!(h.engine.cancel(&uid).await);

    h.wait_status(&uid, TargetStatus::SimulationFailed).await;
    h.wait_open_count(&uid, 0).await;
}

#[tokio::test]
async fn test_external_status_flip_stops_monitor() {
    // cooperative cancellation through the store, without the token
    let h = harness(AnalyzerMode::Data);
    let uid = h.seed_target("T1", "U1").await;
    let mut events = h.bus.subscribe().await.unwrap();

    h.engine.run(KIND, &uid).await.unwrap();
    h.wait_launched(&uid).await;

    h.targets
        .set_status(&uid, TargetStatus::SimulationFailed)
        .await
        .unwrap();

    match events.recv().await.unwrap() {
        SimulationEvent::Launched { .. } => {}
        other => panic!("expected Launched, got {:?}", other),
    }
    match events.recv().await.unwrap() {
        SimulationEvent::Cancelled { target } => assert_eq!(target, uid),
        other => panic!("expected Cancelled, got {:?}", other),
    }
}
