//! In-Memory Store Implementations
//!
//! Reference implementations of TargetStore and JobStore over
//! `tokio::sync::RwLock` maps. The job store enforces the single-flight
//! invariant under its write lock, standing in for the partial unique index
//! a relational adapter would declare.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use simrun_core::{JobId, OwnerId, SimulationJob, SimulationTarget, TargetId, TargetStatus};
use simrun_ports::{JobStore, JobStoreError, TargetStore, TargetStoreError};
use tokio::sync::RwLock;

/// In-memory target store
#[derive(Default)]
pub struct InMemoryTargetStore {
    targets: Arc<RwLock<HashMap<TargetId, SimulationTarget>>>,
}

impl InMemoryTargetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a target (test and bootstrap helper)
    pub async fn insert(&self, target: SimulationTarget) {
        let mut targets = self.targets.write().await;
        targets.insert(target.uid.clone(), target);
    }
}

#[async_trait]
impl TargetStore for InMemoryTargetStore {
    async fn get(&self, uid: &TargetId) -> Result<SimulationTarget, TargetStoreError> {
        let targets = self.targets.read().await;
        targets
            .get(uid)
            .cloned()
            .ok_or_else(|| TargetStoreError::NotFound(uid.clone()))
    }

    async fn set_status(
        &self,
        uid: &TargetId,
        status: TargetStatus,
    ) -> Result<(), TargetStoreError> {
        let mut targets = self.targets.write().await;
        let target = targets
            .get_mut(uid)
            .ok_or_else(|| TargetStoreError::NotFound(uid.clone()))?;
        target.status = status;
        Ok(())
    }

    async fn set_result(
        &self,
        uid: &TargetId,
        result: Value,
        artifact_path: String,
    ) -> Result<(), TargetStoreError> {
        let mut targets = self.targets.write().await;
        let target = targets
            .get_mut(uid)
            .ok_or_else(|| TargetStoreError::NotFound(uid.clone()))?;
        target.result = Some(result);
        target.artifact_path = Some(artifact_path);
        Ok(())
    }

    async fn find_by_owner(
        &self,
        owner: &OwnerId,
    ) -> Result<Vec<SimulationTarget>, TargetStoreError> {
        let targets = self.targets.read().await;
        Ok(targets
            .values()
            .filter(|t| &t.owner == owner)
            .cloned()
            .collect())
    }
}

/// In-memory job store
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Arc<RwLock<HashMap<JobId, SimulationJob>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All rows, open and closed (test helper)
    pub async fn all(&self) -> Vec<SimulationJob> {
        let jobs = self.jobs.read().await;
        jobs.values().cloned().collect()
    }

    /// Count of open rows for a target (test helper)
    pub async fn open_count(&self, target_uid: &TargetId) -> usize {
        let jobs = self.jobs.read().await;
        jobs.values()
            .filter(|j| j.is_open() && &j.target_uid == target_uid)
            .count()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create_open(&self, job: &SimulationJob) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.write().await;
        // uniqueness check and insert under one write lock
        if jobs
            .values()
            .any(|j| j.is_open() && j.target_uid == job.target_uid)
        {
            return Err(JobStoreError::OpenJobExists(job.target_uid.clone()));
        }
        jobs.insert(job.uid, job.clone());
        Ok(())
    }

    async fn get(&self, uid: &JobId) -> Result<SimulationJob, JobStoreError> {
        let jobs = self.jobs.read().await;
        jobs.get(uid)
            .cloned()
            .ok_or(JobStoreError::NotFound(*uid))
    }

    async fn set_process_handle(&self, uid: &JobId, pid: i64) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(uid).ok_or(JobStoreError::NotFound(*uid))?;
        job.process_handle = Some(pid);
        Ok(())
    }

    async fn close(&self, uid: &JobId, end_time: DateTime<Utc>) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(uid).ok_or(JobStoreError::NotFound(*uid))?;
        job.end_time = Some(end_time);
        Ok(())
    }

    async fn find_open_by_target(
        &self,
        target_uid: &TargetId,
    ) -> Result<Option<SimulationJob>, JobStoreError> {
        let jobs = self.jobs.read().await;
        Ok(jobs
            .values()
            .find(|j| j.is_open() && &j.target_uid == target_uid)
            .cloned())
    }

    async fn find_open_by_targets(
        &self,
        target_uids: &[TargetId],
    ) -> Result<Option<SimulationJob>, JobStoreError> {
        let jobs = self.jobs.read().await;
        Ok(jobs
            .values()
            .find(|j| j.is_open() && target_uids.contains(&j.target_uid))
            .cloned())
    }

    async fn delete_open_for_target(
        &self,
        target_uid: &TargetId,
    ) -> Result<usize, JobStoreError> {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, j| !(j.is_open() && &j.target_uid == target_uid));
        Ok(before - jobs.len())
    }

    async fn delete(&self, uid: &JobId) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.write().await;
        jobs.remove(uid).ok_or(JobStoreError::NotFound(*uid))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_open_rejects_second_open_row() {
        let store = InMemoryJobStore::new();
        let target = TargetId::new("T1");

        let first = SimulationJob::open(target.clone());
        store.create_open(&first).await.unwrap();

        let second = SimulationJob::open(target.clone());
        let err = store.create_open(&second).await.unwrap_err();
        assert!(matches!(err, JobStoreError::OpenJobExists(t) if t == target));
        assert_eq!(store.open_count(&target).await, 1);
    }

    #[tokio::test]
    async fn test_create_open_allowed_after_close() {
        let store = InMemoryJobStore::new();
        let target = TargetId::new("T1");

        let first = SimulationJob::open(target.clone());
        store.create_open(&first).await.unwrap();
        store.close(&first.uid, Utc::now()).await.unwrap();

        let second = SimulationJob::open(target.clone());
        store.create_open(&second).await.unwrap();
        assert_eq!(store.open_count(&target).await, 1);
        assert_eq!(store.all().await.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_open_keeps_closed_rows() {
        let store = InMemoryJobStore::new();
        let target = TargetId::new("T1");

        let closed = SimulationJob::open(target.clone());
        store.create_open(&closed).await.unwrap();
        store.close(&closed.uid, Utc::now()).await.unwrap();

        let open = SimulationJob::open(target.clone());
        store.create_open(&open).await.unwrap();

        let removed = store.delete_open_for_target(&target).await.unwrap();
        assert_eq!(removed, 1);

        let remaining = store.all().await;
        assert_eq!(remaining.len(), 1);
        assert!(!remaining[0].is_open());
    }

    #[tokio::test]
    async fn test_target_store_set_result() {
        let store = InMemoryTargetStore::new();
        let target = SimulationTarget::new(
            TargetId::new("T1"),
            OwnerId::new("U1"),
            serde_json::json!({"x": 1}),
        );
        store.insert(target).await;

        store
            .set_result(
                &TargetId::new("T1"),
                serde_json::json!({"coverage": 0.9}),
                "/artifacts/U1/T1".to_string(),
            )
            .await
            .unwrap();

        let fetched = store.get(&TargetId::new("T1")).await.unwrap();
        assert_eq!(fetched.artifact_path.as_deref(), Some("/artifacts/U1/T1"));
        assert!(fetched.result.is_some());
    }
}
