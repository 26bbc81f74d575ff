//! Job Store Port
//!
//! Defines the interface for simulation job persistence. `create_open` is
//! the single-flight enforcement point: implementations must reject a second
//! open row for the same target atomically, the way a partial unique index
//! on `(target_uid) where end_time is null` would.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use simrun_core::{JobId, SimulationJob, TargetId};

/// Job record store port
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert an open job row; fails with [`JobStoreError::OpenJobExists`]
    /// when the target already has one
    async fn create_open(&self, job: &SimulationJob) -> Result<(), JobStoreError>;

    /// Fetch a job by its identifier
    async fn get(&self, uid: &JobId) -> Result<SimulationJob, JobStoreError>;

    /// Record the external process identifier once launch is acknowledged
    async fn set_process_handle(&self, uid: &JobId, pid: i64) -> Result<(), JobStoreError>;

    /// Close the job, setting its end time
    async fn close(&self, uid: &JobId, end_time: DateTime<Utc>) -> Result<(), JobStoreError>;

    /// The open job for a target, if any
    async fn find_open_by_target(
        &self,
        target_uid: &TargetId,
    ) -> Result<Option<SimulationJob>, JobStoreError>;

    /// The first open job among the given targets, if any
    async fn find_open_by_targets(
        &self,
        target_uids: &[TargetId],
    ) -> Result<Option<SimulationJob>, JobStoreError>;

    /// Delete every open row for a target (terminator cleanup); closed rows
    /// are left untouched as the audit trail. Returns the number removed.
    async fn delete_open_for_target(&self, target_uid: &TargetId)
        -> Result<usize, JobStoreError>;

    /// Delete a single job row (launch-failure rollback)
    async fn delete(&self, uid: &JobId) -> Result<(), JobStoreError>;
}

/// Job store error
#[derive(thiserror::Error, Debug)]
pub enum JobStoreError {
    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Open job already exists for target {0}")]
    OpenJobExists(TargetId),

    #[error("Storage error: {0}")]
    Storage(String),
}
