//! Target Store Port
//!
//! Defines the interface to the external entity store owning the simulation
//! targets. Writes are last-write-wins; a stale overwrite is an accepted
//! failure mode, not guarded here.

use async_trait::async_trait;
use serde_json::Value;
use simrun_core::{OwnerId, SimulationTarget, TargetId, TargetStatus};

/// Entity store port for simulation targets
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Fetch a target by its identifier
    async fn get(&self, uid: &TargetId) -> Result<SimulationTarget, TargetStoreError>;

    /// Persist a new lifecycle status
    async fn set_status(
        &self,
        uid: &TargetId,
        status: TargetStatus,
    ) -> Result<(), TargetStoreError>;

    /// Persist the structured result and the artifact path of a successful run
    async fn set_result(
        &self,
        uid: &TargetId,
        result: Value,
        artifact_path: String,
    ) -> Result<(), TargetStoreError>;

    /// All targets belonging to an owner
    async fn find_by_owner(
        &self,
        owner: &OwnerId,
    ) -> Result<Vec<SimulationTarget>, TargetStoreError>;
}

/// Target store error
#[derive(thiserror::Error, Debug)]
pub enum TargetStoreError {
    #[error("Target not found: {0}")]
    NotFound(TargetId),

    #[error("Storage error: {0}")]
    Storage(String),
}
