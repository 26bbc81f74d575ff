//! Simulation Job entity
//!
//! One row per launched attempt. A job with `end_time = None` is "open";
//! the store guarantees at most one open job per target at any time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::target::TargetId;

/// Unique identifier of a simulation job (one launched attempt)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Record of a single external simulation run for a target
///
/// Created by the launcher, mutated only by the job monitor (process handle,
/// end time) and deleted wholesale by the terminator. Closed rows are kept
/// as an audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationJob {
    pub uid: JobId,
    pub target_uid: TargetId,
    /// PID of the external process, set once launch is acknowledged
    pub process_handle: Option<i64>,
    pub start_time: DateTime<Utc>,
    /// `None` means the attempt is still in flight
    pub end_time: Option<DateTime<Utc>>,
}

impl SimulationJob {
    /// Create an open job row with `start_time = now`
    pub fn open(target_uid: TargetId) -> Self {
        Self {
            uid: JobId::new(),
            target_uid,
            process_handle: None,
            start_time: Utc::now(),
            end_time: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Close the job, marking the attempt as finished (success or not)
    pub fn close(&mut self) {
        self.end_time = Some(Utc::now());
    }

    pub fn attach_process_handle(&mut self, pid: i64) {
        self.process_handle = Some(pid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_open() {
        let job = SimulationJob::open(TargetId::new("T1"));
        assert!(job.is_open());
        assert!(job.process_handle.is_none());
    }

    #[test]
    fn test_close_sets_end_time() {
        let mut job = SimulationJob::open(TargetId::new("T1"));
        job.close();
        assert!(!job.is_open());
        assert!(job.end_time.unwrap() >= job.start_time);
    }
}
