//! Event Bus Port - Completion event notification
//!
//! Asynchronous outcomes used to be observable only by re-polling target
//! status; the engine additionally publishes a terminal event per attempt so
//! the surrounding application can subscribe instead of polling.

use async_trait::async_trait;
use simrun_core::{JobId, TargetId};

/// Lifecycle events emitted by the orchestration engine
#[derive(Debug, Clone)]
pub enum SimulationEvent {
    /// Container started and PID captured
    Launched { target: TargetId, job: JobId },

    /// Analyzer produced a structured result
    Completed {
        target: TargetId,
        job: JobId,
        artifact_path: String,
    },

    /// Attempt ended without a usable result
    Failed { target: TargetId, reason: String },

    /// Attempt exceeded its configured deadline
    TimedOut { target: TargetId },

    /// Attempt stopped by cancellation
    Cancelled { target: TargetId },
}

/// Event bus error types
#[derive(thiserror::Error, Debug)]
pub enum EventBusError {
    #[error("Bus full (capacity: {0})")]
    Full(usize),

    #[error("Subscriber dropped")]
    Dropped,

    #[error("Channel closed")]
    Closed,
}

/// Event publisher port
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: SimulationEvent) -> Result<(), EventBusError>;
}

/// Event receiver wrapper
#[derive(Debug)]
pub struct EventReceiver {
    pub receiver: tokio::sync::broadcast::Receiver<SimulationEvent>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Result<SimulationEvent, EventBusError> {
        self.receiver
            .recv()
            .await
            .map_err(|_| EventBusError::Dropped)
    }
}

/// Event subscriber port
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    async fn subscribe(&self) -> Result<EventReceiver, EventBusError>;
}
