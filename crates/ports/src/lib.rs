//! Ports - Abstraction Layer
//!
//! This crate defines ports (traits) that represent the interfaces the
//! engine needs from its collaborators: the entity store, the job record
//! store, the container runtime, the per-kind result analyzer and report
//! generator, and the completion event bus. Adapters implement them in the
//! infrastructure layer.

pub mod analysis;
pub mod event_bus;
pub mod job_store;
pub mod process_runtime;
pub mod target_store;

pub use crate::analysis::{AnalyzerError, ReportError, ReportGenerator, ResultAnalyzer};
pub use crate::event_bus::{
    EventBusError, EventPublisher, EventReceiver, EventSubscriber, SimulationEvent,
};
pub use crate::job_store::{JobStore, JobStoreError};
pub use crate::process_runtime::{LaunchSpec, ProcessRuntime, RuntimeError};
pub use crate::target_store::{TargetStore, TargetStoreError};
