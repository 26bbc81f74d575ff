//! Core domain types for the simulation orchestration engine
//!
//! This crate contains the entities, value objects and the error taxonomy
//! shared by the ports, adapters and engine crates. It performs no I/O.

pub mod error;
pub mod job;
pub mod kind;
pub mod target;

pub use crate::error::{EngineError, EngineResult};
pub use crate::job::{JobId, SimulationJob};
pub use crate::kind::{ResourceLimits, SimulationKind};
pub use crate::target::{OwnerId, SimulationTarget, TargetId, TargetStatus};
