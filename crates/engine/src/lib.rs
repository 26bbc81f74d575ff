//! Simulation Job Orchestration Engine
//!
//! One generalized engine replacing the per-entity copies: for a given
//! parameterized simulation target it launches an isolated external
//! computation, supervises its lifecycle, enforces single-flight execution
//! per target and per owner, detects completion, timeout and failure, hands
//! produced artifacts to the per-kind analyzer and report generator, and
//! persists a terminal status.
//!
//! Components:
//! - [`guard`]: admission decision before any job is created
//! - [`launcher`]: job row creation and container start
//! - [`monitor`]: background supervisory polling loop
//! - [`handoff`]: success-path result persistence and reporting
//! - [`terminator`]: forced cleanup, idempotent and infallible
//! - [`engine`]: the facade wiring them together per registered kind

pub mod artifacts;
pub mod engine;
pub mod guard;
pub mod handoff;
pub mod launcher;
pub mod monitor;
pub mod registry;
pub mod terminator;

pub use crate::artifacts::ArtifactLayout;
pub use crate::engine::{RunResponse, SimulationEngine};
pub use crate::guard::{Admission, ConcurrencyGuard};
pub use crate::registry::RegisteredKind;
