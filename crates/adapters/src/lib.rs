//! Adapters - Infrastructure Implementations
//!
//! This crate contains the implementations of the ports defined in
//! simrun-ports: the Docker process runtime, in-memory target and job
//! stores, the in-memory event bus, the configuration loader and the
//! engine bootstrap wiring them together.

pub mod bootstrap;
pub mod bus;
pub mod config;
pub mod docker;
pub mod memory;
pub mod observability;

pub use crate::bootstrap::{build_docker_engine, build_engine, engine_options};
pub use crate::bus::InMemoryBus;
pub use crate::config::{ConfigError, DockerConfig, EngineConfig, LoggingConfig};
pub use crate::docker::DockerProcessRuntime;
pub use crate::memory::{InMemoryJobStore, InMemoryTargetStore};
pub use crate::observability::init_tracing;
