//! Kind registration
//!
//! A registered kind couples the static [`SimulationKind`] descriptor with
//! the two per-kind collaborators invoked on the success path.

use std::sync::Arc;

use simrun_core::SimulationKind;
use simrun_ports::{ReportGenerator, ResultAnalyzer};

/// A simulation kind together with its analyzer and report generator
pub struct RegisteredKind {
    pub spec: SimulationKind,
    pub analyzer: Arc<dyn ResultAnalyzer>,
    pub reporter: Arc<dyn ReportGenerator>,
}

impl RegisteredKind {
    pub fn new(
        spec: SimulationKind,
        analyzer: Arc<dyn ResultAnalyzer>,
        reporter: Arc<dyn ReportGenerator>,
    ) -> Self {
        Self {
            spec,
            analyzer,
            reporter,
        }
    }
}

impl std::fmt::Debug for RegisteredKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredKind")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}
