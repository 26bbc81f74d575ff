//! Simulation Target entity
//!
//! The target is owned by the surrounding data-management application; the
//! engine only reads it through the `TargetStore` port and writes back
//! status, result and artifact path.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque identifier of a simulation target (minted by the entity store)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TargetId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Opaque identifier of the principal owning a target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Simulation lifecycle status of a target
///
/// Transitions are monotone except for the external reset to `None` that the
/// surrounding application performs on manual result deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetStatus {
    /// Never simulated (or results manually deleted)
    None,
    /// A simulation attempt is in flight
    Processing,
    /// Simulation finished and produced a parsable result
    Completed,
    /// Simulation ended without a usable result (timeout, no output, no data)
    SimulationFailed,
    /// The result analyzer itself faulted; job row kept open for diagnosis
    Error,
}

impl TargetStatus {
    /// Whether the engine may move a target from `self` to `target`
    pub fn can_transition_to(&self, target: TargetStatus) -> bool {
        match (*self, target) {
            (Self::None, Self::Processing) => true,
            (Self::Processing, Self::Completed | Self::SimulationFailed | Self::Error) => true,
            // re-run after a finished attempt
            (Self::Completed | Self::SimulationFailed | Self::Error, Self::Processing) => true,
            // demotion when a completed artifact went missing
            (Self::Completed, Self::SimulationFailed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TargetStatus::None => "None",
            TargetStatus::Processing => "Processing",
            TargetStatus::Completed => "Completed",
            TargetStatus::SimulationFailed => "SimulationFailed",
            TargetStatus::Error => "Error",
        };
        write!(f, "{}", s)
    }
}

/// Read model of a simulation target as seen by the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationTarget {
    pub uid: TargetId,
    pub owner: OwnerId,
    /// Structured simulation parameters, write-once after creation
    pub parameter: Value,
    pub status: TargetStatus,
    /// Structured result, set only on success
    pub result: Option<Value>,
    /// Output directory of the last successful run, set only on success
    pub artifact_path: Option<String>,
}

impl SimulationTarget {
    pub fn new(uid: TargetId, owner: OwnerId, parameter: Value) -> Self {
        Self {
            uid,
            owner,
            parameter,
            status: TargetStatus::None,
            result: None,
            artifact_path: None,
        }
    }

    /// A target is runnable only with a non-empty parameter set
    pub fn has_parameter(&self) -> bool {
        match &self.parameter {
            Value::Null => false,
            Value::Object(map) => !map.is_empty(),
            Value::String(s) => !s.trim().is_empty(),
            Value::Array(items) => !items.is_empty(),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_transitions() {
        assert!(TargetStatus::None.can_transition_to(TargetStatus::Processing));
        assert!(TargetStatus::Processing.can_transition_to(TargetStatus::Completed));
        assert!(TargetStatus::Processing.can_transition_to(TargetStatus::SimulationFailed));
        assert!(TargetStatus::Processing.can_transition_to(TargetStatus::Error));
        assert!(TargetStatus::Completed.can_transition_to(TargetStatus::SimulationFailed));
        assert!(TargetStatus::SimulationFailed.can_transition_to(TargetStatus::Processing));

        assert!(!TargetStatus::None.can_transition_to(TargetStatus::Completed));
        assert!(!TargetStatus::Completed.can_transition_to(TargetStatus::None));
    }

    #[test]
    fn test_empty_parameter_detection() {
        let owner = OwnerId::new("U1");
        let empty = SimulationTarget::new(TargetId::new("T1"), owner.clone(), json!({}));
        assert!(!empty.has_parameter());

        let null = SimulationTarget::new(TargetId::new("T2"), owner.clone(), Value::Null);
        assert!(!null.has_parameter());

        let filled = SimulationTarget::new(TargetId::new("T3"), owner, json!({"x": 1}));
        assert!(filled.has_parameter());
    }
}
