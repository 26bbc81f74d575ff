//! Simulation Kind descriptor
//!
//! Each of the former per-entity engines differed only in entity name,
//! container image, invocation command and timing. Those differences are
//! captured here so a single engine can serve every kind.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::target::TargetId;

/// Token in a command template replaced by the serialized parameter set
pub const PARAMETER_TOKEN: &str = "{parameters}";

/// Container path the output directory is bind-mounted onto
pub const OUTPUT_MOUNT: &str = "/data/output";

/// Resource ceiling applied to every launched container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Hard memory limit in bytes
    pub memory_bytes: Option<i64>,
    /// CPU quota in units of 1e-9 CPUs
    pub nano_cpus: Option<i64>,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            memory_bytes: Some(4 * 1024 * 1024 * 1024),
            nano_cpus: None,
        }
    }
}

/// Static descriptor of one simulation kind
///
/// Timeout and poll interval are configuration here rather than constants
/// scattered per kind; the analyzer and report generator collaborators are
/// registered alongside the descriptor at engine level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationKind {
    /// Kind name, also the prefix of the deterministic container name
    pub name: String,
    /// Container image running the external computation
    pub image: String,
    /// Invocation command; `{parameters}` is replaced by the serialized
    /// parameter set (the whole configuration travels as one argument)
    pub command_template: Vec<String>,
    pub limits: ResourceLimits,
    /// Delay between monitor polls
    #[serde(with = "duration_secs")]
    pub poll_interval: Duration,
    /// Overall deadline for one attempt
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

impl SimulationKind {
    /// Deterministic container name for a target, the sole mutual-exclusion
    /// mechanism on the shared process runtime
    pub fn container_name(&self, target_uid: &TargetId) -> String {
        format!("{}Simulation_{}", self.name, target_uid)
    }

    /// Render the invocation command for a concrete parameter set
    pub fn render_command(&self, parameter: &Value) -> Vec<String> {
        let serialized = parameter.to_string();
        self.command_template
            .iter()
            .map(|part| part.replace(PARAMETER_TOKEN, &serialized))
            .collect()
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kind() -> SimulationKind {
        SimulationKind {
            name: "Coverage".to_string(),
            image: "simrun/coverage:latest".to_string(),
            command_template: vec![
                "python".to_string(),
                "/opt/run.py".to_string(),
                PARAMETER_TOKEN.to_string(),
            ],
            limits: ResourceLimits::default(),
            poll_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(3600),
        }
    }

    #[test]
    fn test_container_name_is_deterministic() {
        let k = kind();
        let uid = TargetId::new("T1");
        assert_eq!(k.container_name(&uid), "CoverageSimulation_T1");
        assert_eq!(k.container_name(&uid), k.container_name(&uid));
    }

    #[test]
    fn test_render_command_substitutes_parameter() {
        let k = kind();
        let cmd = k.render_command(&json!({"x": 1}));
        assert_eq!(cmd, vec!["python", "/opt/run.py", r#"{"x":1}"#]);
    }
}
