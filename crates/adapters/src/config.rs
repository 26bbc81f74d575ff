//! Engine Configuration
//!
//! Centralized configuration for the orchestration engine, loaded from a
//! YAML file (`SIMRUN_CONFIG_PATH`), inline YAML (`SIMRUN_CONFIG_YAML`) or
//! environment variables with validated defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Result type for configuration loading
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Root directory under which per-owner/per-target output directories
    /// are created and bind-mounted into containers
    pub artifact_root: PathBuf,

    /// Upper bound on concurrently supervised jobs
    pub max_concurrent_jobs: usize,

    /// Grace period a container gets on stop before the runtime kills it,
    /// in seconds
    pub stop_grace_secs: u64,

    /// Docker daemon configuration
    #[serde(default)]
    pub docker: DockerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Docker connection configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DockerConfig {
    /// Daemon address; platform default socket when unset
    pub host: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment and file
    pub fn load() -> Result<Self> {
        let config: Self = match (
            std::env::var("SIMRUN_CONFIG_PATH").ok(),
            std::env::var("SIMRUN_CONFIG_YAML").ok(),
        ) {
            (Some(path), _) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    return Err(ConfigError::FileNotFound(path));
                }
                let content = std::fs::read_to_string(&path).map_err(ConfigError::FileRead)?;
                serde_yaml::from_str(&content).map_err(ConfigError::ParseYaml)?
            }
            (None, Some(yaml)) => serde_yaml::from_str(&yaml).map_err(ConfigError::ParseYaml)?,
            _ => Self::from_env()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let artifact_root = std::env::var("SIMRUN_ARTIFACT_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/var/lib/simrun/artifacts"));

        let max_concurrent_jobs = std::env::var("SIMRUN_MAX_CONCURRENT_JOBS")
            .unwrap_or_else(|_| "8".to_string())
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidValue("SIMRUN_MAX_CONCURRENT_JOBS".to_string()))?;

        let stop_grace_secs = std::env::var("SIMRUN_STOP_GRACE_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidValue("SIMRUN_STOP_GRACE_SECS".to_string()))?;

        let docker = DockerConfig {
            host: std::env::var("SIMRUN_DOCKER_HOST").ok(),
        };

        let logging = LoggingConfig {
            filter: std::env::var("SIMRUN_LOG").unwrap_or_else(|_| "info".to_string()),
        };

        Ok(Self {
            artifact_root,
            max_concurrent_jobs,
            stop_grace_secs,
            docker,
            logging,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_jobs == 0 {
            return Err(ConfigError::InvalidValue(
                "max_concurrent_jobs must be at least 1".to_string(),
            ));
        }
        if self.artifact_root.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue(
                "artifact_root must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration error
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    FileRead(#[source] std::io::Error),

    #[error("Failed to parse YAML configuration: {0}")]
    ParseYaml(#[source] serde_yaml::Error),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}
