//! Docker Process Runtime Adapter
//!
//! Concrete implementation of the ProcessRuntime port using bollard-next.
//! Every lookup goes through the deterministic container name, so the
//! adapter keeps no per-process state of its own.

use std::time::Duration;

use async_trait::async_trait;
use bollard_next::Docker;
use bollard_next::container::{
    Config, CreateContainerOptions, InspectContainerOptions, KillContainerOptions,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard_next::errors::Error as DockerError;
use bollard_next::image::CreateImageOptions;
use bollard_next::models::ContainerStateStatusEnum;
use futures::StreamExt;
use simrun_ports::{LaunchSpec, ProcessRuntime, RuntimeError};
use tracing::{debug, info};

/// Docker-backed process runtime
#[derive(Debug, Clone)]
pub struct DockerProcessRuntime {
    docker: Docker,
}

impl DockerProcessRuntime {
    /// Connect with platform defaults (unix socket / named pipe)
    pub fn connect() -> Result<Self, RuntimeError> {
        #[cfg(unix)]
        let docker = Docker::connect_with_socket_defaults()
            .map_err(|e| RuntimeError::Runtime(format!("Failed to connect to Docker: {}", e)))?;

        #[cfg(windows)]
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| RuntimeError::Runtime(format!("Failed to connect to Docker: {}", e)))?;

        info!("Docker process runtime initialized");
        Ok(Self { docker })
    }

    /// Connect to a specific daemon address
    pub fn connect_with_host(host: &str) -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_http(host, 30, bollard_next::API_DEFAULT_VERSION)
            .map_err(|e| {
                RuntimeError::Runtime(format!("Failed to connect to Docker at {}: {}", host, e))
            })?;
        Ok(Self { docker })
    }

    async fn ensure_image(&self, image: &str) -> Result<(), RuntimeError> {
        let mut stream = self.docker.create_image(
            Some(CreateImageOptions {
                from_image: image,
                ..Default::default()
            }),
            None,
            None,
        );

        while let Some(result) = stream.next().await {
            if let Err(e) = result {
                return Err(RuntimeError::Runtime(format!(
                    "Failed to pull image '{}': {}",
                    image, e
                )));
            }
        }

        Ok(())
    }

    async fn inspect_state(
        &self,
        name: &str,
    ) -> Result<Option<bollard_next::models::ContainerState>, RuntimeError> {
        match self
            .docker
            .inspect_container(name, Some(InspectContainerOptions::default()))
            .await
        {
            Ok(info) => Ok(info.state),
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => Err(RuntimeError::NotFound(name.to_string())),
            Err(e) => Err(RuntimeError::Runtime(format!(
                "Failed to inspect container '{}': {}",
                name, e
            ))),
        }
    }
}

#[async_trait]
impl ProcessRuntime for DockerProcessRuntime {
    async fn start(&self, spec: &LaunchSpec) -> Result<String, RuntimeError> {
        self.ensure_image(&spec.image).await?;

        let binds = spec
            .volumes
            .iter()
            .map(|(host, container)| format!("{}:{}", host, container))
            .collect::<Vec<_>>();

        let container_config = Config {
            image: Some(spec.image.clone()),
            cmd: Some(spec.command.clone()),
            host_config: Some(bollard_next::service::HostConfig {
                memory: spec.limits.memory_bytes,
                nano_cpus: spec.limits.nano_cpus,
                binds: if binds.is_empty() { None } else { Some(binds) },
                auto_remove: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };

        let create_options = CreateContainerOptions {
            name: spec.name.clone(),
            ..Default::default()
        };

        let created = self
            .docker
            .create_container(Some(create_options), container_config)
            .await
            .map_err(|e| RuntimeError::StartFailed {
                name: spec.name.clone(),
                reason: format!("create failed: {}", e),
            })?;

        self.docker
            .start_container::<&str>(&spec.name, Some(StartContainerOptions::default()))
            .await
            .map_err(|e| RuntimeError::StartFailed {
                name: spec.name.clone(),
                reason: format!("start failed: {}", e),
            })?;

        debug!(container = %spec.name, id = %created.id, "container started");
        Ok(created.id)
    }

    async fn is_alive(&self, name: &str) -> Result<bool, RuntimeError> {
        match self.inspect_state(name).await {
            Ok(state) => Ok(matches!(
                state.as_ref().and_then(|s| s.status.as_ref()),
                Some(ContainerStateStatusEnum::RUNNING)
            )),
            // auto-remove already reaped the container
            Err(RuntimeError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn pid(&self, name: &str) -> Result<i64, RuntimeError> {
        let state = self.inspect_state(name).await?;
        state
            .and_then(|s| s.pid)
            .filter(|pid| *pid > 0)
            .ok_or_else(|| RuntimeError::NotFound(name.to_string()))
    }

    async fn stop(&self, name: &str, timeout: Duration) -> Result<(), RuntimeError> {
        let result = self
            .docker
            .stop_container(
                name,
                Some(StopContainerOptions {
                    t: timeout.as_secs() as i64,
                }),
            )
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => Err(RuntimeError::NotFound(name.to_string())),
            Err(e) => {
                // stop timed out or daemon refused; escalate to SIGKILL
                self.docker
                    .kill_container::<&str>(name, Some(KillContainerOptions { signal: "SIGKILL" }))
                    .await
                    .map_err(|kill_err| {
                        RuntimeError::Runtime(format!(
                            "Failed to stop container '{}': {} (kill also failed: {})",
                            name, e, kill_err
                        ))
                    })
            }
        }
    }

    async fn force_remove(&self, name: &str) -> Result<(), RuntimeError> {
        let result = self
            .docker
            .remove_container(
                name,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => Err(RuntimeError::NotFound(name.to_string())),
            Err(e) => Err(RuntimeError::Runtime(format!(
                "Failed to remove container '{}': {}",
                name, e
            ))),
        }
    }
}
