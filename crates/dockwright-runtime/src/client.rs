use crate::RuntimeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// A resolved image as reported by the runtime's local store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub id: String,
    #[serde(default)]
    pub repo_tags: Vec<String>,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub size: u64,
}

/// A container created by the runtime. Valid until the caller discards it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerDescriptor {
    pub id: String,
    pub image: String,
    pub command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateContainerOptions {
    pub name: Option<String>,
    pub image: String,
    pub command: Vec<String>,
    pub attach_stdout: bool,
    pub attach_stderr: bool,
}

impl CreateContainerOptions {
    /// Options for a detached container: no output streams attached.
    pub fn new(image: &str, command: Vec<String>) -> Self {
        Self {
            name: None,
            image: image.to_owned(),
            command,
            attach_stdout: false,
            attach_stderr: false,
        }
    }
}

/// Host-side settings applied when a container is started.
///
/// The executor always starts with the default. Clients that cannot apply
/// start-time settings reject anything else with
/// [`RuntimeError::Unsupported`] instead of dropping it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostConfig {
    /// Volume binds in `host:container[:mode]` form.
    pub binds: Vec<String>,
    pub network_mode: Option<String>,
}

impl HostConfig {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Registry credentials for a pull. The default value means anonymous.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
    pub server_address: String,
}

impl AuthConfig {
    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("server_address", &self.server_address)
            .finish()
    }
}

/// What a client needs to reach a runtime endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub endpoint: String,
    pub timeout: Duration,
    pub working_dir: PathBuf,
}

/// The operations the resolver and executor need from a container runtime.
///
/// Every method blocks until the runtime answers. An absent image is reported
/// by `inspect_image` as [`RuntimeError::NoSuchImage`], never as a generic
/// failure, so callers can match it without comparing messages.
pub trait RuntimeClient: Send + Sync {
    fn name(&self) -> &str;

    fn inspect_image(&self, name: &str) -> Result<ImageDescriptor, RuntimeError>;

    /// Pull `repository` from its registry. Reports only success or failure;
    /// callers re-inspect to obtain a descriptor.
    fn pull_image(&self, repository: &str, auth: &AuthConfig) -> Result<(), RuntimeError>;

    fn create_container(
        &self,
        options: &CreateContainerOptions,
    ) -> Result<ContainerDescriptor, RuntimeError>;

    fn start_container(&self, id: &str, host_config: &HostConfig) -> Result<(), RuntimeError>;

    /// Block until the container exits and return its exit code.
    fn wait_container(&self, id: &str) -> Result<i64, RuntimeError>;
}

impl<T: RuntimeClient + ?Sized> RuntimeClient for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn inspect_image(&self, name: &str) -> Result<ImageDescriptor, RuntimeError> {
        (**self).inspect_image(name)
    }

    fn pull_image(&self, repository: &str, auth: &AuthConfig) -> Result<(), RuntimeError> {
        (**self).pull_image(repository, auth)
    }

    fn create_container(
        &self,
        options: &CreateContainerOptions,
    ) -> Result<ContainerDescriptor, RuntimeError> {
        (**self).create_container(options)
    }

    fn start_container(&self, id: &str, host_config: &HostConfig) -> Result<(), RuntimeError> {
        (**self).start_container(id, host_config)
    }

    fn wait_container(&self, id: &str) -> Result<i64, RuntimeError> {
        (**self).wait_container(id)
    }
}

/// Build a connected client by backend name.
pub fn select_client(
    name: &str,
    options: &ConnectOptions,
) -> Result<Box<dyn RuntimeClient>, RuntimeError> {
    match name {
        "docker" => Ok(Box::new(crate::docker::DockerCliClient::connect(options)?)),
        "podman" => Ok(Box::new(crate::docker::DockerCliClient::connect_with_binary(
            "podman", options,
        )?)),
        "mock" => Ok(Box::new(crate::mock::MockClient::from_env())),
        other => Err(RuntimeError::BackendUnavailable(other.to_owned())),
    }
}
