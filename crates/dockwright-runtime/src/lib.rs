//! Container runtime clients for dockwright.
//!
//! This crate defines the `RuntimeClient` trait that the image resolver and
//! container executor are written against, the descriptor and option types
//! exchanged with a runtime, a client that drives a Docker-compatible engine
//! through its command-line interface, and an in-memory mock used by tests.

pub mod client;
pub mod docker;
pub mod mock;

pub use client::{
    select_client, AuthConfig, ConnectOptions, ContainerDescriptor, CreateContainerOptions,
    HostConfig, ImageDescriptor, RuntimeClient,
};
pub use docker::{validate_endpoint, DockerCliClient};
pub use mock::{MockClient, Operation};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no such image: {0}")]
    NoSuchImage(String),
    #[error("invalid runtime endpoint '{0}'")]
    InvalidEndpoint(String),
    #[error("invalid image or container reference '{0}'")]
    InvalidReference(String),
    #[error("backend '{0}' is not available on this system")]
    BackendUnavailable(String),
    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
    #[error("failed to parse runtime output: {0}")]
    Parse(String),
    #[error("{backend} client does not support {detail}")]
    Unsupported { backend: String, detail: String },
}

impl RuntimeError {
    /// True for the runtime's "no such image" answer, which is a valid
    /// negative result rather than a failed query.
    pub fn is_no_such_image(&self) -> bool {
        matches!(self, Self::NoSuchImage(_))
    }
}
