//! Image presence resolution and run-to-completion container execution.
//!
//! A [`Handler`] wraps one live runtime client for the duration of a single
//! request. It resolves images (inspect, pull on demand, re-inspect) and runs
//! short-lived containers through create, start and wait, classifying each
//! failure as a connection, pull, container-exit or passthrough runtime error.

pub mod config;
pub mod execute;
pub mod handler;
pub mod resolve;

pub use config::{Configuration, Request, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECS};
pub use execute::{validate_transition, ExecutionState, PROBE_COMMAND};
pub use handler::Handler;

use dockwright_runtime::RuntimeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// The runtime client could not be established. The transport error is
    /// deliberately not carried.
    #[error("connection error: unable to reach the container runtime")]
    Connection,
    #[error("pull error: unable to make image '{0}' available locally")]
    PullImageFailed(String),
    #[error("container error: container exited with code {code}")]
    CreateContainerFailed { code: i64 },
    #[error("invalid container command: {0}")]
    InvalidCommand(String),
    #[error("invalid execution transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("config error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}
