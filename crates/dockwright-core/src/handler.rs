use crate::config::{Configuration, Request};
use crate::CoreError;
use dockwright_runtime::{DockerCliClient, RuntimeClient, RuntimeError};
use tracing::debug;

/// Session object for one request: a single live runtime client plus the
/// request's debug flag.
///
/// Operations take `&self` and never share state between handlers. Callers
/// that need parallelism build one handler per concurrent request.
#[derive(Debug)]
pub struct Handler<C: RuntimeClient = DockerCliClient> {
    pub(crate) client: C,
    pub(crate) debug: bool,
}

impl Handler<DockerCliClient> {
    /// Connect to the request's endpoint through the docker/podman CLI.
    pub fn new(request: &Request) -> Result<Self, CoreError> {
        Self::with_connector(request, |config| {
            DockerCliClient::connect(&config.connect_options())
        })
    }
}

impl<C: RuntimeClient> Handler<C> {
    /// Establish the client eagerly through `connector`.
    ///
    /// Any failure, including an empty endpoint, is reported as
    /// [`CoreError::Connection`]; the underlying error only reaches the
    /// debug log.
    pub fn with_connector<F>(request: &Request, connector: F) -> Result<Self, CoreError>
    where
        F: FnOnce(&Configuration) -> Result<C, RuntimeError>,
    {
        let config = request.config();
        if config.endpoint().is_empty() {
            debug!("no runtime endpoint configured");
            return Err(CoreError::Connection);
        }

        let client = connector(config).map_err(|e| {
            debug!("runtime connection to {} failed: {e}", config.endpoint());
            CoreError::Connection
        })?;
        debug!(
            "connected to {} runtime at {}",
            client.name(),
            config.endpoint()
        );

        Ok(Self {
            client,
            debug: config.debug(),
        })
    }

    /// Wrap a client that is already connected.
    pub fn from_client(client: C, debug: bool) -> Self {
        Self { client, debug }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn debug(&self) -> bool {
        self.debug
    }
}
