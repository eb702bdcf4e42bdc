use crate::config::Request;
use crate::handler::Handler;
use crate::CoreError;
use dockwright_runtime::{AuthConfig, ImageDescriptor, RuntimeClient, RuntimeError};
use tracing::{debug, info};

impl<C: RuntimeClient> Handler<C> {
    /// Whether `name` is in the runtime's local store.
    ///
    /// The runtime's "no such image" answer is `Ok(false)`; every other
    /// inspect failure means the question could not be answered and is
    /// returned as is.
    pub fn image_exists_locally(&self, name: &str) -> Result<bool, RuntimeError> {
        match self.client.inspect_image(name) {
            Ok(_) => Ok(true),
            Err(e) if e.is_no_such_image() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Make sure `name` is available locally, pulling it anonymously if not.
    pub fn check_and_pull(&self, name: &str) -> Result<Option<ImageDescriptor>, CoreError> {
        self.check_and_pull_with_auth(name, &AuthConfig::default())
    }

    /// Inspect, pull when absent, then inspect again.
    ///
    /// A failed first inspect and a failed pull both yield
    /// [`CoreError::PullImageFailed`]. A failed re-inspect is returned as a
    /// runtime error, since the pull itself succeeded. If the re-inspect still
    /// finds nothing the result is `Ok(None)`.
    pub fn check_and_pull_with_auth(
        &self,
        name: &str,
        auth: &AuthConfig,
    ) -> Result<Option<ImageDescriptor>, CoreError> {
        match self.client.inspect_image(name) {
            Ok(image) => {
                if self.debug {
                    info!("image {name} available locally");
                }
                return Ok(Some(image));
            }
            Err(e) if e.is_no_such_image() => {}
            Err(e) => {
                debug!("inspect of {name} failed: {e}");
                return Err(CoreError::PullImageFailed(name.to_owned()));
            }
        }

        if self.debug {
            info!("pulling image {name}");
        }
        self.client.pull_image(name, auth).map_err(|e| {
            debug!("pull of {name} failed: {e}");
            CoreError::PullImageFailed(name.to_owned())
        })?;

        match self.client.inspect_image(name) {
            Ok(image) => Ok(Some(image)),
            Err(e) if e.is_no_such_image() => {
                debug!("image {name} still absent after a successful pull");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve every image a request names, base image first. Stops at the
    /// first failure.
    pub fn ensure_request_images(
        &self,
        request: &Request,
    ) -> Result<Vec<Option<ImageDescriptor>>, CoreError> {
        request
            .images()
            .map(|name| self.check_and_pull(name))
            .collect()
    }
}
