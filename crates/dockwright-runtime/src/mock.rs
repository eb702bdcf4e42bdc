use crate::client::{
    AuthConfig, ContainerDescriptor, CreateContainerOptions, HostConfig, ImageDescriptor,
    RuntimeClient,
};
use crate::RuntimeError;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Preloaded images for the CLI's mock backend, comma separated.
pub const MOCK_IMAGES_ENV: &str = "DOCKWRIGHT_MOCK_IMAGES";
/// Exit code reported by every mock container.
pub const MOCK_EXIT_CODE_ENV: &str = "DOCKWRIGHT_MOCK_EXIT_CODE";

/// A runtime operation, used to count calls and script failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Inspect,
    Pull,
    Create,
    Start,
    Wait,
}

#[derive(Debug, Clone)]
struct MockContainer {
    descriptor: ContainerDescriptor,
    started_with: Option<HostConfig>,
}

#[derive(Debug)]
struct MockState {
    images: HashMap<String, ImageDescriptor>,
    containers: HashMap<String, MockContainer>,
    calls: HashMap<Operation, usize>,
    // Keyed by (operation, 1-based call number).
    failures: HashMap<(Operation, usize), String>,
    exit_code: i64,
    pulls_land: bool,
}

/// In-memory runtime: a local image store, a container table, and per
/// operation call counters.
///
/// Pulls succeed for any reference and land the image locally unless
/// [`MockClient::with_phantom_pulls`] is set. Containers exit with the
/// configured code (0 by default).
#[derive(Debug)]
pub struct MockClient {
    state: Mutex<MockState>,
}

impl Default for MockClient {
    fn default() -> Self {
        Self {
            state: Mutex::new(MockState {
                images: HashMap::new(),
                containers: HashMap::new(),
                calls: HashMap::new(),
                failures: HashMap::new(),
                exit_code: 0,
                pulls_land: true,
            }),
        }
    }
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mock from `DOCKWRIGHT_MOCK_IMAGES` and
    /// `DOCKWRIGHT_MOCK_EXIT_CODE`, ignoring unset or unparsable values.
    pub fn from_env() -> Self {
        let mut client = Self::new();
        if let Ok(images) = std::env::var(MOCK_IMAGES_ENV) {
            for name in images.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                client = client.with_image(name);
            }
        }
        if let Some(code) = std::env::var(MOCK_EXIT_CODE_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
        {
            client = client.with_exit_code(code);
        }
        client
    }

    #[must_use]
    pub fn with_image(self, name: &str) -> Self {
        self.state()
            .images
            .insert(name.to_owned(), mock_image(name));
        self
    }

    #[must_use]
    pub fn with_exit_code(self, code: i64) -> Self {
        self.state().exit_code = code;
        self
    }

    /// Pulls report success without the image ever appearing locally.
    #[must_use]
    pub fn with_phantom_pulls(self) -> Self {
        self.state().pulls_land = false;
        self
    }

    /// Make the `call`-th invocation (1-based) of `op` fail.
    pub fn fail_call(&self, op: Operation, call: usize, message: &str) {
        self.state().failures.insert((op, call), message.to_owned());
    }

    /// Make the next invocation of `op` fail.
    pub fn fail_next(&self, op: Operation, message: &str) {
        let mut state = self.state();
        let next = state.calls.get(&op).copied().unwrap_or(0) + 1;
        state.failures.insert((op, next), message.to_owned());
    }

    pub fn calls(&self, op: Operation) -> usize {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn has_image(&self, name: &str) -> bool {
        self.state().images.contains_key(name)
    }

    pub fn remove_image(&self, name: &str) {
        self.state().images.remove(name);
    }

    pub fn container_count(&self) -> usize {
        self.state().containers.len()
    }

    pub fn is_started(&self, id: &str) -> bool {
        self.state()
            .containers
            .get(id)
            .is_some_and(|c| c.started_with.is_some())
    }

    /// The host configuration a container was started with.
    pub fn started_with(&self, id: &str) -> Option<HostConfig> {
        self.state()
            .containers
            .get(id)
            .and_then(|c| c.started_with.clone())
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Counts the call and returns the state, or the scripted failure.
    fn enter(&self, op: Operation) -> Result<MutexGuard<'_, MockState>, RuntimeError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| scripted(op, &format!("mutex poisoned: {e}")))?;
        let count = state.calls.entry(op).or_insert(0);
        *count += 1;
        let call = *count;
        if let Some(message) = state.failures.remove(&(op, call)) {
            return Err(scripted(op, &message));
        }
        Ok(state)
    }
}

impl RuntimeClient for MockClient {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn inspect_image(&self, name: &str) -> Result<ImageDescriptor, RuntimeError> {
        let state = self.enter(Operation::Inspect)?;
        state
            .images
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::NoSuchImage(name.to_owned()))
    }

    fn pull_image(&self, repository: &str, _auth: &AuthConfig) -> Result<(), RuntimeError> {
        let mut state = self.enter(Operation::Pull)?;
        if state.pulls_land {
            state
                .images
                .insert(repository.to_owned(), mock_image(repository));
        }
        Ok(())
    }

    fn create_container(
        &self,
        options: &CreateContainerOptions,
    ) -> Result<ContainerDescriptor, RuntimeError> {
        let mut state = self.enter(Operation::Create)?;
        if !state.images.contains_key(&options.image) {
            return Err(RuntimeError::NoSuchImage(options.image.clone()));
        }
        let seq = state.containers.len() + 1;
        let id = blake3::hash(format!("mock-container:{}:{seq}", options.image).as_bytes())
            .to_hex()
            .to_string();
        let descriptor = ContainerDescriptor {
            id: id.clone(),
            image: options.image.clone(),
            command: options.command.clone(),
        };
        state.containers.insert(
            id,
            MockContainer {
                descriptor: descriptor.clone(),
                started_with: None,
            },
        );
        Ok(descriptor)
    }

    fn start_container(&self, id: &str, host_config: &HostConfig) -> Result<(), RuntimeError> {
        let mut state = self.enter(Operation::Start)?;
        let container = state
            .containers
            .get_mut(id)
            .ok_or_else(|| scripted(Operation::Start, &format!("no such container: {id}")))?;
        container.started_with = Some(host_config.clone());
        Ok(())
    }

    fn wait_container(&self, id: &str) -> Result<i64, RuntimeError> {
        let state = self.enter(Operation::Wait)?;
        match state.containers.get(id) {
            Some(c) if c.started_with.is_some() => Ok(state.exit_code),
            Some(c) => Err(scripted(
                Operation::Wait,
                &format!("container {} is not running", c.descriptor.id),
            )),
            None => Err(scripted(Operation::Wait, &format!("no such container: {id}"))),
        }
    }
}

fn mock_image(name: &str) -> ImageDescriptor {
    ImageDescriptor {
        id: format!(
            "blake3:{}",
            blake3::hash(format!("mock-image:{name}").as_bytes()).to_hex()
        ),
        repo_tags: vec![name.to_owned()],
        created: "1970-01-01T00:00:00Z".to_owned(),
        size: 0,
    }
}

fn scripted(op: Operation, message: &str) -> RuntimeError {
    RuntimeError::CommandFailed {
        command: format!("mock {op:?}").to_lowercase(),
        stderr: message.to_owned(),
    }
}
