use crate::handler::Handler;
use crate::CoreError;
use dockwright_runtime::{ContainerDescriptor, CreateContainerOptions, HostConfig, RuntimeClient};
use std::fmt;
use tracing::{debug, warn};

/// Liveness probe run by [`Handler::run_to_completion`].
pub const PROBE_COMMAND: &[&str] = &["/bin/true"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Created,
    Started,
    Waiting,
    Succeeded,
    Failed,
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Started => "started",
            Self::Waiting => "waiting",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl ExecutionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Created → Started → Waiting → {Succeeded | Failed}; nothing is skipped
/// and terminal states are final.
pub fn validate_transition(from: ExecutionState, to: ExecutionState) -> Result<(), CoreError> {
    let valid = matches!(
        (from, to),
        (ExecutionState::Created, ExecutionState::Started)
            | (ExecutionState::Started, ExecutionState::Waiting)
            | (
                ExecutionState::Waiting,
                ExecutionState::Succeeded | ExecutionState::Failed
            )
    );

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

fn advance(
    id: &str,
    from: ExecutionState,
    to: ExecutionState,
) -> Result<ExecutionState, CoreError> {
    validate_transition(from, to)?;
    debug!("container {}: {from} -> {to}", short_id(id));
    Ok(to)
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

impl<C: RuntimeClient> Handler<C> {
    /// Run the probe command in a fresh container from `image` and block
    /// until it exits.
    pub fn run_to_completion(&self, image: &str) -> Result<ContainerDescriptor, CoreError> {
        let command: Vec<String> = PROBE_COMMAND.iter().map(|s| (*s).to_owned()).collect();
        self.run_command_to_completion(image, &command)
    }

    /// Create, start and wait for a detached container running `command`.
    ///
    /// Runtime failures at any step are returned unchanged and leave whatever
    /// was already created in place. A non-zero exit code is always logged and
    /// reported as [`CoreError::CreateContainerFailed`].
    pub fn run_command_to_completion(
        &self,
        image: &str,
        command: &[String],
    ) -> Result<ContainerDescriptor, CoreError> {
        match command.first() {
            Some(program) if !program.trim().is_empty() => {}
            _ => {
                return Err(CoreError::InvalidCommand(
                    "a container command needs at least a program".to_owned(),
                ))
            }
        }

        let options = CreateContainerOptions::new(image, command.to_vec());
        let container = self.client.create_container(&options)?;
        let mut state = ExecutionState::Created;
        debug!("container {}: {state} from {image}", short_id(&container.id));

        self.client
            .start_container(&container.id, &HostConfig::default())?;
        state = advance(&container.id, state, ExecutionState::Started)?;

        state = advance(&container.id, state, ExecutionState::Waiting)?;
        let code = self.client.wait_container(&container.id)?;

        if code != 0 {
            advance(&container.id, state, ExecutionState::Failed)?;
            warn!("container exit code: {code}");
            return Err(CoreError::CreateContainerFailed { code });
        }

        advance(&container.id, state, ExecutionState::Succeeded)?;
        Ok(container)
    }
}
