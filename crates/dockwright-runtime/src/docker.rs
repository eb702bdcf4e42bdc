use crate::client::{
    AuthConfig, ConnectOptions, ContainerDescriptor, CreateContainerOptions, HostConfig,
    ImageDescriptor, RuntimeClient,
};
use crate::RuntimeError;
use serde::Deserialize;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::debug;

const ENDPOINT_SCHEMES: &[&str] = &[
    "unix://", "tcp://", "http://", "https://", "npipe://", "ssh://",
];

/// Overrides binary discovery, e.g. `/usr/local/bin/docker`.
pub const BINARY_ENV: &str = "DOCKWRIGHT_DOCKER_BIN";

const PROBE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Drives a Docker-compatible engine (`docker` or `podman`) through its CLI.
///
/// Every invocation is pinned to the configured endpoint, so one client talks
/// to exactly one engine for its whole lifetime.
#[derive(Debug)]
pub struct DockerCliClient {
    binary: String,
    endpoint: String,
    working_dir: PathBuf,
}

impl DockerCliClient {
    /// Locate a container CLI and verify the endpoint answers within
    /// `options.timeout`.
    pub fn connect(options: &ConnectOptions) -> Result<Self, RuntimeError> {
        validate_endpoint(&options.endpoint)?;
        let binary = find_binary().ok_or_else(|| {
            RuntimeError::BackendUnavailable("no container CLI found (docker/podman)".to_owned())
        })?;
        Self::connect_with_binary(&binary, options)
    }

    pub fn connect_with_binary(binary: &str, options: &ConnectOptions) -> Result<Self, RuntimeError> {
        validate_endpoint(&options.endpoint)?;
        let client = Self {
            binary: binary.to_owned(),
            endpoint: options.endpoint.trim().to_owned(),
            working_dir: options.working_dir.clone(),
        };
        client.probe(options.timeout)?;
        Ok(client)
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn host_flag(&self) -> &'static str {
        host_flag_for(&self.binary)
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(self.host_flag())
            .arg(&self.endpoint)
            .args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null());
        cmd
    }

    fn run(&self, args: &[&str]) -> Result<String, RuntimeError> {
        debug!("{} {}", self.binary, args.join(" "));
        let output = self.command(args).output()?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(self.failure(args, &output.stderr))
        }
    }

    fn failure(&self, args: &[&str], stderr: &[u8]) -> RuntimeError {
        let label: Vec<&str> = args
            .iter()
            .copied()
            .take_while(|a| !a.starts_with('-'))
            .take(2)
            .collect();
        RuntimeError::CommandFailed {
            command: format!("{} {}", self.binary, label.join(" ")),
            stderr: String::from_utf8_lossy(stderr).trim().to_owned(),
        }
    }

    /// Run `version` against the endpoint. A zero `timeout` waits as long as
    /// the CLI takes.
    fn probe(&self, timeout: Duration) -> Result<(), RuntimeError> {
        let mut child = self
            .command(&["version", "--format", "{{.Server.Version}}"])
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drained concurrently so a chatty CLI cannot block on a full pipe.
        let stderr_reader = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                buf
            })
        });

        let start = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if !timeout.is_zero() && start.elapsed() > timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(RuntimeError::CommandFailed {
                    command: format!("{} version", self.binary),
                    stderr: format!("no answer from {} within {timeout:?}", self.endpoint),
                });
            }
            std::thread::sleep(PROBE_POLL_INTERVAL);
        };

        if status.success() {
            return Ok(());
        }
        let stderr = stderr_reader
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default();
        Err(self.failure(&["version"], &stderr))
    }

    fn login(&self, auth: &AuthConfig) -> Result<(), RuntimeError> {
        let mut args = vec!["login", "--username", auth.username.as_str(), "--password-stdin"];
        if !auth.server_address.is_empty() {
            args.push(auth.server_address.as_str());
        }
        debug!("{} login {}", self.binary, auth.server_address);

        let mut child = self
            .command(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(auth.password.as_bytes()) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e.into());
            }
        }
        let output = child.wait_with_output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(self.failure(&["login"], &output.stderr))
        }
    }
}

impl RuntimeClient for DockerCliClient {
    fn name(&self) -> &str {
        &self.binary
    }

    fn inspect_image(&self, name: &str) -> Result<ImageDescriptor, RuntimeError> {
        check_reference(name)?;
        let args = ["image", "inspect", name];
        debug!("{} {}", self.binary, args.join(" "));
        let output = self.command(&args).output()?;
        if !output.status.success() {
            if is_missing_image(&String::from_utf8_lossy(&output.stderr)) {
                return Err(RuntimeError::NoSuchImage(name.to_owned()));
            }
            return Err(self.failure(&args, &output.stderr));
        }
        parse_inspect_output(&output.stdout)
    }

    fn pull_image(&self, repository: &str, auth: &AuthConfig) -> Result<(), RuntimeError> {
        check_reference(repository)?;
        if !auth.is_empty() {
            self.login(auth)?;
        }
        self.run(&["pull", "--quiet", repository])?;
        Ok(())
    }

    fn create_container(
        &self,
        options: &CreateContainerOptions,
    ) -> Result<ContainerDescriptor, RuntimeError> {
        check_reference(&options.image)?;
        let mut args = vec!["create"];
        if options.attach_stdout {
            args.extend(["--attach", "STDOUT"]);
        }
        if options.attach_stderr {
            args.extend(["--attach", "STDERR"]);
        }
        if let Some(name) = &options.name {
            args.extend(["--name", name.as_str()]);
        }
        args.push(&options.image);
        args.extend(options.command.iter().map(String::as_str));

        let stdout = self.run(&args)?;
        let id = last_line(&stdout)
            .ok_or_else(|| RuntimeError::Parse("create printed no container id".to_owned()))?;
        Ok(ContainerDescriptor {
            id: id.to_owned(),
            image: options.image.clone(),
            command: options.command.clone(),
        })
    }

    fn start_container(&self, id: &str, host_config: &HostConfig) -> Result<(), RuntimeError> {
        check_reference(id)?;
        if !host_config.is_default() {
            return Err(RuntimeError::Unsupported {
                backend: self.binary.clone(),
                detail: "host configuration at start time".to_owned(),
            });
        }
        self.run(&["start", id])?;
        Ok(())
    }

    fn wait_container(&self, id: &str) -> Result<i64, RuntimeError> {
        check_reference(id)?;
        let stdout = self.run(&["wait", id])?;
        parse_exit_code(&stdout)
    }
}

/// Accept only endpoints with a scheme the docker/podman CLIs understand.
pub fn validate_endpoint(endpoint: &str) -> Result<(), RuntimeError> {
    let trimmed = endpoint.trim();
    match ENDPOINT_SCHEMES
        .iter()
        .find_map(|scheme| trimmed.strip_prefix(scheme))
    {
        Some(rest) if !rest.is_empty() => Ok(()),
        _ => Err(RuntimeError::InvalidEndpoint(endpoint.to_owned())),
    }
}

fn find_binary() -> Option<String> {
    if let Ok(bin) = std::env::var(BINARY_ENV) {
        if !bin.trim().is_empty() {
            return Some(bin);
        }
    }
    for candidate in &["docker", "podman"] {
        if let Ok(output) = Command::new(candidate).arg("--version").output() {
            if output.status.success() {
                return Some((*candidate).to_owned());
            }
        }
    }
    None
}

fn host_flag_for(binary: &str) -> &'static str {
    let file_name = Path::new(binary)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if file_name.contains("podman") {
        "--url"
    } else {
        "--host"
    }
}

// Keeps names that would be parsed as flags away from the CLI.
fn check_reference(reference: &str) -> Result<(), RuntimeError> {
    if reference.trim().is_empty()
        || reference.starts_with('-')
        || reference.chars().any(char::is_whitespace)
    {
        return Err(RuntimeError::InvalidReference(reference.to_owned()));
    }
    Ok(())
}

fn is_missing_image(stderr: &str) -> bool {
    let msg = stderr.to_lowercase();
    msg.contains("no such image") || msg.contains("no such object") || msg.contains("image not known")
}

fn last_line(stdout: &str) -> Option<&str> {
    stdout.lines().map(str::trim).rev().find(|l| !l.is_empty())
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawImage {
    id: String,
    #[serde(default)]
    repo_tags: Option<Vec<String>>,
    #[serde(default)]
    created: Option<String>,
    #[serde(default)]
    size: Option<u64>,
}

fn parse_inspect_output(stdout: &[u8]) -> Result<ImageDescriptor, RuntimeError> {
    let images: Vec<RawImage> = serde_json::from_slice(stdout)
        .map_err(|e| RuntimeError::Parse(format!("image inspect output: {e}")))?;
    let raw = images
        .into_iter()
        .next()
        .ok_or_else(|| RuntimeError::Parse("image inspect returned no entries".to_owned()))?;
    Ok(ImageDescriptor {
        id: raw.id,
        repo_tags: raw.repo_tags.unwrap_or_default(),
        created: raw.created.unwrap_or_default(),
        size: raw.size.unwrap_or(0),
    })
}

fn parse_exit_code(stdout: &str) -> Result<i64, RuntimeError> {
    let line = last_line(stdout)
        .ok_or_else(|| RuntimeError::Parse("wait printed no exit code".to_owned()))?;
    line.parse::<i64>()
        .map_err(|e| RuntimeError::Parse(format!("exit code '{line}': {e}")))
}
