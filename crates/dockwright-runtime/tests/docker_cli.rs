//! DockerCliClient tests against a scripted stand-in for the docker CLI.
//!
//! The fake binary understands just enough of `version`, `image inspect`,
//! `pull`, `create`, `start` and `wait` to exercise argument construction and
//! output parsing without a real engine.
#![cfg(unix)]

use dockwright_runtime::{
    AuthConfig, ConnectOptions, CreateContainerOptions, DockerCliClient, HostConfig,
    RuntimeClient, RuntimeError,
};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

const FAKE_DOCKER: &str = r#"#!/bin/sh
# argv: --host <endpoint> <subcommand> ...
echo "$@" >> "$(dirname "$0")/calls.log"
shift 2
case "$1" in
  version)
    echo "27.3.1"
    ;;
  image)
    if [ "$3" = "busybox:latest" ]; then
      echo '[{"Id":"sha256:3f57d9401f8d","RepoTags":["busybox:latest"],"Created":"2024-09-26T21:31:42Z","Size":4261550}]'
    elif [ "$3" = "broken:latest" ]; then
      echo "Cannot connect to the Docker daemon" >&2
      exit 1
    else
      echo "Error response from daemon: No such image: $3" >&2
      exit 1
    fi
    ;;
  pull)
    if [ "$3" = "private/app:1" ]; then
      echo "pull access denied for private/app" >&2
      exit 1
    fi
    echo "docker.io/library/$3"
    ;;
  login)
    read -r password
    [ "$password" = "s3cret" ] || { echo "unauthorized" >&2; exit 1; }
    ;;
  create)
    shift
    while [ "$1" = "--attach" ] || [ "$1" = "--name" ]; do shift 2; done
    if [ "$1" = "failing:latest" ]; then echo "deadbeef"; else echo "c0ffee"; fi
    ;;
  start)
    echo "$2"
    ;;
  wait)
    if [ "$2" = "deadbeef" ]; then echo 1; else echo 0; fi
    ;;
  *)
    echo "unknown command $1" >&2
    exit 1
    ;;
esac
"#;

const SLOW_DOCKER: &str = "#!/bin/sh\nexec sleep 5\n";

// Writes more than a pipe buffer to stderr before failing.
const NOISY_DOCKER: &str = r#"#!/bin/sh
i=0
while [ $i -lt 4000 ]; do
  echo "warning: deprecated option number $i in daemon configuration" >&2
  i=$((i + 1))
done
echo "engine exploded" >&2
exit 1
"#;

// Rejects logins without reading the password from stdin.
const CLOSED_LOGIN_DOCKER: &str = r#"#!/bin/sh
shift 2
case "$1" in
  version) echo "27.3.1" ;;
  login) exec 0<&-; echo "login disabled" >&2; exit 1 ;;
  *) exit 0 ;;
esac
"#;

fn install(dir: &Path, name: &str, script: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn options(dir: &Path) -> ConnectOptions {
    ConnectOptions {
        endpoint: "unix:///var/run/docker.sock".to_owned(),
        timeout: Duration::from_secs(10),
        working_dir: dir.to_path_buf(),
    }
}

fn connect(dir: &Path) -> DockerCliClient {
    let bin = install(dir, "docker", FAKE_DOCKER);
    DockerCliClient::connect_with_binary(bin.to_str().unwrap(), &options(dir)).unwrap()
}

fn calls(dir: &Path) -> String {
    std::fs::read_to_string(dir.join("calls.log")).unwrap_or_default()
}

#[test]
fn connect_probes_version_on_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let client = connect(dir.path());
    assert_eq!(client.endpoint(), "unix:///var/run/docker.sock");
    assert!(calls(dir.path()).contains("--host unix:///var/run/docker.sock version"));
}

#[test]
fn connect_times_out_on_silent_engine() {
    let dir = tempfile::tempdir().unwrap();
    let bin = install(dir.path(), "docker", SLOW_DOCKER);
    let mut opts = options(dir.path());
    opts.timeout = Duration::from_millis(200);

    let err = DockerCliClient::connect_with_binary(bin.to_str().unwrap(), &opts).unwrap_err();
    assert!(matches!(err, RuntimeError::CommandFailed { .. }));
    assert!(err.to_string().contains("no answer"));
}

#[test]
fn connect_with_subsecond_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let bin = install(dir.path(), "docker", FAKE_DOCKER);
    let mut opts = options(dir.path());
    opts.timeout = Duration::from_millis(500);

    let client = DockerCliClient::connect_with_binary(bin.to_str().unwrap(), &opts).unwrap();
    assert_eq!(client.binary(), bin.to_str().unwrap());
}

#[test]
fn connect_with_zero_timeout_waits_for_answer() {
    let dir = tempfile::tempdir().unwrap();
    let bin = install(dir.path(), "docker", FAKE_DOCKER);
    let mut opts = options(dir.path());
    opts.timeout = Duration::ZERO;

    assert!(DockerCliClient::connect_with_binary(bin.to_str().unwrap(), &opts).is_ok());
    assert!(calls(dir.path()).contains("version"));
}

#[test]
fn connect_reports_failure_of_noisy_engine() {
    let dir = tempfile::tempdir().unwrap();
    let bin = install(dir.path(), "docker", NOISY_DOCKER);
    let mut opts = options(dir.path());
    opts.timeout = Duration::from_secs(5);

    let err = DockerCliClient::connect_with_binary(bin.to_str().unwrap(), &opts).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("engine exploded"), "{msg}");
    assert!(!msg.contains("no answer"), "{msg}");
}

#[test]
fn rejected_login_fails_pull_without_pulling() {
    let dir = tempfile::tempdir().unwrap();
    let bin = install(dir.path(), "docker", CLOSED_LOGIN_DOCKER);
    let client = DockerCliClient::connect_with_binary(bin.to_str().unwrap(), &options(dir.path()))
        .unwrap();
    let auth = AuthConfig {
        username: "builder".to_owned(),
        password: "x".repeat(256 * 1024),
        server_address: "registry.example.com".to_owned(),
    };

    let err = client.pull_image("private/app:1", &auth).unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Io(_) | RuntimeError::CommandFailed { .. }
    ));
}

#[test]
fn inspect_distinguishes_absence_from_failure() {
    let dir = tempfile::tempdir().unwrap();
    let client = connect(dir.path());

    let image = client.inspect_image("busybox:latest").unwrap();
    assert_eq!(image.id, "sha256:3f57d9401f8d");

    let err = client.inspect_image("alpine:3.20").unwrap_err();
    assert!(err.is_no_such_image());

    let err = client.inspect_image("broken:latest").unwrap_err();
    assert!(!err.is_no_such_image());
    assert!(err.to_string().contains("Cannot connect"));
}

#[test]
fn pull_reports_registry_failure() {
    let dir = tempfile::tempdir().unwrap();
    let client = connect(dir.path());

    client
        .pull_image("alpine:3.20", &AuthConfig::default())
        .unwrap();
    assert!(calls(dir.path()).contains("pull --quiet alpine:3.20"));

    let err = client
        .pull_image("private/app:1", &AuthConfig::default())
        .unwrap_err();
    assert!(err.to_string().contains("pull access denied"));
}

#[test]
fn pull_with_credentials_logs_in_first() {
    let dir = tempfile::tempdir().unwrap();
    let client = connect(dir.path());
    let auth = AuthConfig {
        username: "builder".to_owned(),
        password: "s3cret".to_owned(),
        server_address: "registry.example.com".to_owned(),
    };
    client.pull_image("alpine:3.20", &auth).unwrap();

    let log = calls(dir.path());
    let login = log.find("login --username builder").unwrap();
    let pull = log.find("pull --quiet alpine:3.20").unwrap();
    assert!(login < pull);
    assert!(!log.contains("s3cret"));

    let wrong = AuthConfig {
        password: "nope".to_owned(),
        ..auth
    };
    assert!(client.pull_image("alpine:3.20", &wrong).is_err());
}

#[test]
fn create_start_wait_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let client = connect(dir.path());

    let opts = CreateContainerOptions::new("busybox:latest", vec!["/bin/true".to_owned()]);
    let container = client.create_container(&opts).unwrap();
    assert_eq!(container.id, "c0ffee");
    assert_eq!(container.image, "busybox:latest");
    assert!(calls(dir.path()).contains("create busybox:latest /bin/true"));

    client
        .start_container(&container.id, &HostConfig::default())
        .unwrap();
    assert_eq!(client.wait_container(&container.id).unwrap(), 0);

    let opts = CreateContainerOptions::new("failing:latest", vec!["/bin/true".to_owned()]);
    let container = client.create_container(&opts).unwrap();
    client
        .start_container(&container.id, &HostConfig::default())
        .unwrap();
    assert_eq!(client.wait_container(&container.id).unwrap(), 1);
}

#[test]
fn create_passes_attach_flags() {
    let dir = tempfile::tempdir().unwrap();
    let client = connect(dir.path());

    let mut opts = CreateContainerOptions::new("busybox:latest", vec!["/bin/true".to_owned()]);
    opts.attach_stdout = true;
    opts.attach_stderr = true;
    client.create_container(&opts).unwrap();
    assert!(calls(dir.path()).contains("create --attach STDOUT --attach STDERR busybox:latest"));
}

#[test]
fn start_rejects_host_config() {
    let dir = tempfile::tempdir().unwrap();
    let client = connect(dir.path());
    let host = HostConfig {
        network_mode: Some("none".to_owned()),
        ..HostConfig::default()
    };
    let err = client.start_container("c0ffee", &host).unwrap_err();
    assert!(matches!(err, RuntimeError::Unsupported { .. }));
}
