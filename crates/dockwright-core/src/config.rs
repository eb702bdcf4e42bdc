use crate::CoreError;
use dockwright_runtime::ConnectOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "unix:///var/run/docker.sock";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Runtime endpoint, timeout, working directory and debug flag.
///
/// Built once by the caller and handed to the core by value; there are no
/// setters, only consuming builders. A zero timeout means the connection
/// probe has no deadline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Configuration {
    endpoint: String,
    #[serde(
        rename = "timeout_secs",
        default = "default_timeout",
        with = "timeout_secs"
    )]
    timeout: Duration,
    #[serde(default = "default_working_dir")]
    working_dir: PathBuf,
    #[serde(default)]
    debug: bool,
}

fn default_timeout() -> Duration {
    Duration::from_secs(DEFAULT_TIMEOUT_SECS)
}

/// `timeout_secs` as whole or fractional seconds, e.g. `30` or `1.5`.
mod timeout_secs {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(timeout: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        if timeout.subsec_nanos() == 0 {
            serializer.serialize_u64(timeout.as_secs())
        } else {
            serializer.serialize_f64(timeout.as_secs_f64())
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|_| de::Error::custom(format!("invalid timeout_secs {secs}")))
    }
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

impl Configuration {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim().to_owned(),
            timeout: default_timeout(),
            working_dir: default_working_dir(),
            debug: false,
        }
    }

    /// Endpoint from `DOCKER_HOST`, falling back to the default socket.
    pub fn from_env() -> Self {
        match std::env::var("DOCKER_HOST") {
            Ok(host) if !host.trim().is_empty() => Self::new(&host),
            _ => Self::default(),
        }
    }

    /// Load a TOML config file. Only `endpoint` is required.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))
    }

    pub fn parse(content: &str) -> Result<Self, CoreError> {
        Self::from_toml(content).map_err(|e| CoreError::Config(e.to_string()))
    }

    fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(content)?;
        config.endpoint = config.endpoint.trim().to_owned();
        Ok(config)
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim().to_owned();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            endpoint: self.endpoint.clone(),
            timeout: self.timeout(),
            working_dir: self.working_dir.clone(),
        }
    }
}

/// One build/run intent: a configuration, a base image and an optional
/// runtime image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    config: Configuration,
    base_image: String,
    runtime_image: Option<String>,
}

impl Request {
    pub fn new(config: Configuration, base_image: &str) -> Self {
        Self {
            config,
            base_image: base_image.to_owned(),
            runtime_image: None,
        }
    }

    #[must_use]
    pub fn with_runtime_image(mut self, image: &str) -> Self {
        self.runtime_image = Some(image.to_owned());
        self
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn base_image(&self) -> &str {
        &self.base_image
    }

    pub fn runtime_image(&self) -> Option<&str> {
        self.runtime_image.as_deref()
    }

    /// The base image, then the runtime image when one is set.
    pub fn images(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.base_image.as_str()).chain(self.runtime_image.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Configuration::default();
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.working_dir(), Path::new("."));
        assert!(!config.debug());
    }

    #[test]
    fn builders_override_fields() {
        let config = Configuration::new(" tcp://127.0.0.1:2375 ")
            .with_timeout(Duration::from_secs(5))
            .with_working_dir("/srv/build")
            .with_debug(true);
        assert_eq!(config.endpoint(), "tcp://127.0.0.1:2375");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.working_dir(), Path::new("/srv/build"));
        assert!(config.debug());

        let opts = config.connect_options();
        assert_eq!(opts.endpoint, "tcp://127.0.0.1:2375");
        assert_eq!(opts.timeout, Duration::from_secs(5));
    }

    #[test]
    fn timeout_keeps_subsecond_precision() {
        let config = Configuration::new(DEFAULT_ENDPOINT).with_timeout(Duration::from_millis(1500));
        assert_eq!(config.timeout(), Duration::from_millis(1500));
        assert_eq!(config.connect_options().timeout, Duration::from_millis(1500));

        let config = config.with_timeout(Duration::from_millis(250));
        assert_eq!(config.connect_options().timeout, Duration::from_millis(250));
    }

    #[test]
    fn parse_fractional_and_zero_timeout() {
        let config =
            Configuration::parse("endpoint = \"tcp://buildhost:2375\"\ntimeout_secs = 0.5").unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(500));

        let config =
            Configuration::parse("endpoint = \"tcp://buildhost:2375\"\ntimeout_secs = 0").unwrap();
        assert!(config.timeout().is_zero());
    }

    #[test]
    fn parse_negative_timeout_fails() {
        let err = Configuration::parse("endpoint = \"tcp://buildhost:2375\"\ntimeout_secs = -1")
            .unwrap_err();
        assert!(matches!(err, CoreError::Config(ref msg) if msg.contains("timeout_secs")));
    }

    #[test]
    fn serialized_timeout_round_trips() {
        let config = Configuration::new(DEFAULT_ENDPOINT).with_timeout(Duration::from_millis(1500));
        let text = toml::to_string(&config).unwrap();
        assert!(text.contains("timeout_secs = 1.5"), "{text}");
        assert_eq!(Configuration::parse(&text).unwrap(), config);
    }

    #[test]
    fn parse_full_file() {
        let config = Configuration::parse(
            r#"
endpoint = "unix:///run/podman/podman.sock"
timeout_secs = 90
working_dir = "/tmp/work"
debug = true
"#,
        )
        .unwrap();
        assert_eq!(config.endpoint(), "unix:///run/podman/podman.sock");
        assert_eq!(config.timeout(), Duration::from_secs(90));
        assert_eq!(config.working_dir(), Path::new("/tmp/work"));
        assert!(config.debug());
    }

    #[test]
    fn parse_minimal_file_uses_defaults() {
        let config = Configuration::parse(r#"endpoint = "tcp://buildhost:2375""#).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.working_dir(), Path::new("."));
        assert!(!config.debug());
    }

    #[test]
    fn parse_without_endpoint_fails() {
        let err = Configuration::parse("debug = true").unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dockwright.toml");
        std::fs::write(&path, "endpoint = \"tcp://10.0.0.2:2375\"\ntimeout_secs = 3\n").unwrap();

        let config = Configuration::load(&path).unwrap();
        assert_eq!(config.endpoint(), "tcp://10.0.0.2:2375");
        assert_eq!(config.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Configuration::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, CoreError::Io(_)));
    }

    #[test]
    fn load_invalid_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "endpoint = [").unwrap();
        let err = Configuration::load(&path).unwrap_err();
        assert!(matches!(err, CoreError::Config(ref msg) if msg.contains("bad.toml")));
    }

    #[test]
    fn request_images_in_order() {
        let request = Request::new(Configuration::default(), "builder:1.0");
        assert_eq!(request.images().collect::<Vec<_>>(), vec!["builder:1.0"]);
        assert!(request.runtime_image().is_none());

        let request = request.with_runtime_image("runtime:1.0");
        assert_eq!(
            request.images().collect::<Vec<_>>(),
            vec!["builder:1.0", "runtime:1.0"]
        );
        assert_eq!(request.base_image(), "builder:1.0");
    }
}
