mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{
    config_error, connect, EXIT_CONFIG_ERROR, EXIT_CONNECTION_ERROR, EXIT_CONTAINER_FAILED,
    EXIT_FAILURE,
};
use dockwright_core::{Configuration, Request};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Parser)]
#[command(
    name = "dockwright",
    version,
    about = "Make sure container images are present and run them to completion"
)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Runtime endpoint (overrides the config file and DOCKER_HOST).
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Connection probe timeout in seconds, e.g. 30 or 1.5; 0 waits forever.
    #[arg(long, global = true, value_parser = parse_timeout)]
    timeout: Option<Duration>,

    /// Working directory for runtime invocations.
    #[arg(long, global = true)]
    workdir: Option<PathBuf>,

    /// Report pull intent and local image availability.
    #[arg(long, default_value_t = false, global = true)]
    debug: bool,

    /// Runtime client to use.
    #[arg(long, default_value = "docker", global = true, value_parser = ["docker", "podman", "mock"])]
    backend: String,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Make sure an image is available locally, pulling it if needed.
    Ensure {
        /// Image reference, e.g. busybox:latest.
        image: String,
    },
    /// Ensure an image, then run a command in a new container until it exits.
    Run {
        /// Image reference.
        image: String,
        /// Command to run (after --). Defaults to the /bin/true probe.
        #[arg(last = true)]
        command: Vec<String>,
    },
    /// Ensure a build's base and runtime images, then probe the base image.
    Prepare {
        /// Base (builder) image.
        base_image: String,
        /// Optional runtime image.
        #[arg(long)]
        runtime_image: Option<String>,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.debug {
        "info"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("DOCKWRIGHT_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let result = execute(&cli);

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("connection error:") {
                EXIT_CONNECTION_ERROR
            } else if msg.starts_with("config error:") {
                EXIT_CONFIG_ERROR
            } else if msg.starts_with("container error:") {
                EXIT_CONTAINER_FAILED
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}

fn execute(cli: &Cli) -> Result<u8, String> {
    match &cli.command {
        Commands::Completions { shell } => commands::completions::run::<Cli>(*shell),
        Commands::Ensure { image } => {
            let request = Request::new(resolve_config(cli)?, image);
            let handler = connect(&cli.backend, &request)?;
            commands::ensure::run(&handler, image, cli.json)
        }
        Commands::Run { image, command } => {
            let request = Request::new(resolve_config(cli)?, image);
            let handler = connect(&cli.backend, &request)?;
            commands::run::run(&handler, image, command, cli.json)
        }
        Commands::Prepare {
            base_image,
            runtime_image,
        } => {
            let mut request = Request::new(resolve_config(cli)?, base_image);
            if let Some(runtime_image) = runtime_image {
                request = request.with_runtime_image(runtime_image);
            }
            let handler = connect(&cli.backend, &request)?;
            commands::prepare::run(&handler, &request, cli.json)
        }
    }
}

fn parse_timeout(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number of seconds"))?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("invalid timeout '{value}'"))
}

/// Config file (or `DOCKER_HOST`/defaults), then command-line overrides.
fn resolve_config(cli: &Cli) -> Result<Configuration, String> {
    let mut config = match &cli.config {
        Some(path) => Configuration::load(path).map_err(|e| config_error(&e))?,
        None => Configuration::from_env(),
    };
    if let Some(endpoint) = &cli.endpoint {
        config = config.with_endpoint(endpoint);
    }
    if let Some(timeout) = cli.timeout {
        config = config.with_timeout(timeout);
    }
    if let Some(dir) = &cli.workdir {
        config = config.with_working_dir(dir.clone());
    }
    if cli.debug {
        config = config.with_debug(true);
    }
    debug!(
        "backend {} at {} (timeout {:?}, workdir {})",
        cli.backend,
        config.endpoint(),
        config.timeout(),
        config.working_dir().display()
    );
    Ok(config)
}
