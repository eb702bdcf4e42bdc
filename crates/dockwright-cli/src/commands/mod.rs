pub mod completions;
pub mod ensure;
pub mod prepare;
pub mod run;

use dockwright_core::{CoreError, Handler, Request};
use dockwright_runtime::{select_client, RuntimeClient};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONNECTION_ERROR: u8 = 2;
pub const EXIT_CONFIG_ERROR: u8 = 3;
pub const EXIT_CONTAINER_FAILED: u8 = 4;

pub type CliHandler = Handler<Box<dyn RuntimeClient>>;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_exit(code: i64) -> String {
    use console::Style;
    let text = format!("exit {code}");
    if code == 0 {
        Style::new().green().apply_to(text).to_string()
    } else {
        Style::new().red().bold().apply_to(text).to_string()
    }
}

/// Connect a handler for `request` through the named backend.
pub fn connect(backend: &str, request: &Request) -> Result<CliHandler, String> {
    Handler::with_connector(request, |config| {
        select_client(backend, &config.connect_options())
    })
    .map_err(|e| e.to_string())
}

/// Configuration failures all carry the `config error:` prefix so the exit
/// code mapping in `main` can recognize them.
pub fn config_error(err: &CoreError) -> String {
    match err {
        CoreError::Config(_) => err.to_string(),
        other => format!("config error: {other}"),
    }
}

pub fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}
