use super::ensure::resolve;
use super::{colorize_exit, json_pretty, short_id, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use dockwright_core::{CoreError, Handler, PROBE_COMMAND};
use dockwright_runtime::RuntimeClient;

/// Ensure `image`, then run `command` (or the probe) in it to completion.
pub fn run<C: RuntimeClient>(
    handler: &Handler<C>,
    image: &str,
    command: &[String],
    json: bool,
) -> Result<u8, String> {
    if resolve(handler, image)?.is_none() {
        return Err(format!(
            "pull error: image '{image}' could not be resolved after pulling"
        ));
    }

    let command: Vec<String> = if command.is_empty() {
        PROBE_COMMAND.iter().map(|s| (*s).to_owned()).collect()
    } else {
        command.to_vec()
    };

    let pb = spinner(&format!("running {} in {image}…", command.join(" ")));
    let container = handler
        .run_command_to_completion(image, &command)
        .map_err(|e| {
            spin_fail(&pb, &failure_label(&e));
            e.to_string()
        })?;
    spin_ok(&pb, "container finished");

    if json {
        let payload = serde_json::json!({
            "image": image,
            "container": container,
            "exit_code": 0,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "{} {} ({})",
            short_id(&container.id),
            colorize_exit(0),
            command.join(" ")
        );
    }
    Ok(EXIT_SUCCESS)
}

fn failure_label(err: &CoreError) -> String {
    match err {
        CoreError::CreateContainerFailed { code } => {
            format!("container failed ({})", colorize_exit(*code))
        }
        _ => "container failed".to_owned(),
    }
}
